use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;

use crate::application::CustomerService;
use crate::domain::{CustomerDraft, NewCustomer, customers_from_value};

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
}

/// Importer for loading customers into the store
pub struct Importer<'a> {
    service: &'a CustomerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a CustomerService) -> Self {
        Self { service }
    }

    /// Import customers from CSV. Columns are matched by header name; an
    /// `id` column is ignored because the store assigns ids. Amount text
    /// that is not a valid yen value is kept as malformed, as it was stored.
    pub async fn import_customers_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut drafts = Vec::new();
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.deserialize::<NewCustomer>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let form = match result {
                Ok(form) => form,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            match form.into_stored_draft() {
                Ok(draft) => drafts.push((line, draft)),
                Err(e) => errors.push(ImportError {
                    line,
                    field: Some(e.field.to_string()),
                    error: e.source.to_string(),
                }),
            }
        }

        self.store_all(drafts, errors, options).await
    }

    /// Import customers from a JSON snapshot, or from a bare JSON array of
    /// customer records. A document that is not shaped like a record set is
    /// rejected as a whole.
    pub async fn import_full_json<R: Read>(
        &self,
        mut reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut input = String::new();
        reader
            .read_to_string(&mut input)
            .context("Failed to read JSON input")?;

        let value: Value = serde_json::from_str(&input).context("Input is not valid JSON")?;
        let customers = match value {
            Value::Object(mut snapshot) if snapshot.contains_key("customers") => {
                customers_from_value(snapshot.remove("customers").unwrap_or(Value::Null))?
            }
            other => customers_from_value(other)?,
        };

        let drafts = customers
            .into_iter()
            .enumerate()
            .map(|(index, customer)| (index + 1, CustomerDraft::from(customer)))
            .collect();

        self.store_all(drafts, Vec::new(), options).await
    }

    async fn store_all(
        &self,
        drafts: Vec<(usize, CustomerDraft)>,
        mut errors: Vec<ImportError>,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut imported = 0;
        let mut skipped = 0;

        for (line, draft) in drafts {
            if draft.name.trim().is_empty() {
                skipped += 1;
                errors.push(ImportError {
                    line,
                    field: Some("name".to_string()),
                    error: "name is empty".to_string(),
                });
                continue;
            }

            if options.dry_run {
                imported += 1;
                continue;
            }

            match self.service.store_customer(draft).await {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Customer creation failed: {}", e),
                }),
            }
        }

        log::info!(
            "import finished: {} imported, {} skipped, {} errors",
            imported,
            skipped,
            errors.len()
        );

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }
}
