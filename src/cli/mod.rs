use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{CustomerService, DashboardReport};
use crate::domain::{
    Amount, AmountProblem, CustomerRecord, FilterCriteria, NewCustomer, PaymentStatus,
    StatusFilter, Total, format_yen, parse_customers_json,
};

/// Width of the notes column when showing a single customer.
const NOTES_WRAP_WIDTH: usize = 20;

/// Width of the longest bar in the counselor profit chart.
const CHART_WIDTH: usize = 30;

/// Ryugaku - study-abroad customer and payment tracker
#[derive(Parser)]
#[command(name = "ryugaku")]
#[command(about = "Track study-abroad customers, their payments and counselor profit")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "customers.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Register a new customer
    Add(AddArgs),

    /// List customers, optionally filtered
    List {
        /// Case-insensitive part of the customer name
        #[arg(short, long, default_value = "")]
        search: String,

        /// Payment status: all, unpaid, partial, completed, or a stored label
        #[arg(long, default_value = "all")]
        status: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show every detail of one customer
    Show {
        /// Customer ID
        id: i64,
    },

    /// Revenue, profit and profit per counselor
    Dashboard {
        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,

        /// Read customers from a JSON file instead of the database
        #[arg(long)]
        input: Option<String>,
    },

    /// Export data (customers, report, full)
    Export {
        /// What to export: customers, report, full
        export_type: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Only export customers whose name contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only export customers with this payment status
        #[arg(long, default_value = "all")]
        status: String,
    },

    /// Import data (customers, full)
    Import {
        /// What to import: customers (CSV), full (JSON)
        import_type: String,

        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// Customer name
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    /// Program name
    #[arg(long, default_value = "")]
    pub program: String,

    /// School name
    #[arg(long, default_value = "")]
    pub school: String,

    /// Total amount received from the customer (yen)
    #[arg(long, default_value = "")]
    pub received: String,

    /// Amount paid to the school (yen)
    #[arg(long, default_value = "")]
    pub paid_to_school: String,

    /// Agency profit (yen)
    #[arg(long, default_value = "")]
    pub profit: String,

    /// Payment status: unpaid, partial, completed, or a label
    #[arg(long, default_value = "")]
    pub status: String,

    /// Program start date
    #[arg(long, default_value = "")]
    pub start: String,

    /// Program end date
    #[arg(long, default_value = "")]
    pub end: String,

    /// Assigned counselor
    #[arg(long, default_value = "")]
    pub counselor: String,

    #[arg(long, default_value = "")]
    pub notes: String,
}

impl From<AddArgs> for NewCustomer {
    fn from(args: AddArgs) -> Self {
        let payment_status = if args.status.is_empty() {
            String::new()
        } else {
            PaymentStatus::from_alias(&args.status).to_string()
        };

        Self {
            name: args.name,
            email: args.email,
            phone: args.phone,
            program_name: args.program,
            school_name: args.school,
            total_amount_received: args.received,
            amount_paid_to_school: args.paid_to_school,
            agency_profit: args.profit,
            payment_status,
            program_start_date: args.start,
            program_end_date: args.end,
            assigned_to: args.counselor,
            notes: args.notes,
        }
    }
}

impl Cli {
    /// Set up logging. `RUST_LOG` takes precedence over `--verbose`.
    pub fn init_logging(&self) {
        let default_filter = if self.verbose { "debug" } else { "warn" };
        let env = env_logger::Env::default().default_filter_or(default_filter);
        env_logger::Builder::from_env(env).init();
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                CustomerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Add(args) => {
                let service = CustomerService::connect(&self.database).await?;
                let customer = service.create_customer(args.into()).await?;
                println!(
                    "Registered customer: {} ({}) id {}",
                    customer.name,
                    display_status(&customer.payment_status),
                    customer.id
                );
            }

            Commands::List {
                search,
                status,
                format,
            } => {
                let service = CustomerService::connect(&self.database).await?;
                let criteria = FilterCriteria::new(search, parse_status_filter(&status));
                let customers = service.list_customers(&criteria).await?;
                print_customers(&customers, &format)?;
            }

            Commands::Show { id } => {
                let service = CustomerService::connect(&self.database).await?;
                let customer = service.get_customer(id).await?;
                print_customer(&customer);
            }

            Commands::Dashboard { format, input } => {
                let dashboard = match input {
                    Some(path) => {
                        let json = std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read input file: {}", path))?;
                        let customers = parse_customers_json(&json)
                            .with_context(|| format!("Invalid customer data in {}", path))?;
                        DashboardReport::build(&customers)
                    }
                    None => {
                        let service = CustomerService::connect(&self.database).await?;
                        service.dashboard().await?
                    }
                };
                print_dashboard(&dashboard, &format)?;
            }

            Commands::Export {
                export_type,
                output,
                search,
                status,
            } => {
                let service = CustomerService::connect(&self.database).await?;
                let criteria = FilterCriteria::new(search, parse_status_filter(&status));
                run_export_command(&service, &export_type, output.as_deref(), &criteria).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
            } => {
                let service = CustomerService::connect(&self.database).await?;
                run_import_command(&service, &import_type, input.as_deref(), dry_run).await?;
            }
        }

        Ok(())
    }
}

/// `all` keeps every status; anything else is resolved through the aliases.
fn parse_status_filter(input: &str) -> StatusFilter {
    if input == StatusFilter::ALL {
        StatusFilter::All
    } else {
        StatusFilter::Only(PaymentStatus::from_alias(input))
    }
}

async fn run_export_command(
    service: &CustomerService,
    export_type: &str,
    output: Option<&str>,
    criteria: &FilterCriteria,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "customers" => {
            let count = exporter.export_customers_csv(writer, criteria).await?;
            if output.is_some() {
                eprintln!("Exported {} customers", count);
            }
        }
        "report" => {
            let count = exporter.export_report_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported report with {} counselors", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!("Exported full database: {} customers", snapshot.customers.len());
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: customers, report, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &CustomerService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions { dry_run };

    let result = match import_type {
        "customers" => importer.import_customers_csv(reader, options).await?,
        "full" => importer.import_full_json(reader, options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: customers, full",
                import_type
            );
        }
    };

    if dry_run {
        println!("Validation finished");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn print_customers(customers: &[CustomerRecord], format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(customers)?);
        }
        "csv" => {
            crate::io::write_customers_csv(std::io::stdout(), customers)?;
        }
        _ => {
            if customers.is_empty() {
                println!("No customers found.");
                return Ok(());
            }

            println!(
                "{:>5} {:<18} {:<18} {:<10} {:<12} {:<12} NOTES",
                "ID", "NAME", "PROGRAM", "STATUS", "START", "END"
            );
            println!("{}", "-".repeat(100));
            for c in customers {
                println!(
                    "{:>5} {:<18} {:<18} {:<10} {:<12} {:<12} {}",
                    c.id,
                    truncate(&c.name, 18),
                    truncate(&c.program_name, 18),
                    display_status(&c.payment_status),
                    truncate(&c.program_start_date, 12),
                    truncate(&c.program_end_date, 12),
                    truncate(&c.notes.replace('\n', " "), 20)
                );
            }
        }
    }
    Ok(())
}

fn print_customer(c: &CustomerRecord) {
    println!("Customer: {}", c.name);
    println!("  ID:              {}", c.id);
    println!("  Email:           {}", c.email);
    println!("  Phone:           {}", c.phone);
    println!("  Program:         {}", c.program_name);
    println!("  School:          {}", c.school_name);
    println!("  Received:        {}", format_amount(&c.total_amount_received));
    println!("  Paid to school:  {}", format_amount(&c.amount_paid_to_school));
    println!("  Agency profit:   {}", format_amount(&c.agency_profit));
    println!("  Status:          {}", display_status(&c.payment_status));
    println!("  Program dates:   {} - {}", c.program_start_date, c.program_end_date);
    println!("  Counselor:       {}", display_counselor(&c.assigned_to));

    let notes = wrap_text(&c.notes, NOTES_WRAP_WIDTH);
    if !notes.is_empty() {
        println!("  Notes:");
        for line in notes {
            println!("    {}", line);
        }
    }
}

fn print_dashboard(dashboard: &DashboardReport, format: &str) -> Result<()> {
    let report = &dashboard.report;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(dashboard)?);
        }
        "csv" => {
            crate::io::write_report_csv(std::io::stdout(), report)?;
        }
        _ => {
            println!("Dashboard");
            println!();
            println!("Customers:      {:>15}", dashboard.customer_count);
            println!("Total revenue:  {:>15}", format_yen(report.total_revenue));
            println!("Total profit:   {:>15}", format_yen(report.total_profit));

            if !report.profit_by_counselor.is_empty() {
                println!();
                println!("Profit by counselor:");

                let max = report
                    .profit_by_counselor
                    .iter()
                    .map(|e| e.profit.unsigned_abs())
                    .max()
                    .unwrap_or(0);

                for entry in &report.profit_by_counselor {
                    println!(
                        "  {:<18} {:>15} {}",
                        truncate(display_counselor(&entry.counselor), 18),
                        format_yen(entry.profit),
                        bar(entry.profit, max)
                    );
                }
            }

            if dashboard.has_issues() {
                println!();
                println!(
                    "Warning: {} amount(s) missing or invalid, counted as 0:",
                    dashboard.issues.len()
                );
                for issue in dashboard.issues.iter().take(10) {
                    let problem = match &issue.problem {
                        AmountProblem::Missing => "missing".to_string(),
                        AmountProblem::Malformed(raw) => format!("'{}'", raw),
                    };
                    println!("  customer {} {}: {}", issue.customer_id, issue.field, problem);
                }
                if dashboard.issues.len() > 10 {
                    println!("  ... and {} more", dashboard.issues.len() - 10);
                }
            }
        }
    }
    Ok(())
}

fn bar(profit: Total, max: u128) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (profit.unsigned_abs() as f64 / max as f64 * CHART_WIDTH as f64).round() as usize;
    let ch = if profit < 0 { '░' } else { '█' };
    std::iter::repeat_n(ch, len).collect()
}

fn format_amount(amount: &Amount) -> String {
    match amount {
        Amount::Value(v) => format_yen(*v),
        Amount::Missing => "-".to_string(),
        Amount::Malformed(raw) => format!("invalid ({})", raw),
    }
}

fn display_status(status: &PaymentStatus) -> &str {
    if status.as_str().is_empty() {
        "-"
    } else {
        status.as_str()
    }
}

fn display_counselor(counselor: &str) -> &str {
    if counselor.is_empty() {
        "(unassigned)"
    } else {
        counselor
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Split text into lines of at most `width` characters. Existing line breaks
/// are kept.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    text.lines()
        .filter(|line| !line.is_empty())
        .flat_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            chars
                .chunks(width)
                .map(|chunk| chunk.iter().collect::<String>())
                .collect::<Vec<_>>()
        })
        .collect()
}
