use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::money::{ParseYenError, Yen, parse_yen};

/// Store-assigned identifier. Never reused.
pub type CustomerId = i64;

/// A monetary field as it was actually stored.
///
/// Store data is not guaranteed to be clean: a column may never have been
/// populated, or may hold text that is not an integer. Those cases are kept
/// distinct so they can be reported, and count as zero when aggregating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Amount {
    Value(Yen),
    #[default]
    Missing,
    Malformed(String),
}

impl Amount {
    /// Coerce free-text form input. Empty input means "not filled in".
    pub fn from_input(input: &str) -> Result<Self, ParseYenError> {
        match parse_yen(input) {
            Ok(v) => Ok(Amount::Value(v)),
            Err(ParseYenError::Empty) => Ok(Amount::Missing),
            Err(e) => Err(e),
        }
    }

    /// Interpret stored text leniently: anything that is not a valid amount
    /// is kept as `Malformed`, except values too large to represent.
    pub fn from_stored_text(text: &str) -> Result<Self, ParseYenError> {
        match parse_yen(text) {
            Ok(v) => Ok(Amount::Value(v)),
            Err(ParseYenError::Empty) => Ok(Amount::Missing),
            Err(ParseYenError::InvalidFormat(_)) => Ok(Amount::Malformed(text.to_string())),
            Err(e @ ParseYenError::OutOfRange(_)) => Err(e),
        }
    }

    /// Interpret a stored floating-point value. Only integral values are
    /// usable amounts.
    pub fn from_stored_float(v: f64) -> Result<Self, ParseYenError> {
        if !v.is_finite() || v.fract() != 0.0 {
            return Ok(Amount::Malformed(v.to_string()));
        }
        if !(F64_I64_MIN..F64_I64_LIMIT).contains(&v) {
            return Err(ParseYenError::OutOfRange(v.to_string()));
        }
        Ok(Amount::Value(v as Yen))
    }

    pub fn value(&self) -> Option<Yen> {
        match self {
            Amount::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// The fail-soft interpretation used by reporting.
    pub fn or_zero(&self) -> Yen {
        self.value().unwrap_or(0)
    }
}

impl From<Yen> for Amount {
    fn from(v: Yen) -> Self {
        Amount::Value(v)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Value(v) => write!(f, "{}", v),
            Amount::Missing => Ok(()),
            Amount::Malformed(raw) => write!(f, "{}", raw),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Value(v) => serializer.serialize_i64(*v),
            Amount::Missing => serializer.serialize_none(),
            Amount::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

// Bounds of the f64 values that convert to i64 without saturating.
const F64_I64_MIN: f64 = -9_223_372_036_854_775_808.0;
const F64_I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer yen amount, a string, or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::Value(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Yen::try_from(v)
            .map(Amount::Value)
            .map_err(|_| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_stored_float(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_stored_text(v).map_err(E::custom)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Amount, E> {
        Ok(Amount::Malformed(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::Missing)
    }

    fn visit_none<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::Missing)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Amount, D::Error> {
        Amount::deserialize(deserializer)
    }
}

/// Payment status label as stored. Three labels are known; anything else is
/// passed through untouched and treated as its own category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PaymentStatus(String);

impl PaymentStatus {
    pub const UNPAID: &'static str = "未払い";
    pub const PARTIALLY_PAID: &'static str = "一部支払い";
    pub const COMPLETED: &'static str = "完了";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn unpaid() -> Self {
        Self::new(Self::UNPAID)
    }

    pub fn partially_paid() -> Self {
        Self::new(Self::PARTIALLY_PAID)
    }

    pub fn completed() -> Self {
        Self::new(Self::COMPLETED)
    }

    pub fn known() -> [&'static str; 3] {
        [Self::UNPAID, Self::PARTIALLY_PAID, Self::COMPLETED]
    }

    /// Resolve a lowercase English alias (`unpaid`, `partial`, `completed`)
    /// to its stored label. Other input, including differently cased
    /// aliases, is taken as a label verbatim.
    pub fn from_alias(input: &str) -> Self {
        match input {
            "unpaid" => Self::unpaid(),
            "partial" | "partially-paid" | "partially_paid" => Self::partially_paid(),
            "completed" | "complete" | "paid" => Self::completed(),
            _ => Self::new(input),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        Self::known().contains(&self.0.as_str())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A customer enrolled in a study-abroad program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub program_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub school_name: String,
    #[serde(default)]
    pub total_amount_received: Amount,
    #[serde(default)]
    pub amount_paid_to_school: Amount,
    #[serde(default)]
    pub agency_profit: Amount,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub program_start_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub program_end_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assigned_to: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
}

impl CustomerRecord {
    /// The monetary fields, keyed by column name.
    pub fn amounts(&self) -> [(&'static str, &Amount); 3] {
        [
            ("total_amount_received", &self.total_amount_received),
            ("amount_paid_to_school", &self.amount_paid_to_school),
            ("agency_profit", &self.agency_profit),
        ]
    }
}

/// A customer that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub program_name: String,
    pub school_name: String,
    pub total_amount_received: Amount,
    pub amount_paid_to_school: Amount,
    pub agency_profit: Amount,
    pub payment_status: PaymentStatus,
    pub program_start_date: String,
    pub program_end_date: String,
    pub assigned_to: String,
    pub notes: String,
}

impl CustomerDraft {
    pub fn with_id(self, id: CustomerId) -> CustomerRecord {
        CustomerRecord {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            program_name: self.program_name,
            school_name: self.school_name,
            total_amount_received: self.total_amount_received,
            amount_paid_to_school: self.amount_paid_to_school,
            agency_profit: self.agency_profit,
            payment_status: self.payment_status,
            program_start_date: self.program_start_date,
            program_end_date: self.program_end_date,
            assigned_to: self.assigned_to,
            notes: self.notes,
        }
    }
}

impl From<CustomerRecord> for CustomerDraft {
    fn from(record: CustomerRecord) -> Self {
        Self {
            name: record.name,
            email: record.email,
            phone: record.phone,
            program_name: record.program_name,
            school_name: record.school_name,
            total_amount_received: record.total_amount_received,
            amount_paid_to_school: record.amount_paid_to_school,
            agency_profit: record.agency_profit,
            payment_status: record.payment_status,
            program_start_date: record.program_start_date,
            program_end_date: record.program_end_date,
            assigned_to: record.assigned_to,
            notes: record.notes,
        }
    }
}

/// Registration form input. Amounts are free text until submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub program_name: String,
    pub school_name: String,
    pub total_amount_received: String,
    pub amount_paid_to_school: String,
    pub agency_profit: String,
    pub payment_status: String,
    pub program_start_date: String,
    pub program_end_date: String,
    pub assigned_to: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {source}")]
pub struct AmountFieldError {
    pub field: &'static str,
    pub source: ParseYenError,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Coerce the amount fields and build a storable draft. Amounts that are
    /// not valid yen are rejected.
    pub fn into_draft(self) -> Result<CustomerDraft, AmountFieldError> {
        self.into_draft_with(Amount::from_input)
    }

    /// Build a draft from a row that was already stored somewhere, such as a
    /// CSV export. Unusable amount text is kept as `Malformed`; only values
    /// too large to represent are rejected.
    pub fn into_stored_draft(self) -> Result<CustomerDraft, AmountFieldError> {
        self.into_draft_with(Amount::from_stored_text)
    }

    fn into_draft_with(
        self,
        parse: fn(&str) -> Result<Amount, ParseYenError>,
    ) -> Result<CustomerDraft, AmountFieldError> {
        let amount = |field: &'static str, input: &str| {
            parse(input).map_err(|source| AmountFieldError { field, source })
        };

        Ok(CustomerDraft {
            total_amount_received: amount("total_amount_received", &self.total_amount_received)?,
            amount_paid_to_school: amount("amount_paid_to_school", &self.amount_paid_to_school)?,
            agency_profit: amount("agency_profit", &self.agency_profit)?,
            payment_status: PaymentStatus::new(self.payment_status.trim()),
            name: self.name,
            email: self.email,
            phone: self.phone,
            program_name: self.program_name,
            school_name: self.school_name,
            program_start_date: self.program_start_date,
            program_end_date: self.program_end_date,
            assigned_to: self.assigned_to,
            notes: self.notes,
        })
    }
}

/// Why a supplied record set could not be read as customer records at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputKind {
    #[error("input is not valid JSON: {0}")]
    Syntax(String),

    #[error("expected a sequence of customer records, found {found}")]
    NotASequence { found: &'static str },

    #[error("element {index} is not a customer record (found {found})")]
    NotARecord { index: usize, found: &'static str },

    #[error("customer record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

/// Decode a JSON document holding an array of customer records.
pub fn parse_customers_json(input: &str) -> Result<Vec<CustomerRecord>, InvalidInputKind> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| InvalidInputKind::Syntax(e.to_string()))?;
    customers_from_value(value)
}

/// Decode an already-parsed JSON value holding an array of customer records.
pub fn customers_from_value(value: Value) -> Result<Vec<CustomerRecord>, InvalidInputKind> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(InvalidInputKind::NotASequence {
                found: json_kind(&other),
            });
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(InvalidInputKind::NotARecord {
                    index,
                    found: json_kind(&item),
                });
            }
            serde_json::from_value(item).map_err(|e| InvalidInputKind::MalformedRecord {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_input() {
        assert_eq!(Amount::from_input("1,000"), Ok(Amount::Value(1000)));
        assert_eq!(Amount::from_input(""), Ok(Amount::Missing));
        assert!(Amount::from_input("lots").is_err());
    }

    #[test]
    fn test_amount_or_zero() {
        assert_eq!(Amount::Value(-20).or_zero(), -20);
        assert_eq!(Amount::Missing.or_zero(), 0);
        assert_eq!(Amount::Malformed("n/a".into()).or_zero(), 0);
    }

    #[test]
    fn test_amount_from_json() {
        let parse = |s: &str| serde_json::from_str::<Amount>(s);
        assert_eq!(parse("1200").unwrap(), Amount::Value(1200));
        assert_eq!(parse("-5").unwrap(), Amount::Value(-5));
        assert_eq!(parse("300.0").unwrap(), Amount::Value(300));
        assert_eq!(parse("\"4,500\"").unwrap(), Amount::Value(4500));
        assert_eq!(parse("null").unwrap(), Amount::Missing);
        assert_eq!(parse("\"\"").unwrap(), Amount::Missing);
        assert_eq!(parse("\"NaN\"").unwrap(), Amount::Malformed("NaN".into()));
        assert_eq!(parse("12.5").unwrap(), Amount::Malformed("12.5".into()));
        assert_eq!(parse("true").unwrap(), Amount::Malformed("true".into()));
    }

    #[test]
    fn test_amount_out_of_range_is_rejected() {
        assert!(serde_json::from_str::<Amount>("18446744073709551615").is_err());
        assert!(serde_json::from_str::<Amount>("1e30").is_err());
        assert!(serde_json::from_str::<Amount>("\"99999999999999999999\"").is_err());
    }

    #[test]
    fn test_payment_status_aliases() {
        assert_eq!(PaymentStatus::from_alias("unpaid"), PaymentStatus::unpaid());
        assert_eq!(
            PaymentStatus::from_alias("partial"),
            PaymentStatus::partially_paid()
        );
        assert_eq!(
            PaymentStatus::from_alias("completed"),
            PaymentStatus::completed()
        );
        assert_eq!(PaymentStatus::from_alias("完了"), PaymentStatus::completed());
        assert_eq!(PaymentStatus::from_alias("refunded").as_str(), "refunded");
        assert!(!PaymentStatus::from_alias("refunded").is_known());
        assert!(PaymentStatus::unpaid().is_known());
    }

    #[test]
    fn test_payment_status_aliases_are_case_sensitive() {
        assert_eq!(PaymentStatus::from_alias("Paid").as_str(), "Paid");
        assert_eq!(PaymentStatus::from_alias("PAID").as_str(), "PAID");
        assert_eq!(PaymentStatus::from_alias("paid"), PaymentStatus::completed());
    }

    #[test]
    fn test_new_customer_into_draft() {
        let form = NewCustomer {
            name: "田中 花子".into(),
            total_amount_received: "500,000".into(),
            amount_paid_to_school: "".into(),
            agency_profit: "120000".into(),
            payment_status: " 完了 ".into(),
            ..Default::default()
        };

        let draft = form.into_draft().unwrap();
        assert_eq!(draft.total_amount_received, Amount::Value(500000));
        assert_eq!(draft.amount_paid_to_school, Amount::Missing);
        assert_eq!(draft.agency_profit, Amount::Value(120000));
        assert_eq!(draft.payment_status, PaymentStatus::completed());
    }

    #[test]
    fn test_new_customer_rejects_bad_amount() {
        let form = NewCustomer {
            agency_profit: "twelve".into(),
            ..NewCustomer::new("Bob")
        };

        let err = form.into_draft().unwrap_err();
        assert_eq!(err.field, "agency_profit");
    }

    #[test]
    fn test_stored_draft_keeps_malformed_amounts() {
        let form = NewCustomer {
            total_amount_received: "¥1,000".into(),
            agency_profit: "n/a".into(),
            ..NewCustomer::new("Bob")
        };

        let draft = form.into_stored_draft().unwrap();
        assert_eq!(draft.total_amount_received, Amount::Value(1000));
        assert_eq!(draft.amount_paid_to_school, Amount::Missing);
        assert_eq!(draft.agency_profit, Amount::Malformed("n/a".into()));

        let too_large = NewCustomer {
            agency_profit: "99999999999999999999".into(),
            ..NewCustomer::new("Bob")
        };
        let err = too_large.into_stored_draft().unwrap_err();
        assert_eq!(err.field, "agency_profit");
    }

    #[test]
    fn test_parse_customers_json() {
        let json = r#"[
            {"id": 1, "name": "Alice", "agency_profit": 100, "assigned_to": "Sato"},
            {"id": 2, "name": null, "email": null, "agency_profit": "oops", "payment_status": null}
        ]"#;

        let records = parse_customers_json(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agency_profit, Amount::Value(100));
        assert_eq!(records[0].total_amount_received, Amount::Missing);
        assert_eq!(records[1].name, "");
        assert_eq!(records[1].agency_profit, Amount::Malformed("oops".into()));
        assert_eq!(records[1].payment_status, PaymentStatus::default());
    }

    #[test]
    fn test_parse_customers_json_structural_errors() {
        assert!(matches!(
            parse_customers_json("{not json"),
            Err(InvalidInputKind::Syntax(_))
        ));
        assert_eq!(
            parse_customers_json(r#"{"id": 1}"#),
            Err(InvalidInputKind::NotASequence { found: "an object" })
        );
        assert_eq!(
            parse_customers_json(r#"[{"id": 1}, 7]"#),
            Err(InvalidInputKind::NotARecord {
                index: 1,
                found: "a number"
            })
        );
        assert!(matches!(
            parse_customers_json(r#"[{"name": "no id"}]"#),
            Err(InvalidInputKind::MalformedRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_record_json_roundtrip_keeps_malformed_text() {
        let json = r#"[{"id": 9, "name": "Eve", "agency_profit": "abc"}]"#;
        let records = parse_customers_json(json).unwrap();
        let out = serde_json::to_string(&records).unwrap();
        assert_eq!(parse_customers_json(&out).unwrap(), records);
    }
}
