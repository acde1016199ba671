//! Schemas for the public intake forms (contact, newsletter, quote).
//!
//! A submission is validated against its form's field list, reduced to the
//! known fields, stored as a record with a generated id, and rendered into a
//! plain-text notification.

use core::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::collection::{self, MutationError, Outcome};
use crate::record::{record_id, Record, ID_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Contact,
    Newsletter,
    Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_len: usize },
    Email,
    /// One of the configured content languages.
    Language,
    NonNegativeInteger,
    NonNegativeNumber,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, required: bool, kind: FieldKind) -> FieldRule {
    FieldRule {
        name,
        label,
        required,
        kind,
    }
}

const SHORT: FieldKind = FieldKind::Text { max_len: 200 };
const PHONE: FieldKind = FieldKind::Text { max_len: 50 };
const LONG: FieldKind = FieldKind::Text { max_len: 5000 };

const CONTACT_FIELDS: &[FieldRule] = &[
    field("name", "Name", true, SHORT),
    field("email", "Email", true, FieldKind::Email),
    field("phone", "Phone", false, PHONE),
    field("subject", "Subject", false, SHORT),
    field("message", "Message", true, LONG),
];

const NEWSLETTER_FIELDS: &[FieldRule] = &[
    field("email", "Email", true, FieldKind::Email),
    field("name", "Name", false, SHORT),
    field("language", "Language", false, FieldKind::Language),
];

const QUOTE_FIELDS: &[FieldRule] = &[
    field("name", "Name", true, SHORT),
    field("email", "Email", true, FieldKind::Email),
    field("phone", "Phone", false, PHONE),
    field("company", "Company", false, SHORT),
    field("product", "Product", true, SHORT),
    field("quantity", "Quantity", false, FieldKind::NonNegativeInteger),
    field("capacityKwh", "Capacity (kWh)", false, FieldKind::NonNegativeNumber),
    field("message", "Message", false, LONG),
];

impl FormKind {
    pub const ALL: [FormKind; 3] = [FormKind::Contact, FormKind::Newsletter, FormKind::Quote];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Contact => "contact",
            FormKind::Newsletter => "newsletter",
            FormKind::Quote => "quote",
        }
    }

    /// Resource the submissions of this form are stored in.
    pub fn resource(&self) -> &'static str {
        match self {
            FormKind::Contact => "contact_submissions",
            FormKind::Newsletter => "newsletter_subscribers",
            FormKind::Quote => "quote_requests",
        }
    }

    /// Field that identifies a returning submitter, if the form dedupes.
    pub fn dedupe_key(&self) -> Option<&'static str> {
        match self {
            FormKind::Newsletter => Some("email"),
            FormKind::Contact | FormKind::Quote => None,
        }
    }

    pub fn fields(&self) -> &'static [FieldRule] {
        match self {
            FormKind::Contact => CONTACT_FIELDS,
            FormKind::Newsletter => NEWSLETTER_FIELDS,
            FormKind::Quote => QUOTE_FIELDS,
        }
    }

    fn subject(&self) -> String {
        format!("New {} submission", self.as_str())
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown form: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn check_field(rule: &FieldRule, value: &Value, languages: &[String]) -> Result<Value, String> {
    match rule.kind {
        FieldKind::Text { max_len } => {
            let Value::String(s) = value else {
                return Err("must be a string".into());
            };
            let s = s.trim();
            if s.chars().count() > max_len {
                return Err(format!("must be at most {} characters", max_len));
            }
            Ok(Value::String(s.to_string()))
        }
        FieldKind::Email => {
            let Value::String(s) = value else {
                return Err("must be a valid email address".into());
            };
            let s = s.trim().to_lowercase();
            if s.len() > 254 || !email_regex().is_match(&s) {
                return Err("must be a valid email address".into());
            }
            Ok(Value::String(s))
        }
        FieldKind::Language => {
            let lang = value.as_str().map(str::trim).unwrap_or_default();
            if languages.iter().any(|l| l == lang) {
                Ok(Value::String(lang.to_string()))
            } else {
                Err(format!("must be one of: {}", languages.join(", ")))
            }
        }
        FieldKind::NonNegativeInteger => match number_from(value) {
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                Ok(Value::from(n as u64))
            }
            _ => Err("must be a non-negative integer".into()),
        },
        FieldKind::NonNegativeNumber => match number_from(value).and_then(Number::from_f64) {
            Some(n) if n.as_f64().is_some_and(|f| f >= 0.0) => Ok(Value::Number(n)),
            _ => Err("must be a non-negative number".into()),
        },
    }
}

/// Validate a raw payload against the form's schema.
///
/// Returns the cleaned record, holding only schema fields, in schema order,
/// with strings trimmed and emails lowercased. Blank optional fields are
/// left out. On failure every offending field is reported.
pub fn validate(kind: FormKind, payload: &Value, languages: &[String]) -> Result<Record, Vec<FieldError>> {
    let Value::Object(input) = payload else {
        return Err(vec![FieldError::new("body", "must be a JSON object")]);
    };

    let mut cleaned = Record::new();
    let mut errors = Vec::new();
    for rule in kind.fields() {
        match input.get(rule.name) {
            Some(value) if !is_blank(value) => match check_field(rule, value, languages) {
                Ok(v) => {
                    cleaned.insert(rule.name.to_string(), v);
                }
                Err(message) => errors.push(FieldError::new(rule.name, message)),
            },
            _ if rule.required => errors.push(FieldError::new(rule.name, "is required")),
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}

/// Result of storing a validated submission.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSubmission {
    pub id: Value,
    pub outcome: Outcome,
    pub record: Record,
}

/// Add a validated submission to a resource's records.
///
/// Each submission gets a fresh UUID `id` and a `createdAt` stamp. Forms with
/// a dedupe key update the earlier record of the same submitter instead,
/// keeping its `id` and stamping `updatedAt`.
pub fn store_submission(
    kind: FormKind,
    records: &mut Vec<Record>,
    fields: Record,
    now: i64,
) -> Result<StoredSubmission, MutationError> {
    let existing_id = kind.dedupe_key().and_then(|key| {
        let wanted = fields.get(key)?;
        records
            .iter()
            .find(|r| r.get(key) == Some(wanted))
            .and_then(|r| record_id(r).cloned())
    });
    let id = existing_id.unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));

    let mut record = Record::new();
    record.insert(ID_FIELD.to_string(), id.clone());
    record.extend(fields);

    let outcome = match kind.dedupe_key() {
        Some(key) => collection::update_by(records, key, record, now)?,
        None => collection::create(records, record, now),
    };
    let record = records
        .iter()
        .rev()
        .find(|r| r.get(ID_FIELD) == Some(&id))
        .cloned()
        .unwrap_or_default();

    Ok(StoredSubmission {
        id,
        outcome,
        record,
    })
}

/// Notification sent for every accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub form: FormKind,
    pub subject: String,
    pub body: String,
    pub fields: Record,
}

/// Render the notification for a stored submission record.
pub fn render_notification(kind: FormKind, record: &Record) -> Notification {
    let mut body = String::new();
    for rule in kind.fields() {
        let Some(value) = record.get(rule.name) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        body.push_str(&format!("{}: {}\n", rule.label, text));
    }
    if let Some(id) = record_id(record) {
        let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
        body.push_str(&format!("\nSubmission ID: {}\n", id));
    }

    Notification {
        form: kind,
        subject: kind.subject(),
        body,
        fields: record.clone(),
    }
}
