//! Book form construction and validation
//!
//! The book form is assembled once from the schema registry: each descriptor
//! is mapped to a typed field validator by name. Validation never fails the
//! request; it returns per-field messages the caller shows next to the form.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::models::BookRecord;
use crate::schema::{FieldDescriptor, BOOK_FIELDS, OPTIONAL_FIELDS};

/// Maximum length of the author field and of any unlisted text field
pub const DEFAULT_TEXT_MAX: usize = 200;
/// Maximum length of the title field
pub const TITLE_MAX: usize = 300;
/// Maximum length of the optional genre field
pub const GENRE_MAX: usize = 100;

/// Process-wide book form, built on first use with the current year as the
/// upper bound for `year`
pub static BOOK_FORM: Lazy<BookForm> =
    Lazy::new(|| BookForm::build(BOOK_FIELDS, current_year()));

/// Current calendar year (local time)
pub fn current_year() -> i64 {
    i64::from(chrono::Local::now().year())
}

/// Validator attached to one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Whole number within `[min, max]`; no upper bound when `max` is `None`
    Integer { min: i64, max: Option<i64> },
    /// Free text up to `max_length` characters
    Text { max_length: usize },
}

/// One field of a built form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Value produced by a field that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cleaned {
    Integer(i64),
    Text(String),
    Empty,
}

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a message to a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// All messages flattened into one line, for logs and flash messages
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for FieldErrors {}

/// Input form for a single book record
#[derive(Debug, Clone, Serialize)]
pub struct BookForm {
    fields: Vec<FormField>,
}

impl BookForm {
    /// Build the form from a descriptor list
    ///
    /// Field kinds are chosen by name: `pages` is an integer >= 1, `year` an
    /// integer in `[1, current_year]`, `title` text up to 300 characters, and
    /// everything else text up to 200 characters. The optional `genre` field
    /// is appended after the descriptors.
    pub fn build(descriptors: &[FieldDescriptor], current_year: i64) -> Self {
        let mut fields: Vec<FormField> = descriptors
            .iter()
            .map(|d| FormField {
                name: d.name,
                label: d.label,
                kind: kind_for(d.name, current_year),
                required: true,
            })
            .collect();

        fields.extend(OPTIONAL_FIELDS.iter().map(|d| FormField {
            name: d.name,
            label: d.label,
            kind: kind_for(d.name, current_year),
            required: false,
        }));

        Self { fields }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Validate raw submitted values into a book record
    pub fn validate(&self, data: &HashMap<String, String>) -> Result<BookRecord, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut cleaned: HashMap<&str, Cleaned> = HashMap::new();

        for field in &self.fields {
            let raw = data.get(field.name).map(String::as_str).unwrap_or("");
            match clean_field(field, raw) {
                Ok(value) => {
                    cleaned.insert(field.name, value);
                }
                Err(msg) => errors.add(field.name, msg),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let text = |name: &str| match cleaned.get(name) {
            Some(Cleaned::Text(s)) => Some(s.clone()),
            _ => None,
        };
        let integer = |name: &str| match cleaned.get(name) {
            Some(Cleaned::Integer(n)) => Some(*n),
            _ => None,
        };

        match (text("author"), text("title"), integer("pages"), integer("year")) {
            (Some(author), Some(title), Some(pages), Some(year)) => Ok(BookRecord {
                author,
                title,
                pages,
                year,
                genre: text("genre"),
            }),
            _ => {
                // Built from a descriptor list that does not cover every attribute
                for name in ["author", "title", "pages", "year"] {
                    if text(name).is_none() && integer(name).is_none() {
                        errors.add(name, "This field is required.");
                    }
                }
                Err(errors)
            }
        }
    }
}

fn kind_for(name: &str, current_year: i64) -> FieldKind {
    match name {
        "pages" => FieldKind::Integer { min: 1, max: None },
        "year" => FieldKind::Integer { min: 1, max: Some(current_year) },
        "title" => FieldKind::Text { max_length: TITLE_MAX },
        "genre" => FieldKind::Text { max_length: GENRE_MAX },
        _ => FieldKind::Text { max_length: DEFAULT_TEXT_MAX },
    }
}

/// "5.0" and "5." are whole numbers too
fn strip_zero_fraction(raw: &str) -> &str {
    match raw.rfind('.') {
        Some(dot) if raw[dot + 1..].bytes().all(|b| b == b'0') => &raw[..dot],
        _ => raw,
    }
}

fn clean_field(field: &FormField, raw: &str) -> Result<Cleaned, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return if field.required {
            Err("This field is required.".to_string())
        } else {
            Ok(Cleaned::Empty)
        };
    }

    match field.kind {
        FieldKind::Integer { min, max } => {
            let n: i64 = strip_zero_fraction(raw)
                .parse()
                .map_err(|_| "Enter a whole number.".to_string())?;
            if n < min {
                return Err(format!(
                    "Ensure this value is greater than or equal to {}.",
                    min
                ));
            }
            if let Some(max) = max {
                if n > max {
                    return Err(format!(
                        "Ensure this value is less than or equal to {}.",
                        max
                    ));
                }
            }
            Ok(Cleaned::Integer(n))
        }
        FieldKind::Text { max_length } => {
            let len = raw.chars().count();
            if len > max_length {
                return Err(format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max_length, len
                ));
            }
            Ok(Cleaned::Text(raw.to_string()))
        }
    }
}
