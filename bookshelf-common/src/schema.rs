//! Book schema registry
//!
//! The fixed, ordered list of fields every book record must carry. Both the
//! form builder and the import validator read from here; nothing mutates it
//! after startup.

use serde::Serialize;

/// One recognized book attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub label: &'static str,
}

/// Canonical book shape, in display order
pub const BOOK_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { name: "author", label: "Author" },
    FieldDescriptor { name: "title", label: "Title" },
    FieldDescriptor { name: "pages", label: "Number of pages" },
    FieldDescriptor { name: "year", label: "Year of publication" },
];

/// Attributes a record may carry but never has to
pub const OPTIONAL_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor { name: "genre", label: "Genre" },
];

/// Names of the required fields, in order
pub fn required_names() -> impl Iterator<Item = &'static str> {
    BOOK_FIELDS.iter().map(|f| f.name)
}
