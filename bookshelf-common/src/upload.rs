//! Upload form validation
//!
//! Checks an uploaded file's name and size before any byte of it is written
//! to storage.

use crate::form::FieldErrors;

/// Largest accepted upload, in bytes (5 MiB)
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Maximum length of the optional display title
pub const TITLE_MAX: usize = 200;

/// Upload that passed form validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedUpload {
    /// Name shown to the user: the display title, or the original file name
    pub display_name: String,
    /// File name as sent by the client (never used for writing)
    pub original_name: String,
    pub size: usize,
}

/// Validate the upload form fields
///
/// `file` carries the client-side file name and payload size, or `None` when
/// no file part was submitted.
pub fn validate_upload(
    title: Option<&str>,
    file: Option<(&str, usize)>,
) -> Result<AcceptedUpload, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = title.map(str::trim).filter(|t| !t.is_empty());
    if let Some(t) = title {
        let len = t.chars().count();
        if len > TITLE_MAX {
            errors.add(
                "title",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    TITLE_MAX, len
                ),
            );
        }
    }

    let file = match file {
        Some((name, size)) if !name.trim().is_empty() => {
            if !name.to_lowercase().ends_with(".json") {
                errors.add("file", "Only .json files are allowed.");
                None
            } else if size > MAX_UPLOAD_BYTES {
                errors.add("file", "File is too large (max 5 MB).");
                None
            } else {
                Some((name, size))
            }
        }
        _ => {
            errors.add("file", "No file was submitted.");
            None
        }
    };

    match file {
        Some((name, size)) if errors.is_empty() => Ok(AcceptedUpload {
            display_name: title.unwrap_or(name).to_string(),
            original_name: name.to_string(),
            size,
        }),
        _ => Err(errors),
    }
}
