use std::path::Path;

use crate::TransferError;

/// Maximum length of the sanitized title segment of a target file name.
const MAX_TITLE_LEN: usize = 64;

/// Reduces a free-form title to `[A-Za-z0-9_-]`.
///
/// Whitespace runs become a single `_`, everything else outside the set is
/// dropped. Returns `untitled` when nothing survives.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        }
        if out.len() >= MAX_TITLE_LEN {
            break;
        }
    }
    out.truncate(MAX_TITLE_LEN);
    if out.is_empty() {
        "untitled".into()
    } else {
        out
    }
}

/// Builds the backend file name for an upload:
/// `{stamp}_{sanitized_title}{.ext}`.
///
/// `stamp` must be unique per upload (a millisecond timestamp or id). The
/// extension of `original_name` is preserved, lowercased.
pub fn target_file_name(title: &str, original_name: &str, stamp: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{stamp}_{}{ext}", sanitize_title(title))
}

/// Validates a backend file name.
///
/// Rejects:
/// - Empty names
/// - Path separators (`/`, `\`)
/// - Parent directory references (`..`)
/// - Control characters
pub fn validate_file_name(file_name: &str) -> Result<(), TransferError> {
    if file_name.trim().is_empty() {
        return Err(TransferError::InvalidFileName("empty file name".into()));
    }
    if file_name.contains('/') || file_name.contains('\\') {
        return Err(TransferError::InvalidFileName(format!(
            "path separators not allowed: {file_name}"
        )));
    }
    if file_name.contains("..") {
        return Err(TransferError::InvalidFileName(format!(
            "parent directory reference not allowed: {file_name}"
        )));
    }
    if file_name.chars().any(char::is_control) {
        return Err(TransferError::InvalidFileName(format!(
            "control characters not allowed: {file_name:?}"
        )));
    }
    Ok(())
}
