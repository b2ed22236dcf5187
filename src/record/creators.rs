//! Helpers for contributor names and arXiv identifiers.

/// Formats a creator as "Last, First" when both parts are present, falling
/// back to a single display name or whichever part exists.
///
/// Returns `None` when no usable name part is present.
#[must_use]
pub fn format_creator(
    first_name: Option<&str>,
    last_name: Option<&str>,
    name: Option<&str>,
) -> Option<String> {
    let first = first_name.map(str::trim).filter(|s| !s.is_empty());
    let last = last_name.map(str::trim).filter(|s| !s.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{last}, {first}")),
        (None, Some(single)) | (Some(single), None) => Some(single.to_string()),
        (None, None) => name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

/// Extracts an arXiv id from a Zotero `extra` blob.
///
/// The `extra` field is free-form, one entry per line; an arXiv id appears as
/// a line starting with `arXiv:`.
#[must_use]
pub fn extract_arxiv_id(extra: &str) -> Option<String> {
    for line in extra.lines() {
        let line = line.trim();
        if let Some(id) = line.strip_prefix("arXiv:") {
            let id = id.trim();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}
