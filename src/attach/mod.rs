//! Attachment location: from a record to its candidate files.
//!
//! Locators never fail and never touch the filesystem to verify existence;
//! a lookup error degrades to an empty attachment list for that record and
//! the run continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::record::{AttachmentRef, FormatEntry, Record, StorageRef};
use crate::source::ZoteroClient;

/// Content types accepted as listable attachments (Zotero child objects).
pub const SUPPORTED_CONTENT_TYPES: [&str; 13] = [
    "application/pdf",
    "image/vnd.djvu",
    "video/mp4",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/epub+zip",
    "application/vnd.amazon.ebook",
    "application/x-mobi8-ebook",
    "application/x-mobipocket-ebook",
    "application/vnd.comicbook+zip",
    "application/x-cbr",
    "application/x-fictionbook+xml",
    "text/plain",
];

/// True when the content type is on the attachment allow-list.
#[must_use]
pub fn is_supported_content_type(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&content_type)
}

/// Enumerates a record's candidate file attachments.
#[async_trait]
pub trait AttachmentLocator: Send + Sync {
    /// Returns the record's attachments, empty on any lookup failure.
    async fn locate(&self, record: &Record) -> Vec<AttachmentRef>;
}

/// Locator for Calibre records: joins the library root with the book folder
/// and derives one path per declared format.
#[derive(Debug, Clone)]
pub struct CalibreLocator {
    library_root: PathBuf,
    anchor: String,
}

impl CalibreLocator {
    /// `anchor` is the directory name emitted paths are shortened to start
    /// at (so listings stay portable across machines).
    #[must_use]
    pub fn new(library_root: PathBuf, anchor: impl Into<String>) -> Self {
        Self {
            library_root,
            anchor: anchor.into(),
        }
    }
}

#[async_trait]
impl AttachmentLocator for CalibreLocator {
    async fn locate(&self, record: &Record) -> Vec<AttachmentRef> {
        let StorageRef::LocalFolder { folder, formats } = &record.storage else {
            return Vec::new();
        };
        let book_folder = self.library_root.join(folder);
        formats
            .iter()
            .map(|entry| derive_local_attachment(&book_folder, entry, &self.anchor))
            .collect()
    }
}

/// Derives the display path and search filename for one format row.
///
/// The stored name usually lacks an extension; the format tag supplies it.
/// Appending is idempotent: a name that already carries the extension is
/// left alone, and the final path ends in `.ext` exactly once.
#[must_use]
pub fn derive_local_attachment(
    book_folder: &Path,
    entry: &FormatEntry,
    anchor: &str,
) -> AttachmentRef {
    let ext = entry.format.to_lowercase();
    let filename = if entry.name.contains('.') {
        entry.name.clone()
    } else {
        format!("{}.{ext}", entry.name)
    };

    let local = book_folder.join(&filename);
    let local = std::path::absolute(&local).unwrap_or(local);
    let mut path_str = to_slash_string(&local);
    path_str = truncate_before_anchor(&path_str, anchor);
    let suffix = format!(".{ext}");
    if !path_str.to_lowercase().ends_with(&suffix) {
        path_str.push_str(&suffix);
    }

    AttachmentRef {
        filename,
        local_path: path_str,
    }
}

/// Normalizes a path to forward slashes for emission.
fn to_slash_string(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Drops everything before the anchor directory name, case-insensitively,
/// when it occurs in the path.
fn truncate_before_anchor(path: &str, anchor: &str) -> String {
    if anchor.is_empty() {
        return path.to_string();
    }
    let lowered = path.to_lowercase();
    match lowered.find(&anchor.to_lowercase()) {
        Some(idx) if path.is_char_boundary(idx) => path[idx..].to_string(),
        _ => path.to_string(),
    }
}

/// Locator for Zotero records: queries child objects and keeps supported
/// attachment types, deriving the conventional local-storage path.
#[derive(Clone)]
pub struct ZoteroLocator {
    client: Arc<ZoteroClient>,
}

impl ZoteroLocator {
    #[must_use]
    pub fn new(client: Arc<ZoteroClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttachmentLocator for ZoteroLocator {
    async fn locate(&self, record: &Record) -> Vec<AttachmentRef> {
        let StorageRef::RemoteItem { item_key } = &record.storage else {
            return Vec::new();
        };
        let children = match self.client.children(item_key).await {
            Ok(children) => children,
            Err(error) => {
                warn!(
                    item = %item_key,
                    title = %record.display_title(),
                    error = %error,
                    "failed to list attachments, continuing without them"
                );
                return Vec::new();
            }
        };
        children
            .iter()
            .filter(|child| {
                child.data.item_type == "attachment"
                    && is_supported_content_type(&child.data.content_type)
                    && !child.data.filename.is_empty()
            })
            .map(|child| AttachmentRef {
                filename: child.data.filename.clone(),
                local_path: format!("storage/{}/{}", child.key, child.data.filename),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(format: &str, name: &str) -> FormatEntry {
        FormatEntry {
            format: format.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_extension_appended_exactly_once() {
        let folder = Path::new("/home/user/Calibre Library/Author/Title (1)");
        let derived = derive_local_attachment(folder, &entry("EPUB", "Title - Author"), "Calibre Library");
        assert!(derived.local_path.ends_with("Title - Author.epub"));
        assert!(!derived.local_path.ends_with(".epub.epub"));
        assert_eq!(derived.filename, "Title - Author.epub");
    }

    #[test]
    fn test_extension_derivation_is_idempotent() {
        let folder = Path::new("/home/user/Calibre Library/Author/Title (1)");
        let first = derive_local_attachment(folder, &entry("EPUB", "Title - Author"), "Calibre Library");
        // Re-deriving from the already-suffixed name must not double the suffix.
        let second =
            derive_local_attachment(folder, &entry("EPUB", &first.filename), "Calibre Library");
        assert_eq!(first.local_path, second.local_path);
    }

    #[test]
    fn test_dotted_stored_name_is_kept() {
        let folder = Path::new("/lib/Calibre Library/A/B");
        let derived = derive_local_attachment(folder, &entry("PDF", "scan.v2.pdf"), "Calibre Library");
        assert_eq!(derived.filename, "scan.v2.pdf");
        assert!(derived.local_path.ends_with("scan.v2.pdf"));
    }

    #[test]
    fn test_anchor_truncation_is_case_insensitive() {
        let folder = Path::new("/mnt/backup/CALIBRE LIBRARY/Author/Book (3)");
        let derived = derive_local_attachment(folder, &entry("PDF", "Book"), "Calibre Library");
        assert!(
            derived.local_path.starts_with("CALIBRE LIBRARY/"),
            "got: {}",
            derived.local_path
        );
    }

    #[test]
    fn test_missing_anchor_keeps_absolute_path() {
        let folder = Path::new("/srv/books/Author/Book (3)");
        let derived = derive_local_attachment(folder, &entry("PDF", "Book"), "Calibre Library");
        assert!(derived.local_path.starts_with("/srv/books/"));
    }

    #[test]
    fn test_content_type_allow_list() {
        assert!(is_supported_content_type("application/pdf"));
        assert!(is_supported_content_type("application/epub+zip"));
        assert!(is_supported_content_type("text/plain"));
        assert!(!is_supported_content_type("text/html"));
        assert!(!is_supported_content_type("image/png"));
    }

    #[tokio::test]
    async fn test_calibre_locator_ignores_remote_records() {
        use crate::record::{OtherFields, Record, RecordDetails};
        let locator = CalibreLocator::new(PathBuf::from("/lib"), "Calibre Library");
        let record = Record {
            id: "K".to_string(),
            title: "T".to_string(),
            creators: vec![],
            date: None,
            details: RecordDetails::Other(OtherFields::default()),
            storage: StorageRef::RemoteItem {
                item_key: "K".to_string(),
            },
        };
        assert!(locator.locate(&record).await.is_empty());
    }
}
