//! Bibliographic record model shared by both library sources.
//!
//! A [`Record`] is one bibliographic entry, immutable once fetched. The
//! type-specific fields live in [`RecordDetails`], a tagged variant with
//! exhaustive handling in the formatters, replacing the loosely-typed
//! per-item dictionaries of the upstream APIs.

mod creators;

pub use creators::{extract_arxiv_id, format_creator};

/// One bibliographic entry from either source. Lifetime = one program run.
#[derive(Debug, Clone)]
pub struct Record {
    /// Stable identifier within the source (Calibre row id or Zotero key).
    pub id: String,
    /// Entry title. Empty titles are rendered as "Unknown".
    pub title: String,
    /// Contributor names in source order, already formatted as "Last, First".
    pub creators: Vec<String>,
    /// Publication date as the source stores it (free-form string).
    pub date: Option<String>,
    /// Type-specific bibliographic fields.
    pub details: RecordDetails,
    /// How this record's file attachments are located.
    pub storage: StorageRef,
}

impl Record {
    /// Returns the title, or "Unknown" when the source stored none.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Unknown"
        } else {
            &self.title
        }
    }
}

/// Type-tagged extension payload for a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordDetails {
    /// A book (Calibre rows and Zotero `book` items).
    Book(BookFields),
    /// A journal article (Zotero `journalArticle`).
    Article(ArticleFields),
    /// A manuscript/preprint (Zotero `manuscript`), with arXiv hints.
    Manuscript(ManuscriptFields),
    /// Any other item type: only the fields every type can carry.
    Other(OtherFields),
}

impl RecordDetails {
    /// Human-readable type tag used in rendered output.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Book(_) => "book",
            Self::Article(_) => "journalArticle",
            Self::Manuscript(_) => "manuscript",
            Self::Other(fields) => &fields.item_type,
        }
    }
}

/// Book-specific fields. Calibre contributes series data, Zotero place data.
#[derive(Debug, Clone, Default)]
pub struct BookFields {
    pub publisher: Option<String>,
    pub place: Option<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
}

/// Journal-article fields.
#[derive(Debug, Clone, Default)]
pub struct ArticleFields {
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
}

/// Manuscript fields. The arXiv id is parsed out of Zotero's `extra` field.
#[derive(Debug, Clone, Default)]
pub struct ManuscriptFields {
    pub url: Option<String>,
    pub arxiv_id: Option<String>,
    pub doi: Option<String>,
}

impl ManuscriptFields {
    /// The arXiv abstract URL: the stored URL when it points at arxiv.org,
    /// otherwise derived from the arXiv id.
    #[must_use]
    pub fn arxiv_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            if url.contains("arxiv.org") {
                return Some(url.clone());
            }
        }
        self.arxiv_id
            .as_ref()
            .map(|id| format!("https://arxiv.org/abs/{id}"))
    }
}

/// Fallback payload for item types without dedicated handling.
#[derive(Debug, Clone, Default)]
pub struct OtherFields {
    /// The source's type tag (e.g. "thesis", "presentation").
    pub item_type: String,
    pub doi: Option<String>,
}

/// Where a record's attachments live, consumed by the attachment locator.
#[derive(Debug, Clone)]
pub enum StorageRef {
    /// Calibre: a folder relative to the library root plus per-format rows.
    LocalFolder {
        /// Relative folder as stored in `books.path`.
        folder: String,
        /// Declared formats for this book.
        formats: Vec<FormatEntry>,
    },
    /// Zotero: attachments are child objects of this item key.
    RemoteItem {
        /// The parent item's key.
        item_key: String,
    },
    /// The record has no locatable attachments.
    None,
}

/// One row of Calibre's `data` table: a declared format for a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    /// Format tag as stored, e.g. "EPUB" or "PDF".
    pub format: String,
    /// Stored file name, usually without an extension.
    pub name: String,
}

/// A candidate file attachment derived from a record at locate time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Bare filename used for cloud index lookups.
    pub filename: String,
    /// Locally-derived path string for display. Existence is not checked.
    pub local_path: String,
}

/// An [`AttachmentRef`] plus the cloud link the resolver found, if any.
/// Created per record during rendering and discarded afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    pub attachment: AttachmentRef,
    pub link: Option<String>,
}
