//! Rendering: one fragment per record, assembled in fetch order.
//!
//! Formatters are pure with respect to the record; attachment lookup and
//! link resolution are their only I/O and both degrade gracefully. The
//! orchestrator fans formatting out over a bounded set of tasks and restores
//! input order afterwards.

mod html;
mod orchestrator;
mod text;

pub use html::{HtmlFormatter, assemble_html_document, escape_html};
pub use orchestrator::render_all;
pub use text::{TextFormatter, assemble_text_document};

use async_trait::async_trait;
use thiserror::Error;

use crate::attach::AttachmentLocator;
use crate::drive::{LinkResolver, SearchOptions};
use crate::record::{Record, ResolvedAttachment};

/// Errors raised while formatting one record.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Formatting failed for a record-specific reason.
    #[error("{0}")]
    Failed(String),
}

/// One rendered record, tagged with its position in the fetch order.
#[derive(Debug, Clone)]
pub struct RenderedFragment {
    /// Index into the source record sequence.
    pub index: usize,
    /// Rendered text or HTML, including the fragment's own delimiters.
    pub body: String,
    /// False when this fragment is an inline error block.
    pub ok: bool,
}

/// Renders one record into one fragment.
#[async_trait]
pub trait RecordFormatter: Send + Sync {
    /// Formats the record at position `index` (zero-based).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the record cannot be formatted; the
    /// orchestrator converts it to an inline error fragment.
    async fn format_fragment(&self, index: usize, record: &Record) -> Result<String, RenderError>;

    /// Builds the inline error block substituted for a failed record.
    fn error_fragment(&self, index: usize, message: &str) -> String;
}

/// Locates a record's attachments and resolves each against the cloud index
/// when a resolver is configured. Never fails; lookup problems surface as
/// missing links or an empty list.
pub(crate) async fn resolve_attachments(
    record: &Record,
    locator: &dyn AttachmentLocator,
    resolver: Option<&LinkResolver>,
    search: &SearchOptions,
) -> Vec<ResolvedAttachment> {
    let refs = locator.locate(record).await;
    let mut resolved = Vec::with_capacity(refs.len());
    for attachment in refs {
        let link = match resolver {
            Some(resolver) => resolver
                .resolve(&attachment.filename, search)
                .await
                .first()
                .map(str::to_string),
            None => None,
        };
        resolved.push(ResolvedAttachment { attachment, link });
    }
    resolved
}

/// `1.0` renders as `1`, fractional indices keep their fraction.
pub(crate) fn format_series_index(index: f64) -> String {
    if index.fract() == 0.0 {
        format!("{}", index as i64)
    } else {
        format!("{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_index_formatting() {
        assert_eq!(format_series_index(1.0), "1");
        assert_eq!(format_series_index(2.5), "2.5");
    }
}
