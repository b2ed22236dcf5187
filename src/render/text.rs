//! Plain-text record fragments and document assembly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::attach::AttachmentLocator;
use crate::drive::{LinkResolver, SearchOptions};
use crate::record::{Record, RecordDetails};

use super::{
    RecordFormatter, RenderError, RenderedFragment, format_series_index, resolve_attachments,
};

/// Formats records as labelled text blocks separated by `---` lines.
pub struct TextFormatter {
    label: String,
    locator: Arc<dyn AttachmentLocator>,
    resolver: Option<LinkResolver>,
    search: SearchOptions,
}

impl TextFormatter {
    /// `label` heads each fragment, e.g. "Book #3" for label "Book".
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        locator: Arc<dyn AttachmentLocator>,
        resolver: Option<LinkResolver>,
        search: SearchOptions,
    ) -> Self {
        Self {
            label: label.into(),
            locator,
            resolver,
            search,
        }
    }
}

fn push_field(lines: &mut Vec<String>, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            lines.push(format!("{name}: {value}"));
        }
    }
}

#[async_trait]
impl RecordFormatter for TextFormatter {
    async fn format_fragment(&self, index: usize, record: &Record) -> Result<String, RenderError> {
        let mut lines = vec![
            format!("{} #{}", self.label, index + 1),
            format!("Title: {}", record.display_title()),
            format!("Type: {}", record.details.type_name()),
        ];
        if !record.creators.is_empty() {
            lines.push(format!("Authors: {}", record.creators.join("; ")));
        }
        push_field(&mut lines, "Date", record.date.as_ref());

        match &record.details {
            RecordDetails::Book(book) => {
                push_field(&mut lines, "Publisher", book.publisher.as_ref());
                push_field(&mut lines, "Place", book.place.as_ref());
                if let Some(series) = &book.series {
                    let index = book.series_index.unwrap_or(1.0);
                    lines.push(format!("Series: {series} ({})", format_series_index(index)));
                }
                push_field(&mut lines, "ISBN", book.isbn.as_ref());
                push_field(&mut lines, "DOI", book.doi.as_ref());
            }
            RecordDetails::Article(article) => {
                push_field(&mut lines, "Journal", article.journal.as_ref());
                push_field(&mut lines, "Volume", article.volume.as_ref());
                push_field(&mut lines, "Issue", article.issue.as_ref());
                push_field(&mut lines, "Pages", article.pages.as_ref());
                push_field(&mut lines, "DOI", article.doi.as_ref());
            }
            RecordDetails::Manuscript(manuscript) => {
                push_field(&mut lines, "arXiv ID", manuscript.arxiv_id.as_ref());
                if let Some(url) = manuscript.arxiv_url() {
                    lines.push(format!("arXiv URL: {url}"));
                }
                push_field(&mut lines, "DOI", manuscript.doi.as_ref());
            }
            RecordDetails::Other(other) => {
                push_field(&mut lines, "DOI", other.doi.as_ref());
            }
        }

        let attachments = resolve_attachments(
            record,
            self.locator.as_ref(),
            self.resolver.as_ref(),
            &self.search,
        )
        .await;
        if !attachments.is_empty() {
            lines.push("Attachments:".to_string());
            for resolved in &attachments {
                match &resolved.link {
                    Some(link) => lines.push(format!(
                        "  - {} (Drive: {link})",
                        resolved.attachment.local_path
                    )),
                    None => lines.push(format!("  - {}", resolved.attachment.local_path)),
                }
            }
        }

        lines.push("---".to_string());
        Ok(lines.join("\n"))
    }

    fn error_fragment(&self, index: usize, message: &str) -> String {
        format!("Error formatting item {}: {message}\n---", index + 1)
    }
}

/// Joins ordered fragments under an underlined title header.
#[must_use]
pub fn assemble_text_document(title: &str, fragments: &[RenderedFragment]) -> String {
    let mut parts = vec![title.to_string(), "=".repeat(title.chars().count()), String::new()];
    parts.extend(fragments.iter().map(|f| f.body.clone()));
    let mut document = parts.join("\n");
    document.push('\n');
    document
}
