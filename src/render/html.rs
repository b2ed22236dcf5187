//! HTML record fragments and the document scaffold.
//!
//! The scaffold is static boilerplate: styles, a client-side search box, and
//! the script driving it. Fragments carry an `item` class the search script
//! keys on.

use std::sync::Arc;

use async_trait::async_trait;

use crate::attach::AttachmentLocator;
use crate::drive::{LinkResolver, SearchOptions};
use crate::record::{Record, RecordDetails};

use super::{
    RecordFormatter, RenderError, RenderedFragment, format_series_index, resolve_attachments,
};

/// Escapes text for embedding in HTML element or attribute content.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats records as `<div class='item'>` fragments.
pub struct HtmlFormatter {
    label: String,
    locator: Arc<dyn AttachmentLocator>,
    resolver: Option<LinkResolver>,
    search: SearchOptions,
}

impl HtmlFormatter {
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

fn push_field(parts: &mut Vec<String>, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            parts.push(format!(
                "<p><strong>{name}:</strong> {}</p>",
                escape_html(value)
            ));
        }
    }
}

fn link_field(parts: &mut Vec<String>, name: &str, url: &str) {
    let url = escape_html(url);
    parts.push(format!(
        "<p><strong>{name}:</strong> <a href='{url}' target='_blank'>{url}</a></p>"
    ));
}

#[async_trait]
impl RecordFormatter for HtmlFormatter {
    async fn format_fragment(&self, index: usize, record: &Record) -> Result<String, RenderError> {
        let type_name = record.details.type_name().to_string();
        let mut parts = vec![
            format!(
                "<div class='item-number'>{} #{}</div>",
                escape_html(&self.label),
                index + 1
            ),
            format!("<div class='item {}'>", escape_html(&type_name)),
            format!("<h2>{}</h2>", escape_html(record.display_title())),
            format!("<p><strong>Type:</strong> {}</p>", escape_html(&type_name)),
        ];
        if !record.creators.is_empty() {
            parts.push(format!(
                "<p><strong>Authors:</strong> {}</p>",
                escape_html(&record.creators.join("; "))
            ));
        }
        push_field(&mut parts, "Date", record.date.as_ref());

        match &record.details {
            RecordDetails::Book(book) => {
                push_field(&mut parts, "Publisher", book.publisher.as_ref());
                push_field(&mut parts, "Place", book.place.as_ref());
                if let Some(series) = &book.series {
                    let index = book.series_index.unwrap_or(1.0);
                    parts.push(format!(
                        "<p><strong>Series:</strong> {} ({})</p>",
                        escape_html(series),
                        format_series_index(index)
                    ));
                }
                push_field(&mut parts, "ISBN", book.isbn.as_ref());
                push_field(&mut parts, "DOI", book.doi.as_ref());
            }
            RecordDetails::Article(article) => {
                push_field(&mut parts, "Journal", article.journal.as_ref());
                push_field(&mut parts, "Volume", article.volume.as_ref());
                push_field(&mut parts, "Issue", article.issue.as_ref());
                push_field(&mut parts, "Pages", article.pages.as_ref());
                push_field(&mut parts, "DOI", article.doi.as_ref());
            }
            RecordDetails::Manuscript(manuscript) => {
                push_field(&mut parts, "arXiv ID", manuscript.arxiv_id.as_ref());
                if let Some(url) = manuscript.arxiv_url() {
                    link_field(&mut parts, "arXiv URL", &url);
                }
                push_field(&mut parts, "DOI", manuscript.doi.as_ref());
            }
            RecordDetails::Other(other) => {
                push_field(&mut parts, "DOI", other.doi.as_ref());
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
            parts.push("<p><strong>Attachments:</strong></p>".to_string());
            parts.push("<ul>".to_string());
            for resolved in &attachments {
                let path = escape_html(&resolved.attachment.local_path);
                match &resolved.link {
                    Some(link) => parts.push(format!(
                        "<li>{path} - <a href='{}' target='_blank'>View on Google Drive</a></li>",
                        escape_html(link)
                    )),
                    None => parts.push(format!("<li>{path}</li>")),
                }
            }
            parts.push("</ul>".to_string());
        }

        parts.push("</div>".to_string());
        Ok(parts.join("\n"))
    }

    fn error_fragment(&self, index: usize, message: &str) -> String {
        format!(
            "<div class='item-error'>Error formatting item {}: {}</div>",
            index + 1,
            escape_html(message)
        )
    }
}

const STYLES: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; }
.item { margin-bottom: 30px; border-bottom: 1px solid #ccc; padding-bottom: 20px; }
.item-number { font-weight: bold; color: #7f8c8d; margin-bottom: 5px; }
.item-error { color: #c0392b; background-color: #fdecea; padding: 10px; margin-bottom: 30px; border-left: 3px solid #c0392b; }
h1 { color: #2c3e50; }
h2 { color: #3498db; }
.notice { font-style: italic; background-color: #f8f9fa; padding: 10px; border-left: 3px solid #3498db; margin-bottom: 20px; }
.search-container { margin-bottom: 20px; padding: 15px; background-color: #f8f9fa; border-radius: 5px; }
#searchInput { width: 300px; padding: 8px; font-size: 16px; border: 1px solid #ccc; border-radius: 4px; }
#searchBtn { padding: 8px 15px; background-color: #3498db; color: white; border: none; border-radius: 4px; cursor: pointer; margin-left: 10px; }
#searchBtn:hover { background-color: #2980b9; }
#searchCount { margin-left: 15px; font-style: italic; }
.highlight { background-color: yellow; font-weight: bold; }
.hidden { display: none; }";

const SEARCH_CONTAINER: &str = "\
<div class='search-container'>
<input type='text' id='searchInput' placeholder='Search within this page...' />
<button id='searchBtn'>Search</button>
<span id='searchCount'></span>
</div>";

const SEARCH_SCRIPT: &str = "\
<script>
document.addEventListener('DOMContentLoaded', function() {
  const searchInput = document.getElementById('searchInput');
  const searchBtn = document.getElementById('searchBtn');
  const searchCount = document.getElementById('searchCount');
  const items = document.querySelectorAll('.item');

  function performSearch() {
    const searchTerm = searchInput.value.toLowerCase().trim();
    if (searchTerm === '') {
      items.forEach(item => item.classList.remove('hidden'));
      searchCount.textContent = '';
      return;
    }
    let matchCount = 0;
    items.forEach(item => {
      const hasMatch = item.textContent.toLowerCase().includes(searchTerm);
      if (hasMatch) {
        item.classList.remove('hidden');
        matchCount++;
      } else {
        item.classList.add('hidden');
      }
    });
    searchCount.textContent = `Found ${matchCount} matching items`;
  }

  searchBtn.addEventListener('click', performSearch);
  searchInput.addEventListener('keyup', function(event) {
    if (event.key === 'Enter') { performSearch(); }
  });
});
</script>";

/// Assembles the complete HTML page around ordered fragments.
///
/// `notice` is rendered verbatim under the heading when non-empty; callers
/// are responsible for any escaping it needs.
#[must_use]
pub fn assemble_html_document(
    title: &str,
    notice: Option<&str>,
    fragments: &[RenderedFragment],
) -> String {
    let escaped_title = escape_html(title);
    let mut parts = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        "<head>".to_string(),
        "<meta charset='utf-8'>".to_string(),
        format!("<title>{escaped_title}</title>"),
        "<style>".to_string(),
        STYLES.to_string(),
        "</style>".to_string(),
        "</head>".to_string(),
        "<body>".to_string(),
        format!("<h1>{escaped_title}</h1>"),
    ];
    if let Some(notice) = notice {
        if !notice.is_empty() {
            parts.push(format!("<div class='notice'>{notice}</div>"));
        }
    }
    parts.push(SEARCH_CONTAINER.to_string());
    parts.extend(fragments.iter().map(|f| f.body.clone()));
    parts.push(SEARCH_SCRIPT.to_string());
    parts.push("</body>".to_string());
    parts.push("</html>".to_string());
    let mut document = parts.join("\n");
    document.push('\n');
    document
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attach::CalibreLocator;
    use crate::record::{BookFields, StorageRef};
    use std::path::PathBuf;

    fn formatter() -> HtmlFormatter {
        HtmlFormatter::new(
            "Book",
            Arc::new(CalibreLocator::new(
                PathBuf::from("/lib"),
                "Calibre Library",
            )),
            None,
            SearchOptions::default(),
        )
    }

    #[test]
    fn test_escape_html_covers_metacharacters() {
        assert_eq!(
            escape_html("<b>\"O'Brien\" & co</b>"),
            "&lt;b&gt;&quot;O&#x27;Brien&quot; &amp; co&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn test_fragment_escapes_title_and_authors() {
        let record = Record {
            id: "1".to_string(),
            title: "Graphs & Matroids <draft>".to_string(),
            creators: vec!["O'Connor, Sinead".to_string()],
            date: None,
            details: RecordDetails::Book(BookFields::default()),
            storage: StorageRef::None,
        };
        let fragment = formatter().format_fragment(0, &record).await.unwrap();
        assert!(fragment.contains("<h2>Graphs &amp; Matroids &lt;draft&gt;</h2>"));
        assert!(fragment.contains("O&#x27;Connor, Sinead"));
        assert!(fragment.starts_with("<div class='item-number'>Book #1</div>"));
        assert!(fragment.ends_with("</div>"));
    }

    #[test]
    fn test_error_fragment_uses_error_class() {
        let fragment = formatter().error_fragment(1, "bad <field>");
        assert!(fragment.starts_with("<div class='item-error'>Error formatting item 2:"));
        assert!(fragment.contains("bad &lt;field&gt;"));
    }

    #[test]
    fn test_document_scaffold_contains_search_and_notice() {
        let doc = assemble_html_document("My Library", Some("restricted access"), &[]);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>My Library</title>"));
        assert!(doc.contains("<div class='notice'>restricted access</div>"));
        assert!(doc.contains("id='searchInput'"));
        assert!(doc.contains("performSearch"));
        assert!(doc.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_document_without_notice_omits_block() {
        let doc = assemble_html_document("T", None, &[]);
        assert!(!doc.contains("class='notice'"));
    }
}
