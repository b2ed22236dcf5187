//! Document emission: chosen format, file or stdout destination.

mod pdf;

pub use pdf::{CommandBackend, PdfBackend, PdfError, select_backend};

use std::path::Path;

use clap::ValueEnum;
use thiserror::Error;
use tracing::info;

/// Output formats the exporter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain UTF-8 text.
    Text,
    /// Self-contained HTML page with client-side search.
    Html,
    /// PDF produced from the HTML rendering by an external converter.
    Pdf,
}

/// Errors raised while emitting the assembled document.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Writing the destination failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// PDF selection or conversion failed. Fatal for the invocation.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// PDF cannot be streamed; it needs a named output file.
    #[error("PDF output requires an output file")]
    PdfNeedsFile,
}

/// Writes an assembled text or HTML document to the destination, stdout when
/// none is given.
///
/// # Errors
///
/// Returns [`OutputError::Io`] on write failure.
pub async fn write_document(content: &str, destination: Option<&Path>) -> Result<(), OutputError> {
    match destination {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            info!(path = %path.display(), bytes = content.len(), "output written");
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Converts an assembled HTML document to PDF at `destination`.
///
/// # Errors
///
/// Returns [`OutputError::PdfNeedsFile`] without a destination, otherwise
/// propagates converter errors; any failure here is fatal.
pub async fn write_pdf(
    html: &str,
    destination: Option<&Path>,
    backend: &dyn PdfBackend,
) -> Result<(), OutputError> {
    let Some(path) = destination else {
        return Err(OutputError::PdfNeedsFile);
    };
    backend.convert(html, path).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_document_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.txt");
        write_document("hello\n", Some(&path)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_write_document_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listing.txt");
        std::fs::write(&path, "a much longer previous document").unwrap();
        write_document("short", Some(&path)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn test_pdf_without_destination_is_rejected() {
        let backend = CommandBackend::new("true", "true", vec![]);
        let error = write_pdf("<html/>", None, &backend).await.unwrap_err();
        assert!(matches!(error, OutputError::PdfNeedsFile));
    }
}
