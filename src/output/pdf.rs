//! HTML-to-PDF conversion via external converter commands.
//!
//! Two interchangeable converters are supported, both taking HTML on stdin
//! and an output path argument. Availability is probed once at startup;
//! a conversion failure is fatal for the invocation because a partial PDF
//! must never be left behind.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors from PDF backend selection and conversion.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// No converter command was found on the system.
    #[error("no usable HTML-to-PDF converter found (tried wkhtmltopdf, weasyprint)")]
    NoBackend,

    /// The explicitly requested converter is not installed.
    #[error("{name} is not available on this system")]
    Unavailable {
        /// Converter name.
        name: String,
    },

    /// The converter process could not be started.
    #[error("failed to run {name}: {source}")]
    Spawn {
        /// Converter name.
        name: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The converter ran but reported failure.
    #[error("{name} failed ({status}): {detail}")]
    Conversion {
        /// Converter name.
        name: String,
        /// Exit status description.
        status: String,
        /// Captured stderr, truncated.
        detail: String,
    },
}

/// One HTML-to-PDF converter.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Converter name for logs and error messages.
    fn name(&self) -> &str;

    /// Probes whether the converter can be invoked at all.
    async fn is_available(&self) -> bool;

    /// Converts `html` into a PDF written at `output`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when the converter cannot be run or reports
    /// failure.
    async fn convert(&self, html: &str, output: &Path) -> Result<(), PdfError>;
}

/// A converter invoked as `<program> <args..> <output>` with HTML on stdin.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    #[must_use]
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// The `wkhtmltopdf` converter, reading HTML from stdin.
    #[must_use]
    pub fn wkhtmltopdf() -> Self {
        Self::new(
            "wkhtmltopdf",
            "wkhtmltopdf",
            ["--quiet", "--encoding", "utf-8", "-"]
                .map(String::from)
                .to_vec(),
        )
    }

    /// The WeasyPrint converter, reading HTML from stdin.
    #[must_use]
    pub fn weasyprint() -> Self {
        Self::new("weasyprint", "weasyprint", vec!["-".to_string()])
    }
}

#[async_trait]
impl PdfBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let probed = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match probed {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }

    async fn convert(&self, html: &str, output: &Path) -> Result<(), PdfError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PdfError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A write error here usually means the converter already exited;
            // the exit status below carries the real diagnosis.
            if let Err(error) = stdin.write_all(html.as_bytes()).await {
                debug!(name = %self.name, error = %error, "writing HTML to converter stdin failed");
            }
        }

        let finished = child
            .wait_with_output()
            .await
            .map_err(|source| PdfError::Spawn {
                name: self.name.clone(),
                source,
            })?;
        if !finished.status.success() {
            let detail: String = String::from_utf8_lossy(&finished.stderr)
                .chars()
                .take(400)
                .collect();
            return Err(PdfError::Conversion {
                name: self.name.clone(),
                status: finished.status.to_string(),
                detail: detail.trim().to_string(),
            });
        }
        info!(name = %self.name, output = %output.display(), "PDF written");
        Ok(())
    }
}

/// Picks a usable converter: the requested one, or the first of the known
/// converters that answers an availability probe.
///
/// # Errors
///
/// Returns [`PdfError::Unavailable`] when the requested converter is
/// missing, or [`PdfError::NoBackend`] when none is installed.
pub async fn select_backend(requested: Option<&str>) -> Result<CommandBackend, PdfError> {
    let candidates = [CommandBackend::wkhtmltopdf(), CommandBackend::weasyprint()];
    match requested {
        Some(name) => {
            for backend in candidates {
                if backend.name() == name {
                    if backend.is_available().await {
                        return Ok(backend);
                    }
                    return Err(PdfError::Unavailable {
                        name: name.to_string(),
                    });
                }
            }
            Err(PdfError::Unavailable {
                name: name.to_string(),
            })
        }
        None => {
            for backend in candidates {
                if backend.is_available().await {
                    debug!(name = backend.name(), "selected PDF converter");
                    return Ok(backend);
                }
            }
            Err(PdfError::NoBackend)
        }
    }
}
