//! CLI command handlers.

mod calibre;
mod zotero;

pub use calibre::run_calibre_command;
pub use zotero::run_zotero_command;

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};

use shelflist_core::drive::FileIndex;
use shelflist_core::output::{self, OutputFormat};
use shelflist_core::render::{self, RecordFormatter};
use shelflist_core::{
    AttachmentLocator, CredentialProvider, GoogleDriveIndex, HtmlFormatter, LinkResolver,
    RecordSource, SearchOptions, ServiceAccountProvider, StaticTokenProvider, TextFormatter,
};

use crate::cli::CommonArgs;

/// Builds the Drive index from whichever credential flag was given, probing
/// access once. Any failure disables link enrichment and returns `None`; it
/// never aborts the run.
async fn drive_index(common: &CommonArgs) -> Option<Arc<GoogleDriveIndex>> {
    let credentials: Arc<dyn CredentialProvider> = if let Some(spec) = &common.service_account {
        match ServiceAccountProvider::from_key_spec(spec, &std::env::temp_dir()) {
            Ok(provider) => Arc::new(provider),
            Err(error) => {
                warn!(error = %error, "could not load service account key, links disabled");
                return None;
            }
        }
    } else if let Some(token) = &common.access_token {
        Arc::new(StaticTokenProvider::new(token))
    } else {
        return None;
    };

    let index = match GoogleDriveIndex::new(credentials) {
        Ok(index) => index,
        Err(error) => {
            warn!(error = %error, "could not build Drive client, links disabled");
            return None;
        }
    };
    match index.about().await {
        Ok(about) => {
            info!(
                email = about.email.as_deref().unwrap_or("unknown"),
                "Google Drive access confirmed"
            );
            Some(Arc::new(index))
        }
        Err(error) => {
            warn!(error = %error, "Google Drive access check failed, links disabled");
            None
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}

fn default_notice(source_desc: &str) -> String {
    format!(
        "This document was automatically generated from {source_desc}. \
         Items are listed for personal reference only. All references, articles, \
         and other content remain the property of their respective copyright \
         holders. This document is not for redistribution. Last updated on {}.",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Shared export pipeline: fetch, render concurrently, assemble, emit.
pub(crate) async fn execute_export(
    source: &dyn RecordSource,
    locator: Arc<dyn AttachmentLocator>,
    drive: Option<Arc<GoogleDriveIndex>>,
    label: &str,
    title: &str,
    source_desc: &str,
    common: &CommonArgs,
) -> Result<()> {
    // Fail on a missing converter before any network round trips.
    let pdf_backend = if common.output_format == OutputFormat::Pdf {
        Some(output::select_backend(common.pdf_engine.as_deref()).await?)
    } else {
        None
    };

    let records = source.fetch_records().await?;
    let total = records.len();
    info!(records = total, "fetched records");

    let resolver = drive.map(|index| LinkResolver::new(index as Arc<dyn FileIndex>));
    let search = SearchOptions {
        contains: false,
        folder_name: common.drive_folder.clone(),
        return_all: false,
    };
    let formatter: Arc<dyn RecordFormatter> = match common.output_format {
        OutputFormat::Text => Arc::new(TextFormatter::new(label, locator, resolver, search)),
        OutputFormat::Html | OutputFormat::Pdf => {
            Arc::new(HtmlFormatter::new(label, locator, resolver, search))
        }
    };

    let concurrency = common
        .concurrency
        .map(usize::from)
        .unwrap_or_else(default_concurrency);
    let fragments = render::render_all(records, formatter, concurrency).await;
    let errors = fragments.iter().filter(|f| !f.ok).count();

    let destination = common.output_file.as_deref();
    match common.output_format {
        OutputFormat::Text => {
            let document = render::assemble_text_document(title, &fragments);
            output::write_document(&document, destination).await?;
        }
        OutputFormat::Html => {
            let notice = common
                .notice
                .clone()
                .unwrap_or_else(|| default_notice(source_desc));
            let document = render::assemble_html_document(title, Some(&notice), &fragments);
            output::write_document(&document, destination).await?;
        }
        OutputFormat::Pdf => {
            let notice = common
                .notice
                .clone()
                .unwrap_or_else(|| default_notice(source_desc));
            let document = render::assemble_html_document(title, Some(&notice), &fragments);
            let backend = pdf_backend
                .ok_or_else(|| anyhow::anyhow!("no PDF converter selected"))?;
            output::write_pdf(&document, destination, &backend).await?;
        }
    }

    // Summary goes to stderr so a stdout destination stays a clean document.
    match destination {
        Some(path) => eprintln!(
            "Exported {total} records to {} ({errors} errors)",
            path.display()
        ),
        None => eprintln!("Exported {total} records ({errors} errors)"),
    }
    Ok(())
}
