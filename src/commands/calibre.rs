//! Calibre export command handler.

use std::sync::Arc;

use anyhow::Result;

use shelflist_core::drive::FileIndex;
use shelflist_core::source::DEFAULT_LIBRARY_ANCHOR;
use shelflist_core::{CalibreLocator, CalibreSource, TagFilter};

use crate::cli::CalibreArgs;

use super::{drive_index, execute_export};

pub async fn run_calibre_command(args: &CalibreArgs) -> Result<()> {
    let drive = drive_index(&args.common).await;

    let filter = TagFilter::new(&args.tags, args.tag_match);
    let filter = (!filter.is_empty()).then_some(filter);
    let index_ref = drive.as_ref().map(|index| index.as_ref() as &dyn FileIndex);
    let source = CalibreSource::open(&args.library_path, filter, index_ref).await?;

    let locator = Arc::new(CalibreLocator::new(
        args.library_path.clone(),
        DEFAULT_LIBRARY_ANCHOR,
    ));
    let title = format!(
        "Calibre Library - {}",
        chrono::Local::now().format("%Y-%m-%d")
    );
    execute_export(
        &source,
        locator,
        drive,
        "Book",
        &title,
        "a Calibre library",
        &args.common,
    )
    .await
}
