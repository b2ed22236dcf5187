//! Zotero export command handler.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use shelflist_core::{ItemScope, ZoteroClient, ZoteroLocator, ZoteroSource};

use crate::cli::ZoteroArgs;

use super::{drive_index, execute_export};

pub async fn run_zotero_command(args: &ZoteroArgs) -> Result<()> {
    let client = Arc::new(ZoteroClient::new(
        &args.library_id,
        args.library_type,
        args.api_key.as_deref().unwrap_or(""),
    )?);

    if args.list_collections {
        let collections = client.collections().await?;
        if collections.is_empty() {
            println!("No collections found.");
            return Ok(());
        }
        for collection in collections {
            println!("{}\t{}", collection.key, collection.name);
        }
        return Ok(());
    }

    // The collection name feeds fragment labels and the document title; a
    // lookup failure only costs the nicer heading.
    let collection_name = match &args.collection {
        Some(key) => match client.collection(key).await {
            Ok(collection) => Some(collection.name),
            Err(error) => {
                warn!(key = %key, error = %error, "could not fetch collection name");
                None
            }
        },
        None => None,
    };

    let drive = drive_index(&args.common).await;
    let scope = ItemScope {
        collection: args.collection.clone(),
        item_type: args.item_type.clone(),
    };
    let source = ZoteroSource::new(Arc::clone(&client), scope);
    let locator = Arc::new(ZoteroLocator::new(Arc::clone(&client)));

    let date = chrono::Local::now().format("%Y-%m-%d");
    let (label, title) = match &collection_name {
        Some(name) => (name.clone(), format!("Zotero Collection: {name} - {date}")),
        None => ("Item".to_string(), format!("Zotero Items - {date}")),
    };
    execute_export(
        &source,
        locator,
        drive,
        &label,
        &title,
        "a Zotero library",
        &args.common,
    )
    .await
}
