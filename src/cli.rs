//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shelflist_core::{LibraryType, OutputFormat, TagMatch};

/// Export bibliographic listings from Calibre or Zotero libraries.
///
/// Shelflist reads a library, locates each entry's file attachments,
/// optionally cross-references them against Google Drive, and writes an
/// ordered listing as text, HTML, or PDF.
#[derive(Parser, Debug)]
#[command(name = "shelflist")]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export from a local Calibre library (metadata.db)
    Calibre(CalibreArgs),
    /// Export from a Zotero library via the Web API
    Zotero(ZoteroArgs),
}

/// Options shared by both sources.
#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Write to this file instead of standard output (required for PDF)
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// HTML-to-PDF converter to use (default: first available)
    #[arg(long, value_parser = ["wkhtmltopdf", "weasyprint"])]
    pub pdf_engine: Option<String>,

    /// Maximum concurrent record renders (1-100, default: CPU count)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Google service account key: a file path or the key JSON itself
    #[arg(long, value_name = "KEY")]
    pub service_account: Option<String>,

    /// Pre-minted Google OAuth2 bearer token (alternative to a key)
    #[arg(long, value_name = "TOKEN", conflicts_with = "service_account")]
    pub access_token: Option<String>,

    /// Restrict Drive searches to this folder (by name, first match wins)
    #[arg(long, value_name = "FOLDER")]
    pub drive_folder: Option<String>,

    /// Custom notice paragraph for HTML/PDF output
    #[arg(long)]
    pub notice: Option<String>,
}

/// Calibre-specific options.
#[derive(clap::Args, Debug)]
pub struct CalibreArgs {
    /// Path to the Calibre library folder (contains metadata.db)
    #[arg(short = 'p', long, value_name = "DIR")]
    pub library_path: PathBuf,

    /// Only list books carrying a matching tag (repeatable)
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// How --tag values are compared against book tags
    #[arg(long, value_enum, default_value = "substring")]
    pub tag_match: TagMatch,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Zotero-specific options.
#[derive(clap::Args, Debug)]
pub struct ZoteroArgs {
    /// Zotero library id (user or group id)
    #[arg(short = 'l', long, value_name = "ID")]
    pub library_id: String,

    /// Zotero API key (not needed for public libraries)
    #[arg(short = 'k', long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Whether the library id names a user or a group
    #[arg(long, value_enum, default_value = "user")]
    pub library_type: LibraryType,

    /// Restrict to one collection (by key)
    #[arg(long, value_name = "KEY")]
    pub collection: Option<String>,

    /// Restrict to one item type (e.g. book, journalArticle)
    #[arg(long, value_name = "TYPE")]
    pub item_type: Option<String>,

    /// List the library's collections and exit
    #[arg(long)]
    pub list_collections: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl Args {
    /// The common options of whichever subcommand was chosen.
    #[must_use]
    pub fn common(&self) -> &CommonArgs {
        match &self.command {
            Command::Calibre(args) => &args.common,
            Command::Zotero(args) => &args.common,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_calibre_minimal_args() {
        let args = Args::try_parse_from(["shelflist", "calibre", "-p", "/lib"]).unwrap();
        let Command::Calibre(calibre) = args.command else {
            panic!("expected calibre subcommand");
        };
        assert_eq!(calibre.library_path, PathBuf::from("/lib"));
        assert!(calibre.tags.is_empty());
        assert_eq!(calibre.tag_match, TagMatch::Substring);
        assert_eq!(calibre.common.output_format, OutputFormat::Text);
        assert_eq!(calibre.common.concurrency, None);
    }

    #[test]
    fn test_cli_calibre_requires_library_path() {
        let result = Args::try_parse_from(["shelflist", "calibre"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_tags_are_repeatable() {
        let args = Args::try_parse_from([
            "shelflist", "calibre", "-p", "/lib", "-t", "math", "-t", "graphs",
            "--tag-match", "exact",
        ])
        .unwrap();
        let Command::Calibre(calibre) = args.command else {
            panic!("expected calibre subcommand");
        };
        assert_eq!(calibre.tags, vec!["math".to_string(), "graphs".to_string()]);
        assert_eq!(calibre.tag_match, TagMatch::Exact);
    }

    #[test]
    fn test_cli_zotero_minimal_args() {
        let args = Args::try_parse_from(["shelflist", "zotero", "-l", "12345"]).unwrap();
        let Command::Zotero(zotero) = args.command else {
            panic!("expected zotero subcommand");
        };
        assert_eq!(zotero.library_id, "12345");
        assert_eq!(zotero.library_type, LibraryType::User);
        assert!(!zotero.list_collections);
    }

    #[test]
    fn test_cli_zotero_group_collection() {
        let args = Args::try_parse_from([
            "shelflist",
            "zotero",
            "-l",
            "9",
            "--library-type",
            "group",
            "--collection",
            "ABCD1234",
            "--item-type",
            "book",
        ])
        .unwrap();
        let Command::Zotero(zotero) = args.command else {
            panic!("expected zotero subcommand");
        };
        assert_eq!(zotero.library_type, LibraryType::Group);
        assert_eq!(zotero.collection.as_deref(), Some("ABCD1234"));
        assert_eq!(zotero.item_type.as_deref(), Some("book"));
    }

    #[test]
    fn test_cli_output_format_values() {
        for (value, expected) in [
            ("text", OutputFormat::Text),
            ("html", OutputFormat::Html),
            ("pdf", OutputFormat::Pdf),
        ] {
            let args = Args::try_parse_from([
                "shelflist", "calibre", "-p", "/lib", "--output-format", value,
            ])
            .unwrap();
            assert_eq!(args.common().output_format, expected);
        }
    }

    #[test]
    fn test_cli_invalid_output_format_rejected() {
        let result = Args::try_parse_from([
            "shelflist", "calibre", "-p", "/lib", "--output-format", "docx",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_concurrency_range_enforced() {
        let args =
            Args::try_parse_from(["shelflist", "calibre", "-p", "/lib", "-c", "100"]).unwrap();
        assert_eq!(args.common().concurrency, Some(100));

        for bad in ["0", "101"] {
            let result = Args::try_parse_from(["shelflist", "calibre", "-p", "/lib", "-c", bad]);
            assert!(result.is_err(), "concurrency {bad} should be rejected");
        }
    }

    #[test]
    fn test_cli_access_token_conflicts_with_service_account() {
        let result = Args::try_parse_from([
            "shelflist",
            "calibre",
            "-p",
            "/lib",
            "--service-account",
            "/k.json",
            "--access-token",
            "abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verbose_and_quiet_flags() {
        let args =
            Args::try_parse_from(["shelflist", "zotero", "-l", "1", "-vv", "-q"]).unwrap();
        assert_eq!(args.common().verbose, 2);
        assert!(args.common().quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["shelflist", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_missing_subcommand_rejected() {
        let result = Args::try_parse_from(["shelflist"]);
        assert!(result.is_err());
    }
}
