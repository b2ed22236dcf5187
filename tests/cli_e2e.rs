//! End-to-end CLI tests for the shelflist binary.

use assert_cmd::Command;
use predicates::prelude::*;
use sqlx::sqlite::SqlitePoolOptions;

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Export bibliographic listings"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shelflist"));
}

/// Test that a missing subcommand causes non-zero exit.
#[test]
fn test_binary_without_subcommand_returns_error() {
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.assert().failure();
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.args(["calibre", "-p", "/tmp", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that a library without metadata.db is a fatal, explained error.
#[test]
fn test_missing_database_is_fatal_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.args(["calibre", "-p"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Calibre database not found"));
}

async fn build_library(dir: &std::path::Path) {
    let db_path = dir.join("metadata.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
        .await
        .unwrap();

    sqlx::raw_sql(
        r"
        CREATE TABLE books (
            id INTEGER PRIMARY KEY, title TEXT NOT NULL, path TEXT NOT NULL DEFAULT '',
            pubdate TEXT, isbn TEXT, series_index REAL, timestamp TEXT
        );
        CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE books_series_link (book INTEGER, series INTEGER);
        CREATE TABLE publishers (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE books_publishers_link (book INTEGER, publisher INTEGER);
        CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE books_authors_link (id INTEGER PRIMARY KEY, book INTEGER, author INTEGER);
        CREATE TABLE data (book INTEGER, format TEXT, name TEXT);
        CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE books_tags_link (book INTEGER, tag INTEGER);
        ",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::raw_sql(
        r"
        INSERT INTO books (id, title, path, pubdate, timestamp) VALUES
            (1, 'Older Book', 'A/Older Book (1)', '2001', '2024-01-01'),
            (2, 'Newer Book', 'A/Newer Book (2)', '2019', '2025-06-01');
        INSERT INTO authors (id, name) VALUES (1, 'Author, Test');
        INSERT INTO books_authors_link (book, author) VALUES (1, 1), (2, 1);
        INSERT INTO data (book, format, name) VALUES (2, 'EPUB', 'Newer Book - Author');
        ",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}

/// Full text export of a small library, newest first, written to a file.
#[tokio::test]
async fn test_calibre_text_export_writes_ordered_listing() {
    let dir = tempfile::tempdir().unwrap();
    build_library(dir.path()).await;
    let out = dir.path().join("listing.txt");

    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.args(["calibre", "-p"])
        .arg(dir.path())
        .args(["-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Exported 2 records"));

    let listing = std::fs::read_to_string(&out).unwrap();
    let newer = listing.find("Title: Newer Book").unwrap();
    let older = listing.find("Title: Older Book").unwrap();
    assert!(newer < older, "records must be ordered newest first");
    assert!(listing.contains("Book #1\nTitle: Newer Book"));
    assert!(listing.contains("Authors: Author, Test"));
    assert!(listing.contains("Newer Book - Author.epub"));
}

/// Tag filtering narrows the export.
#[tokio::test]
async fn test_calibre_tag_filter_limits_export() {
    let dir = tempfile::tempdir().unwrap();
    build_library(dir.path()).await;
    let db_path = dir.path().join("metadata.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}?mode=rw", db_path.display()))
        .await
        .unwrap();
    sqlx::raw_sql(
        r"
        INSERT INTO tags (id, name) VALUES (1, 'Mathematics');
        INSERT INTO books_tags_link (book, tag) VALUES (2, 1);
        ",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let out = dir.path().join("filtered.txt");
    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.args(["calibre", "-p"])
        .arg(dir.path())
        .args(["-t", "math", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Exported 1 records"));

    let listing = std::fs::read_to_string(&out).unwrap();
    assert!(listing.contains("Newer Book"));
    assert!(!listing.contains("Older Book"));
}

/// HTML export produces a self-contained searchable page on stdout.
#[tokio::test]
async fn test_calibre_html_export_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    build_library(dir.path()).await;

    let mut cmd = Command::cargo_bin("shelflist").unwrap();
    cmd.args(["calibre", "-p"])
        .arg(dir.path())
        .args(["--output-format", "html", "--notice", "test notice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("Newer Book"))
        .stdout(predicate::str::contains("test notice"))
        .stdout(predicate::str::contains("searchInput"));
}
