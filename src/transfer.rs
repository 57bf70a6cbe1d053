use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::types::{Book, BookId};

pub const APP_VERSION: &str = "1.0";

/// Envelope written by `export` and read back by `import`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub books: Vec<Book>,
    pub export_date: DateTime<Utc>,
    pub app_version: String,
}

/// Default export file name for a given local date
pub fn export_file_name(date: NaiveDate) -> String {
    format!("timer-app-books-{}.json", date.format("%Y-%m-%d"))
}

/// Export file name for today's local date
pub fn default_export_file_name(now: DateTime<Utc>) -> String {
    export_file_name(now.with_timezone(&Local).date_naive())
}

pub fn export_to(path: &Path, books: &[Book], now: DateTime<Utc>) -> Result<()> {
    let export = ExportFile {
        books: books.to_vec(),
        export_date: now,
        app_version: APP_VERSION.to_string(),
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &export).context("Failed to write export")?;
    writer.flush().context("Failed to flush export")?;

    tracing::info!(count = books.len(), path = %path.display(), "exported books");
    Ok(())
}

/// Parse an export file, requiring a `books` array
///
/// Any other fields are ignored. Nothing is returned unless every record
/// parses.
pub fn parse_import(text: &str) -> Result<Vec<Book>, TrackerError> {
    let mut value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| TrackerError::InvalidImport(e.to_string()))?;

    let books = match value.get_mut("books") {
        Some(books) if books.is_array() => books.take(),
        _ => return Err(TrackerError::InvalidImport("missing \"books\" array".to_string())),
    };

    serde_json::from_value(books).map_err(|e| TrackerError::InvalidImport(e.to_string()))
}

/// Give imported books fresh ids so they cannot collide with anything stored
pub fn reassign_ids(books: &mut [Book], base_ms: u64) {
    for (index, book) in books.iter_mut().enumerate() {
        book.id = BookId(base_ms + index as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "books": [
            {"id": 5, "title": "Dune", "author": "Frank Herbert", "totalTime": 61000,
             "sessions": [{"date": "2025-01-13T14:00:00Z", "duration": 61000,
                           "startTime": 1736776739000, "endTime": 1736776800000}],
             "createdAt": "2025-01-10T09:00:00Z", "isFinished": false},
            {"id": 6, "title": "Emma", "createdAt": "2025-01-11T09:00:00Z"}
        ],
        "exportDate": "2025-01-14T10:00:00Z",
        "appVersion": "1.0"
    }"#;

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "timer-app-books-2025-03-07.json");
    }

    #[test]
    fn test_parse_import() {
        let books = parse_import(SAMPLE).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].total_time, 61_000);
        assert_eq!(books[0].sessions.len(), 1);
        // Omitted fields fall back to defaults
        assert_eq!(books[1].author, "");
        assert!(books[1].sessions.is_empty());
    }

    #[test]
    fn test_parse_import_rejections() {
        let test_cases = vec![
            ("not json", "expected"),
            (r#"{"items": []}"#, "missing \"books\" array"),
            (r#"{"books": {"title": "Dune"}}"#, "missing \"books\" array"),
            (r#"{"books": [{"title": "Dune"}]}"#, "missing field"),
        ];

        for (text, fragment) in test_cases {
            match parse_import(text) {
                Err(TrackerError::InvalidImport(message)) => {
                    assert!(message.contains(fragment), "{:?} gave {:?}", text, message)
                }
                other => panic!("{:?} should be rejected, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_reassign_ids() {
        let mut books = parse_import(SAMPLE).unwrap();
        reassign_ids(&mut books, 1_000);
        assert_eq!(books[0].id, BookId(1_000));
        assert_eq!(books[1].id, BookId(1_001));
    }

    #[test]
    fn test_export_then_parse() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("export.json");
        let books = parse_import(SAMPLE).unwrap();
        let now: DateTime<Utc> = "2025-01-14T10:00:00Z".parse()?;

        export_to(&path, &books, now)?;
        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("\"appVersion\": \"1.0\""));
        assert!(text.contains("\"exportDate\""));
        assert_eq!(parse_import(&text).unwrap(), books);
        Ok(())
    }
}
