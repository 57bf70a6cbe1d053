use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::Book;

pub const STORE_FILE_NAME: &str = "reading-tracker-books.json";

/// Whole-file JSON persistence for the book collection
#[derive(Debug, Clone)]
pub struct BookStore {
    path: PathBuf,
}

impl BookStore {
    /// Store inside `data_dir`, using the standard file name
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE_NAME),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection
    ///
    /// A missing or blank file is an empty library. A file that does not
    /// parse is logged and also treated as empty; read failures are errors.
    pub fn load(&self) -> Result<Vec<Book>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no store yet");
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read book store {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Book>>(&text) {
            Ok(books) => {
                tracing::debug!(count = books.len(), "loaded books");
                Ok(books)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "book store is unreadable, starting empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Rewrite the whole collection through a temporary file
    pub fn save(&self, books: &[Book]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).context("Failed to create temporary store file")?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, books).context("Failed to write book store")?;
            writer.flush().context("Failed to flush book store")?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace book store {}", self.path.display()))?;

        tracing::debug!(count = books.len(), path = %self.path.display(), "saved books");
        Ok(())
    }
}
