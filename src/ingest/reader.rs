//! Asynchronous JSONL row reader for bulk import

use super::row::RawRow;
use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads one JSON object per line. Blank lines are ignored; lines that are
/// not JSON objects are skipped with a warning and counted.
pub struct RowReader {
    path: PathBuf,
    reader: BufReader<File>,
    line_no: u64,
    malformed: u64,
}

impl RowReader {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        log::info!("📖 Reading rows from: {}", path.display());
        Ok(Self {
            path,
            reader: BufReader::new(file),
            line_no: 0,
            malformed: 0,
        })
    }

    /// Next object row, or `None` at end of file
    pub async fn next_row(&mut self) -> Result<Option<RawRow>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(row)) => return Ok(Some(row)),
                Ok(_) => {
                    self.malformed += 1;
                    log::warn!(
                        "⚠️  {}:{}: expected a JSON object, skipping",
                        self.path.display(),
                        self.line_no
                    );
                }
                Err(e) => {
                    self.malformed += 1;
                    log::warn!("⚠️  {}:{}: {}, skipping", self.path.display(), self.line_no, e);
                }
            }
        }
    }

    /// Up to `max` rows; an empty batch means end of file
    pub async fn next_batch(&mut self, max: usize) -> Result<Vec<RawRow>> {
        let mut batch = Vec::with_capacity(max.min(4096));
        while batch.len() < max {
            match self.next_row().await? {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(batch)
    }

    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("rows.jsonl");
        let mut file = tokio::fs::File::create(&file_path).await.unwrap();
        file.write_all(contents.as_bytes()).await.unwrap();
        file.flush().await.unwrap();
        (temp_dir, file_path)
    }

    #[tokio::test]
    async fn test_reads_rows_and_skips_garbage() {
        let (_dir, path) = write_file(
            "{\"timestamp\": 1, \"symbol\": \"BTC\"}\n\n[1, 2]\nnot json\n{\"timestamp\": 2}\n",
        )
        .await;

        let mut reader = RowReader::open(&path).await.unwrap();
        let first = reader.next_row().await.unwrap().unwrap();
        assert_eq!(first["symbol"], "BTC");
        let second = reader.next_row().await.unwrap().unwrap();
        assert_eq!(second["timestamp"], 2);
        assert!(reader.next_row().await.unwrap().is_none());

        assert_eq!(reader.malformed(), 2);
        assert_eq!(reader.lines_read(), 5);
    }

    #[tokio::test]
    async fn test_batches() {
        let body: String = (0..5).map(|i| format!("{{\"timestamp\": {}}}\n", i)).collect();
        let (_dir, path) = write_file(&body).await;

        let mut reader = RowReader::open(&path).await.unwrap();
        assert_eq!(reader.next_batch(2).await.unwrap().len(), 2);
        assert_eq!(reader.next_batch(2).await.unwrap().len(), 2);
        assert_eq!(reader.next_batch(2).await.unwrap().len(), 1);
        assert!(reader.next_batch(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = RowReader::open(temp_dir.path().join("absent.jsonl")).await;
        assert!(matches!(result, Err(crate::error::LedgerError::Io(_))));
    }
}
