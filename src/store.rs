//! Append-only scrobble log stored as newline-delimited JSON.
//!
//! Each accepted record is one self-contained JSON object on its own line.
//! Existing lines are never rewritten; the only mutation is appending.

use crate::error::{Result, StationError};
use crate::scrobble::ScrobbleRecord;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct ScrobbleLog {
    path: PathBuf,
}

impl ScrobbleLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record in append order.
    ///
    /// A missing log reads as empty. Blank lines are ignored, but any other
    /// line that fails to decode, invalid UTF-8 included, aborts the whole read.
    pub async fn read_all(&self) -> Result<Vec<ScrobbleRecord>> {
        ensure_parent_dir(&self.path).await?;

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Scrobble log {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StationError::io(&self.path, e)),
        };

        let records = decode_lines(&self.path, &raw)?;
        tracing::debug!(
            "Read {} scrobbles from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    /// Append `records` to the end of the log, creating it if needed.
    pub async fn append(&self, records: &[ScrobbleRecord]) -> Result<()> {
        ensure_parent_dir(&self.path).await?;

        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StationError::io(&self.path, e))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| StationError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StationError::io(&self.path, e))?;

        tracing::debug!(
            "Appended {} scrobbles to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn decode_lines(path: &Path, raw: &[u8]) -> Result<Vec<ScrobbleRecord>> {
    let mut records = Vec::new();
    for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
        if line.trim_ascii().is_empty() {
            continue;
        }
        let record = serde_json::from_slice(line).map_err(|source| StationError::StoreCorruption {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Create the directory holding `path`, parents included
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

pub(crate) async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StationError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(n: i64) -> ScrobbleRecord {
        ScrobbleRecord::new("Artist", format!("Track {}", n), 1700000000 + n)
    }

    #[tokio::test]
    async fn missing_log_reads_as_empty_and_creates_directory() {
        let dir = tempdir().unwrap();
        let log = ScrobbleLog::new(dir.path().join("nested/data/scrobbles.ndjson"));

        let records = log.read_all().await.unwrap();
        assert!(records.is_empty());
        assert!(dir.path().join("nested/data").is_dir());
        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn append_then_read_preserves_order() {
        let dir = tempdir().unwrap();
        let log = ScrobbleLog::new(dir.path().join("scrobbles.ndjson"));

        log.append(&[sample(1), sample(2)]).await.unwrap();
        log.append(&[sample(3)]).await.unwrap();

        let records = log.read_all().await.unwrap();
        assert_eq!(records, vec![sample(1), sample(2), sample(3)]);

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.ends_with('\n'));
        assert!(raw.lines().next().unwrap().contains("\"listenedAt\":1700000001"));
    }

    #[tokio::test]
    async fn empty_append_is_a_no_op() {
        let dir = tempdir().unwrap();
        let log = ScrobbleLog::new(dir.path().join("data/scrobbles.ndjson"));

        log.append(&[]).await.unwrap();
        assert!(!log.path().exists());
        assert!(dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn append_leaves_existing_bytes_untouched() {
        let dir = tempdir().unwrap();
        let log = ScrobbleLog::new(dir.path().join("scrobbles.ndjson"));
        log.append(&[sample(1)]).await.unwrap();
        let before = std::fs::read(log.path()).unwrap();

        log.append(&[sample(2)]).await.unwrap();
        let after = std::fs::read(log.path()).unwrap();
        assert_eq!(&after[..before.len()], &before[..]);
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scrobbles.ndjson");
        let line = serde_json::to_string(&sample(1)).unwrap();
        std::fs::write(&path, format!("\n{}\n   \n\n{}\n", line, line)).unwrap();

        let records = ScrobbleLog::new(&path).read_all().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_line_fails_with_its_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scrobbles.ndjson");
        let line = serde_json::to_string(&sample(1)).unwrap();
        std::fs::write(&path, format!("{}\n\n{{\"artist\":\"A\"}}\n{}\n", line, line)).unwrap();

        let err = ScrobbleLog::new(&path).read_all().await.unwrap_err();
        match err {
            StationError::StoreCorruption { line, .. } => assert_eq!(line, 3),
            other => panic!("expected store corruption, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_reported_as_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scrobbles.ndjson");
        let mut raw = serde_json::to_vec(&sample(1)).unwrap();
        raw.extend_from_slice(b"\n{\"artist\":\"\xff\xfe\",\"track\":\"T\",\"album\":\"\",\"listenedAt\":5}\n");
        std::fs::write(&path, raw).unwrap();

        let err = ScrobbleLog::new(&path).read_all().await.unwrap_err();
        match err {
            StationError::StoreCorruption { line, .. } => assert_eq!(line, 2),
            other => panic!("expected store corruption, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn crlf_line_endings_still_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scrobbles.ndjson");
        let line = serde_json::to_string(&sample(1)).unwrap();
        std::fs::write(&path, format!("{}\r\n{}\r\n", line, line)).unwrap();

        let records = ScrobbleLog::new(&path).read_all().await.unwrap();
        assert_eq!(records, vec![sample(1), sample(1)]);
    }
}
