use crate::analytics::{aggregate, write_snapshot};
use crate::config::Config;
use crate::error::{Result, StationError};
use crate::scrobble::normalize;
use crate::store::{ScrobbleLog, ensure_dir};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub processed: usize,
    pub output_path: PathBuf,
}

/// Ingest a JSON export file into the scrobble log.
///
/// The whole file is parsed before anything is written, so a malformed file
/// leaves the log untouched.
pub async fn ingest(config: &Config, input: &Path) -> Result<IngestReport> {
    if input.as_os_str().is_empty() {
        return Err(StationError::Usage(
            "ingest requires a path to a JSON file".to_string(),
        ));
    }

    let raw = tokio::fs::read(input)
        .await
        .map_err(|e| StationError::io(input, e))?;
    let parsed: Value =
        serde_json::from_slice(&raw).map_err(|source| StationError::InputFormat {
            path: input.to_path_buf(),
            source,
        })?;

    match parsed {
        Value::Array(items) => {
            tracing::info!("Ingesting {} elements from {}", items.len(), input.display());
            ingest_values(config, &items).await
        }
        _ => Err(StationError::NotAnArray(input.display().to_string())),
    }
}

/// Ingest an already parsed JSON document; it must be an array.
pub async fn ingest_value(config: &Config, value: Value) -> Result<IngestReport> {
    match value {
        Value::Array(items) => ingest_values(config, &items).await,
        _ => Err(StationError::NotAnArray("request body".to_string())),
    }
}

/// Normalize each element and append the accepted ones to the log
pub async fn ingest_values(config: &Config, items: &[Value]) -> Result<IngestReport> {
    let mut accepted = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (idx, item) in items.iter().enumerate() {
        match normalize(item) {
            Some(record) => accepted.push(record),
            None => {
                tracing::debug!("Skipping element {}: not a valid scrobble", idx);
                skipped += 1;
            }
        }
    }

    ensure_dir(&config.data_dir).await?;
    let log = ScrobbleLog::new(config.log_path());
    log.append(&accepted).await?;

    if skipped > 0 {
        tracing::warn!("Skipped {} of {} elements", skipped, items.len());
    }
    tracing::info!(
        "Ingested {} scrobbles into {}",
        accepted.len(),
        log.path().display()
    );

    Ok(IngestReport {
        ingested: accepted.len(),
        skipped,
        output_path: log.path().to_path_buf(),
    })
}

/// Rebuild the analytics snapshot from the full scrobble log
pub async fn build(config: &Config) -> Result<BuildReport> {
    ensure_dir(&config.data_dir).await?;
    ensure_dir(&config.output_dir).await?;

    let log = ScrobbleLog::new(config.log_path());
    let records = log.read_all().await?;
    let snapshot = aggregate(&records);

    let output_path = config.snapshot_path();
    write_snapshot(&output_path, &snapshot).await?;

    tracing::info!(
        "Built analytics from {} scrobbles into {}",
        records.len(),
        output_path.display()
    );

    Ok(BuildReport {
        processed: records.len(),
        output_path,
    })
}
