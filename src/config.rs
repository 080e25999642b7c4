use std::path::{Path, PathBuf};

const LOG_FILE: &str = "scrobbles.ndjson";
const SNAPSHOT_FILE: &str = "analytics.json";

/// Locations of the scrobble log and the analytics snapshot.
///
/// Every pipeline entry point takes a `Config` so tests can point both
/// directories at a temporary location.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Use `root/data` and `root/output`
    pub fn rooted_at(root: &Path) -> Self {
        Self::new(root.join("data"), root.join("output"))
    }

    /// Append-only NDJSON log of accepted scrobbles
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    /// Pretty-printed analytics snapshot, replaced on every build
    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(SNAPSHOT_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("data", "output")
    }
}
