use crate::error::{Result, StationError};
use crate::scrobble::ScrobbleRecord;
use crate::store::ensure_parent_dir;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

/// Length of the top artist and top track lists
pub const TOP_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    /// RFC 3339 UTC time the snapshot was computed
    pub generated_at: String,
    pub totals: Totals,
    pub range: ListenRange,
    pub top_artists: Vec<NamedCount>,
    pub top_tracks: Vec<NamedCount>,
    pub activity_by_day: Vec<DayCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub scrobbles: u64,
    pub unique_artists: u64,
    pub unique_tracks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenRange {
    pub first_listen: Option<i64>,
    pub latest_listen: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    /// `YYYY-MM-DD` in UTC
    pub day: String,
    pub count: u64,
}

/// Counter that remembers the order in which keys were first seen
struct Tally<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn bump(&mut self, key: &K) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key.clone(), 1));
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn top(mut self, limit: usize) -> Vec<(K, u64)> {
        // sort_by is stable
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Fold the full scrobble history into a snapshot stamped with the current time
pub fn aggregate(records: &[ScrobbleRecord]) -> AnalyticsSnapshot {
    aggregate_at(records, Utc::now())
}

/// Fold the full scrobble history into a snapshot stamped with `generated_at`
pub fn aggregate_at(records: &[ScrobbleRecord], generated_at: DateTime<Utc>) -> AnalyticsSnapshot {
    let mut by_day: HashMap<String, u64> = HashMap::new();
    let mut by_artist: Tally<String> = Tally::new();
    let mut by_track: Tally<(String, String)> = Tally::new();
    let mut range = ListenRange::default();

    for record in records {
        if let Some(day) = day_key(record.listened_at) {
            *by_day.entry(day).or_insert(0) += 1;
        }
        by_artist.bump(&record.artist);
        by_track.bump(&(record.artist.clone(), record.track.clone()));

        let ts = record.listened_at;
        range.first_listen = Some(range.first_listen.map_or(ts, |v| v.min(ts)));
        range.latest_listen = Some(range.latest_listen.map_or(ts, |v| v.max(ts)));
    }

    let totals = Totals {
        scrobbles: records.len() as u64,
        unique_artists: by_artist.len() as u64,
        unique_tracks: by_track.len() as u64,
    };

    let top_artists = by_artist
        .top(TOP_LIMIT)
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    let top_tracks = by_track
        .top(TOP_LIMIT)
        .into_iter()
        .map(|((artist, track), count)| NamedCount {
            name: track_name(&artist, &track),
            count,
        })
        .collect();

    let mut activity_by_day: Vec<DayCount> = by_day
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect();
    activity_by_day.sort_by(|a, b| a.day.cmp(&b.day));

    AnalyticsSnapshot {
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        totals,
        range,
        top_artists,
        top_tracks,
        activity_by_day,
    }
}

/// Display name of a track entry in `top_tracks`
pub fn track_name(artist: &str, track: &str) -> String {
    format!("{} - {}", artist, track)
}

/// UTC calendar day of a Unix timestamp
fn day_key(listened_at: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(listened_at, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Write the snapshot as pretty-printed JSON, replacing any previous file.
///
/// The JSON goes to a sibling temp file that is renamed over `path`, so
/// readers see either the old snapshot or the new one.
pub async fn write_snapshot(path: &Path, snapshot: &AnalyticsSnapshot) -> Result<()> {
    ensure_parent_dir(path).await?;
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| StationError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StationError::io(path, e))
}

/// Load the last written snapshot, `None` if no build has run yet
pub async fn read_snapshot(path: &Path) -> Result<Option<AnalyticsSnapshot>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StationError::io(path, e)),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
