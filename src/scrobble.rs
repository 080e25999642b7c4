use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One accepted listen, as persisted in the scrobble log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrobbleRecord {
    pub artist: String,
    pub track: String,
    pub album: String,
    /// Unix seconds, always > 0
    pub listened_at: i64,
}

impl ScrobbleRecord {
    pub fn new(artist: impl Into<String>, track: impl Into<String>, listened_at: i64) -> Self {
        Self {
            artist: artist.into(),
            track: track.into(),
            album: String::new(),
            listened_at,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }
}

/// Validate an untrusted JSON element and coerce it into a `ScrobbleRecord`.
///
/// Returns `None` when the artist or track is blank after trimming, or when
/// the listen time does not resolve to a positive timestamp with a UTC
/// calendar date. Unknown fields are dropped.
pub fn normalize(raw: &Value) -> Option<ScrobbleRecord> {
    let artist = text_field(raw, "artist");
    let track = text_field(raw, "track");
    let album = text_field(raw, "album");

    let listened_at = raw
        .get("listenedAt")
        .filter(|v| !v.is_null())
        .or_else(|| raw.get("timestamp"))
        .map(coerce_seconds)
        .unwrap_or(0);

    if artist.is_empty() || track.is_empty() || listened_at <= 0 {
        return None;
    }
    // every stored listen must land on a UTC calendar day
    DateTime::<Utc>::from_timestamp(listened_at, 0)?;

    Some(ScrobbleRecord {
        artist,
        track,
        album,
        listened_at,
    })
}

fn text_field(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Numeric coercion of a JSON value, truncated toward zero. Non-finite
/// results collapse to 0.
fn coerce_seconds(value: &Value) -> i64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric_text(s),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    };

    if number.is_finite() {
        number.trunc() as i64
    } else {
        0
    }
}

fn parse_numeric_text(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}
