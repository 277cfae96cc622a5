//! Canonical post records and their derived fields
//!
//! A `RawRow` is one record of a scraped archive; a `Post` is the canonical
//! entity the pipeline works on, with timestamps parsed to UTC and the
//! viewer-local hour/day derived once at load time.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Deserialize;

/// One raw archive record, as scraped
///
/// Column presence is required; absent optional values are empty strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "Upvotes")]
    pub upvotes: f32,
    #[serde(rename = "Subreddit")]
    pub subreddit: String,
    #[serde(rename = "Comments")]
    pub comments: i64,
    #[serde(rename = "Post URL")]
    pub url: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Audio Link")]
    pub audio_link: String,
    #[serde(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Fills")]
    pub fills: Option<i64>,
}

/// Parsed duration field
///
/// Archives overload one column with two encodings: `"MM:SS"` audio runtimes
/// and dash-prefixed script word counts (`"-1234"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationCode {
    /// Audio runtime in whole minutes
    Minutes(u32),
    /// Script length in words
    Words(u32),
}

/// One canonical post
#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    /// Lower-cased tag values in input order
    pub tags: Vec<String>,
    pub subreddit: String,
    pub author: String,
    pub url: String,
    /// Raw upvote count as scraped; never rewritten after deduplication
    pub upvotes: f32,
    /// The metric value comparisons read. Starts equal to `upvotes`;
    /// normalization and inflation adjustment replace it, leaving `upvotes`
    /// as provenance.
    pub metric: f32,
    pub comments: i64,
    pub timestamp_utc: DateTime<Utc>,
    /// Always derived from `timestamp_utc`, never stored independently
    pub timestamp_local: DateTime<Local>,
    pub hour_utc: u32,
    pub hour_local: u32,
    /// 0..=6, Sunday = 0
    pub day_local: u32,
    pub audio_link: Option<String>,
    pub duration: Option<DurationCode>,
    pub fills: Option<i64>,
}

impl Post {
    /// Build a canonical post from a raw row.
    ///
    /// Returns `None` when the timestamp does not parse; callers count the
    /// exclusion. A malformed duration only clears the duration field.
    pub fn from_raw(row: &RawRow) -> Option<Self> {
        let timestamp_utc = parse_timestamp(&row.timestamp)?;
        let timestamp_local = timestamp_utc.with_timezone(&Local);
        let audio_link = match row.audio_link.trim() {
            "" => None,
            link => Some(link.to_string()),
        };
        Some(Self {
            title: row.title.clone(),
            tags: split_tags(&row.tags),
            subreddit: row.subreddit.clone(),
            author: row.author.clone(),
            url: row.url.clone(),
            upvotes: row.upvotes,
            metric: row.upvotes,
            comments: row.comments,
            timestamp_utc,
            timestamp_local,
            hour_utc: timestamp_utc.hour(),
            hour_local: timestamp_local.hour(),
            day_local: timestamp_local.weekday().num_days_from_sunday(),
            audio_link,
            duration: parse_duration(&row.duration),
            fills: row.fills,
        })
    }

    /// The pipe-joined tag string used for containment matching
    pub fn joined_tags(&self) -> String {
        self.tags.join("|")
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// Split a pipe-delimited tag string into lower-cased tag values
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse an archive timestamp into a UTC instant.
///
/// Accepts RFC 3339, the `YYYY-MM-DD HH:MM:SS[.frac]+HH:MM` form archives
/// round-trip through, and naive datetimes assumed UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Parse the overloaded duration column.
///
/// `"MM:SS"`, `":SS"`, `"MM:"` and bare integers are audio runtimes in
/// minutes (seconds contribute only full minutes); a leading dash marks a
/// script word count. Anything else is unparseable.
pub fn parse_duration(raw: &str) -> Option<DurationCode> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(words) = s.strip_prefix('-') {
        return words.parse::<u32>().ok().map(DurationCode::Words);
    }
    let mut parts = s.split(':');
    let minutes_part = parts.next()?;
    let minutes: u32 = if minutes_part.is_empty() {
        0
    } else {
        minutes_part.parse().ok()?
    };
    let seconds: u32 = match parts.next() {
        None | Some("") => 0,
        Some(sec) => sec.parse().ok()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(DurationCode::Minutes(minutes + seconds / 60))
}
