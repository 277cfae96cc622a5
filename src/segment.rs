//! Segmentation dimensions
//!
//! For a requested dimension, enumerates candidate segment keys, builds the
//! (in-group, out-of-group) partitions, applies the minimum sample gate, and
//! invokes the comparator. Candidates that fail the gate still produce a row
//! with an `InsufficientSample` outcome, so consumers that need fixed-width
//! output (24 hourly bars, 7 day bars) always get one row per candidate key.

use std::collections::HashMap;

use chrono::{Local, TimeZone, Timelike, Utc};
use regex::Regex;

use crate::canonicalize::Dataset;
use crate::compare::{compare, Comparison};
use crate::error::{Error, Result};
use crate::post::{DurationCode, Post};

/// Administrative tags that never become tag-dimension candidates
pub const IGNORED_TAGS: &[&str] = &["script offer", "script fill"];

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// A segmentation dimension, carrying the parameters it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    /// UTC hour-of-day blocks of `block` hours; `block` must divide 24.
    /// Results are reordered into viewer-local hour labels.
    Hour { block: u32 },
    /// Local day of week, Sunday first
    Day,
    /// One candidate per distinct subreddit
    Subreddit,
    /// Every tag frequent enough to clear the gate, optionally capped to the
    /// `top` most frequent compared rows
    Tag { top: Option<usize> },
    /// Exact number of tags on a post, 1..=59
    TagCount,
    /// Audio runtime bucketed into `minutes`-wide blocks
    DurationBlock { minutes: u32 },
    /// Script length bucketed into `words`-wide blocks
    WordCountBlock { words: u32 },
}

/// Outcome of one segment's comparison
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    Compared(Comparison),
    /// The gate was not cleared (or the comparison was degenerate); the
    /// segment is undeterminable, not zero.
    InsufficientSample,
}

impl SegmentOutcome {
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            Self::Compared(c) => Some(c),
            Self::InsufficientSample => None,
        }
    }
}

/// One result row: a labeled segment and its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub label: String,
    pub outcome: SegmentOutcome,
}

/// Minimum group size, per side, before a segment's comparison is trusted.
///
/// Scales with dataset size to reduce false positives on small samples.
pub fn minimum_sample_gate(total: usize) -> usize {
    total / 1000 + 5
}

/// Whether `hour` falls inside the block starting at `start`, wrapping at
/// midnight (a block starting at 22 with width 4 covers {22, 23, 0, 1})
pub fn hour_in_block(hour: u32, start: u32, width: u32) -> bool {
    let end = (start + width) % 24;
    if end <= start {
        hour >= start || hour < end
    } else {
        hour >= start && hour < end
    }
}

/// 12-hour AM/PM label for an hour of day
pub fn format_hour_12h(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        12 => "12 PM".to_string(),
        h if h < 12 => format!("{h} AM"),
        h => format!("{} PM", h - 12),
    }
}

/// Viewer-local hour label for a UTC hour, via a fixed reference date
fn local_label_hour(utc_hour: u32) -> u32 {
    Utc.with_ymd_and_hms(2000, 1, 1, utc_hour, 0, 0)
        .single()
        .map(|dt| dt.with_timezone(&Local).hour())
        .unwrap_or(utc_hour)
}

fn partition_metrics<F>(posts: &[Post], pred: F) -> (Vec<f32>, Vec<f32>)
where
    F: Fn(&Post) -> bool,
{
    let mut in_group = Vec::new();
    let mut out_group = Vec::new();
    for post in posts {
        if pred(post) {
            in_group.push(post.metric);
        } else {
            out_group.push(post.metric);
        }
    }
    (in_group, out_group)
}

/// Compare only when both sides strictly clear the gate
fn gated_compare(
    in_group: &[f32],
    out_group: &[f32],
    gate: usize,
    confidence: f32,
) -> SegmentOutcome {
    if in_group.len() > gate && out_group.len() > gate {
        match compare(in_group, out_group, confidence) {
            Some(comparison) => SegmentOutcome::Compared(comparison),
            None => SegmentOutcome::InsufficientSample,
        }
    } else {
        SegmentOutcome::InsufficientSample
    }
}

/// Segment the dataset along one dimension.
///
/// Returns one row per candidate key, ordered per the dimension's rule.
/// `Subreddit` over a single-subreddit dataset returns the explicit
/// `SingleSubreddit` error rather than a spurious single-row result.
pub fn segment(dataset: &Dataset, dimension: &Dimension, confidence: f32) -> Result<Vec<SegmentRow>> {
    if confidence <= 0.0 || confidence >= 1.0 {
        return Err(Error::InvalidConfidence(confidence));
    }
    match dimension {
        Dimension::Hour { block } => segment_by_hour(dataset, *block, confidence),
        Dimension::Day => Ok(segment_by_day(dataset, confidence)),
        Dimension::Subreddit => segment_by_subreddit(dataset, confidence),
        Dimension::Tag { top } => Ok(segment_by_tag(dataset, *top, confidence)),
        Dimension::TagCount => Ok(segment_by_tag_count(dataset, confidence)),
        Dimension::DurationBlock { minutes } => {
            segment_by_blocks(dataset, *minutes, confidence, BlockKind::Minutes)
        }
        Dimension::WordCountBlock { words } => {
            segment_by_blocks(dataset, *words, confidence, BlockKind::Words)
        }
    }
}

fn segment_by_hour(dataset: &Dataset, block: u32, confidence: f32) -> Result<Vec<SegmentRow>> {
    if block == 0 || 24 % block != 0 {
        return Err(Error::InvalidBlockWidth(block));
    }
    let gate = minimum_sample_gate(dataset.len());
    let mut rows: Vec<(u32, SegmentRow)> = Vec::with_capacity((24 / block) as usize);
    let mut start = 0;
    while start < 24 {
        let (in_group, out_group) =
            partition_metrics(dataset.posts(), |p| hour_in_block(p.hour_utc, start, block));
        let outcome = gated_compare(&in_group, &out_group, gate, confidence);
        let local = local_label_hour(start);
        rows.push((
            local,
            SegmentRow {
                label: format_hour_12h(local),
                outcome,
            },
        ));
        start += block;
    }
    // presentation order is the viewer's local clock, not UTC
    rows.sort_by_key(|(local, _)| *local);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

fn segment_by_day(dataset: &Dataset, confidence: f32) -> Vec<SegmentRow> {
    let gate = minimum_sample_gate(dataset.len());
    (0..7)
        .map(|day| {
            let (in_group, out_group) =
                partition_metrics(dataset.posts(), |p| p.day_local == day);
            SegmentRow {
                label: DAY_NAMES[day as usize].to_string(),
                outcome: gated_compare(&in_group, &out_group, gate, confidence),
            }
        })
        .collect()
}

fn segment_by_subreddit(dataset: &Dataset, confidence: f32) -> Result<Vec<SegmentRow>> {
    let subreddits = dataset.subreddits();
    if subreddits.len() <= 1 {
        return Err(Error::SingleSubreddit);
    }
    let gate = minimum_sample_gate(dataset.len());
    Ok(subreddits
        .into_iter()
        .map(|subreddit| {
            let (in_group, out_group) =
                partition_metrics(dataset.posts(), |p| p.subreddit == subreddit);
            SegmentRow {
                label: subreddit,
                outcome: gated_compare(&in_group, &out_group, gate, confidence),
            }
        })
        .collect())
}

/// Dataset-wide tag frequencies, for candidate selection
fn tag_frequencies(dataset: &Dataset) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for post in dataset.posts() {
        for tag in &post.tags {
            *counts.entry(tag.clone()).or_default() += 1;
        }
    }
    counts
}

fn segment_by_tag(dataset: &Dataset, top: Option<usize>, confidence: f32) -> Vec<SegmentRow> {
    let gate = minimum_sample_gate(dataset.len());
    let mut candidates: Vec<(String, usize)> = tag_frequencies(dataset)
        .into_iter()
        .filter(|(tag, count)| *count >= gate && !IGNORED_TAGS.contains(&tag.as_str()))
        .collect();
    // most frequent first; name breaks ties so the order is reproducible
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut rows = Vec::new();
    let mut compared = 0;
    for (tag, _) in candidates {
        // tags may contain regex metacharacters; match them literally
        let Ok(pattern) = Regex::new(&regex::escape(&tag)) else {
            continue;
        };
        let (in_group, out_group) =
            partition_metrics(dataset.posts(), |p| pattern.is_match(&p.joined_tags()));
        let outcome = gated_compare(&in_group, &out_group, gate, confidence);
        if matches!(outcome, SegmentOutcome::Compared(_)) {
            compared += 1;
        }
        rows.push(SegmentRow {
            label: tag,
            outcome,
        });
        if top.is_some_and(|n| compared >= n) {
            break;
        }
    }
    rows
}

fn segment_by_tag_count(dataset: &Dataset, confidence: f32) -> Vec<SegmentRow> {
    let gate = minimum_sample_gate(dataset.len());
    (1..60)
        .map(|count| {
            let (in_group, out_group) =
                partition_metrics(dataset.posts(), |p| p.tag_count() == count);
            SegmentRow {
                label: count.to_string(),
                outcome: gated_compare(&in_group, &out_group, gate, confidence),
            }
        })
        .collect()
}

enum BlockKind {
    Minutes,
    Words,
}

impl BlockKind {
    fn value(&self, post: &Post) -> Option<u32> {
        match (self, post.duration) {
            (Self::Minutes, Some(DurationCode::Minutes(m))) => Some(m),
            (Self::Words, Some(DurationCode::Words(w))) => Some(w),
            _ => None,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Self::Minutes => "mins",
            Self::Words => "words",
        }
    }
}

/// Duration / word-count block segmentation.
///
/// Only posts whose duration field carries the matching encoding take part;
/// both the gate total and the out-of-group are drawn from that subset, not
/// the whole dataset.
fn segment_by_blocks(
    dataset: &Dataset,
    width: u32,
    confidence: f32,
    kind: BlockKind,
) -> Result<Vec<SegmentRow>> {
    if width == 0 {
        return Err(Error::EmptyBlock(width));
    }
    let subset: Vec<(u32, f32)> = dataset
        .posts()
        .iter()
        .filter_map(|p| kind.value(p).map(|v| ((v / width) * width, p.metric)))
        .collect();
    let gate = minimum_sample_gate(subset.len());

    let mut blocks: Vec<u32> = subset.iter().map(|(block, _)| *block).collect();
    blocks.sort_unstable();
    blocks.dedup();

    Ok(blocks
        .into_iter()
        .map(|block| {
            let mut in_group = Vec::new();
            let mut out_group = Vec::new();
            for (b, metric) in &subset {
                if *b == block {
                    in_group.push(*metric);
                } else {
                    out_group.push(*metric);
                }
            }
            SegmentRow {
                label: format!("{}-{} {}", block, block + width - 1, kind.unit()),
                outcome: gated_compare(&in_group, &out_group, gate, confidence),
            }
        })
        .collect())
}

/// The hour segmentation run separately on each local day of week.
///
/// Returns `(day label, rows)` pairs in local day order; each day's gate is
/// computed from that day's subset.
pub fn segment_hours_by_day(
    dataset: &Dataset,
    block: u32,
    confidence: f32,
) -> Result<Vec<(String, Vec<SegmentRow>)>> {
    let mut out = Vec::with_capacity(7);
    for day in 0..7 {
        let subset: Vec<Post> = dataset
            .posts()
            .iter()
            .filter(|p| p.day_local == day)
            .cloned()
            .collect();
        let rows = segment_by_hour(&Dataset::new(subset), block, confidence)?;
        out.push((DAY_NAMES[day as usize].to_string(), rows));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::RawRow;

    fn post(title: &str, subreddit: &str, tags: &str, metric: f32, timestamp: &str) -> Post {
        let row = RawRow {
            title: title.to_string(),
            tags: tags.to_string(),
            upvotes: metric,
            subreddit: subreddit.to_string(),
            comments: 0,
            url: String::new(),
            timestamp: timestamp.to_string(),
            author: "auth".to_string(),
            audio_link: String::new(),
            duration: String::new(),
            fills: None,
        };
        Post::from_raw(&row).unwrap()
    }

    fn hour_stamp(hour: u32) -> String {
        format!("2024-03-15T{hour:02}:30:00Z")
    }

    #[test]
    fn test_gate_scales_with_dataset_size() {
        assert_eq!(minimum_sample_gate(0), 5);
        assert_eq!(minimum_sample_gate(999), 5);
        assert_eq!(minimum_sample_gate(1000), 6);
        assert_eq!(minimum_sample_gate(4321), 9);
    }

    #[test]
    fn test_hour_in_block_plain_range() {
        assert!(hour_in_block(10, 9, 3));
        assert!(hour_in_block(9, 9, 3));
        assert!(!hour_in_block(12, 9, 3));
        assert!(!hour_in_block(8, 9, 3));
    }

    #[test]
    fn test_hour_in_block_wraps_at_midnight() {
        for hour in [22, 23, 0, 1] {
            assert!(hour_in_block(hour, 22, 4), "hour {hour} should match");
        }
        for hour in [2, 12, 21] {
            assert!(!hour_in_block(hour, 22, 4), "hour {hour} should not match");
        }
    }

    #[test]
    fn test_hour_in_block_full_day() {
        for hour in 0..24 {
            assert!(hour_in_block(hour, 0, 24));
        }
    }

    #[test]
    fn test_format_hour_12h() {
        assert_eq!(format_hour_12h(0), "12 AM");
        assert_eq!(format_hour_12h(1), "1 AM");
        assert_eq!(format_hour_12h(11), "11 AM");
        assert_eq!(format_hour_12h(12), "12 PM");
        assert_eq!(format_hour_12h(13), "1 PM");
        assert_eq!(format_hour_12h(23), "11 PM");
    }

    #[test]
    fn test_segment_hour_rejects_bad_block() {
        let dataset = Dataset::new(vec![]);
        assert!(matches!(
            segment(&dataset, &Dimension::Hour { block: 5 }, 0.95),
            Err(Error::InvalidBlockWidth(5))
        ));
        assert!(matches!(
            segment(&dataset, &Dimension::Hour { block: 0 }, 0.95),
            Err(Error::InvalidBlockWidth(0))
        ));
    }

    #[test]
    fn test_segment_rejects_bad_confidence() {
        let dataset = Dataset::new(vec![]);
        assert!(matches!(
            segment(&dataset, &Dimension::Day, 0.0),
            Err(Error::InvalidConfidence(_))
        ));
        assert!(matches!(
            segment(&dataset, &Dimension::Day, 1.0),
            Err(Error::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_segment_hour_one_row_per_block() {
        let posts: Vec<Post> = (0..24)
            .map(|h| post(&format!("p{h}"), "sub", "alpha", 10.0, &hour_stamp(h)))
            .collect();
        let dataset = Dataset::new(posts);
        let rows = segment(&dataset, &Dimension::Hour { block: 1 }, 0.95).unwrap();
        assert_eq!(rows.len(), 24);
        let rows = segment(&dataset, &Dimension::Hour { block: 3 }, 0.95).unwrap();
        assert_eq!(rows.len(), 8);
        // sparse data: every row is a placeholder, none omitted
        assert!(rows
            .iter()
            .all(|r| r.outcome == SegmentOutcome::InsufficientSample));
    }

    #[test]
    fn test_segment_day_seven_rows_sunday_first() {
        let dataset = Dataset::new(vec![post("a", "sub", "alpha", 10.0, &hour_stamp(3))]);
        let rows = segment(&dataset, &Dimension::Day, 0.95).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].label, "Sunday");
        assert_eq!(rows[6].label, "Saturday");
    }

    #[test]
    fn test_segment_subreddit_single_is_error() {
        let dataset = Dataset::new(vec![
            post("a", "only", "alpha", 10.0, &hour_stamp(1)),
            post("b", "only", "alpha", 12.0, &hour_stamp(2)),
        ]);
        assert!(matches!(
            segment(&dataset, &Dimension::Subreddit, 0.95),
            Err(Error::SingleSubreddit)
        ));
    }

    #[test]
    fn test_segment_subreddit_candidates_in_appearance_order() {
        let mut posts = Vec::new();
        for i in 0..8 {
            posts.push(post(&format!("a{i}"), "first", "alpha", 10.0 + i as f32, &hour_stamp(1)));
            posts.push(post(&format!("b{i}"), "second", "alpha", 20.0 + i as f32, &hour_stamp(2)));
        }
        let dataset = Dataset::new(posts);
        let rows = segment(&dataset, &Dimension::Subreddit, 0.95).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "first");
        assert_eq!(rows[1].label, "second");
        assert!(matches!(rows[0].outcome, SegmentOutcome::Compared(_)));
    }

    #[test]
    fn test_segment_tag_excludes_administrative_tags() {
        let mut posts = Vec::new();
        for i in 0..12 {
            let tags = if i % 2 == 0 {
                "script offer|alpha"
            } else {
                "script offer|beta"
            };
            posts.push(post(&format!("p{i}"), "sub", tags, 10.0 + i as f32, &hour_stamp(1)));
        }
        let rows = segment_by_tag(&Dataset::new(posts), None, 0.95);
        assert!(rows.iter().all(|r| r.label != "script offer"));
    }

    #[test]
    fn test_segment_tag_candidates_by_frequency() {
        let mut posts = Vec::new();
        for i in 0..20 {
            let tags = if i < 12 { "common|rare" } else { "common" };
            posts.push(post(&format!("p{i}"), "sub", tags, 10.0 + (i % 7) as f32, &hour_stamp(1)));
        }
        let rows = segment_by_tag(&Dataset::new(posts), None, 0.95);
        assert_eq!(rows[0].label, "common");
        assert_eq!(rows[1].label, "rare");
    }

    #[test]
    fn test_segment_tag_regex_metacharacters_match_literally() {
        let mut posts = Vec::new();
        for i in 0..14 {
            let tags = if i < 7 { "f4m [script]" } else { "other" };
            posts.push(post(&format!("p{i}"), "sub", tags, 10.0 + (i % 5) as f32, &hour_stamp(1)));
        }
        let rows = segment_by_tag(&Dataset::new(posts), None, 0.95);
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert!(labels.contains(&"f4m [script]"));
        let row = rows.iter().find(|r| r.label == "f4m [script]").unwrap();
        assert!(matches!(row.outcome, SegmentOutcome::Compared(_)));
    }

    #[test]
    fn test_segment_tag_count_fixed_candidates() {
        let dataset = Dataset::new(vec![post("a", "sub", "alpha", 10.0, &hour_stamp(1))]);
        let rows = segment(&dataset, &Dimension::TagCount, 0.95).unwrap();
        assert_eq!(rows.len(), 59);
        assert_eq!(rows[0].label, "1");
        assert_eq!(rows[58].label, "59");
    }

    #[test]
    fn test_segment_duration_blocks_observed_ascending() {
        let mut posts = Vec::new();
        for i in 0..10 {
            let mut p = post(&format!("short{i}"), "sub", "alpha", 10.0 + i as f32, &hour_stamp(1));
            p.duration = Some(DurationCode::Minutes(4));
            posts.push(p);
            let mut p = post(&format!("long{i}"), "sub", "alpha", 20.0 + i as f32, &hour_stamp(2));
            p.duration = Some(DurationCode::Minutes(10));
            posts.push(p);
        }
        // word-count posts and missing durations stay out of the subset
        let mut w = post("words", "sub", "alpha", 99.0, &hour_stamp(3));
        w.duration = Some(DurationCode::Words(500));
        posts.push(w);
        posts.push(post("none", "sub", "alpha", 99.0, &hour_stamp(4)));

        let rows =
            segment(&Dataset::new(posts), &Dimension::DurationBlock { minutes: 3 }, 0.95).unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["3-5 mins", "9-11 mins"]);
        assert!(matches!(rows[0].outcome, SegmentOutcome::Compared(_)));
    }

    #[test]
    fn test_segment_word_blocks_label_unit() {
        let mut posts = Vec::new();
        for i in 0..12 {
            let mut p = post(&format!("a{i}"), "sub", "alpha", 10.0 + i as f32, &hour_stamp(1));
            p.duration = Some(DurationCode::Words(if i < 6 { 800 } else { 2300 }));
            posts.push(p);
        }
        let rows = segment(
            &Dataset::new(posts),
            &Dimension::WordCountBlock { words: 1000 },
            0.95,
        )
        .unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["0-999 words", "2000-2999 words"]);
    }

    #[test]
    fn test_segment_blocks_zero_width_is_error() {
        let dataset = Dataset::new(vec![]);
        assert!(matches!(
            segment(&dataset, &Dimension::DurationBlock { minutes: 0 }, 0.95),
            Err(Error::EmptyBlock(0))
        ));
    }

    #[test]
    fn test_segment_hours_by_day_shape() {
        let posts: Vec<Post> = (0..24)
            .map(|h| post(&format!("p{h}"), "sub", "alpha", 10.0, &hour_stamp(h)))
            .collect();
        let per_day = segment_hours_by_day(&Dataset::new(posts), 3, 0.95).unwrap();
        assert_eq!(per_day.len(), 7);
        assert_eq!(per_day[0].0, "Sunday");
        assert!(per_day.iter().all(|(_, rows)| rows.len() == 8));
    }

    #[test]
    fn test_gated_compare_blocks_small_groups() {
        let small = vec![1.0, 2.0, 3.0];
        let big: Vec<f32> = (0..50).map(|i| i as f32).collect();
        assert_eq!(
            gated_compare(&small, &big, 5, 0.95),
            SegmentOutcome::InsufficientSample
        );
        assert!(matches!(
            gated_compare(&big, &big, 5, 0.95),
            SegmentOutcome::Compared(_)
        ));
    }
}
