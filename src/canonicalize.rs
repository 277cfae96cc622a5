//! Dataset canonicalization pipeline
//!
//! Turns raw archive rows into the canonical dataset every segmentation runs
//! against: concatenated, de-duplicated, time-derived, optionally normalized,
//! filtered, and gated for sufficiency. Stage order is fixed; the "latest
//! timestamp" reference of the later stages depends on the state after
//! filtering, not on the original rows. Every stage reports how many records
//! it removed before the next stage runs.

use std::collections::HashMap;

use chrono::{Datelike, Duration};
use trueno::Vector;

use crate::error::{Error, Result};
use crate::post::{Post, RawRow};

/// Smoothing window for the monthly inflation baseline. A centered 1-point
/// window is the identity; the clamped-edge policy below only matters for
/// wider windows.
const INFLATION_SMOOTHING_WINDOW: usize = 1;

/// Minimum posts a subreddit needs to stay in a multi-subreddit dataset
const MIN_SUBREDDIT_POSTS: usize = 3;

/// Posts newer than this are always excluded; very recent posts have not had
/// time to accumulate upvotes.
const RECENCY_EXCLUSION_DAYS: i64 = 14;

/// Options for one canonicalization run
#[derive(Debug, Clone, Default)]
pub struct CanonicalizeOptions {
    /// Case-insensitive exact subreddit filter
    pub subreddit: Option<String>,
    /// Cumulative case-insensitive substring filters over the joined tag string
    pub tag_filters: Vec<String>,
    /// Drop posts older than `months * 30` days before the latest remaining post
    pub time_cutoff_months: Option<u32>,
    /// Rescale the metric so every subreddit's mean matches the highest one
    pub normalize_subreddits: bool,
    /// Rescale the metric so every month's mean matches the smoothed peak month
    pub adjust_inflation: bool,
}

/// The canonical dataset: built once per analysis invocation, treated as
/// immutable for the remainder of the run.
#[derive(Debug, Clone)]
pub struct Dataset {
    posts: Vec<Post>,
}

impl Dataset {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Metric values of every post, in dataset order
    pub fn metrics(&self) -> Vec<f32> {
        self.posts.iter().map(|p| p.metric).collect()
    }

    /// Distinct subreddit values in first-appearance order
    pub fn subreddits(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for post in &self.posts {
            if !seen.contains(&post.subreddit) {
                seen.push(post.subreddit.clone());
            }
        }
        seen
    }
}

/// Run the full canonicalization pipeline over one or more raw row sources.
pub fn canonicalize(sources: Vec<Vec<RawRow>>, options: &CanonicalizeOptions) -> Result<Dataset> {
    let file_count = sources.len();
    let rows: Vec<RawRow> = sources.into_iter().flatten().collect();
    tracing::info!("loaded {} file(s) for a total of {} posts", file_count, rows.len());

    let rows = deduplicate(rows);
    let mut dataset = Dataset::new(derive_posts(rows));

    if options.normalize_subreddits {
        dataset = normalize_across_subreddits(dataset);
    }
    if options.adjust_inflation {
        dataset = adjust_for_inflation(dataset);
    }

    dataset = apply_tag_filters(dataset, &options.tag_filters);
    if let Some(subreddit) = &options.subreddit {
        dataset = filter_subreddit(dataset, subreddit);
    }
    if dataset.is_empty() {
        return Err(Error::InsufficientData);
    }

    dataset = drop_recent(dataset);
    dataset = drop_small_subreddits(dataset);
    if let Some(months) = options.time_cutoff_months {
        dataset = apply_time_cutoff(dataset, months);
    }
    if dataset.is_empty() {
        return Err(Error::InsufficientData);
    }
    Ok(dataset)
}

/// Collapse rows sharing (title, subreddit, author) into one.
///
/// Re-scrapes of the same post are updates, not new posts: the first-seen row
/// keeps its tags, URL, timestamp, audio link, duration and fills, while
/// upvotes and comments take the maximum observed value. First-seen input
/// order is preserved.
fn deduplicate(rows: Vec<RawRow>) -> Vec<RawRow> {
    let before = rows.len();
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();
    let mut out: Vec<RawRow> = Vec::with_capacity(before);
    for row in rows {
        let key = (row.title.clone(), row.subreddit.clone(), row.author.clone());
        match index.get(&key) {
            Some(&at) => {
                let kept = &mut out[at];
                kept.upvotes = kept.upvotes.max(row.upvotes);
                kept.comments = kept.comments.max(row.comments);
            }
            None => {
                index.insert(key, out.len());
                out.push(row);
            }
        }
    }
    tracing::info!(
        "dropped {} duplicate posts ({} -> {})",
        before - out.len(),
        before,
        out.len()
    );
    out
}

/// Parse timestamps and derive the time fields; rows whose timestamp does
/// not parse are excluded and counted.
fn derive_posts(rows: Vec<RawRow>) -> Vec<Post> {
    let before = rows.len();
    let posts: Vec<Post> = rows.iter().filter_map(Post::from_raw).collect();
    if posts.len() < before {
        tracing::warn!(
            "excluded {} rows with unparseable timestamps",
            before - posts.len()
        );
    }
    posts
}

fn group_mean(values: &[f32]) -> f32 {
    Vector::from_slice(values).mean().unwrap_or(0.0)
}

/// Rescale the metric so every subreddit's mean matches the highest
/// per-subreddit mean. Raw upvotes are left untouched.
fn normalize_across_subreddits(dataset: Dataset) -> Dataset {
    let mut by_subreddit: HashMap<String, Vec<f32>> = HashMap::new();
    for post in dataset.posts() {
        by_subreddit
            .entry(post.subreddit.clone())
            .or_default()
            .push(post.metric);
    }
    let means: HashMap<String, f32> = by_subreddit
        .into_iter()
        .map(|(subreddit, values)| (subreddit, group_mean(&values)))
        .collect();
    let baseline = means.values().copied().fold(f32::MIN, f32::max);
    tracing::info!("normalizing across subreddits, baseline mean {:.2}", baseline);

    let posts = dataset
        .posts
        .into_iter()
        .map(|mut post| {
            let mean = means.get(&post.subreddit).copied().unwrap_or(baseline);
            let factor = if mean > 0.0 { baseline / mean } else { 1.0 };
            post.metric *= factor;
            post
        })
        .collect();
    Dataset::new(posts)
}

/// Centered rolling mean with clamped edges: when the window cannot fully
/// center on an edge element, the mean of the neighbors actually inside the
/// span is used.
fn centered_rolling_mean(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let span = &values[lo..=hi];
            span.iter().sum::<f32>() / span.len() as f32
        })
        .collect()
}

/// Rescale the metric against upvote inflation: the smoothed peak monthly
/// mean becomes the baseline, and every month is scaled up to it.
///
/// Requires at least 1000 posts; a smaller dataset would make the monthly
/// means too noisy, so the stage is skipped with a warning, not an error.
fn adjust_for_inflation(dataset: Dataset) -> Dataset {
    if dataset.len() < 1000 {
        tracing::warn!(
            "only {} posts; inflation adjustment would be inaccurate, skipping",
            dataset.len()
        );
        return dataset;
    }

    let mut by_month: std::collections::BTreeMap<(i32, u32), Vec<f32>> =
        std::collections::BTreeMap::new();
    for post in dataset.posts() {
        let key = (post.timestamp_utc.year(), post.timestamp_utc.month());
        by_month.entry(key).or_default().push(post.metric);
    }
    let months: Vec<(i32, u32)> = by_month.keys().copied().collect();
    let means: Vec<f32> = by_month.values().map(|v| group_mean(v)).collect();
    let smoothed = centered_rolling_mean(&means, INFLATION_SMOOTHING_WINDOW);

    let mut baseline = f32::MIN;
    let mut baseline_month = months[0];
    for (month, mean) in months.iter().zip(&smoothed) {
        if *mean > baseline {
            baseline = *mean;
            baseline_month = *month;
        }
    }
    tracing::info!(
        "inflation baseline {}-{:02}, mean {:.2}",
        baseline_month.0,
        baseline_month.1,
        baseline
    );

    let factors: HashMap<(i32, u32), f32> = months
        .iter()
        .zip(&smoothed)
        .map(|(month, mean)| {
            let factor = if *mean > 0.0 { baseline / mean } else { 1.0 };
            (*month, factor)
        })
        .collect();

    let posts = dataset
        .posts
        .into_iter()
        .map(|mut post| {
            let key = (post.timestamp_utc.year(), post.timestamp_utc.month());
            post.metric *= factors.get(&key).copied().unwrap_or(1.0);
            post
        })
        .collect();
    Dataset::new(posts)
}

/// Apply the tag filters sequentially; each is an independent, cumulative
/// case-insensitive substring check over the pipe-joined tag string.
fn apply_tag_filters(mut dataset: Dataset, filters: &[String]) -> Dataset {
    for filter in filters {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let before = dataset.len();
        dataset.posts.retain(|p| p.joined_tags().contains(&needle));
        tracing::info!(
            "filtered out {} posts not containing '{}'",
            before - dataset.len(),
            needle
        );
    }
    dataset
}

/// Case-insensitive exact subreddit match
fn filter_subreddit(mut dataset: Dataset, subreddit: &str) -> Dataset {
    let needle = subreddit.to_lowercase();
    let before = dataset.len();
    dataset
        .posts
        .retain(|p| p.subreddit.to_lowercase() == needle);
    tracing::info!(
        "filtered out {} posts from other subreddits",
        before - dataset.len()
    );
    dataset
}

/// Drop posts within 14 days of the latest remaining post. Guards against
/// observation bias: very recent posts have not finished accumulating
/// upvotes.
fn drop_recent(mut dataset: Dataset) -> Dataset {
    let Some(latest) = dataset.posts.iter().map(|p| p.timestamp_local).max() else {
        return dataset;
    };
    let cutoff = latest - Duration::days(RECENCY_EXCLUSION_DAYS);
    let before = dataset.len();
    dataset.posts.retain(|p| p.timestamp_local < cutoff);
    tracing::info!(
        "filtered out {} posts within {} days of the latest post",
        before - dataset.len(),
        RECENCY_EXCLUSION_DAYS
    );
    dataset
}

/// Drop subreddits with fewer than 3 remaining posts. Only triggered when
/// more than one subreddit remains; a subreddit-level comparison needs the
/// others as an out-group.
fn drop_small_subreddits(mut dataset: Dataset) -> Dataset {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for post in &dataset.posts {
        *counts.entry(post.subreddit.as_str()).or_default() += 1;
    }
    if counts.len() <= 1 {
        return dataset;
    }
    let keep: std::collections::HashSet<String> = counts
        .into_iter()
        .filter(|(_, n)| *n >= MIN_SUBREDDIT_POSTS)
        .map(|(s, _)| s.to_string())
        .collect();
    let before = dataset.len();
    dataset.posts.retain(|p| keep.contains(&p.subreddit));
    if dataset.len() < before {
        tracing::info!(
            "filtered out subreddits with fewer than {} posts ({} -> {})",
            MIN_SUBREDDIT_POSTS,
            before,
            dataset.len()
        );
    }
    dataset
}

/// Drop posts older than `months * 30` days before the latest remaining post
fn apply_time_cutoff(mut dataset: Dataset, months: u32) -> Dataset {
    let Some(latest) = dataset.posts.iter().map(|p| p.timestamp_local).max() else {
        return dataset;
    };
    let cutoff = latest - Duration::days(30 * i64::from(months));
    let before = dataset.len();
    dataset.posts.retain(|p| p.timestamp_local > cutoff);
    tracing::info!(
        "filtered out {} posts before {} months ago",
        before - dataset.len(),
        months
    );
    dataset
}
