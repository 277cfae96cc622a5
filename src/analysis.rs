//! Single ad-hoc comparison
//!
//! Answers one question ("do posts with this tag / in this subreddit / in
//! this hour window get more upvotes?") with group sizes and a
//! human-readable summary, instead of sweeping a whole dimension.

use std::collections::HashMap;

use chrono::{Local, Offset};
use trueno::Vector;

use crate::canonicalize::Dataset;
use crate::compare::{compare, Comparison};
use crate::error::{Error, Result};
use crate::post::Post;
use crate::segment::hour_in_block;

/// What a single comparison partitions on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonTarget {
    /// Posts whose tag string contains the value vs the rest
    Tag(String),
    /// Posts whose subreddit contains the value vs the rest
    Subreddit(String),
    /// Posts inside a viewer-local hour window vs the rest
    LocalHour { hour: u32, span_hours: u32 },
}

/// Result of one ad-hoc comparison
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub label: String,
    pub in_count: usize,
    pub out_count: usize,
    pub comparison: Option<Comparison>,
    /// Presentation-ready interpretation: group sizes, split, significance
    pub summary: String,
}

/// Collapse duplicate titles, averaging the metric and keeping first-seen
/// fields. Cross-posted titles would otherwise count once per subreddit.
fn collapse_titles(dataset: &Dataset) -> Vec<Post> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut collapsed: Vec<(Post, Vec<f32>)> = Vec::new();
    for post in dataset.posts() {
        match index.get(&post.title) {
            Some(&at) => collapsed[at].1.push(post.metric),
            None => {
                index.insert(post.title.clone(), collapsed.len());
                collapsed.push((post.clone(), vec![post.metric]));
            }
        }
    }
    let before = dataset.len();
    let posts: Vec<Post> = collapsed
        .into_iter()
        .map(|(mut post, metrics)| {
            post.metric = Vector::from_slice(&metrics).mean().unwrap_or(post.metric);
            post
        })
        .collect();
    tracing::info!(
        "collapsed {} duplicate titles ({} -> {})",
        before - posts.len(),
        before,
        posts.len()
    );
    posts
}

/// The viewer-local hour expressed as a UTC hour, using the current offset
fn local_hour_to_utc(local_hour: u32) -> u32 {
    let offset_hours = Local::now().offset().fix().local_minus_utc() / 3600;
    (i64::from(local_hour) - i64::from(offset_hours)).rem_euclid(24) as u32
}

/// Run one comparison against the canonical dataset.
pub fn compare_single(
    dataset: &Dataset,
    target: &ComparisonTarget,
    confidence: f32,
) -> Result<ComparisonReport> {
    if confidence <= 0.0 || confidence >= 1.0 {
        return Err(Error::InvalidConfidence(confidence));
    }
    let (label, in_group, out_group, opening) = match target {
        ComparisonTarget::Tag(value) => {
            let needle = value.trim().to_lowercase();
            let posts = collapse_titles(dataset);
            let (in_g, out_g): (Vec<&Post>, Vec<&Post>) =
                posts.iter().partition(|p| p.joined_tags().contains(&needle));
            let total = posts.len();
            let opening = format!(
                "You have made {} posts with '{}' and {} posts without '{}' ({:.2}%, total posts = {}).",
                in_g.len(),
                needle,
                out_g.len(),
                needle,
                in_g.len() as f32 / total.max(1) as f32 * 100.0,
                total
            );
            (
                needle,
                in_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                out_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                opening,
            )
        }
        ComparisonTarget::Subreddit(value) => {
            let needle = value.trim().to_lowercase();
            let posts = collapse_titles(dataset);
            let (in_g, out_g): (Vec<&Post>, Vec<&Post>) = posts
                .iter()
                .partition(|p| p.subreddit.to_lowercase().contains(&needle));
            let opening = format!(
                "You have made {} posts in '{}' and {} posts in other subreddits.",
                in_g.len(),
                needle,
                out_g.len()
            );
            (
                needle,
                in_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                out_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                opening,
            )
        }
        ComparisonTarget::LocalHour { hour, span_hours } => {
            let start_utc = local_hour_to_utc(*hour);
            let (in_g, out_g): (Vec<&Post>, Vec<&Post>) = dataset
                .posts()
                .iter()
                .partition(|p| hour_in_block(p.hour_utc, start_utc, *span_hours));
            let end_utc = (start_utc + span_hours) % 24;
            let opening = format!(
                "You have made {} posts between {}:00 and {}:00 UTC, and {} posts at other times.",
                in_g.len(),
                start_utc,
                end_utc,
                out_g.len()
            );
            (
                format!("{start_utc}:00-{end_utc}:00 UTC"),
                in_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                out_g.iter().map(|p| p.metric).collect::<Vec<f32>>(),
                opening,
            )
        }
    };

    let comparison = compare(&in_group, &out_group, confidence);
    let interpretation = match &comparison {
        Some(c) => format!(
            "There is a {} difference in upvotes.\nMean difference: {:.2} (CI: {:.2} to {:.2}).\nT-statistic: {:.2}, P-value: {:.4}",
            if c.is_significant(confidence) {
                "significant"
            } else {
                "not significant"
            },
            c.mean_difference,
            c.ci_low,
            c.ci_high,
            c.t_statistic,
            c.p_value
        ),
        None => "The comparison is undeterminable: one of the groups has too few posts.".to_string(),
    };
    let summary = format!("{opening}\n{interpretation}");

    Ok(ComparisonReport {
        label,
        in_count: in_group.len(),
        out_count: out_group.len(),
        comparison,
        summary,
    })
}
