//! CLI argument parsing for tagdiff

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::segment::Dimension;

/// Output format for segment results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text table (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

/// Segmentation dimension selector
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DimensionArg {
    /// UTC hour-of-day blocks, labeled in local time
    Hour,
    /// Local day of week
    Day,
    /// One segment per subreddit
    Subreddit,
    /// Frequent tags vs the rest
    Tag,
    /// Exact number of tags on a post
    TagCount,
    /// Audio runtime blocks in minutes
    Duration,
    /// Script length blocks in words
    Words,
}

#[derive(Parser, Debug)]
#[command(name = "tagdiff")]
#[command(version)]
#[command(about = "Segmented comparative statistics for tagged post archives", long_about = None)]
pub struct Cli {
    /// CSV archives to analyze
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Only analyze posts from this subreddit (case-insensitive exact match)
    #[arg(short = 's', long = "subreddit", value_name = "NAME")]
    pub subreddit: Option<String>,

    /// Only analyze posts whose tags contain TAG; repeatable, cumulative
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Drop posts older than N months (30-day months) before the latest post
    #[arg(short = 'm', long = "months", value_name = "N")]
    pub months: Option<u32>,

    /// Rescale the metric so every subreddit's mean matches the highest one
    #[arg(long = "normalize-subreddits")]
    pub normalize_subreddits: bool,

    /// Rescale the metric against upvote inflation (needs >= 1000 posts)
    #[arg(long = "adjust-inflation")]
    pub adjust_inflation: bool,

    /// Confidence level for intervals and significance, in (0, 1)
    #[arg(long = "confidence", value_name = "LEVEL", default_value = "0.95")]
    pub confidence: f32,

    /// Segment along one dimension instead of running the full suite
    #[arg(long = "dimension", value_enum, value_name = "DIM")]
    pub dimension: Option<DimensionArg>,

    /// Hour block width for the hour dimension (must divide 24)
    #[arg(long = "hour-block", value_name = "N", default_value = "1")]
    pub hour_block: u32,

    /// Block width in minutes for the duration dimension
    #[arg(long = "duration-block", value_name = "MIN", default_value = "3")]
    pub duration_block: u32,

    /// Block width in words for the script-length dimension
    #[arg(long = "word-block", value_name = "WORDS", default_value = "1000")]
    pub word_block: u32,

    /// Cap the tag dimension to the N most frequent compared tags
    #[arg(long = "top-tags", value_name = "N", default_value = "10")]
    pub top_tags: usize,

    /// Print the N best and N worst tags by mean difference
    #[arg(long = "best-worst", value_name = "N")]
    pub best_worst: Option<usize>,

    /// Run the hour segmentation separately for each day of the week
    #[arg(long = "hours-by-day")]
    pub hours_by_day: bool,

    /// Compare posts with TAG against posts without it
    #[arg(long = "compare-tag", value_name = "TAG")]
    pub compare_tag: Option<String>,

    /// Compare posts in SUB against posts elsewhere
    #[arg(long = "compare-subreddit", value_name = "SUB")]
    pub compare_subreddit: Option<String>,

    /// Compare posts in a local-hour window against posts at other times
    #[arg(long = "compare-hour", value_name = "HOUR")]
    pub compare_hour: Option<u32>,

    /// Window width in hours for --compare-hour
    #[arg(long = "span-hours", value_name = "N", default_value = "1")]
    pub span_hours: u32,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose tracing to stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// The requested dimension with its parameters, if one was selected
    pub fn to_dimension(&self) -> Option<Dimension> {
        self.dimension.map(|arg| match arg {
            DimensionArg::Hour => Dimension::Hour {
                block: self.hour_block,
            },
            DimensionArg::Day => Dimension::Day,
            DimensionArg::Subreddit => Dimension::Subreddit,
            DimensionArg::Tag => Dimension::Tag {
                top: Some(self.top_tags),
            },
            DimensionArg::TagCount => Dimension::TagCount,
            DimensionArg::Duration => Dimension::DurationBlock {
                minutes: self.duration_block,
            },
            DimensionArg::Words => Dimension::WordCountBlock {
                words: self.word_block,
            },
        })
    }
}
