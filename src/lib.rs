//! tagdiff - Segmented comparative statistics for tagged post archives
//!
//! This library canonicalizes scraped social-media post archives into a
//! de-duplicated, timezone-aware dataset, partitions it along a requested
//! dimension (tag, subreddit, hour of day, day of week, duration block,
//! tag count), and computes a mean-difference estimate with confidence
//! interval and significance flag for each partition.

pub mod analysis;
pub mod canonicalize;
pub mod cli;
pub mod compare;
pub mod error;
pub mod loader;
pub mod output;
pub mod post;
pub mod rank;
pub mod segment;
