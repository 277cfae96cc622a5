//! Ranking and renderer-safe formatting of segment results

use serde::Serialize;

use crate::canonicalize::Dataset;
use crate::compare::Comparison;
use crate::error::Result;
use crate::segment::{segment, Dimension, SegmentOutcome, SegmentRow};

/// A tag with a computed comparison, for best/worst ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTag {
    pub label: String,
    pub comparison: Comparison,
}

/// Best and worst tags by mean difference.
///
/// Runs the full tag segmentation (uncapped), drops undeterminable segments,
/// and takes the `n` highest and `n` lowest mean differences. The worst list
/// is reversed so both lists read most-extreme-outward when shown side by
/// side.
pub fn top_and_worst_tags(
    dataset: &Dataset,
    confidence: f32,
    n: usize,
) -> Result<(Vec<RankedTag>, Vec<RankedTag>)> {
    let rows = segment(dataset, &Dimension::Tag { top: None }, confidence)?;
    let mut ranked: Vec<RankedTag> = rows
        .into_iter()
        .filter_map(|row| {
            row.outcome.comparison().map(|c| RankedTag {
                label: row.label.clone(),
                comparison: *c,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.comparison
            .mean_difference
            .total_cmp(&a.comparison.mean_difference)
    });
    let best: Vec<RankedTag> = ranked.iter().take(n).cloned().collect();
    let mut worst: Vec<RankedTag> = ranked.iter().rev().take(n).cloned().collect();
    worst.reverse();
    Ok((best, worst))
}

/// A presentation-ready segment row.
///
/// Downstream renderers are never handed an undeterminable value: an
/// insufficient segment becomes a zero-height, zero-interval, non-significant
/// bar at its candidate position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRow {
    pub label: String,
    pub mean_difference: f32,
    pub ci_low: f32,
    pub ci_high: f32,
    pub significant: bool,
}

impl RenderRow {
    pub fn from_segment(row: &SegmentRow, confidence: f32) -> Self {
        match &row.outcome {
            SegmentOutcome::Compared(c) => Self {
                label: row.label.clone(),
                mean_difference: c.mean_difference,
                ci_low: c.ci_low,
                ci_high: c.ci_high,
                significant: c.is_significant(confidence),
            },
            SegmentOutcome::InsufficientSample => Self {
                label: row.label.clone(),
                mean_difference: 0.0,
                ci_low: 0.0,
                ci_high: 0.0,
                significant: false,
            },
        }
    }

    pub fn from_ranked(tag: &RankedTag, confidence: f32) -> Self {
        Self {
            label: tag.label.clone(),
            mean_difference: tag.comparison.mean_difference,
            ci_low: tag.comparison.ci_low,
            ci_high: tag.comparison.ci_high,
            significant: tag.comparison.is_significant(confidence),
        }
    }
}

/// Map segment rows into presentation rows, preserving order
pub fn render_rows(rows: &[SegmentRow], confidence: f32) -> Vec<RenderRow> {
    rows.iter()
        .map(|row| RenderRow::from_segment(row, confidence))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(mean_difference: f32, p_value: f32) -> Comparison {
        Comparison {
            mean_difference,
            ci_low: mean_difference - 1.0,
            ci_high: mean_difference + 1.0,
            p_value,
            t_statistic: 2.0,
        }
    }

    #[test]
    fn test_render_row_from_compared() {
        let row = SegmentRow {
            label: "alpha".to_string(),
            outcome: SegmentOutcome::Compared(comparison(5.0, 0.01)),
        };
        let render = RenderRow::from_segment(&row, 0.95);
        assert_eq!(render.mean_difference, 5.0);
        assert_eq!(render.ci_low, 4.0);
        assert!(render.significant);
    }

    #[test]
    fn test_render_row_insufficient_is_zeroed() {
        let row = SegmentRow {
            label: "3 AM".to_string(),
            outcome: SegmentOutcome::InsufficientSample,
        };
        let render = RenderRow::from_segment(&row, 0.95);
        assert_eq!(render.mean_difference, 0.0);
        assert_eq!((render.ci_low, render.ci_high), (0.0, 0.0));
        assert!(!render.significant);
    }

    #[test]
    fn test_render_row_significance_depends_on_confidence() {
        let row = SegmentRow {
            label: "alpha".to_string(),
            outcome: SegmentOutcome::Compared(comparison(5.0, 0.03)),
        };
        assert!(RenderRow::from_segment(&row, 0.95).significant);
        assert!(!RenderRow::from_segment(&row, 0.99).significant);
    }

    #[test]
    fn test_render_rows_preserve_order() {
        let rows = vec![
            SegmentRow {
                label: "b".to_string(),
                outcome: SegmentOutcome::InsufficientSample,
            },
            SegmentRow {
                label: "a".to_string(),
                outcome: SegmentOutcome::Compared(comparison(1.0, 0.5)),
            },
        ];
        let rendered = render_rows(&rows, 0.95);
        assert_eq!(rendered[0].label, "b");
        assert_eq!(rendered[1].label, "a");
    }
}
