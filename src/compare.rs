//! Two-sample mean-difference comparison
//!
//! One procedure, applied repeatedly over domain-specific partitions: the
//! mean difference between an in-group and an out-of-group, with a
//! confidence interval and a Welch-style significance test.
//!
//! - Uses aprender's independent t-test (unequal-variance variant) for the
//!   test statistic and p-value
//! - Uses trueno::Vector for the vector statistics (mean, variance)
//! - Uses statrs' Student-t quantile for the interval's critical value
//!
//! The critical value deliberately uses df = min(n1, n2) - 1 rather than the
//! full Welch-Satterthwaite df. Known approximation, kept for parity with
//! the archives this engine was validated against.

use statrs::distribution::{ContinuousCDF, StudentsT};
use trueno::Vector;

/// Result of comparing one metric between two independent groups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// mean(in-group) - mean(out-of-group)
    pub mean_difference: f32,
    pub ci_low: f32,
    pub ci_high: f32,
    /// Two-tailed p-value from the unequal-variance t-test
    pub p_value: f32,
    pub t_statistic: f32,
}

impl Comparison {
    /// A segment is significant iff its p-value falls below `1 - confidence`
    pub fn is_significant(&self, confidence: f32) -> bool {
        self.p_value < 1.0 - confidence
    }
}

/// Standard error of the mean, using the unbiased sample standard deviation.
///
/// trueno's `variance()` is the population variance; rescale by n/(n-1).
/// Caller guarantees `values.len() >= 2`.
fn standard_error(values: &[f32]) -> f32 {
    let n = values.len() as f32;
    let pop_var = Vector::from_slice(values).variance().unwrap_or(0.0);
    let sample_var = pop_var * n / (n - 1.0);
    (sample_var / n).sqrt()
}

/// Two-tailed Student-t critical value at `confidence` with `df` degrees of freedom
fn t_critical(confidence: f32, df: usize) -> Option<f32> {
    let dist = StudentsT::new(0.0, 1.0, df as f64).ok()?;
    let quantile = dist.inverse_cdf((1.0 + f64::from(confidence)) / 2.0);
    Some(quantile as f32)
}

/// Compare the metric between two independent groups.
///
/// Non-finite samples are omitted. Returns `None` when either side has fewer
/// than 2 valid values - the comparison is undeterminable, which callers
/// must never conflate with a zero difference.
pub fn compare(group_a: &[f32], group_b: &[f32], confidence: f32) -> Option<Comparison> {
    let a: Vec<f32> = group_a.iter().copied().filter(|v| v.is_finite()).collect();
    let b: Vec<f32> = group_b.iter().copied().filter(|v| v.is_finite()).collect();
    if a.len() < 2 || b.len() < 2 {
        return None;
    }

    let mean_a = Vector::from_slice(&a).mean().unwrap_or(f32::NAN);
    let mean_b = Vector::from_slice(&b).mean().unwrap_or(f32::NAN);
    if !mean_a.is_finite() || !mean_b.is_finite() {
        return None;
    }
    let mean_difference = mean_a - mean_b;

    let se_diff = (standard_error(&a).powi(2) + standard_error(&b).powi(2)).sqrt();
    let df = a.len().min(b.len()) - 1;
    let t_crit = t_critical(confidence, df)?;
    let ci_low = mean_difference - t_crit * se_diff;
    let ci_high = mean_difference + t_crit * se_diff;

    let test = match aprender::stats::hypothesis::ttest_ind(&a, &b, false) {
        Ok(test) => test,
        Err(e) => {
            tracing::warn!("two-sample t-test failed: {}", e);
            return None;
        }
    };

    Some(Comparison {
        mean_difference,
        ci_low,
        ci_high,
        p_value: test.pvalue,
        t_statistic: test.statistic,
    })
}
