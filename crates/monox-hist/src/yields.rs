//! Yield integration and named yield tables
//!
//! Plots are usually stored width-normalized, so a yield is recovered by
//! multiplying each bin by its width. The final bin is the overflow bin of
//! such plots and holds a raw count; it is added as is.

use crate::histogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Width-weighted yield from `threshold` upward
///
/// Starts at the first bin whose lower edge is at or above `threshold`.
/// Returns 0 when no such bin exists.
pub fn integrate_from(hist: &Histogram, threshold: f64) -> f64 {
    match hist.binning().first_bin_from(threshold) {
        Some(start) => weighted_sum(hist, start, hist.n_bins()),
        None => 0.0,
    }
}

/// Width-weighted yield of the bins before the `threshold` start bin
pub fn integrate_below(hist: &Histogram, threshold: f64) -> f64 {
    let end = hist
        .binning()
        .first_bin_from(threshold)
        .unwrap_or(hist.n_bins());
    weighted_sum(hist, 0, end)
}

fn weighted_sum(hist: &Histogram, start: usize, end: usize) -> f64 {
    let last = hist.n_bins() - 1;
    (start..end)
        .map(|i| {
            if i == last {
                hist.content(i)
            } else {
                hist.content(i) * hist.bin_width(i)
            }
        })
        .sum()
}

/// Named yields, kept in name order for stable reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YieldTable {
    yields: BTreeMap<String, f64>,
}

impl YieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `value` under `name`
    pub fn add(&mut self, name: impl Into<String>, value: f64) {
        *self.yields.entry(name.into()).or_insert(0.0) += value;
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.yields.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.yields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.yields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.yields.is_empty()
    }

    /// Sum of every entry
    pub fn total(&self) -> f64 {
        self.yields.values().sum()
    }
}

impl fmt::Display for YieldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.yields {
            writeln!(f, "{:<16} {:>12.3}", name, value)?;
        }
        Ok(())
    }
}
