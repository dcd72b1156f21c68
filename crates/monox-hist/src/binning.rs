//! Bin edges for one-dimensional histograms
//!
//! A [`Binning`] is an immutable, strictly increasing list of N+1 edges
//! defining N half-open bins `[low, high)`. The last bin can be turned into an
//! overflow bin that collects every value at or above the last declared edge.

use crate::error::{HistError, HistResult};
use serde::{Deserialize, Serialize};

/// Relative tolerance used to detect uniform spacing
const UNIFORM_TOLERANCE: f64 = 1e-9;

/// Validated bin edges
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BinningRepr", into = "BinningRepr")]
pub struct Binning {
    /// Effective edges, including the extra edge of the overflow bin
    edges: Vec<f64>,
    /// Whether the last bin collects everything above the declared range
    overflow: bool,
    /// (low, width) when all bins share one width
    uniform: Option<(f64, f64)>,
}

/// Serialized form of a binning
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinningRepr {
    edges: Vec<f64>,
    #[serde(default)]
    overflow: bool,
}

impl TryFrom<BinningRepr> for Binning {
    type Error = HistError;

    fn try_from(repr: BinningRepr) -> HistResult<Self> {
        let mut binning = Binning::new(repr.edges)?;
        if repr.overflow {
            if binning.n_bins() < 2 {
                return Err(HistError::InvalidEdges(
                    "overflow binning needs at least two bins".to_string(),
                ));
            }
            binning.overflow = true;
        }
        Ok(binning)
    }
}

impl From<Binning> for BinningRepr {
    fn from(binning: Binning) -> Self {
        Self {
            edges: binning.edges,
            overflow: binning.overflow,
        }
    }
}

impl PartialEq for Binning {
    fn eq(&self, other: &Self) -> bool {
        self.overflow == other.overflow && self.edges == other.edges
    }
}

impl Binning {
    /// Create a binning from explicit edges
    ///
    /// Fails with [`HistError::InvalidEdges`] when fewer than two edges are
    /// given, when an edge is not finite, or when the edges are not strictly
    /// increasing.
    pub fn new(edges: Vec<f64>) -> HistResult<Self> {
        if edges.len() < 2 {
            return Err(HistError::InvalidEdges(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(HistError::InvalidEdges(format!("non-finite edge {}", bad)));
        }
        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(HistError::InvalidEdges(format!(
                "edges not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }

        let uniform = detect_uniform(&edges);
        Ok(Self {
            edges,
            overflow: false,
            uniform,
        })
    }

    /// Create `n` equal-width bins spanning `[low, high)`
    pub fn uniform(n: usize, low: f64, high: f64) -> HistResult<Self> {
        if n == 0 {
            return Err(HistError::InvalidEdges("uniform binning needs n > 0".to_string()));
        }
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(HistError::InvalidEdges(format!(
                "invalid uniform range [{}, {})",
                low, high
            )));
        }

        let width = (high - low) / n as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| low + width * i as f64).collect();
        edges.push(high);

        let mut binning = Self::new(edges)?;
        binning.uniform = Some((low, width));
        Ok(binning)
    }

    /// Append an overflow bin
    ///
    /// The new bin has the width of the first bin and starts at the last
    /// declared edge. Every value at or above that edge is collected there.
    /// Calling this on a binning that already has an overflow bin is a no-op.
    pub fn with_overflow(mut self) -> Self {
        if self.overflow {
            return self;
        }
        let first_width = self.edges[1] - self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        self.edges.push(last + first_width);
        self.overflow = true;
        self.uniform = detect_uniform(&self.edges);
        self
    }

    /// All edges, including the upper edge of the overflow bin if present
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins (including the overflow bin)
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Whether the last bin is an overflow bin
    pub fn has_overflow(&self) -> bool {
        self.overflow
    }

    /// Index of the overflow bin, if any
    pub fn overflow_bin(&self) -> Option<usize> {
        self.overflow.then(|| self.n_bins() - 1)
    }

    /// Upper edge of the declared range (where overflow starts)
    pub fn upper_limit(&self) -> f64 {
        if self.overflow {
            self.edges[self.edges.len() - 2]
        } else {
            self.edges[self.edges.len() - 1]
        }
    }

    /// Lower edge of the declared range
    pub fn lower_limit(&self) -> f64 {
        self.edges[0]
    }

    /// Lower edge of bin `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_bins()`.
    pub fn low_edge(&self, i: usize) -> f64 {
        assert!(i < self.n_bins(), "bin {} out of range", i);
        self.edges[i]
    }

    /// Upper edge of bin `i`
    pub fn high_edge(&self, i: usize) -> f64 {
        assert!(i < self.n_bins(), "bin {} out of range", i);
        self.edges[i + 1]
    }

    /// Width of bin `i`
    pub fn width(&self, i: usize) -> f64 {
        self.high_edge(i) - self.low_edge(i)
    }

    /// Center of bin `i`
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.high_edge(i) + self.low_edge(i))
    }

    /// Whether all bins have the same width
    pub fn is_uniform(&self) -> bool {
        self.uniform.is_some()
    }

    /// Locate the bin holding `x`
    ///
    /// Returns `None` for NaN, for values below the first edge, and for values
    /// at or above the last edge when there is no overflow bin.
    /// Time complexity: O(1) for uniform binning, O(log n) otherwise.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() || x < self.edges[0] {
            return None;
        }
        if x >= self.upper_limit() {
            return self.overflow_bin();
        }

        let n = self.n_bins();
        match self.uniform {
            Some((low, width)) => {
                let mut idx = (((x - low) / width).floor() as usize).min(n - 1);
                // Correct for rounding right at an edge
                while idx > 0 && x < self.edges[idx] {
                    idx -= 1;
                }
                while idx + 1 < n && x >= self.edges[idx + 1] {
                    idx += 1;
                }
                Some(idx)
            }
            None => Some(self.edges.partition_point(|e| *e <= x) - 1),
        }
    }

    /// Index of the first bin whose lower edge is at or above `threshold`
    pub fn first_bin_from(&self, threshold: f64) -> Option<usize> {
        (0..self.n_bins()).find(|&i| self.edges[i] >= threshold)
    }
}

fn detect_uniform(edges: &[f64]) -> Option<(f64, f64)> {
    let width = edges[1] - edges[0];
    let uniform = edges
        .windows(2)
        .all(|w| ((w[1] - w[0]) - width).abs() <= UNIFORM_TOLERANCE * width.abs());
    uniform.then_some((edges[0], width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_decreasing_edges() {
        let err = Binning::new(vec![10.0, 5.0, 20.0]).unwrap_err();
        assert!(matches!(err, HistError::InvalidEdges(_)));
    }

    #[test]
    fn test_rejects_short_edges() {
        assert!(Binning::new(vec![1.0]).is_err());
        assert!(Binning::new(vec![]).is_err());
        assert!(Binning::new(vec![0.0, f64::NAN]).is_err());
        assert!(Binning::new(vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn test_uniform_edges() {
        let binning = Binning::uniform(4, 0.0, 40.0).unwrap();
        assert_eq!(binning.edges(), &[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert!(binning.is_uniform());
        assert!(Binning::uniform(0, 0.0, 1.0).is_err());
        assert!(Binning::uniform(3, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_find_bin_variable() {
        let binning = Binning::new(vec![200.0, 250.0, 300.0, 400.0, 1000.0]).unwrap();
        assert!(!binning.is_uniform());
        assert_eq!(binning.find_bin(199.9), None);
        assert_eq!(binning.find_bin(200.0), Some(0));
        assert_eq!(binning.find_bin(250.0), Some(1));
        assert_eq!(binning.find_bin(999.0), Some(3));
        assert_eq!(binning.find_bin(1000.0), None);
        assert_eq!(binning.find_bin(f64::NAN), None);
    }

    #[test]
    fn test_find_bin_uniform_edges_exact() {
        let binning = Binning::uniform(20, -1.5, 1.5).unwrap();
        for i in 0..20 {
            let low = binning.low_edge(i);
            assert_eq!(binning.find_bin(low), Some(i), "edge {}", low);
        }
        assert_eq!(binning.find_bin(1.5), None);
    }

    #[test]
    fn test_overflow_bin() {
        let binning = Binning::new(vec![0.0, 10.0, 20.0]).unwrap().with_overflow();
        assert_eq!(binning.n_bins(), 3);
        assert_eq!(binning.edges(), &[0.0, 10.0, 20.0, 30.0]);
        assert_eq!(binning.upper_limit(), 20.0);
        assert_eq!(binning.overflow_bin(), Some(2));
        assert_eq!(binning.find_bin(25.0), Some(2));
        assert_eq!(binning.find_bin(1e6), Some(2));
        assert_eq!(binning.find_bin(-1.0), None);

        // idempotent
        let again = binning.clone().with_overflow();
        assert_eq!(again, binning);
    }

    #[test]
    fn test_first_bin_from() {
        let binning = Binning::new(vec![0.0, 10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(binning.first_bin_from(20.0), Some(2));
        assert_eq!(binning.first_bin_from(15.0), Some(2));
        assert_eq!(binning.first_bin_from(-5.0), Some(0));
        assert_eq!(binning.first_bin_from(35.0), None);
    }

    #[test]
    fn test_serde_validates() {
        let binning = Binning::new(vec![0.0, 1.0, 3.0]).unwrap().with_overflow();
        let json = serde_json::to_string(&binning).unwrap();
        let back: Binning = serde_json::from_str(&json).unwrap();
        assert_eq!(back, binning);

        let bad = r#"{"edges":[3.0,1.0],"overflow":false}"#;
        assert!(serde_json::from_str::<Binning>(bad).is_err());
    }
}
