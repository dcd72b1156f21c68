//! Weighted one-dimensional histogram
//!
//! Each bin keeps the sum of weights (`content`) and the sum of squared
//! weights (`variance`), which is the statistical variance of the bin under
//! weighted filling.

use crate::binning::Binning;
use crate::error::{HistError, HistResult};
use serde::{Deserialize, Serialize};

/// How to turn bin contents into densities for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthNormalization {
    /// Divide by the bin width (events per unit)
    PerUnit,
    /// Divide by the bin width relative to the first bin's width
    RelativeToFirst,
}

/// A binned accumulator of weighted observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramRepr")]
pub struct Histogram {
    binning: Binning,
    content: Vec<f64>,
    variance: Vec<f64>,
    entries: u64,
    normalization: Option<WidthNormalization>,
}

#[derive(Deserialize)]
struct HistogramRepr {
    binning: Binning,
    content: Vec<f64>,
    variance: Vec<f64>,
    #[serde(default)]
    entries: u64,
    #[serde(default)]
    normalization: Option<WidthNormalization>,
}

impl TryFrom<HistogramRepr> for Histogram {
    type Error = HistError;

    fn try_from(repr: HistogramRepr) -> HistResult<Self> {
        let mut hist = Histogram::from_parts(repr.binning, repr.content, repr.variance)?;
        hist.entries = repr.entries;
        hist.normalization = repr.normalization;
        Ok(hist)
    }
}

impl Histogram {
    /// Create an empty histogram
    pub fn new(binning: Binning) -> Self {
        let n = binning.n_bins();
        Self {
            binning,
            content: vec![0.0; n],
            variance: vec![0.0; n],
            entries: 0,
            normalization: None,
        }
    }

    /// Create an empty histogram from explicit edges
    pub fn from_edges(edges: Vec<f64>) -> HistResult<Self> {
        Ok(Self::new(Binning::new(edges)?))
    }

    /// Build a histogram from precomputed contents and variances
    pub fn from_parts(binning: Binning, content: Vec<f64>, variance: Vec<f64>) -> HistResult<Self> {
        let n = binning.n_bins();
        for len in [content.len(), variance.len()] {
            if len != n {
                return Err(HistError::LengthMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        Ok(Self {
            binning,
            content,
            variance,
            entries: 0,
            normalization: None,
        })
    }

    /// Create an empty histogram with the same binning
    pub fn empty_like(&self) -> Self {
        Self::new(self.binning.clone())
    }

    /// The binning
    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    /// Number of bins
    pub fn n_bins(&self) -> usize {
        self.content.len()
    }

    /// Number of accepted fills
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of weights in bin `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_bins()`.
    pub fn content(&self, i: usize) -> f64 {
        self.content[i]
    }

    /// Sum of squared weights in bin `i`
    pub fn variance(&self, i: usize) -> f64 {
        self.variance[i]
    }

    /// Statistical error of bin `i`
    pub fn error(&self, i: usize) -> f64 {
        self.variance[i].sqrt()
    }

    /// All bin contents
    pub fn contents(&self) -> &[f64] {
        &self.content
    }

    /// All bin variances
    pub fn variances(&self) -> &[f64] {
        &self.variance
    }

    /// Width of bin `i`
    pub fn bin_width(&self, i: usize) -> f64 {
        self.binning.width(i)
    }

    /// Lower edge of bin `i`
    pub fn bin_low_edge(&self, i: usize) -> f64 {
        self.binning.low_edge(i)
    }

    /// Locate the bin holding `x`
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        self.binning.find_bin(x)
    }

    /// Width normalization applied so far, if any
    pub fn normalization(&self) -> Option<WidthNormalization> {
        self.normalization
    }

    /// Overwrite one bin
    pub fn set_bin(&mut self, i: usize, content: f64, variance: f64) -> HistResult<()> {
        self.check_bin(i)?;
        self.content[i] = content;
        self.variance[i] = variance;
        Ok(())
    }

    /// Overwrite the variance of one bin
    pub fn set_variance(&mut self, i: usize, variance: f64) -> HistResult<()> {
        self.check_bin(i)?;
        self.variance[i] = variance;
        Ok(())
    }

    pub(crate) fn variances_mut(&mut self) -> &mut [f64] {
        &mut self.variance
    }

    /// Fill one weighted observation
    ///
    /// Returns whether the value landed in a bin. Values below the first
    /// edge, NaN values, and values past the last edge without an overflow
    /// bin are dropped.
    pub fn fill(&mut self, value: f64, weight: f64) -> bool {
        match self.binning.find_bin(value) {
            Some(bin) => {
                self.content[bin] += weight;
                self.variance[bin] += weight * weight;
                self.entries += 1;
                true
            }
            None => false,
        }
    }

    /// Fill a stream of `(value, weight)` observations
    ///
    /// Returns the number of accepted observations.
    pub fn fill_all<I>(&mut self, observations: I) -> usize
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        observations
            .into_iter()
            .filter(|&(value, weight)| self.fill(value, weight))
            .count()
    }

    /// Add another histogram bin by bin
    pub fn add(&mut self, other: &Histogram) -> HistResult<()> {
        self.add_scaled(other, 1.0)
    }

    /// Add `scale * other` bin by bin
    ///
    /// Variances add as `scale^2 * other.variance`. Fails with
    /// [`HistError::IncompatibleBinning`] unless both histograms have the same
    /// edges and the same width normalization.
    pub fn add_scaled(&mut self, other: &Histogram, scale: f64) -> HistResult<()> {
        self.check_compatible(other)?;
        let s2 = scale * scale;
        for i in 0..self.content.len() {
            self.content[i] += scale * other.content[i];
            self.variance[i] += s2 * other.variance[i];
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Multiply contents by `factor` and variances by `factor^2`
    pub fn scale(&mut self, factor: f64) {
        let f2 = factor * factor;
        for c in &mut self.content {
            *c *= factor;
        }
        for v in &mut self.variance {
            *v *= f2;
        }
    }

    /// Divide by another histogram bin by bin
    ///
    /// Uses uncorrelated error propagation,
    /// `var = (v1 * c2^2 + v2 * c1^2) / c2^4`.
    /// Bins with a zero denominator get content and variance 0.
    pub fn divide(&mut self, other: &Histogram) -> HistResult<()> {
        self.check_compatible(other)?;
        for i in 0..self.content.len() {
            let (c1, v1) = (self.content[i], self.variance[i]);
            let (c2, v2) = (other.content[i], other.variance[i]);
            if c2 == 0.0 {
                self.content[i] = 0.0;
                self.variance[i] = 0.0;
            } else {
                let c2sq = c2 * c2;
                self.content[i] = c1 / c2;
                self.variance[i] = (v1 * c2sq + v2 * c1 * c1) / (c2sq * c2sq);
            }
        }
        Ok(())
    }

    /// Set negative bin contents to zero, leaving variances untouched
    ///
    /// Weighted MC subtraction can produce negative yields that must not be
    /// stacked. Returns the number of bins that were clamped.
    pub fn clamp_non_negative(&mut self) -> usize {
        let mut clamped = 0;
        for c in &mut self.content {
            if *c < 0.0 {
                *c = 0.0;
                clamped += 1;
            }
        }
        clamped
    }

    /// Convert contents to densities for display
    ///
    /// The overflow bin keeps its raw count. This is a display transform and
    /// can only be applied once.
    pub fn normalize_by_width(&mut self, mode: WidthNormalization) -> HistResult<()> {
        if self.normalization.is_some() {
            return Err(HistError::AlreadyNormalized);
        }

        let reference = self.binning.width(0);
        let last_regular = match self.binning.overflow_bin() {
            Some(overflow) => overflow,
            None => self.n_bins(),
        };

        for i in 0..last_regular {
            let w = self.binning.width(i);
            let divisor = match mode {
                WidthNormalization::PerUnit => w,
                WidthNormalization::RelativeToFirst => w / reference,
            };
            self.content[i] /= divisor;
            self.variance[i] /= divisor * divisor;
        }

        self.normalization = Some(mode);
        Ok(())
    }

    /// Sum of all bin contents
    pub fn integral(&self) -> f64 {
        self.content.iter().sum()
    }

    /// Sum of all bin variances
    pub fn integral_variance(&self) -> f64 {
        self.variance.iter().sum()
    }

    fn check_bin(&self, i: usize) -> HistResult<()> {
        if i >= self.content.len() {
            return Err(HistError::BinOutOfRange {
                index: i,
                size: self.content.len(),
            });
        }
        Ok(())
    }

    fn check_compatible(&self, other: &Histogram) -> HistResult<()> {
        if self.binning != other.binning {
            return Err(HistError::IncompatibleBinning(format!(
                "edges {:?} vs {:?}",
                self.binning.edges(),
                other.binning.edges()
            )));
        }
        if self.normalization != other.normalization {
            return Err(HistError::IncompatibleBinning(
                "width normalization differs".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(edges: &[f64], content: &[f64]) -> Histogram {
        let binning = Binning::new(edges.to_vec()).unwrap();
        let variance = content.iter().map(|c| c.abs()).collect();
        Histogram::from_parts(binning, content.to_vec(), variance).unwrap()
    }

    #[test]
    fn test_fill_weights() {
        let mut h = Histogram::from_edges(vec![0.0, 1.0, 2.0]).unwrap();
        assert!(h.fill(0.5, 2.0));
        assert!(h.fill(0.7, 3.0));
        assert!(h.fill(1.5, -1.0));
        assert!(!h.fill(-0.1, 1.0));
        assert!(!h.fill(2.0, 1.0));

        assert_eq!(h.contents(), &[5.0, -1.0]);
        assert_eq!(h.variances(), &[13.0, 1.0]);
        assert_eq!(h.entries(), 3);
    }

    #[test]
    fn test_fill_overflow() {
        let binning = Binning::new(vec![0.0, 10.0, 20.0]).unwrap().with_overflow();
        let mut h = Histogram::new(binning);
        assert_eq!(h.fill_all(vec![(5.0, 1.0), (20.0, 1.0), (500.0, 2.0)]), 3);
        assert_eq!(h.contents(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_add_requires_same_edges() {
        let mut a = hist(&[0.0, 1.0, 2.0], &[1.0, 2.0]);
        let b = hist(&[0.0, 1.0, 3.0], &[1.0, 2.0]);
        assert!(matches!(a.add(&b), Err(HistError::IncompatibleBinning(_))));
        // receiver untouched
        assert_eq!(a.contents(), &[1.0, 2.0]);
    }

    #[test]
    fn test_add_scaled() {
        let mut a = hist(&[0.0, 1.0, 2.0], &[1.0, 2.0]);
        let b = hist(&[0.0, 1.0, 2.0], &[4.0, 8.0]);
        a.add_scaled(&b, 0.5).unwrap();
        assert_eq!(a.contents(), &[3.0, 6.0]);
        assert_eq!(a.variances(), &[2.0, 4.0]);
    }

    #[test]
    fn test_scale() {
        let mut a = hist(&[0.0, 1.0, 2.0], &[1.0, 2.0]);
        a.scale(3.0);
        assert_eq!(a.contents(), &[3.0, 6.0]);
        assert_eq!(a.variances(), &[9.0, 18.0]);
    }

    #[test]
    fn test_divide_zero_denominator() {
        let mut a = hist(&[0.0, 1.0, 2.0], &[4.0, 2.0]);
        let b = hist(&[0.0, 1.0, 2.0], &[2.0, 0.0]);
        a.divide(&b).unwrap();
        assert_eq!(a.content(0), 2.0);
        assert_eq!(a.content(1), 0.0);
        assert_eq!(a.variance(1), 0.0);
        // (4 * 4 + 2 * 16) / 16
        assert!((a.variance(0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_non_negative() {
        let binning = Binning::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut h =
            Histogram::from_parts(binning, vec![-1.0, 2.0, -0.5], vec![1.0, 2.0, 0.25]).unwrap();
        assert_eq!(h.clamp_non_negative(), 2);
        assert_eq!(h.contents(), &[0.0, 2.0, 0.0]);
        assert_eq!(h.variances(), &[1.0, 2.0, 0.25]);
    }

    #[test]
    fn test_normalize_per_unit() {
        let binning = Binning::new(vec![0.0, 10.0, 30.0]).unwrap().with_overflow();
        let mut h =
            Histogram::from_parts(binning, vec![10.0, 40.0, 7.0], vec![100.0, 400.0, 7.0])
                .unwrap();
        h.normalize_by_width(WidthNormalization::PerUnit).unwrap();
        assert_eq!(h.contents(), &[1.0, 2.0, 7.0]);
        assert_eq!(h.variances(), &[1.0, 1.0, 7.0]);
        assert_eq!(
            h.normalize_by_width(WidthNormalization::PerUnit),
            Err(HistError::AlreadyNormalized)
        );
    }

    #[test]
    fn test_normalize_relative_to_first() {
        let mut h = hist(&[0.0, 10.0, 30.0], &[10.0, 40.0]);
        h.normalize_by_width(WidthNormalization::RelativeToFirst)
            .unwrap();
        assert_eq!(h.contents(), &[10.0, 20.0]);
        assert_eq!(h.variances(), &[10.0, 10.0]);
    }

    #[test]
    fn test_from_parts_length_check() {
        let binning = Binning::new(vec![0.0, 1.0, 2.0]).unwrap();
        let err = Histogram::from_parts(binning, vec![1.0], vec![1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            HistError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_set_bin_out_of_range() {
        let mut h = hist(&[0.0, 1.0], &[1.0]);
        assert!(h.set_bin(1, 1.0, 1.0).is_err());
        h.set_bin(0, 5.0, 2.0).unwrap();
        assert_eq!(h.content(0), 5.0);
        assert!((h.error(0) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_json_round_trip_validates() {
        let h = hist(&[0.0, 1.0, 2.0], &[1.0, 2.0]);
        let json = serde_json::to_string(&h).unwrap();
        let back: Histogram = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);

        let bad = r#"{"binning":{"edges":[0.0,1.0]},"content":[1.0,2.0],"variance":[1.0]}"#;
        assert!(serde_json::from_str::<Histogram>(bad).is_err());
    }
}
