//! Bin-by-bin ratios with statistical and systematic uncertainties
//!
//! Ratios are formed with pure statistical error propagation. Systematic
//! uncertainties are attached afterwards by [`apply_systematic_envelope`],
//! which treats external histograms as multiplicative correction factors on
//! the ratio's own content.

use crate::error::{HistError, HistResult};
use crate::histogram::Histogram;
use serde::{Deserialize, Serialize};

/// Result of dividing two histograms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RatioRepr")]
pub struct Ratio {
    hist: Histogram,
    /// Propagated statistical variance, before any envelope
    stat_variance: Vec<f64>,
}

#[derive(Deserialize)]
struct RatioRepr {
    hist: Histogram,
    stat_variance: Vec<f64>,
}

impl TryFrom<RatioRepr> for Ratio {
    type Error = HistError;

    fn try_from(repr: RatioRepr) -> HistResult<Self> {
        if repr.stat_variance.len() != repr.hist.n_bins() {
            return Err(HistError::LengthMismatch {
                expected: repr.hist.n_bins(),
                actual: repr.stat_variance.len(),
            });
        }
        Ok(Self {
            hist: repr.hist,
            stat_variance: repr.stat_variance,
        })
    }
}

impl Ratio {
    /// Divide `numerator` by `denominator`
    pub fn new(numerator: &Histogram, denominator: &Histogram) -> HistResult<Self> {
        let mut hist = numerator.clone();
        hist.divide(denominator)?;
        let stat_variance = hist.variances().to_vec();
        Ok(Self {
            hist,
            stat_variance,
        })
    }

    pub fn n_bins(&self) -> usize {
        self.hist.n_bins()
    }

    pub fn content(&self, i: usize) -> f64 {
        self.hist.content(i)
    }

    /// Total variance (statistical plus any applied envelope)
    pub fn variance(&self, i: usize) -> f64 {
        self.hist.variance(i)
    }

    /// Total error
    pub fn error(&self, i: usize) -> f64 {
        self.hist.error(i)
    }

    /// Statistical error only
    pub fn stat_error(&self, i: usize) -> f64 {
        self.stat_variance[i].sqrt()
    }

    /// Systematic error added by envelopes
    pub fn syst_error(&self, i: usize) -> f64 {
        (self.hist.variance(i) - self.stat_variance[i]).max(0.0).sqrt()
    }

    /// The ratio as a histogram carrying the total variance
    pub fn histogram(&self) -> &Histogram {
        &self.hist
    }

    pub fn into_histogram(self) -> Histogram {
        self.hist
    }
}

/// Bin alignment between a ratio and its correction-factor histograms
///
/// Two conventions exist in practice: factors indexed like the ratio
/// (`aligned`), and factors read one bin further along (`shifted`). Each
/// caller picks one explicitly. Bins are 0-based and every bin receives the
/// envelope unless `first_bin` says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopePolicy {
    /// First ratio bin that receives an envelope; earlier bins keep their
    /// statistical error
    pub first_bin: usize,
    /// Added to the ratio bin index to find the factor bin
    pub factor_offset: usize,
}

impl EnvelopePolicy {
    /// Factor bin `i` applies to ratio bin `i`
    pub fn aligned() -> Self {
        Self {
            first_bin: 0,
            factor_offset: 0,
        }
    }

    /// Factor bin `i + 1` applies to ratio bin `i`
    pub fn shifted() -> Self {
        Self {
            first_bin: 0,
            factor_offset: 1,
        }
    }

    pub fn with_first_bin(mut self, first_bin: usize) -> Self {
        self.first_bin = first_bin;
        self
    }
}

impl Default for EnvelopePolicy {
    fn default() -> Self {
        Self::aligned()
    }
}

/// Add multiplicative systematic factors to a ratio's variance
///
/// For every bin `i >= policy.first_bin`:
/// `var[i] += sum_f (content[i] * (f[i + offset] - 1))^2`.
/// Factor bins past the end of a factor histogram contribute nothing.
pub fn apply_systematic_envelope(ratio: &mut Ratio, factors: &[Histogram], policy: EnvelopePolicy) {
    let contents = ratio.hist.contents().to_vec();
    let variances = ratio.hist.variances_mut();
    for (i, content) in contents.iter().enumerate().skip(policy.first_bin) {
        let j = i + policy.factor_offset;
        variances[i] += factors
            .iter()
            .filter(|f| j < f.n_bins())
            .map(|f| (content * (f.content(j) - 1.0)).powi(2))
            .sum::<f64>();
    }
}

/// Divides families of histograms and tracks which series is which
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioBuilder {
    /// Series holding observed data
    pub data_index: usize,
    /// Reference series the systematic envelope attaches to
    pub ratio_index: usize,
}

impl RatioBuilder {
    pub fn new(data_index: usize, ratio_index: usize) -> Self {
        Self {
            data_index,
            ratio_index,
        }
    }

    /// Divide two families index by index
    pub fn divide(&self, numerators: &[Histogram], denominators: &[Histogram]) -> HistResult<RatioSet> {
        if numerators.len() != denominators.len() {
            return Err(HistError::FamilyMismatch {
                numerators: numerators.len(),
                denominators: denominators.len(),
            });
        }
        for index in [self.data_index, self.ratio_index] {
            if index >= numerators.len() {
                return Err(HistError::IndexOutOfRange {
                    index,
                    len: numerators.len(),
                });
            }
        }

        let ratios = numerators
            .iter()
            .zip(denominators)
            .map(|(num, den)| Ratio::new(num, den))
            .collect::<HistResult<Vec<_>>>()?;

        Ok(RatioSet {
            ratios,
            data_index: self.data_index,
            ratio_index: self.ratio_index,
        })
    }

    /// Divide a single pair
    pub fn divide_pair(numerator: &Histogram, denominator: &Histogram) -> HistResult<Ratio> {
        Ratio::new(numerator, denominator)
    }
}

/// Ratios of a histogram family, one per series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSet {
    ratios: Vec<Ratio>,
    data_index: usize,
    ratio_index: usize,
}

impl RatioSet {
    pub fn ratios(&self) -> &[Ratio] {
        &self.ratios
    }

    pub fn get(&self, index: usize) -> Option<&Ratio> {
        self.ratios.get(index)
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// The observed-data ratio
    pub fn data(&self) -> &Ratio {
        &self.ratios[self.data_index]
    }

    /// The reference ratio
    pub fn reference(&self) -> &Ratio {
        &self.ratios[self.ratio_index]
    }

    pub fn reference_mut(&mut self) -> &mut Ratio {
        &mut self.ratios[self.ratio_index]
    }

    /// Apply an envelope to the reference ratio
    pub fn apply_envelope(&mut self, factors: &[Histogram], policy: EnvelopePolicy) {
        apply_systematic_envelope(self.reference_mut(), factors, policy);
    }

    pub fn into_ratios(self) -> Vec<Ratio> {
        self.ratios
    }
}
