//! Nominal histograms with named systematic variations
//!
//! A [`VariationSet`] owns one nominal histogram and any number of named
//! uncertainty sources. Each source is either an up/down pair, a symmetric
//! delta, or a single one-sided variation. All of them share the nominal's
//! binning.

use crate::error::{HistError, HistResult};
use crate::histogram::Histogram;
use serde::{Deserialize, Serialize};

/// The shape of one uncertainty source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    /// Alternative histograms for the +1 and -1 sigma shifts
    UpDown { up: Histogram, down: Histogram },
    /// Absolute per-bin uncertainty
    Symmetric { delta: Histogram },
    /// One alternative histogram with no partner
    Single { varied: Histogram },
}

impl VariationKind {
    fn histograms(&self) -> Vec<&Histogram> {
        match self {
            VariationKind::UpDown { up, down } => vec![up, down],
            VariationKind::Symmetric { delta } => vec![delta],
            VariationKind::Single { varied } => vec![varied],
        }
    }

    fn histograms_mut(&mut self) -> Vec<&mut Histogram> {
        match self {
            VariationKind::UpDown { up, down } => vec![up, down],
            VariationKind::Symmetric { delta } => vec![delta],
            VariationKind::Single { varied } => vec![varied],
        }
    }

    /// Upper and lower shifted contents of bin `i`
    fn band(&self, nominal: f64, i: usize) -> (f64, f64) {
        match self {
            VariationKind::UpDown { up, down } => (up.content(i), down.content(i)),
            VariationKind::Symmetric { delta } => {
                (nominal + delta.content(i), nominal - delta.content(i))
            }
            VariationKind::Single { varied } => (varied.content(i), varied.content(i)),
        }
    }
}

/// A named uncertainty source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedVariation {
    pub name: String,
    pub kind: VariationKind,
}

/// How up/down variations turn into a per-bin uncertainty
///
/// There is no default: every call site states which model it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetrizationPolicy {
    /// `((up - nom) / 2)^2`; the down histogram is not read
    HalfDifference,
    /// `((up - down) / 2)^2`
    HalfSpread,
    /// `max(|up - nom|, |down - nom|)^2`
    MaxDeviation,
    /// Variations are multiplicative factors on the nominal content:
    /// `max(|nom * (up - 1)|, |nom * (down - 1)|)^2`
    RelativeFactor,
}

/// Display range for a variation-over-nominal ratio panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    pub low: f64,
    pub high: f64,
}

impl RatioRange {
    pub const NARROW: RatioRange = RatioRange { low: 0.95, high: 1.05 };
    pub const MEDIUM: RatioRange = RatioRange { low: 0.8, high: 1.2 };
    pub const WIDE: RatioRange = RatioRange { low: 0.45, high: 1.55 };
    pub const FULL: RatioRange = RatioRange { low: 0.0, high: 2.0 };

    /// Smallest range showing an excursion to `up` and `down`
    pub fn for_excursion(up: f64, down: f64) -> Self {
        if up > 1.55 || down < 0.45 {
            Self::FULL
        } else if up > 1.2 || down < 0.8 {
            Self::WIDE
        } else if up > 1.05 || down < 0.95 {
            Self::MEDIUM
        } else {
            Self::NARROW
        }
    }

    fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// A nominal histogram with its systematic variations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationSet {
    nominal: Histogram,
    variations: Vec<NamedVariation>,
}

impl VariationSet {
    /// Create a set with no variations
    pub fn new(nominal: Histogram) -> Self {
        Self {
            nominal,
            variations: Vec::new(),
        }
    }

    /// The nominal histogram
    pub fn nominal(&self) -> &Histogram {
        &self.nominal
    }

    /// All registered variations
    pub fn variations(&self) -> &[NamedVariation] {
        &self.variations
    }

    /// Look up a variation by name
    pub fn get(&self, name: &str) -> Option<&VariationKind> {
        self.variations
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.kind)
    }

    /// Number of registered variations
    pub fn len(&self) -> usize {
        self.variations.len()
    }

    /// Whether no variation is registered
    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    /// Register a new uncertainty source
    pub fn register(&mut self, name: impl Into<String>, kind: VariationKind) -> HistResult<()> {
        let name = name.into();
        if self.variations.iter().any(|v| v.name == name) {
            return Err(HistError::DuplicateVariation(name));
        }
        if kind
            .histograms()
            .iter()
            .any(|h| h.binning() != self.nominal.binning())
        {
            return Err(HistError::BinningMismatch { name });
        }
        self.variations.push(NamedVariation { name, kind });
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_variation(mut self, name: impl Into<String>, kind: VariationKind) -> HistResult<Self> {
        self.register(name, kind)?;
        Ok(self)
    }

    /// Systematic variance of bin `i`, summed over all sources
    pub fn systematic_variance(&self, bin: usize, policy: SymmetrizationPolicy) -> HistResult<f64> {
        self.check_bin(bin)?;
        let nom = self.nominal.content(bin);
        Ok(self
            .variations
            .iter()
            .map(|v| contribution(&v.kind, nom, bin, policy))
            .sum())
    }

    /// Total uncertainty of bin `i`: statistical and systematic in quadrature
    pub fn combined_uncertainty(&self, bin: usize, policy: SymmetrizationPolicy) -> HistResult<f64> {
        let syst = self.systematic_variance(bin, policy)?;
        Ok((self.nominal.variance(bin) + syst).sqrt())
    }

    /// Total uncertainty of every bin
    pub fn combined_uncertainties(&self, policy: SymmetrizationPolicy) -> Vec<f64> {
        (0..self.nominal.n_bins())
            .map(|i| {
                let nom = self.nominal.content(i);
                let syst: f64 = self
                    .variations
                    .iter()
                    .map(|v| contribution(&v.kind, nom, i, policy))
                    .sum();
                (self.nominal.variance(i) + syst).sqrt()
            })
            .collect()
    }

    /// The nominal histogram with variances replaced by the combined variance
    pub fn with_total_errors(&self, policy: SymmetrizationPolicy) -> Histogram {
        let mut total = self.nominal.clone();
        for (var, err) in total
            .variances_mut()
            .iter_mut()
            .zip(self.combined_uncertainties(policy))
        {
            *var = err * err;
        }
        total
    }

    /// Scale the nominal and every variation by the same factor
    ///
    /// Used to undo the dilution applied to blinded samples.
    pub fn scale_all(&mut self, factor: f64) {
        self.nominal.scale(factor);
        for variation in &mut self.variations {
            let scale = match variation.kind {
                VariationKind::Symmetric { .. } => factor.abs(),
                _ => factor,
            };
            for h in variation.kind.histograms_mut() {
                h.scale(scale);
            }
        }
    }

    /// Display range for the ratio panel of one variation
    ///
    /// Bins with an empty nominal count as an excursion of (0, 1). The widest
    /// range needed by any bin wins.
    pub fn ratio_limits(&self, name: &str) -> HistResult<RatioRange> {
        let kind = self
            .get(name)
            .ok_or_else(|| HistError::UnknownVariation(name.to_string()))?;

        let mut range = RatioRange::NARROW;
        for i in 0..self.nominal.n_bins() {
            let nom = self.nominal.content(i);
            let (up, down) = kind.band(nom, i);
            let (ratio_up, ratio_down) = if nom != 0.0 {
                let (a, b) = (up / nom, down / nom);
                (a.max(b), a.min(b))
            } else {
                (0.0, 1.0)
            };

            let needed = RatioRange::for_excursion(ratio_up, ratio_down);
            if needed.width() > range.width() {
                range = needed;
            }
            if range == RatioRange::FULL {
                break;
            }
        }
        Ok(range)
    }

    fn check_bin(&self, bin: usize) -> HistResult<()> {
        if bin >= self.nominal.n_bins() {
            return Err(HistError::BinOutOfRange {
                index: bin,
                size: self.nominal.n_bins(),
            });
        }
        Ok(())
    }
}

/// Variance contributed by one source to one bin
fn contribution(kind: &VariationKind, nom: f64, bin: usize, policy: SymmetrizationPolicy) -> f64 {
    match kind {
        VariationKind::Symmetric { delta } => delta.content(bin).powi(2),
        VariationKind::UpDown { up, down } => {
            let (u, d) = (up.content(bin), down.content(bin));
            match policy {
                SymmetrizationPolicy::HalfDifference => ((u - nom) / 2.0).powi(2),
                SymmetrizationPolicy::HalfSpread => ((u - d) / 2.0).powi(2),
                SymmetrizationPolicy::MaxDeviation => (u - nom).abs().max((d - nom).abs()).powi(2),
                SymmetrizationPolicy::RelativeFactor => {
                    (nom * (u - 1.0)).abs().max((nom * (d - 1.0)).abs()).powi(2)
                }
            }
        }
        VariationKind::Single { varied } => {
            let v = varied.content(bin);
            match policy {
                SymmetrizationPolicy::RelativeFactor => (nom * (v - 1.0)).powi(2),
                _ => (v - nom).powi(2),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Binning;

    fn hist(content: &[f64]) -> Histogram {
        let n = content.len();
        let binning = Binning::uniform(n, 0.0, n as f64).unwrap();
        Histogram::from_parts(binning, content.to_vec(), content.to_vec()).unwrap()
    }

    #[test]
    fn test_register_duplicate() {
        let mut set = VariationSet::new(hist(&[10.0, 20.0]));
        set.register("pdf", VariationKind::Symmetric { delta: hist(&[1.0, 1.0]) })
            .unwrap();
        let err = set
            .register("pdf", VariationKind::Symmetric { delta: hist(&[2.0, 2.0]) })
            .unwrap_err();
        assert_eq!(err, HistError::DuplicateVariation("pdf".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_register_binning_mismatch() {
        let mut set = VariationSet::new(hist(&[10.0, 20.0]));
        let err = set
            .register(
                "scale",
                VariationKind::UpDown {
                    up: hist(&[11.0, 21.0]),
                    down: hist(&[9.0, 19.0, 1.0]),
                },
            )
            .unwrap_err();
        assert!(matches!(err, HistError::BinningMismatch { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn test_combined_uncertainty_policies() {
        let set = VariationSet::new(hist(&[10.0]))
            .with_variation(
                "jec",
                VariationKind::UpDown {
                    up: hist(&[13.0]),
                    down: hist(&[9.0]),
                },
            )
            .unwrap();

        // stat variance = 10
        let half = set
            .combined_uncertainty(0, SymmetrizationPolicy::HalfDifference)
            .unwrap();
        assert!((half - (10.0_f64 + 2.25).sqrt()).abs() < 1e-12);

        let spread = set
            .combined_uncertainty(0, SymmetrizationPolicy::HalfSpread)
            .unwrap();
        assert!((spread - (10.0_f64 + 4.0).sqrt()).abs() < 1e-12);

        let max = set
            .combined_uncertainty(0, SymmetrizationPolicy::MaxDeviation)
            .unwrap();
        assert!((max - (10.0_f64 + 9.0).sqrt()).abs() < 1e-12);

        assert!(set
            .combined_uncertainty(1, SymmetrizationPolicy::MaxDeviation)
            .is_err());
    }

    #[test]
    fn test_half_difference_ignores_down() {
        // down != 2 * nom - up, so the two half-width models disagree
        let set = VariationSet::new(hist(&[10.0]))
            .with_variation(
                "pdf",
                VariationKind::UpDown {
                    up: hist(&[14.0]),
                    down: hist(&[8.0]),
                },
            )
            .unwrap();
        let half = set
            .systematic_variance(0, SymmetrizationPolicy::HalfDifference)
            .unwrap();
        assert!((half - 4.0).abs() < 1e-12);
        let spread = set
            .systematic_variance(0, SymmetrizationPolicy::HalfSpread)
            .unwrap();
        assert!((spread - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_factor_policy() {
        let set = VariationSet::new(hist(&[10.0]))
            .with_variation(
                "ewk",
                VariationKind::UpDown {
                    up: hist(&[1.1]),
                    down: hist(&[0.95]),
                },
            )
            .unwrap();
        let syst = set
            .systematic_variance(0, SymmetrizationPolicy::RelativeFactor)
            .unwrap();
        assert!((syst - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_and_single() {
        let set = VariationSet::new(hist(&[10.0, 4.0]))
            .with_variation("lumi", VariationKind::Symmetric { delta: hist(&[1.0, 2.0]) })
            .unwrap()
            .with_variation("smear", VariationKind::Single { varied: hist(&[12.0, 4.0]) })
            .unwrap();

        let errs = set.combined_uncertainties(SymmetrizationPolicy::HalfDifference);
        assert!((errs[0] - (10.0_f64 + 1.0 + 4.0).sqrt()).abs() < 1e-12);
        assert!((errs[1] - (4.0_f64 + 4.0).sqrt()).abs() < 1e-12);

        let total = set.with_total_errors(SymmetrizationPolicy::HalfDifference);
        assert!((total.variance(0) - 15.0).abs() < 1e-12);
        assert_eq!(total.contents(), set.nominal().contents());
    }

    #[test]
    fn test_scale_all() {
        let mut set = VariationSet::new(hist(&[10.0]))
            .with_variation(
                "jec",
                VariationKind::UpDown {
                    up: hist(&[12.0]),
                    down: hist(&[8.0]),
                },
            )
            .unwrap();
        set.scale_all(0.2);
        assert!((set.nominal().content(0) - 2.0).abs() < 1e-12);
        match set.get("jec").unwrap() {
            VariationKind::UpDown { up, down } => {
                assert!((up.content(0) - 2.4).abs() < 1e-12);
                assert!((down.content(0) - 1.6).abs() < 1e-12);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_ratio_limits() {
        let set = VariationSet::new(hist(&[100.0, 100.0, 100.0]))
            .with_variation(
                "small",
                VariationKind::UpDown {
                    up: hist(&[101.0, 102.0, 101.0]),
                    down: hist(&[99.0, 98.0, 99.0]),
                },
            )
            .unwrap()
            .with_variation(
                "medium",
                VariationKind::UpDown {
                    up: hist(&[130.0, 101.0, 101.0]),
                    down: hist(&[99.0, 99.0, 99.0]),
                },
            )
            .unwrap()
            .with_variation(
                "large",
                VariationKind::UpDown {
                    up: hist(&[101.0, 101.0, 101.0]),
                    down: hist(&[99.0, 99.0, 40.0]),
                },
            )
            .unwrap();

        assert_eq!(set.ratio_limits("small").unwrap(), RatioRange::NARROW);
        // a later quiet bin does not shrink the range again
        assert_eq!(set.ratio_limits("medium").unwrap(), RatioRange::WIDE);
        assert_eq!(set.ratio_limits("large").unwrap(), RatioRange::FULL);
        assert!(set.ratio_limits("missing").is_err());
    }
}
