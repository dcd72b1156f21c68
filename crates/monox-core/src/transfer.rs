//! Transfer ratios between control regions
//!
//! A transfer ratio divides the yields of one region by another (for example
//! Z to gamma) for both the MC prediction and the observed data. The MC ratio
//! carries the theory uncertainties: each correction-factor histogram `f`
//! adds `(ratio * (f - 1))^2` to the variance, with the bin alignment chosen
//! per call site through [`EnvelopePolicy`].

use monox_hist::{Binning, EnvelopePolicy, Histogram, Ratio, RatioBuilder, RatioSet};
use monox_io::HistogramDocument;
use serde::{Deserialize, Serialize};

use crate::config::{resolve, AnalysisConfig, EnvelopeAlignment, TransferConfig, TransferSide};
use crate::error::{MonoxError, MonoxResult};
use crate::filler::{PlotFiller, PlotSpec};
use crate::loader::SampleLoader;
use crate::pipeline::Chains;

/// Index of the MC series in a transfer family
pub const MC_INDEX: usize = 0;
/// Index of the data series in a transfer family
pub const DATA_INDEX: usize = 1;

/// Ratio of `[mc, data]` families with an envelope on the MC ratio
#[derive(Debug, Clone)]
pub struct TransferRatio {
    builder: RatioBuilder,
    policy: EnvelopePolicy,
    factors: Vec<Histogram>,
}

impl TransferRatio {
    pub fn new(policy: EnvelopePolicy) -> Self {
        Self {
            builder: RatioBuilder::new(DATA_INDEX, MC_INDEX),
            policy,
            factors: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: Histogram) -> Self {
        self.factors.push(factor);
        self
    }

    pub fn policy(&self) -> EnvelopePolicy {
        self.policy
    }

    /// Divide `[mc, data]` numerators by `[mc, data]` denominators
    pub fn compute(&self, numerators: &[Histogram], denominators: &[Histogram]) -> MonoxResult<RatioSet> {
        let mut ratios = self.builder.divide(numerators, denominators)?;
        ratios.apply_envelope(&self.factors, self.policy);
        Ok(ratios)
    }
}

/// Result of one configured transfer ratio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub name: String,
    pub policy: EnvelopePolicy,
    /// MC ratio with stat and envelope errors
    pub mc: Ratio,
    /// Data ratio with statistical errors
    pub data: Ratio,
}

impl TransferReport {
    /// Run a configured transfer ratio
    pub fn run(
        analysis: &AnalysisConfig,
        transfer: &TransferConfig,
        loader: &dyn SampleLoader,
        chains: &Chains,
    ) -> MonoxResult<Self> {
        let policy = match transfer.alignment {
            EnvelopeAlignment::Aligned => EnvelopePolicy::aligned(),
            EnvelopeAlignment::Shifted => EnvelopePolicy::shifted(),
        }
        .with_first_bin(transfer.first_bin);

        let mut ratio = TransferRatio::new(policy);
        for name in &transfer.factors {
            let factor = analysis
                .factor(name)
                .ok_or_else(|| MonoxError::UnknownFactor(name.clone()))?;
            let doc = HistogramDocument::load(resolve(&analysis.source_dir, &factor.document))?;
            ratio = ratio.with_factor(doc.require(&factor.histogram)?.clone());
        }

        let binning = Binning::new(transfer.edges.clone())?;
        let luminosity = analysis.effective_luminosity().unwrap_or(1.0);
        let numerators = side_family(analysis, transfer, &transfer.numerator, &binning, luminosity, loader, chains)?;
        let denominators =
            side_family(analysis, transfer, &transfer.denominator, &binning, luminosity, loader, chains)?;

        let ratios = ratio.compute(&numerators, &denominators)?;
        tracing::info!(
            transfer = %transfer.name,
            factors = transfer.factors.len(),
            first_bin = policy.first_bin,
            factor_offset = policy.factor_offset,
            "computed transfer ratio"
        );

        let mut ratios = ratios.into_ratios();
        let data = ratios.remove(DATA_INDEX);
        let mc = ratios.remove(MC_INDEX);
        Ok(Self {
            name: transfer.name.clone(),
            policy,
            mc,
            data,
        })
    }
}

/// Fill the `[mc, data]` family of one side
fn side_family(
    analysis: &AnalysisConfig,
    transfer: &TransferConfig,
    side: &TransferSide,
    binning: &Binning,
    luminosity: f64,
    loader: &dyn SampleLoader,
    chains: &Chains,
) -> MonoxResult<Vec<Histogram>> {
    let expr = side.expr.as_deref().unwrap_or(&transfer.expr);
    let mut family = Vec::with_capacity(2);
    for member in [&side.mc, &side.data] {
        let sample = analysis
            .sample(member.sample())
            .ok_or_else(|| MonoxError::UnknownSample(member.sample().to_string()))?;
        let events = loader.load(sample, member.selection(&analysis.region))?;

        let mut spec = PlotSpec::new(transfer.name.as_str(), expr, binning.clone())?.with_cut(&side.cut)?;
        if let Some(weight) = &analysis.weight {
            spec = spec.with_reweight(weight)?;
        }
        let mut plots = PlotFiller::new(chains.for_sample(sample.data))
            .with_plot(spec)
            .fill(&events)?;
        let mut hist = plots.remove(0).nominal;
        hist.scale(sample.scale(luminosity));
        family.push(hist);
    }
    Ok(family)
}
