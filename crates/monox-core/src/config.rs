//! Configuration for monox analyses
//!
//! An [`AnalysisConfig`] describes one control or signal region: which samples
//! exist, how they are grouped into the observed, background and signal
//! series, which variables are plotted and which baseline selection every
//! event has to pass. It replaces environment-derived globals; the pipeline
//! receives it explicitly.

use monox_hist::{Binning, HistResult, SymmetrizationPolicy, WidthNormalization};
use monox_io::HistogramDocument;
use monox_selection::{
    BinnedWeight, ChainBuilder, ConstantWeight, ExpressionCut, FieldWeight, GraphWeight, Prescale,
    RangeCut, SelectionChain, SelectionStage, ThresholdCut,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::MonoxResult;

/// Configuration of one analysis region
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Region name; also the default file selection suffix
    pub region: String,
    /// Integrated luminosity. When unset, the sum of the observed samples' luminosities
    pub luminosity: Option<f64>,
    /// Blinding factor for sensitive variables (1 disables blinding)
    pub blind: u64,
    /// Directory holding `<sample>_<selection>.csv` files
    pub source_dir: PathBuf,
    /// Per-event weight expression applied to every sample
    pub weight: Option<String>,
    /// Symmetrization model for the combined background uncertainty
    pub symmetrization: SymmetrizationPolicy,
    /// Yield reporting
    pub yields: YieldConfig,
    pub samples: Vec<SampleConfig>,
    pub observed: GroupConfig,
    pub backgrounds: Vec<GroupConfig>,
    pub signals: Vec<GroupConfig>,
    pub variables: Vec<VariableConfig>,
    /// Variables whose observed distribution is blinded
    pub sensitive_variables: Vec<String>,
    /// Stages every event has to pass, in order
    pub baseline: Vec<StageConfig>,
    /// Stages appended to the baseline for simulated samples only
    pub mc_weights: Vec<StageConfig>,
    /// Correction-factor histograms used as systematic envelopes
    pub factors: Vec<FactorConfig>,
    pub transfers: Vec<TransferConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            region: "monoph".to_string(),
            luminosity: None,
            blind: 1,
            source_dir: PathBuf::from("."),
            weight: Some("weight".to_string()),
            symmetrization: SymmetrizationPolicy::HalfDifference,
            yields: YieldConfig::default(),
            samples: Vec::new(),
            observed: GroupConfig::new("data", "Observed"),
            backgrounds: Vec::new(),
            signals: Vec::new(),
            variables: Vec::new(),
            sensitive_variables: Vec::new(),
            baseline: Vec::new(),
            mc_weights: Vec::new(),
            factors: Vec::new(),
            transfers: Vec::new(),
        }
    }
}

/// Which variable's high tail is reported and how groups are booked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldConfig {
    pub variable: String,
    pub threshold: f64,
    /// Background groups reported under their own name; the rest sum into `mc`
    pub separate_groups: Vec<String>,
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self {
            variable: "met".to_string(),
            threshold: 240.0,
            separate_groups: vec!["efake".to_string(), "hfake".to_string()],
        }
    }
}

/// One event sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    pub name: String,
    /// Explicit file; otherwise `<source_dir>/<name>_<selection>.csv`
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Collision data (not scaled by luminosity)
    #[serde(default)]
    pub data: bool,
    #[serde(default)]
    pub cross_section: Option<f64>,
    #[serde(default)]
    pub sum_weights: Option<f64>,
    /// Recorded luminosity of a data sample
    #[serde(default)]
    pub luminosity: Option<f64>,
}

impl SampleConfig {
    pub fn mc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            data: false,
            cross_section: None,
            sum_weights: None,
            luminosity: None,
        }
    }

    pub fn data(name: impl Into<String>, luminosity: f64) -> Self {
        Self {
            data: true,
            luminosity: Some(luminosity),
            ..Self::mc(name)
        }
    }

    /// Normalization applied to every event of this sample
    ///
    /// Data is unscaled. MC is scaled by `lumi * xsec / sumw` when both the
    /// cross section and the sum of weights are known, and by `lumi` otherwise.
    pub fn scale(&self, luminosity: f64) -> f64 {
        if self.data {
            return 1.0;
        }
        match (self.cross_section, self.sum_weights) {
            (Some(xsec), Some(sumw)) if sumw != 0.0 => luminosity * xsec / sumw,
            _ => luminosity,
        }
    }

    /// Path of the file holding this sample under a selection
    pub fn path(&self, source_dir: &Path, selection: &str) -> PathBuf {
        match &self.file {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => source_dir.join(file),
            None => source_dir.join(format!("{}_{}.csv", self.name, selection)),
        }
    }
}

/// A sample reference inside a group, optionally with its own selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMember {
    Sample(String),
    Selected { sample: String, selection: String },
}

impl GroupMember {
    pub fn sample(&self) -> &str {
        match self {
            GroupMember::Sample(name) => name,
            GroupMember::Selected { sample, .. } => sample,
        }
    }

    /// The member's selection, falling back to the region default
    pub fn selection<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            GroupMember::Sample(_) => default,
            GroupMember::Selected { selection, .. } => selection,
        }
    }
}

impl From<&str> for GroupMember {
    fn from(name: &str) -> Self {
        GroupMember::Sample(name.to_string())
    }
}

/// A displayed series made of one or more samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub samples: Vec<GroupMember>,
}

impl GroupConfig {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            color: None,
            samples: Vec::new(),
        }
    }

    pub fn with_samples<I, M>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<GroupMember>,
    {
        self.samples = samples.into_iter().map(Into::into).collect();
        self
    }
}

/// Bin edges as an explicit list or as a count and range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinningConfig {
    Edges(Vec<f64>),
    Uniform { bins: usize, low: f64, high: f64 },
}

impl BinningConfig {
    pub fn build(&self) -> HistResult<Binning> {
        match self {
            BinningConfig::Edges(edges) => Binning::new(edges.clone()),
            BinningConfig::Uniform { bins, low, high } => Binning::uniform(*bins, *low, *high),
        }
    }
}

/// One plotted variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub unit: Option<String>,
    /// Expression to histogram; defaults to the variable name
    #[serde(default)]
    pub expr: Option<String>,
    /// Extra cut for this plot only
    #[serde(default)]
    pub cut: String,
    pub binning: BinningConfig,
    #[serde(default)]
    pub overflow: bool,
    /// Divide contents by bin width for display
    #[serde(default = "default_true")]
    pub normalize: bool,
}

fn default_true() -> bool {
    true
}

impl VariableConfig {
    pub fn new(name: impl Into<String>, title: impl Into<String>, binning: BinningConfig) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            unit: None,
            expr: None,
            cut: String::new(),
            binning,
            overflow: false,
            normalize: true,
        }
    }

    pub fn expression(&self) -> &str {
        self.expr.as_deref().unwrap_or(&self.name)
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref().filter(|u| !u.is_empty())
    }

    /// Effective binning, including the overflow bin if requested
    pub fn binning(&self) -> HistResult<Binning> {
        let binning = self.binning.build()?;
        Ok(if self.overflow {
            binning.with_overflow()
        } else {
            binning
        })
    }

    /// Variables with a unit are shown per unit, others relative to the first bin
    pub fn width_normalization(&self) -> Option<WidthNormalization> {
        if !self.normalize {
            return None;
        }
        Some(match self.unit() {
            Some(_) => WidthNormalization::PerUnit,
            None => WidthNormalization::RelativeToFirst,
        })
    }

    pub fn x_title(&self) -> String {
        match self.unit() {
            Some(unit) => format!("{}({})", self.title, unit),
            None => self.title.clone(),
        }
    }

    /// `Events`, followed by the unit or first-bin width unless bins are 1 wide
    pub fn y_title(&self, binning: &Binning) -> String {
        let width = binning.width(0);
        if width == 1.0 {
            return "Events".to_string();
        }
        match self.unit() {
            Some(unit) => format!("Events / {}", unit),
            None => format!("Events / {:.2}", width),
        }
    }
}

/// A typed baseline selection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    Cut {
        name: String,
        expr: String,
        #[serde(default)]
        ignore_decision: bool,
    },
    Threshold {
        name: String,
        field: String,
        min: f64,
        #[serde(default)]
        ignore_decision: bool,
    },
    Range {
        name: String,
        field: String,
        min: f64,
        max: f64,
        #[serde(default)]
        ignore_decision: bool,
    },
    /// Keeps events whose number is a multiple of `factor`
    Prescale {
        name: String,
        factor: u64,
        #[serde(default)]
        ignore_decision: bool,
    },
    ConstantWeight {
        name: String,
        weight: f64,
        /// Relative (up, down) uncertainty
        #[serde(default)]
        uncertainty: Option<(f64, f64)>,
    },
    FieldWeight {
        name: String,
        expr: String,
    },
    BinnedWeight {
        name: String,
        expr: String,
        document: PathBuf,
        histogram: String,
        #[serde(default)]
        error_variation: bool,
    },
    GraphWeight {
        name: String,
        expr: String,
        x: Vec<f64>,
        y: Vec<f64>,
    },
}

impl StageConfig {
    pub fn name(&self) -> &str {
        match self {
            StageConfig::Cut { name, .. }
            | StageConfig::Threshold { name, .. }
            | StageConfig::Range { name, .. }
            | StageConfig::Prescale { name, .. }
            | StageConfig::ConstantWeight { name, .. }
            | StageConfig::FieldWeight { name, .. }
            | StageConfig::BinnedWeight { name, .. }
            | StageConfig::GraphWeight { name, .. } => name,
        }
    }

    /// Build the stage; relative document paths resolve against `base_dir`
    pub fn build(&self, base_dir: &Path) -> MonoxResult<Box<dyn SelectionStage>> {
        let stage: Box<dyn SelectionStage> = match self {
            StageConfig::Cut {
                name,
                expr,
                ignore_decision,
            } => {
                let cut = ExpressionCut::parse(name.as_str(), expr)?;
                if *ignore_decision {
                    Box::new(cut.ignoring_decision())
                } else {
                    Box::new(cut)
                }
            }
            StageConfig::Threshold {
                name,
                field,
                min,
                ignore_decision,
            } => {
                let cut = ThresholdCut::new(name.as_str(), field.as_str(), *min);
                if *ignore_decision {
                    Box::new(cut.ignoring_decision())
                } else {
                    Box::new(cut)
                }
            }
            StageConfig::Range {
                name,
                field,
                min,
                max,
                ignore_decision,
            } => {
                let cut = RangeCut::new(name.as_str(), field.as_str(), *min, *max)?;
                if *ignore_decision {
                    Box::new(cut.ignoring_decision())
                } else {
                    Box::new(cut)
                }
            }
            StageConfig::Prescale {
                name,
                factor,
                ignore_decision,
            } => {
                let cut = Prescale::new(*factor)?.with_name(name.as_str());
                if *ignore_decision {
                    Box::new(cut.ignoring_decision())
                } else {
                    Box::new(cut)
                }
            }
            StageConfig::ConstantWeight {
                name,
                weight,
                uncertainty,
            } => {
                let stage = ConstantWeight::new(name.as_str(), *weight);
                match uncertainty {
                    Some((up, down)) => Box::new(stage.with_uncertainty(*up, *down)),
                    None => Box::new(stage),
                }
            }
            StageConfig::FieldWeight { name, expr } => {
                Box::new(FieldWeight::new(name.as_str(), expr)?)
            }
            StageConfig::BinnedWeight {
                name,
                expr,
                document,
                histogram,
                error_variation,
            } => {
                let doc = HistogramDocument::load(resolve(base_dir, document))?;
                let factors = doc.require(histogram)?.clone();
                let stage = BinnedWeight::new(name.as_str(), expr, factors)?;
                if *error_variation {
                    Box::new(stage.with_error_variation())
                } else {
                    Box::new(stage)
                }
            }
            StageConfig::GraphWeight { name, expr, x, y } => {
                Box::new(GraphWeight::new(name.as_str(), expr, x.clone(), y.clone())?)
            }
        };
        Ok(stage)
    }
}

/// Build a selection chain from stage configurations, in order
pub fn build_chain(stages: &[StageConfig], base_dir: &Path) -> MonoxResult<SelectionChain> {
    let mut builder = ChainBuilder::new();
    for stage in stages {
        builder = builder.boxed(stage.build(base_dir)?);
    }
    Ok(builder.build())
}

pub(crate) fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// A correction-factor histogram stored in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorConfig {
    pub name: String,
    pub document: PathBuf,
    pub histogram: String,
}

/// How factor bins line up with ratio bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeAlignment {
    Aligned,
    Shifted,
}

/// One side of a transfer ratio: an MC prediction and its data counterpart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSide {
    pub mc: GroupMember,
    pub data: GroupMember,
    #[serde(default)]
    pub cut: String,
    /// Expression to histogram; defaults to the transfer's expression
    #[serde(default)]
    pub expr: Option<String>,
}

/// A ratio of two regions with systematic envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub name: String,
    pub expr: String,
    pub edges: Vec<f64>,
    pub numerator: TransferSide,
    pub denominator: TransferSide,
    /// Names of entries in `factors`
    #[serde(default)]
    pub factors: Vec<String>,
    pub alignment: EnvelopeAlignment,
    /// First 0-based bin receiving the envelope
    #[serde(default)]
    pub first_bin: usize,
}

impl AnalysisConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a `.toml` or `.json` file and validate it
    ///
    /// A relative `source_dir` is resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                Self::from_json(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            _ => Self::from_toml(&text).map_err(|e| ConfigError::Parse(e.to_string()))?,
        };
        if let Some(dir) = path.parent() {
            config.source_dir = resolve(dir, &config.source_dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn sample(&self, name: &str) -> Option<&SampleConfig> {
        self.samples.iter().find(|s| s.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableConfig> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn factor(&self, name: &str) -> Option<&FactorConfig> {
        self.factors.iter().find(|f| f.name == name)
    }

    pub fn is_sensitive(&self, variable: &str) -> bool {
        self.sensitive_variables.iter().any(|v| v == variable)
    }

    /// Luminosity used to scale MC
    pub fn effective_luminosity(&self) -> Option<f64> {
        if let Some(lumi) = self.luminosity {
            return Some(lumi);
        }
        let mut total = 0.0;
        for member in &self.observed.samples {
            total += self.sample(member.sample())?.luminosity?;
        }
        Some(total)
    }

    /// Validate configuration values and cross references
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blind == 0 {
            return Err(ConfigError::OutOfRange(
                "blind must be at least 1".to_string(),
            ));
        }

        match self.effective_luminosity() {
            Some(lumi) if lumi > 0.0 && lumi.is_finite() => {}
            Some(lumi) => {
                return Err(ConfigError::OutOfRange(format!(
                    "luminosity must be positive, got {}",
                    lumi
                )))
            }
            None => {
                return Err(ConfigError::MissingField(
                    "luminosity (or a luminosity on every observed sample)".to_string(),
                ))
            }
        }

        if !self.yields.threshold.is_finite() {
            return Err(ConfigError::OutOfRange(
                "yield threshold must be finite".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for sample in &self.samples {
            if !names.insert(sample.name.as_str()) {
                return Err(ConfigError::Duplicate(format!("sample '{}'", sample.name)));
            }
            if sample.sum_weights == Some(0.0) {
                return Err(ConfigError::OutOfRange(format!(
                    "sample '{}' has zero sum of weights",
                    sample.name
                )));
            }
        }

        for member in &self.observed.samples {
            let sample = self.require_sample(member.sample())?;
            if !sample.data {
                return Err(ConfigError::InvalidValue(format!(
                    "observed sample '{}' is not a data sample",
                    sample.name
                )));
            }
        }
        let mut groups = HashSet::new();
        for group in self.backgrounds.iter().chain(&self.signals) {
            if !groups.insert(group.name.as_str()) {
                return Err(ConfigError::Duplicate(format!("group '{}'", group.name)));
            }
            for member in &group.samples {
                self.require_sample(member.sample())?;
            }
        }

        let mut variables = HashSet::new();
        for variable in &self.variables {
            if !variables.insert(variable.name.as_str()) {
                return Err(ConfigError::Duplicate(format!(
                    "variable '{}'",
                    variable.name
                )));
            }
            variable.binning().map_err(|e| {
                ConfigError::InvalidValue(format!("variable '{}': {}", variable.name, e))
            })?;
        }
        for name in &self.sensitive_variables {
            if !variables.contains(name.as_str()) {
                return Err(ConfigError::UnknownReference {
                    kind: "variable",
                    name: name.clone(),
                });
            }
        }

        let mut stages = HashSet::new();
        for stage in self.baseline.iter().chain(&self.mc_weights) {
            if !stages.insert(stage.name()) {
                return Err(ConfigError::Duplicate(format!("stage '{}'", stage.name())));
            }
        }

        for transfer in &self.transfers {
            for side in [&transfer.numerator, &transfer.denominator] {
                self.require_sample(side.mc.sample())?;
                self.require_sample(side.data.sample())?;
            }
            for factor in &transfer.factors {
                if self.factor(factor).is_none() {
                    return Err(ConfigError::UnknownReference {
                        kind: "factor",
                        name: factor.clone(),
                    });
                }
            }
            Binning::new(transfer.edges.clone()).map_err(|e| {
                ConfigError::InvalidValue(format!("transfer '{}': {}", transfer.name, e))
            })?;
        }

        Ok(())
    }

    fn require_sample(&self, name: &str) -> Result<&SampleConfig, ConfigError> {
        self.sample(name).ok_or_else(|| ConfigError::UnknownReference {
            kind: "sample",
            name: name.to_string(),
        })
    }
}

/// Configuration loading and validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Read(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Unknown {kind}: {name}")]
    UnknownReference { kind: &'static str, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.samples = vec![
            SampleConfig::data("sph-d3", 1000.0),
            SampleConfig::data("sph-d4", 1500.0),
            SampleConfig::mc("wg"),
        ];
        config.observed = GroupConfig::new("data", "Observed").with_samples(["sph-d3", "sph-d4"]);
        config.backgrounds = vec![GroupConfig::new("wg", "W+gamma").with_samples(["wg"])];
        config.variables = vec![VariableConfig::new(
            "met",
            "E_T^miss",
            BinningConfig::Edges(vec![0.0, 100.0, 200.0]),
        )];
        config
    }

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.blind, 1);
        assert_eq!(config.yields.threshold, 240.0);
        // No observed samples and no explicit luminosity
        assert_eq!(config.effective_luminosity(), Some(0.0));
        assert!(config.validate().is_err());
        assert!(region().validate().is_ok());
    }

    #[test]
    fn test_luminosity_from_observed() {
        let mut config = region();
        assert_eq!(config.effective_luminosity(), Some(2500.0));
        config.luminosity = Some(10.0);
        assert_eq!(config.effective_luminosity(), Some(10.0));
    }

    #[test]
    fn test_json_serialization() {
        let config = region();
        let json = config.to_json().unwrap();
        let parsed = AnalysisConfig::from_json(&json).unwrap();
        assert_eq!(parsed.samples.len(), 3);
        assert_eq!(parsed.observed.samples, config.observed.samples);
    }

    #[test]
    fn test_toml_region() {
        let config = AnalysisConfig::from_toml(
            r#"
            region = "monoph"
            blind = 5
            sensitive_variables = ["met"]

            [observed]
            name = "data"
            title = "Observed"
            samples = ["sph-d3"]

            [[samples]]
            name = "sph-d3"
            data = true
            luminosity = 2000

            [[samples]]
            name = "znng"
            cross_section = 0.2
            sum_weights = 1000

            [[backgrounds]]
            name = "hfake"
            title = "Hadronic fakes"
            samples = [{ sample = "sph-d3", selection = "hfake" }]

            [[backgrounds]]
            name = "znunu"
            title = "Z+gamma"
            samples = ["znng"]

            [[variables]]
            name = "met"
            title = "E_T^miss"
            unit = "GeV"
            binning = [40, 60, 80, 120]
            overflow = true

            [[variables]]
            name = "phoEta"
            title = "eta"
            binning = { bins = 20, low = -1.5, high = 1.5 }

            [[baseline]]
            type = "threshold"
            name = "HighMet"
            field = "met"
            min = 40

            [[mc_weights]]
            type = "constant_weight"
            name = "lumiUnc"
            weight = 1.0
            uncertainty = [0.027, 0.027]
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert!(config.is_sensitive("met"));
        assert_eq!(
            config.backgrounds[0].samples[0].selection("monoph"),
            "hfake"
        );

        let met = config.variable("met").unwrap();
        assert_eq!(met.binning().unwrap().n_bins(), 4);
        assert_eq!(met.width_normalization(), Some(WidthNormalization::PerUnit));
        assert_eq!(met.x_title(), "E_T^miss(GeV)");
        let eta = config.variable("phoEta").unwrap();
        assert_eq!(
            eta.width_normalization(),
            Some(WidthNormalization::RelativeToFirst)
        );
        assert_eq!(eta.y_title(&eta.binning().unwrap()), "Events / 0.15");

        let znng = config.sample("znng").unwrap();
        assert!((znng.scale(2000.0) - 0.4).abs() < 1e-12);
        assert_eq!(config.sample("sph-d3").unwrap().scale(2000.0), 1.0);

        let stages: Vec<StageConfig> = config
            .baseline
            .iter()
            .chain(&config.mc_weights)
            .cloned()
            .collect();
        let chain = build_chain(&stages, Path::new(".")).unwrap();
        assert_eq!(chain.stage_names(), vec!["HighMet", "lumiUnc"]);
    }

    #[test]
    fn test_prescale_stage() {
        let config = AnalysisConfig::from_toml(
            r#"
            [[baseline]]
            type = "prescale"
            name = "Blind"
            factor = 3
            "#,
        )
        .unwrap();
        let chain = build_chain(&config.baseline, Path::new(".")).unwrap();
        assert_eq!(chain.stage_names(), vec!["Blind"]);
        assert!(chain.run(&monox_selection::Event::new(6)).unwrap().accepted);
        assert!(!chain.run(&monox_selection::Event::new(7)).unwrap().accepted);

        let zero = vec![StageConfig::Prescale {
            name: "Blind".to_string(),
            factor: 0,
            ignore_decision: false,
        }];
        assert!(build_chain(&zero, Path::new(".")).is_err());
    }

    #[test]
    fn test_unknown_sample_reference() {
        let mut config = region();
        config.backgrounds[0].samples.push("zg".into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownReference {
                kind: "sample",
                name: "zg".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut config = region();
        config.blind = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        let mut config = region();
        config.variables[0].binning = BinningConfig::Edges(vec![10.0, 5.0, 20.0]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut config = region();
        config.luminosity = Some(2500.0);
        config.observed.samples.push("wg".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_sample_path() {
        let sample = SampleConfig::mc("wg");
        assert_eq!(
            sample.path(Path::new("/skims"), "monoph"),
            PathBuf::from("/skims/wg_monoph.csv")
        );
    }
}
