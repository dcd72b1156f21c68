//! Data/MC comparison plots
//!
//! For every configured variable the pipeline builds:
//!
//! - one stacked histogram per background group, summed over its samples
//! - one histogram per signal group (sensitive variables only)
//! - the observed data, prescaled by the blinding factor on sensitive variables
//! - the total background with statistical and systematic errors combined
//! - the data/background ratio
//!
//! MC samples are scaled to the luminosity, display-normalized by bin width
//! and clamped to non-negative contents one sample at a time. High-threshold
//! yields of the yield variable are booked before the blinding scale
//! `1 / blind` is applied to sensitive-region MC.

use monox_hist::{
    integrate_from, Histogram, Ratio, RatioBuilder, VariationKind, VariationSet, YieldTable,
};
use monox_io::HistogramDocument;
use monox_selection::SelectionChain;
use serde::{Deserialize, Serialize};

use crate::config::{build_chain, AnalysisConfig, ConfigError, GroupMember, StageConfig};
use crate::error::{MonoxError, MonoxResult};
use crate::filler::{FilledPlot, PlotFiller, PlotSpec};
use crate::loader::{DirectoryLoader, SampleLoader};
use crate::transfer::TransferReport;

/// Name under which MC yields outside the separately reported groups are booked
pub const MC_YIELD: &str = "mc";

/// Baseline chains for data and simulation
#[derive(Debug)]
pub struct Chains {
    pub data: SelectionChain,
    pub mc: SelectionChain,
}

impl Chains {
    /// Data runs the baseline; MC runs the baseline followed by the MC weights
    pub fn build(config: &AnalysisConfig) -> MonoxResult<Self> {
        let mc_stages: Vec<StageConfig> = config
            .baseline
            .iter()
            .chain(&config.mc_weights)
            .cloned()
            .collect();
        Ok(Self {
            data: build_chain(&config.baseline, &config.source_dir)?,
            mc: build_chain(&mc_stages, &config.source_dir)?,
        })
    }

    pub fn for_sample(&self, data: bool) -> &SelectionChain {
        if data {
            &self.data
        } else {
            &self.mc
        }
    }
}

/// A displayed series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPlot {
    pub name: String,
    pub title: String,
    pub color: Option<String>,
    pub histograms: VariationSet,
}

/// Everything needed to draw one data/MC comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataMcPlot {
    pub variable: String,
    pub x_title: String,
    pub y_title: String,
    pub sensitive: bool,
    /// Stacked backgrounds, in configuration order
    pub backgrounds: Vec<GroupPlot>,
    pub signals: Vec<GroupPlot>,
    pub observed: Option<Histogram>,
    /// Sum of backgrounds; variance holds statistical plus systematic errors
    pub background_total: Option<Histogram>,
    /// Observed over total background, statistical errors only
    pub ratio: Option<Ratio>,
}

impl DataMcPlot {
    /// Flatten into a histogram document
    ///
    /// Groups are stored under their name, weight variations as
    /// `<group>_<syst>Up` and `<group>_<syst>Down`, data as `data`.
    pub fn to_document(&self) -> HistogramDocument {
        let mut doc = HistogramDocument::new();
        for group in self.backgrounds.iter().chain(&self.signals) {
            doc.insert(group.name.clone(), group.histograms.nominal().clone());
            for variation in group.histograms.variations() {
                if let VariationKind::UpDown { up, down } = &variation.kind {
                    doc.insert(format!("{}_{}Up", group.name, variation.name), up.clone());
                    doc.insert(format!("{}_{}Down", group.name, variation.name), down.clone());
                }
            }
        }
        if let Some(observed) = &self.observed {
            doc.insert("data", observed.clone());
        }
        doc
    }
}

/// Output of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataMcReport {
    pub region: String,
    pub luminosity: f64,
    pub plots: Vec<DataMcPlot>,
    /// Yields above the threshold of the yield variable
    pub yields: YieldTable,
}

impl DataMcReport {
    pub fn plot(&self, variable: &str) -> Option<&DataMcPlot> {
        self.plots.iter().find(|p| p.variable == variable)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Background,
    Signal,
    Observed,
}

/// Builds data/MC plots for one region
pub struct DataMcPipeline<'a> {
    config: &'a AnalysisConfig,
    loader: Box<dyn SampleLoader + 'a>,
    chains: Chains,
    luminosity: f64,
}

impl<'a> DataMcPipeline<'a> {
    /// Pipeline reading samples from the configured source directory
    pub fn new(config: &'a AnalysisConfig) -> MonoxResult<Self> {
        Self::with_loader(config, DirectoryLoader::new(config.source_dir.clone()))
    }

    pub fn with_loader(config: &'a AnalysisConfig, loader: impl SampleLoader + 'a) -> MonoxResult<Self> {
        config.validate()?;
        let luminosity = config
            .effective_luminosity()
            .ok_or_else(|| ConfigError::MissingField("luminosity".to_string()))?;
        Ok(Self {
            config,
            loader: Box::new(loader),
            chains: Chains::build(config)?,
            luminosity,
        })
    }

    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    pub fn loader(&self) -> &dyn SampleLoader {
        self.loader.as_ref()
    }

    pub fn chains(&self) -> &Chains {
        &self.chains
    }

    /// Run one configured transfer ratio
    pub fn transfer(&self, name: &str) -> MonoxResult<TransferReport> {
        let transfer = self
            .config
            .transfers
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| MonoxError::UnknownTransfer(name.to_string()))?;
        TransferReport::run(self.config, transfer, self.loader(), &self.chains)
    }

    /// Run every configured transfer ratio
    pub fn transfers(&self) -> MonoxResult<Vec<TransferReport>> {
        self.config
            .transfers
            .iter()
            .map(|t| TransferReport::run(self.config, t, self.loader(), &self.chains))
            .collect()
    }

    fn blinded(&self, variable: &str) -> bool {
        self.config.is_sensitive(variable) && self.config.blind != 1
    }

    /// Fill every variable for one group member, scaled and normalized
    fn fill_member(&self, member: &GroupMember, role: Role) -> MonoxResult<Vec<FilledPlot>> {
        let sample = self
            .config
            .sample(member.sample())
            .ok_or_else(|| MonoxError::UnknownSample(member.sample().to_string()))?;
        let selection = member.selection(&self.config.region);
        let events = self.loader.load(sample, selection)?;

        let mut filler = PlotFiller::new(self.chains.for_sample(sample.data));
        for variable in &self.config.variables {
            let mut spec = PlotSpec::new(
                variable.name.as_str(),
                variable.expression(),
                variable.binning()?,
            )?
            .with_cut(&variable.cut)?;
            if let Some(weight) = &self.config.weight {
                spec = spec.with_reweight(weight)?;
            }
            if role == Role::Observed && self.blinded(&variable.name) {
                spec = spec.with_prescale(self.config.blind);
            }
            filler.add_plot(spec);
        }

        let mut plots = filler.fill(&events)?;
        let scale = sample.scale(self.luminosity);
        for (plot, variable) in plots.iter_mut().zip(&self.config.variables) {
            let normalization = variable.width_normalization();
            plot.try_for_each_histogram(|h| {
                h.scale(scale);
                if let Some(mode) = normalization {
                    h.normalize_by_width(mode)?;
                }
                if role == Role::Background {
                    h.clamp_non_negative();
                }
                Ok(())
            })?;
        }

        tracing::debug!(
            sample = %sample.name,
            selection,
            events = events.len(),
            scale,
            "filled sample"
        );
        Ok(plots)
    }

    /// Run over every sample and assemble the plots
    pub fn run(&self) -> MonoxResult<DataMcReport> {
        let config = self.config;
        let n_vars = config.variables.len();
        let yield_index = config
            .variables
            .iter()
            .position(|v| v.name == config.yields.variable);
        let mut yields = YieldTable::new();

        tracing::info!(
            region = %config.region,
            luminosity = self.luminosity,
            variables = n_vars,
            "running data/MC pipeline"
        );

        let mut backgrounds: Vec<Vec<Option<FilledPlot>>> = Vec::new();
        for group in &config.backgrounds {
            let booked = if config.yields.separate_groups.contains(&group.name) {
                group.name.as_str()
            } else {
                MC_YIELD
            };
            let mut sums: Vec<Option<FilledPlot>> = vec![None; n_vars];
            for member in &group.samples {
                let plots = self.fill_member(member, Role::Background)?;
                if let Some(i) = yield_index {
                    yields.add(booked, integrate_from(&plots[i].nominal, config.yields.threshold));
                }
                accumulate(&mut sums, plots)?;
            }
            backgrounds.push(sums);
        }

        let any_sensitive = config.variables.iter().any(|v| config.is_sensitive(&v.name));
        let mut signals: Vec<Vec<Option<FilledPlot>>> = Vec::new();
        if any_sensitive {
            for group in &config.signals {
                let mut sums: Vec<Option<FilledPlot>> = vec![None; n_vars];
                for member in &group.samples {
                    let plots = self.fill_member(member, Role::Signal)?;
                    if let Some(i) = yield_index.filter(|&i| config.is_sensitive(&config.variables[i].name)) {
                        yields.add(
                            member.sample(),
                            integrate_from(&plots[i].nominal, config.yields.threshold),
                        );
                    }
                    accumulate(&mut sums, plots)?;
                }
                signals.push(sums);
            }
        }

        let mut observed: Vec<Option<FilledPlot>> = vec![None; n_vars];
        for member in &config.observed.samples {
            let plots = self.fill_member(member, Role::Observed)?;
            accumulate(&mut observed, plots)?;
        }

        if yield_index.is_some() {
            tracing::info!(yields = %yields, "high-threshold yields");
        }

        let mut plots = Vec::with_capacity(n_vars);
        for (v, variable) in config.variables.iter().enumerate() {
            let sensitive = config.is_sensitive(&variable.name);
            let blind_scale = if self.blinded(&variable.name) {
                1.0 / config.blind as f64
            } else {
                1.0
            };

            let mut total: Option<FilledPlot> = None;
            let mut background_plots = Vec::new();
            for (group, sums) in config.backgrounds.iter().zip(backgrounds.iter_mut()) {
                let Some(mut plot) = sums[v].take() else {
                    tracing::warn!(group = %group.name, "background group has no samples");
                    continue;
                };
                plot.try_for_each_histogram(|h| {
                    h.scale(blind_scale);
                    Ok(())
                })?;
                match total.as_mut() {
                    Some(t) => t.merge(&plot)?,
                    None => total = Some(plot.clone()),
                }
                background_plots.push(GroupPlot {
                    name: group.name.clone(),
                    title: group.title.clone(),
                    color: group.color.clone(),
                    histograms: plot.into_variation_set()?,
                });
            }

            let mut signal_plots = Vec::new();
            if sensitive {
                for (group, sums) in config.signals.iter().zip(signals.iter_mut()) {
                    let Some(mut plot) = sums[v].take() else {
                        continue;
                    };
                    plot.try_for_each_histogram(|h| {
                        h.scale(blind_scale);
                        Ok(())
                    })?;
                    signal_plots.push(GroupPlot {
                        name: group.name.clone(),
                        title: group.title.clone(),
                        color: group.color.clone(),
                        histograms: plot.into_variation_set()?,
                    });
                }
            }

            let observed_hist = observed[v].take().map(|p| p.nominal);
            let total_set = total.map(FilledPlot::into_variation_set).transpose()?;
            let ratio = match (&observed_hist, &total_set) {
                (Some(obs), Some(bkg)) => Some(RatioBuilder::divide_pair(obs, bkg.nominal())?),
                _ => None,
            };

            let binning = variable.binning()?;
            plots.push(DataMcPlot {
                variable: variable.name.clone(),
                x_title: variable.x_title(),
                y_title: variable.y_title(&binning),
                sensitive,
                backgrounds: background_plots,
                signals: signal_plots,
                observed: observed_hist,
                background_total: total_set
                    .as_ref()
                    .map(|set| set.with_total_errors(config.symmetrization)),
                ratio,
            });
        }

        Ok(DataMcReport {
            region: config.region.clone(),
            luminosity: self.luminosity,
            plots,
            yields,
        })
    }
}

/// Add one sample's plots into per-variable group sums
fn accumulate(sums: &mut [Option<FilledPlot>], plots: Vec<FilledPlot>) -> MonoxResult<()> {
    for (sum, plot) in sums.iter_mut().zip(plots) {
        match sum {
            Some(existing) => existing.merge(&plot)?,
            None => *sum = Some(plot),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BinningConfig, GroupConfig, SampleConfig, VariableConfig};
    use crate::loader::MemoryLoader;
    use monox_selection::Event;

    fn config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.luminosity = Some(2.0);
        config.blind = 5;
        config.samples = vec![
            SampleConfig::data("sph", 2.0),
            SampleConfig::mc("wg"),
            SampleConfig::mc("zg"),
            SampleConfig::mc("add"),
        ];
        config.observed = GroupConfig::new("data", "Observed").with_samples(["sph"]);
        config.backgrounds = vec![
            GroupConfig::new("vg", "V+gamma").with_samples(["wg", "zg"]),
            GroupConfig::new("hfake", "Hadronic fakes").with_samples([GroupMember::Selected {
                sample: "sph".to_string(),
                selection: "hfake".to_string(),
            }]),
        ];
        config.signals = vec![GroupConfig::new("add", "ADD").with_samples(["add"])];
        let mut met = VariableConfig::new(
            "met",
            "MET",
            BinningConfig::Edges(vec![0.0, 100.0, 200.0, 300.0]),
        );
        met.normalize = false;
        config.variables = vec![met];
        config.yields.threshold = 200.0;
        config.sensitive_variables = vec!["met".to_string()];
        config
    }

    fn events(values: &[(f64, f64)]) -> Vec<Event> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(met, weight))| {
                Event::new(i as u64)
                    .with("met", met)
                    .with("weight", weight)
            })
            .collect()
    }

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with("sph", "monoph", events(&[(50.0, 1.0); 10]))
            .with("sph", "hfake", events(&[(250.0, 0.5), (250.0, 0.5)]))
            .with("wg", "monoph", events(&[(50.0, 1.0), (250.0, 1.0)]))
            .with("zg", "monoph", events(&[(150.0, 1.0), (250.0, -3.0)]))
            .with("add", "monoph", events(&[(250.0, 0.5)]))
    }

    #[test]
    fn test_blinded_stack() {
        let config = config();
        let pipeline = DataMcPipeline::with_loader(&config, loader()).unwrap();
        let report = pipeline.run().unwrap();
        let plot = report.plot("met").unwrap();

        // wg scaled by lumi 2; zg's negative bin clamped before summing
        assert_eq!(report.yields.get(MC_YIELD), Some(2.0));
        assert_eq!(report.yields.get("hfake"), Some(1.0));
        assert_eq!(report.yields.get("add"), Some(1.0));

        let vg = plot.backgrounds[0].histograms.nominal();
        assert!((vg.contents()[0] - 0.4).abs() < 1e-12);
        assert!((vg.contents()[1] - 0.4).abs() < 1e-12);
        assert!((vg.contents()[2] - 0.4).abs() < 1e-12);

        // Observed events 0 and 5 survive the 1-in-5 prescale
        let observed = plot.observed.as_ref().unwrap();
        assert_eq!(observed.content(0), 2.0);

        let total = plot.background_total.as_ref().unwrap();
        assert!((total.content(2) - 0.6).abs() < 1e-12);
        let ratio = plot.ratio.as_ref().unwrap();
        assert!((ratio.content(0) - 5.0).abs() < 1e-9);

        assert_eq!(plot.signals.len(), 1);
        assert!((plot.signals[0].histograms.nominal().content(2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unblinded_variable_has_no_signal() {
        let mut config = config();
        config.sensitive_variables.clear();
        let report = DataMcPipeline::with_loader(&config, loader())
            .unwrap()
            .run()
            .unwrap();
        let plot = report.plot("met").unwrap();
        assert!(plot.signals.is_empty());
        assert_eq!(report.yields.get("add"), None);
        assert_eq!(plot.observed.as_ref().unwrap().content(0), 10.0);
        assert!((plot.backgrounds[0].histograms.nominal().content(2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_sample_file() {
        let config = config();
        let pipeline =
            DataMcPipeline::with_loader(&config, MemoryLoader::new()).unwrap();
        assert!(matches!(pipeline.run(), Err(MonoxError::Io(_))));
    }

    #[test]
    fn test_document_names() {
        let config = config();
        let report = DataMcPipeline::with_loader(&config, loader())
            .unwrap()
            .run()
            .unwrap();
        let doc = report.plot("met").unwrap().to_document();
        assert_eq!(doc.names(), vec!["add", "data", "hfake", "vg"]);
    }
}
