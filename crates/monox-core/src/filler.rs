//! Single-pass filling of many plots
//!
//! The baseline chain runs once per event; every plot then applies its own
//! cut, value expression and reweighting. Weight variations reported by the
//! chain fill `up`/`down` companions of each plot, so one pass yields the
//! nominal histogram and all of its weight systematics.

use monox_hist::{Binning, HistResult, Histogram, VariationKind, VariationSet};
use monox_selection::{
    parse_cut, parse_value, CutExpr, Evaluator, Event, SelectionChain, Value, WeightVariation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::MonoxResult;

/// Events per shard when filling in parallel
#[cfg(feature = "parallel")]
const SHARD_SIZE: usize = 4096;

/// One histogram to fill during a pass
#[derive(Debug, Clone)]
pub struct PlotSpec {
    name: String,
    value: Value,
    cut: CutExpr,
    reweight: Option<Value>,
    prescale: Option<u64>,
    binning: Binning,
}

impl PlotSpec {
    pub fn new(name: impl Into<String>, expression: &str, binning: Binning) -> MonoxResult<Self> {
        Ok(Self {
            name: name.into(),
            value: parse_value(expression)?,
            cut: CutExpr::All,
            reweight: None,
            prescale: None,
            binning,
        })
    }

    /// Restrict the plot to events passing `cut`
    pub fn with_cut(mut self, cut: &str) -> MonoxResult<Self> {
        self.cut = parse_cut(cut)?;
        Ok(self)
    }

    /// Multiply each event's weight by an expression
    pub fn with_reweight(mut self, expression: &str) -> MonoxResult<Self> {
        self.reweight = Some(parse_value(expression)?);
        Ok(self)
    }

    /// Keep only events whose number is divisible by `factor`
    pub fn with_prescale(mut self, factor: u64) -> Self {
        self.prescale = (factor > 1).then_some(factor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    /// Weight of `event` in this plot, or `None` when the plot rejects it
    fn accept(&self, event: &Event, weight: f64) -> MonoxResult<Option<(f64, f64)>> {
        if let Some(factor) = self.prescale {
            if event.number % factor != 0 {
                return Ok(None);
            }
        }
        let eval = Evaluator::new(event);
        if !eval.evaluate(&self.cut)? {
            return Ok(None);
        }
        let x = eval.evaluate_value(&self.value)?;
        let w = match &self.reweight {
            Some(expr) => weight * eval.evaluate_value(expr)?,
            None => weight,
        };
        Ok(Some((x, w)))
    }
}

/// A filled plot: nominal histogram plus weight-variation companions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledPlot {
    pub name: String,
    pub nominal: Histogram,
    /// Variation name to (up, down)
    pub variations: BTreeMap<String, (Histogram, Histogram)>,
}

impl FilledPlot {
    pub fn new(name: impl Into<String>, binning: Binning) -> Self {
        Self {
            name: name.into(),
            nominal: Histogram::new(binning),
            variations: BTreeMap::new(),
        }
    }

    /// Fill one observation
    ///
    /// A variation seen for the first time starts as a copy of the nominal.
    /// Variations an event does not report are filled with the nominal
    /// weight.
    pub fn fill(&mut self, x: f64, weight: f64, reported: &[WeightVariation]) {
        for v in reported {
            if !self.variations.contains_key(&v.name) {
                let base = self.nominal.clone();
                self.variations.insert(v.name.clone(), (base.clone(), base));
            }
        }

        self.nominal.fill(x, weight);
        for (name, (up, down)) in self.variations.iter_mut() {
            let (fu, fd) = reported
                .iter()
                .find(|v| &v.name == name)
                .map(|v| (v.up, v.down))
                .unwrap_or((1.0, 1.0));
            up.fill(x, weight * fu);
            down.fill(x, weight * fd);
        }
    }

    /// Apply `f` to the nominal and every variation histogram
    pub fn try_for_each_histogram<F>(&mut self, mut f: F) -> HistResult<()>
    where
        F: FnMut(&mut Histogram) -> HistResult<()>,
    {
        f(&mut self.nominal)?;
        for (up, down) in self.variations.values_mut() {
            f(up)?;
            f(down)?;
        }
        Ok(())
    }

    /// Add a plot filled from a disjoint set of events
    ///
    /// A variation missing on either side counts as that side's nominal.
    pub fn merge(&mut self, other: &FilledPlot) -> HistResult<()> {
        for name in other.variations.keys() {
            if !self.variations.contains_key(name) {
                let base = self.nominal.clone();
                self.variations.insert(name.clone(), (base.clone(), base));
            }
        }
        for (name, (up, down)) in self.variations.iter_mut() {
            let (other_up, other_down) = match other.variations.get(name) {
                Some((u, d)) => (u, d),
                None => (&other.nominal, &other.nominal),
            };
            up.add(other_up)?;
            down.add(other_down)?;
        }
        self.nominal.add(&other.nominal)
    }

    /// Convert into a variation set with one `UpDown` entry per variation
    pub fn into_variation_set(self) -> HistResult<VariationSet> {
        let mut set = VariationSet::new(self.nominal);
        for (name, (up, down)) in self.variations {
            set.register(name, VariationKind::UpDown { up, down })?;
        }
        Ok(set)
    }
}

/// Fills a list of plots from events passing a baseline chain
#[derive(Debug)]
pub struct PlotFiller<'a> {
    chain: &'a SelectionChain,
    plots: Vec<PlotSpec>,
}

impl<'a> PlotFiller<'a> {
    pub fn new(chain: &'a SelectionChain) -> Self {
        Self {
            chain,
            plots: Vec::new(),
        }
    }

    pub fn add_plot(&mut self, plot: PlotSpec) {
        self.plots.push(plot);
    }

    pub fn with_plot(mut self, plot: PlotSpec) -> Self {
        self.add_plot(plot);
        self
    }

    pub fn plots(&self) -> &[PlotSpec] {
        &self.plots
    }

    fn empty_plots(&self) -> Vec<FilledPlot> {
        self.plots
            .iter()
            .map(|p| FilledPlot::new(p.name.clone(), p.binning.clone()))
            .collect()
    }

    /// Fill every plot in one pass over `events`
    ///
    /// Returns the filled plots in the order they were added.
    pub fn fill(&self, events: &[Event]) -> MonoxResult<Vec<FilledPlot>> {
        #[cfg(feature = "parallel")]
        let filled = events
            .par_chunks(SHARD_SIZE)
            .map(|shard| self.fill_serial(shard))
            .try_reduce(
                || self.empty_plots(),
                |mut acc, shard| {
                    for (plot, part) in acc.iter_mut().zip(shard) {
                        plot.merge(&part)?;
                    }
                    Ok(acc)
                },
            )?;

        #[cfg(not(feature = "parallel"))]
        let filled = self.fill_serial(events)?;

        tracing::debug!(
            events = events.len(),
            plots = self.plots.len(),
            "filled plots"
        );
        Ok(filled)
    }

    fn fill_serial(&self, events: &[Event]) -> MonoxResult<Vec<FilledPlot>> {
        let mut filled = self.empty_plots();
        for event in events {
            let result = self.chain.run(event)?;
            if !result.accepted {
                continue;
            }
            for (spec, plot) in self.plots.iter().zip(filled.iter_mut()) {
                if let Some((x, w)) = spec.accept(event, result.weight)? {
                    plot.fill(x, w, &result.variations);
                }
            }
        }
        Ok(filled)
    }
}
