//! Selection stages: cuts and weight modifiers
//!
//! Every stage looks at one event and reports a [`StageOutcome`]:
//!
//! - **Cuts** decide `pass`. A cut marked `ignore_decision` still records its
//!   result but never removes the event.
//! - **Modifiers** always pass and multiply the event weight. They may also
//!   report relative up/down factors for a systematic variation of that
//!   weight.

use crate::ast::{CutExpr, Value};
use crate::error::{SelectionError, SelectionResult};
use crate::eval::{EvalError, EvalResult, Evaluator};
use crate::event::Event;
use crate::parser::{parse_cut, parse_value};
use monox_hist::Histogram;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative up/down factors of one weight uncertainty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVariation {
    pub name: String,
    pub up: f64,
    pub down: f64,
}

/// What one stage says about one event
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub pass: bool,
    pub weight: f64,
    pub ignore_decision: bool,
    pub variations: Vec<WeightVariation>,
}

impl StageOutcome {
    /// Outcome of a cut
    pub fn cut(pass: bool, ignore_decision: bool) -> Self {
        Self {
            pass,
            weight: 1.0,
            ignore_decision,
            variations: Vec::new(),
        }
    }

    /// Outcome of a modifier
    pub fn weight(weight: f64) -> Self {
        Self {
            pass: true,
            weight,
            ignore_decision: false,
            variations: Vec::new(),
        }
    }

    pub fn with_variation(mut self, variation: WeightVariation) -> Self {
        self.variations.push(variation);
        self
    }

    /// Whether the chain must stop here
    pub fn rejects(&self) -> bool {
        !self.pass && !self.ignore_decision
    }
}

/// One step of a selection chain
pub trait SelectionStage: fmt::Debug + Send + Sync {
    /// Stage name, used in decision records and logs
    fn name(&self) -> &str;

    /// Evaluate the stage on one event
    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome>;
}

// === Cuts ===

/// A cut given as a cut-grammar expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionCut {
    name: String,
    expr: CutExpr,
    ignore_decision: bool,
}

impl ExpressionCut {
    pub fn new(name: impl Into<String>, expr: CutExpr) -> Self {
        Self {
            name: name.into(),
            expr,
            ignore_decision: false,
        }
    }

    /// Parse the cut from a string
    pub fn parse(name: impl Into<String>, cut: &str) -> SelectionResult<Self> {
        Ok(Self::new(name, parse_cut(cut)?))
    }

    /// Record the decision without acting on it
    pub fn ignoring_decision(mut self) -> Self {
        self.ignore_decision = true;
        self
    }

    pub fn expr(&self) -> &CutExpr {
        &self.expr
    }
}

impl SelectionStage for ExpressionCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let pass = Evaluator::new(event).evaluate(&self.expr)?;
        Ok(StageOutcome::cut(pass, self.ignore_decision))
    }
}

/// Passes when `field >= min`
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCut {
    name: String,
    field: String,
    min: f64,
    ignore_decision: bool,
}

impl ThresholdCut {
    pub fn new(name: impl Into<String>, field: impl Into<String>, min: f64) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            min,
            ignore_decision: false,
        }
    }

    pub fn ignoring_decision(mut self) -> Self {
        self.ignore_decision = true;
        self
    }
}

impl SelectionStage for ThresholdCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let v = field(event, &self.field)?;
        Ok(StageOutcome::cut(v >= self.min, self.ignore_decision))
    }
}

/// Passes when `min <= field <= max`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCut {
    name: String,
    field: String,
    min: f64,
    max: f64,
    ignore_decision: bool,
}

impl RangeCut {
    pub fn new(name: impl Into<String>, field: impl Into<String>, min: f64, max: f64) -> SelectionResult<Self> {
        let name = name.into();
        if !(min <= max) {
            return Err(SelectionError::invalid_stage(
                name,
                format!("empty range [{}, {}]", min, max),
            ));
        }
        Ok(Self {
            name,
            field: field.into(),
            min,
            max,
            ignore_decision: false,
        })
    }

    pub fn ignoring_decision(mut self) -> Self {
        self.ignore_decision = true;
        self
    }
}

impl SelectionStage for RangeCut {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let v = field(event, &self.field)?;
        Ok(StageOutcome::cut(
            v >= self.min && v <= self.max,
            self.ignore_decision,
        ))
    }
}

/// Keeps one event in `factor`, by event number
///
/// This is the blinding selection: only events with `number % factor == 0`
/// pass. A factor of 1 keeps every event.
#[derive(Debug, Clone, PartialEq)]
pub struct Prescale {
    name: String,
    factor: u64,
    ignore_decision: bool,
}

impl Prescale {
    pub fn new(factor: u64) -> SelectionResult<Self> {
        if factor == 0 {
            return Err(SelectionError::invalid_stage("Prescale", "factor must be at least 1"));
        }
        Ok(Self {
            name: "Prescale".to_string(),
            factor,
            ignore_decision: false,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn factor(&self) -> u64 {
        self.factor
    }

    pub fn ignoring_decision(mut self) -> Self {
        self.ignore_decision = true;
        self
    }
}

impl SelectionStage for Prescale {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        Ok(StageOutcome::cut(
            event.number % self.factor == 0,
            self.ignore_decision,
        ))
    }
}

// === Modifiers ===

/// Multiplies every event by a fixed weight
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantWeight {
    name: String,
    weight: f64,
    uncertainty: Option<(f64, f64)>,
}

impl ConstantWeight {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            uncertainty: None,
        }
    }

    /// Attach a relative uncertainty; reported as factors `1 + up` and `1 - down`
    pub fn with_uncertainty(mut self, up: f64, down: f64) -> Self {
        self.uncertainty = Some((1.0 + up, 1.0 - down));
        self
    }
}

impl SelectionStage for ConstantWeight {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, _event: &Event) -> EvalResult<StageOutcome> {
        let outcome = StageOutcome::weight(self.weight);
        Ok(match self.uncertainty {
            Some((up, down)) => outcome.with_variation(WeightVariation {
                name: self.name.clone(),
                up,
                down,
            }),
            None => outcome,
        })
    }
}

/// Multiplies the weight by a numeric expression of the event
///
/// With a single field name this is a per-event weight column; with a
/// formula it is an analytic reweighting function.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWeight {
    name: String,
    value: Value,
}

impl FieldWeight {
    pub fn new(name: impl Into<String>, expression: &str) -> SelectionResult<Self> {
        Ok(Self {
            name: name.into(),
            value: parse_value(expression)?,
        })
    }
}

impl SelectionStage for FieldWeight {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let w = Evaluator::new(event).evaluate_value(&self.value)?;
        Ok(StageOutcome::weight(w))
    }
}

/// Looks the weight up in a histogram of factors
///
/// Values outside the histogram use the first or last bin. With
/// `with_error_variation` the bin error gives an up/down variation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedWeight {
    name: String,
    input: Value,
    factors: Histogram,
    error_variation: bool,
}

impl BinnedWeight {
    pub fn new(name: impl Into<String>, expression: &str, factors: Histogram) -> SelectionResult<Self> {
        Ok(Self {
            name: name.into(),
            input: parse_value(expression)?,
            factors,
            error_variation: false,
        })
    }

    pub fn with_error_variation(mut self) -> Self {
        self.error_variation = true;
        self
    }

    /// Clamped bin lookup
    fn bin_for(&self, x: f64) -> usize {
        let binning = self.factors.binning();
        match binning.find_bin(x) {
            Some(bin) => bin,
            None if x >= binning.upper_limit() => self.factors.n_bins() - 1,
            None => 0,
        }
    }
}

impl SelectionStage for BinnedWeight {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let x = Evaluator::new(event).evaluate_value(&self.input)?;
        let bin = self.bin_for(x);
        let w = self.factors.content(bin);
        let outcome = StageOutcome::weight(w);
        if !self.error_variation {
            return Ok(outcome);
        }

        let rel = if w != 0.0 {
            self.factors.error(bin) / w
        } else {
            0.0
        };
        Ok(outcome.with_variation(WeightVariation {
            name: self.name.clone(),
            up: 1.0 + rel,
            down: 1.0 - rel,
        }))
    }
}

/// Piecewise-linear weight over increasing x points
///
/// Below the first point the first y is used, above the last point the last
/// y.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphWeight {
    name: String,
    input: Value,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl GraphWeight {
    pub fn new(name: impl Into<String>, expression: &str, x: Vec<f64>, y: Vec<f64>) -> SelectionResult<Self> {
        let name = name.into();
        if x.is_empty() || x.len() != y.len() {
            return Err(SelectionError::invalid_stage(
                name,
                format!("need matching non-empty points, got {} x and {} y", x.len(), y.len()),
            ));
        }
        if x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SelectionError::invalid_stage(
                name,
                "x values must be strictly increasing",
            ));
        }
        Ok(Self {
            input: parse_value(expression)?,
            name,
            x,
            y,
        })
    }

    /// Interpolated value at `x`
    pub fn interpolate(&self, x: f64) -> f64 {
        let n = self.x.len();
        let upper = self.x.partition_point(|&p| p <= x);
        if upper == n {
            self.y[n - 1]
        } else if upper == 0 {
            self.y[0]
        } else {
            let low = upper - 1;
            let dlow = x - self.x[low];
            let dhigh = self.x[upper] - x;
            (self.y[low] * dhigh + self.y[upper] * dlow) / (self.x[upper] - self.x[low])
        }
    }
}

impl SelectionStage for GraphWeight {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, event: &Event) -> EvalResult<StageOutcome> {
        let x = Evaluator::new(event).evaluate_value(&self.input)?;
        Ok(StageOutcome::weight(self.interpolate(x)))
    }
}

fn field(event: &Event, name: &str) -> EvalResult<f64> {
    event
        .get(name)
        .ok_or_else(|| EvalError::FieldNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use monox_hist::Binning;

    #[test]
    fn test_threshold_and_range() {
        let high_met = ThresholdCut::new("HighMet", "met", 170.0);
        let event = Event::new(1).with("met", 170.0).with("mt", 90.0);
        assert!(high_met.evaluate(&event).unwrap().pass);

        let mt = RangeCut::new("MtRange", "mt", 40.0, 150.0).unwrap();
        assert!(mt.evaluate(&event).unwrap().pass);
        assert!(!mt
            .evaluate(&Event::new(2).with("mt", 151.0))
            .unwrap()
            .pass);
        assert!(RangeCut::new("bad", "mt", 2.0, 1.0).is_err());
    }

    #[test]
    fn test_ignore_decision() {
        let cut = ThresholdCut::new("HighMet", "met", 170.0).ignoring_decision();
        let outcome = cut.evaluate(&Event::new(1).with("met", 10.0)).unwrap();
        assert!(!outcome.pass);
        assert!(outcome.ignore_decision);
        assert!(!outcome.rejects());
    }

    #[test]
    fn test_missing_field() {
        let cut = ThresholdCut::new("HighMet", "met", 170.0);
        assert!(cut.evaluate(&Event::new(1)).is_err());
    }

    #[test]
    fn test_prescale() {
        let blind = Prescale::new(4).unwrap();
        assert!(blind.evaluate(&Event::new(8)).unwrap().pass);
        assert!(!blind.evaluate(&Event::new(9)).unwrap().pass);
        assert!(Prescale::new(1)
            .unwrap()
            .evaluate(&Event::new(9))
            .unwrap()
            .pass);
        assert!(Prescale::new(0).is_err());
    }

    #[test]
    fn test_constant_weight_variation() {
        let xsec = ConstantWeight::new("extraSF", 1.01).with_uncertainty(0.05, 0.03);
        let outcome = xsec.evaluate(&Event::new(1)).unwrap();
        assert_eq!(outcome.weight, 1.01);
        assert_eq!(outcome.variations.len(), 1);
        assert!((outcome.variations[0].up - 1.05).abs() < 1e-12);
        assert!((outcome.variations[0].down - 0.97).abs() < 1e-12);
    }

    #[test]
    fn test_field_weight_formula() {
        let w = FieldWeight::new("kfactor", "1.2 + 0.001 * pt").unwrap();
        let outcome = w.evaluate(&Event::new(1).with("pt", 200.0)).unwrap();
        assert!((outcome.weight - 1.4).abs() < 1e-12);
        assert!(outcome.pass);
    }

    #[test]
    fn test_binned_weight_clamps() {
        let binning = Binning::new(vec![100.0, 200.0, 400.0]).unwrap();
        let factors = Histogram::from_parts(binning, vec![0.9, 1.1], vec![0.01, 0.0]).unwrap();
        let w = BinnedWeight::new("PhotonPtWeight", "pt", factors)
            .unwrap()
            .with_error_variation();

        let at = |pt: f64| w.evaluate(&Event::new(1).with("pt", pt)).unwrap();
        assert_eq!(at(50.0).weight, 0.9);
        assert_eq!(at(250.0).weight, 1.1);
        assert_eq!(at(5000.0).weight, 1.1);

        let low = at(150.0);
        assert!((low.variations[0].up - (1.0 + 0.1 / 0.9)).abs() < 1e-12);
    }

    #[test]
    fn test_graph_weight() {
        let w = GraphWeight::new("trigger", "met", vec![0.0, 100.0, 200.0], vec![0.5, 0.9, 1.0])
            .unwrap();
        assert_eq!(w.interpolate(-10.0), 0.5);
        assert!((w.interpolate(50.0) - 0.7).abs() < 1e-12);
        assert_eq!(w.interpolate(100.0), 0.9);
        assert_eq!(w.interpolate(500.0), 1.0);

        assert!(GraphWeight::new("bad", "met", vec![0.0, 0.0], vec![1.0, 1.0]).is_err());
        assert!(GraphWeight::new("bad", "met", vec![0.0], vec![]).is_err());
    }
}
