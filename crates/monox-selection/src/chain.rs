//! Ordered selection chains
//!
//! A [`SelectionChain`] runs its stages in order on one event. Event weights
//! multiply along the chain. The chain stops at the first cut that fails
//! without ignoring its decision.

use crate::eval::EvalResult;
use crate::event::Event;
use crate::stage::{SelectionStage, WeightVariation};
use serde::{Deserialize, Serialize};

/// The recorded result of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDecision {
    pub stage: String,
    pub pass: bool,
}

/// Result of running a chain on one event
#[derive(Debug, Clone, PartialEq)]
pub struct ChainResult {
    pub accepted: bool,
    pub weight: f64,
    /// One record per evaluated stage, in order
    pub decisions: Vec<StageDecision>,
    /// Weight variations reported by modifiers
    pub variations: Vec<WeightVariation>,
}

impl ChainResult {
    /// Decision of a named stage, if it was evaluated
    pub fn decision(&self, stage: &str) -> Option<bool> {
        self.decisions
            .iter()
            .find(|d| d.stage == stage)
            .map(|d| d.pass)
    }
}

/// Ordered list of selection stages
#[derive(Debug, Default)]
pub struct SelectionChain {
    stages: Vec<Box<dyn SelectionStage>>,
}

impl SelectionChain {
    /// A chain that accepts everything with weight 1
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage on `event`
    pub fn run(&self, event: &Event) -> EvalResult<ChainResult> {
        let mut result = ChainResult {
            accepted: true,
            weight: 1.0,
            decisions: Vec::with_capacity(self.stages.len()),
            variations: Vec::new(),
        };

        for stage in &self.stages {
            let outcome = stage.evaluate(event)?;
            result.decisions.push(StageDecision {
                stage: stage.name().to_string(),
                pass: outcome.pass,
            });
            if outcome.rejects() {
                result.accepted = false;
                return Ok(result);
            }
            result.weight *= outcome.weight;
            result.variations.extend(outcome.variations);
        }

        Ok(result)
    }
}

/// Explicit, ordered construction of a [`SelectionChain`]
#[derive(Debug, Default)]
pub struct ChainBuilder {
    stages: Vec<Box<dyn SelectionStage>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn stage<S: SelectionStage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append an already boxed stage
    pub fn boxed(mut self, stage: Box<dyn SelectionStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> SelectionChain {
        SelectionChain {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{ConstantWeight, ExpressionCut, FieldWeight, ThresholdCut};

    fn chain() -> SelectionChain {
        SelectionChain::builder()
            .stage(ExpressionCut::parse("PhotonSelection", "pt > 175").unwrap())
            .stage(ThresholdCut::new("HighMet", "met", 170.0).ignoring_decision())
            .stage(ConstantWeight::new("crosssection", 0.5).with_uncertainty(0.1, 0.1))
            .stage(ExpressionCut::parse("JetVeto", "njets < 2").unwrap())
            .stage(FieldWeight::new("PUWeight", "puweight").unwrap())
            .build()
    }

    #[test]
    fn test_chain_accepts() {
        let event = Event::new(1)
            .with("pt", 200.0)
            .with("met", 100.0)
            .with("njets", 1.0)
            .with("puweight", 0.8);
        let result = chain().run(&event).unwrap();

        assert!(result.accepted);
        assert!((result.weight - 0.4).abs() < 1e-12);
        assert_eq!(result.decisions.len(), 5);
        // recorded but ignored
        assert_eq!(result.decision("HighMet"), Some(false));
        assert_eq!(result.variations.len(), 1);
    }

    #[test]
    fn test_chain_stops_at_first_failure() {
        // puweight is missing; the chain must stop before reading it
        let event = Event::new(1)
            .with("pt", 200.0)
            .with("met", 300.0)
            .with("njets", 3.0);
        let result = chain().run(&event).unwrap();

        assert!(!result.accepted);
        assert_eq!(result.decisions.len(), 4);
        assert_eq!(result.decision("JetVeto"), Some(false));
        assert_eq!(result.decision("PUWeight"), None);
    }

    #[test]
    fn test_chain_propagates_eval_errors() {
        let event = Event::new(1).with("pt", 200.0);
        assert!(chain().run(&event).is_err());
    }

    #[test]
    fn test_empty_chain() {
        let chain = SelectionChain::new();
        let result = chain.run(&Event::new(3)).unwrap();
        assert!(result.accepted);
        assert_eq!(result.weight, 1.0);
        assert!(chain.is_empty());
    }
}
