//! monox-core - Analysis pipeline for monophoton and monojet searches
//!
//! This crate wires the histogram, selection and I/O crates into the
//! analysis workflows:
//!
//! - **AnalysisConfig**: samples, groups, variables and selection stages of one region
//! - **PlotFiller**: single pass over an event list filling many plots and their weight variations
//! - **DataMcPipeline**: stacked backgrounds, signals, blinded data, yields and data/MC ratios
//! - **TransferRatio**: region-to-region ratios with systematic envelopes
//! - **ShapeSummary**: discovered shape systematics and their ratio-panel ranges
//!
//! # Parallel filling
//!
//! With the `parallel` feature, [`PlotFiller`] shards the event list with
//! rayon and merges the per-shard histograms.

pub mod config;
pub mod error;
pub mod filler;
pub mod loader;
pub mod pipeline;
pub mod shapes;
pub mod transfer;

pub use config::*;
pub use error::*;
pub use filler::*;
pub use loader::*;
pub use pipeline::*;
pub use shapes::*;
pub use transfer::*;
