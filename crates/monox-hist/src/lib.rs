//! monox-hist - Histograms with systematic variations
//!
//! This crate provides the statistical core shared by every monox plot:
//!
//! - **Binning**: validated bin edges with an optional overflow bin
//! - **Histogram**: weighted fills with per-bin sum of weights and sum of squared weights
//! - **VariationSet**: a nominal histogram plus named systematic variations
//! - **Ratio**: bin-by-bin division with statistical propagation and systematic envelopes
//! - **Yields**: width-weighted integrals above or below a threshold
//!
//! # Lifecycle
//!
//! Histograms are filled, optionally combined or scaled, then queried.
//! Filling is commutative, so event streams can be sharded, filled into
//! independent histograms and merged with [`Histogram::add`].

pub mod binning;
pub mod error;
pub mod histogram;
pub mod ratio;
pub mod variation;
pub mod yields;

pub use binning::*;
pub use error::*;
pub use histogram::*;
pub use ratio::*;
pub use variation::*;
pub use yields::*;
