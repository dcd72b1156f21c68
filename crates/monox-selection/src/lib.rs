//! monox-selection - Event selection chains and the cut grammar
//!
//! This crate turns per-event fields into accept/reject decisions and
//! event weights:
//!
//! # Expression Syntax
//!
//! - **Comparisons**: `met > 170 && photons.pt < 1000`
//! - **Arithmetic**: `(met - 100) * 2 >= pt`, `event % 4 == 0`
//! - **Functions**: `abs(eta) < 1.4442`, `max(j1, j2) > 30`
//! - **Logic**: `(A || B) && !C`
//!
//! # Stages
//!
//! Cuts ([`ExpressionCut`], [`ThresholdCut`], [`RangeCut`], [`Prescale`])
//! and weight modifiers ([`ConstantWeight`], [`FieldWeight`],
//! [`BinnedWeight`], [`GraphWeight`]) are assembled into a
//! [`SelectionChain`] with [`ChainBuilder`].
//!
//! ```ignore
//! use monox_selection::*;
//!
//! let chain = SelectionChain::builder()
//!     .stage(ExpressionCut::parse("PhotonSelection", "pt > 175")?)
//!     .stage(ThresholdCut::new("HighMet", "met", 170.0).ignoring_decision())
//!     .stage(ConstantWeight::new("crosssection", 0.02))
//!     .build();
//! let result = chain.run(&event)?;
//! ```

pub mod ast;
pub mod chain;
pub mod error;
pub mod eval;
pub mod event;
pub mod parser;
pub mod stage;

pub use ast::*;
pub use chain::*;
pub use error::*;
pub use eval::*;
pub use event::*;
pub use parser::*;
pub use stage::*;
