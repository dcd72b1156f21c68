//! monox-io - Event sources and histogram documents
//!
//! This crate moves data in and out of the monox pipeline:
//!
//! - **Event sources**: flat CSV event samples with schema inference
//! - **Histogram documents**: JSON maps of named histograms, used both for
//!   correction-factor inputs and for stored plots
//! - **Nuisance discovery**: finds systematic variations from histogram names
//!
//! # Design
//!
//! All event readers implement the `EventSource` trait so the pipeline can
//! load samples without knowing their on-disk format.

pub mod csv_source;
pub mod document;
pub mod nuisance;
pub mod reader;
pub mod schema;

pub use csv_source::*;
pub use document::*;
pub use nuisance::*;
pub use reader::*;
pub use schema::*;
