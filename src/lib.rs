//! weathervane: turns Buienradar station measurements into fixed-width bit
//! frames for a hardware weather display.
//!
//! Data flow for one cycle:
//! feed (`ingest::buienradar`) → `reconcile::merge` → `annotate` →
//! `frame::encode` → `transport::FrameSink`.
//!
//! `pipeline::Pipeline` wires the middle three steps together and keeps
//! the state that spans cycles.

pub mod model;
pub mod catalog;
pub mod bitio;
pub mod logging;

pub mod reconcile;
pub mod trend;
pub mod annotate;
pub mod weather;
pub mod frame;

pub mod ingest;
pub mod config;
pub mod transport;
pub mod pipeline;
