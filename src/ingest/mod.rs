//! Weather feed clients.
//!
//! Each submodule turns one provider's response into per-station `Record`s
//! keyed by station number, ready for `reconcile::merge`.
//!
//! Submodules:
//! - `buienradar`: Buienradar JSON feed (data.buienradar.nl)

pub mod buienradar;
