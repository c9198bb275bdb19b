//! lexa-app library root.
//!
//! Host-side wiring for a Lexa front end: on-disk configuration, tracing
//! setup, and construction of the session controller and search client.

pub mod config;
pub mod state;
pub mod telemetry;
