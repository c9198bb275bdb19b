//! lexa-search
//!
//! Clients for the remote legal search, AI analysis, and document services.
//! Payloads from all three are loosely shaped; parsing is delegated to the
//! pure functions in `lexa_core::shape` and `lexa_core::reply`.

pub mod client;
pub mod error;

pub use client::{SearchClient, SearchEndpoints};
pub use error::SearchError;
