//! lexa-core
//!
//! Pure domain types and response shaping for the Lexa consultation front end.
//! No network dependency: this is the shared vocabulary of every other crate.

pub mod error;
pub mod markup;
pub mod models;
pub mod reply;
pub mod shape;
pub mod validation;
