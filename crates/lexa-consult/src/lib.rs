//! lexa-consult
//!
//! The consultation session: one request at a time to the remote
//! consultation service, a hard client-side timeout, failures folded into the
//! transcript, and a token-by-token reveal of each reply.

pub mod client;
pub mod controller;
pub mod error;
pub mod reveal;

pub use client::{ConsultClient, ConsultRequest, HttpConsultClient};
pub use controller::{Phase, SessionConfig, SessionController, SessionSnapshot};
pub use error::ConsultError;
