//! lexa-storage
//!
//! Client-local persisted state. The only thing Lexa keeps between runs is
//! the opaque session identifier forwarded with every consultation request.

pub mod error;
pub mod file;
pub mod memory;
pub mod session;

use crate::error::StorageError;

/// Key/value access to client-local storage.
///
/// Implementations must be safe to share between the session controller and
/// whatever front end hosts it.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
