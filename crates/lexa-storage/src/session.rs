use uuid::Uuid;

use crate::SessionStore;
use crate::error::StorageError;

/// Storage key holding the session identifier.
pub const USER_ID_KEY: &str = "user_id";

/// Read the session identifier, generating and persisting one if absent.
///
/// An unreadable store counts as absent; the fresh identifier overwrites it.
///
/// The identifier is opaque. It has no server-side counterpart and is only
/// forwarded with each request.
pub fn session_id(store: &dyn SessionStore) -> Result<String, StorageError> {
    let stored = match store.get(USER_ID_KEY) {
        Ok(stored) => stored,
        Err(err @ (StorageError::Corrupt { .. } | StorageError::Serialization(_))) => {
            tracing::warn!(error = %err, "session store unreadable, issuing a new identifier");
            None
        }
        Err(err) => return Err(err),
    };
    if let Some(existing) = stored.filter(|id| !id.trim().is_empty()) {
        return Ok(existing);
    }

    let id = format!("user_{}", Uuid::new_v4().simple());
    store.set(USER_ID_KEY, &id)?;
    tracing::info!(user_id = %id, "generated new session identifier");
    Ok(id)
}
