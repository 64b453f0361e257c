use std::sync::Arc;

use tracing::warn;

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the raw bearer token
pub const TOKEN_KEY: &str = "token";

/// Accessor for the one credential slot.
/// Clone is cheap - all clones share the same backing store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Get the stored token, if any.
    /// A read failure is logged and reported as no token.
    pub fn get_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read token from storage");
                None
            }
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn remove_token(&self) -> Result<(), StorageError> {
        self.store.remove(TOKEN_KEY)
    }

    pub fn has_token(&self) -> bool {
        self.get_token().is_some()
    }
}
