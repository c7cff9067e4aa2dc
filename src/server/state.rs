use std::sync::Arc;

use crate::auth::AuthGate;
use crate::config::Credentials;
use crate::store::ResourceStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthGate>,
    pub store: Arc<ResourceStore>,
}

impl AppState {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_gate(AuthGate::new(credentials))
    }

    /// Create around a prepared gate (e.g. one with a test clock)
    pub fn with_gate(gate: AuthGate) -> Self {
        Self {
            auth: Arc::new(gate),
            store: Arc::new(ResourceStore::new()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.auth.credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(Credentials::default());

        assert_eq!(state.credentials().username, "admin");
        assert_eq!(state.store.pool_count(), 0);
        assert_eq!(state.auth.token_count(), 0);
    }

    #[test]
    fn test_clones_share_store() {
        let state = AppState::new(Credentials::default());
        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.store, &clone.store));
        assert!(Arc::ptr_eq(&state.auth, &clone.auth));
    }
}
