use std::time::Duration;

use legitrack_store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    /// Lifetime of a bearer token issued by `/auth/login`.
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(store: SharedStore, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }
}
