//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use docsum_core::ports::{CredentialStore, TokenService};
use docsum_core::{AccessGate, DocumentPipeline};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn CredentialStore>,
    pub tokens: Arc<dyn TokenService>,
    pub gate: AccessGate,
    pub pipeline: DocumentPipeline,
}

impl AppState {
    /// Wires the access gate to the same credential store and token service
    /// the handlers use.
    pub fn new(
        config: Arc<Config>,
        users: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenService>,
        pipeline: DocumentPipeline,
    ) -> Self {
        let gate = AccessGate::new(tokens.clone(), users.clone());
        Self {
            config,
            users,
            tokens,
            gate,
            pipeline,
        }
    }
}
