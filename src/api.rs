//! HTTP API for the chat companion
//!
//! A thin surface over [`SessionManager`]: create a session, submit
//! messages, read or drop the transcript.

mod assets;
mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SessionManager>,
}

impl AppState {
    pub fn new(runtime: SessionManager) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
