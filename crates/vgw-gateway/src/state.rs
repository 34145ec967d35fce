//! Shared Axum state (mirrors `gglib-axum::state::AppState`: a single
//! `Arc` handed to every handler via `.with_state()`).

use std::sync::Arc;

use crate::supervisor::SupervisorDeps;

pub type AppState = Arc<SupervisorDeps>;
