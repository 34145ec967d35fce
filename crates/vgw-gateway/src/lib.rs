//! WebSocket/HTTP adapter for the voice gateway: session store (C8),
//! per-connection supervisor (C9), wire codec (C11), and HTTP error
//! mapping (C12). Depends on `vgw-core` and `vgw-agent` for the turn
//! pipeline itself; provider instances are injected by the composition
//! root (mirrors `gglib-axum`'s relationship to `gglib-core`/`gglib-agent`).
#![deny(unsafe_code)]

pub mod error;
pub mod pacer;
pub mod routes;
pub mod session_store;
pub mod state;
pub mod supervisor;
pub mod wire;

pub use error::HttpError;
pub use routes::{create_router, CorsConfig};
pub use session_store::{SessionStore, SessionStoreConfig};
pub use state::AppState;
pub use supervisor::SupervisorDeps;
