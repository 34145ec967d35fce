//! Hook & metric fabric (spec component C10).
//!
//! Mirrors `gglib-axum::sse::AppEventEmitter`: a narrow observation-point
//! trait infrastructure wires up to whatever sink it likes (SSE broadcast,
//! tracing, a test probe), decoupled from the turn pipeline that calls it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::turn_event::TurnEvent;
use crate::error::ErrorCode;

/// Receives every [`TurnEvent`] a session's turn runner emits, in order.
/// Implementations must not block the turn pipeline — hand off to a
/// channel/task if the sink does I/O.
pub trait TurnHookSink: Send + Sync {
    fn on_event(&self, session_id: &str, event: &TurnEvent);
}

/// A no-op sink, useful as a default and in tests.
#[derive(Default)]
pub struct NullHookSink;

impl TurnHookSink for NullHookSink {
    fn on_event(&self, _session_id: &str, _event: &TurnEvent) {}
}

/// In-memory per-component error counters (supplemented ambient feature:
/// a snapshot, not a full metrics exporter).
#[derive(Default)]
pub struct ErrorCounters {
    counts: Mutex<HashMap<&'static str, AtomicU64>>,
}

impl ErrorCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, code: ErrorCode) {
        let mut counts = self.counts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        counts.entry(code.component()).or_insert_with(|| AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
    }

    /// A snapshot of component -> error count, for the health endpoint.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        let counts = self.counts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        counts.iter().map(|(k, v)| (*k, v.load(Ordering::Relaxed))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_component() {
        let counters = ErrorCounters::new();
        counters.record(ErrorCode::SttError);
        counters.record(ErrorCode::SttError);
        counters.record(ErrorCode::LlmError);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.get("stt"), Some(&2));
        assert_eq!(snapshot.get("llm"), Some(&1));
    }
}
