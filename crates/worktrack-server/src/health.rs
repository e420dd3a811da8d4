//! `/health` endpoint body.

use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"healthy"` when the database answers, `"degraded"` otherwise.
    pub status: &'static str,
    pub uptime_secs: u64,
    /// Current WebSocket connection count.
    pub connections: usize,
    /// Open form sessions.
    pub sessions: usize,
    pub database: &'static str,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    sessions: usize,
    db_ok: bool,
) -> HealthResponse {
    HealthResponse {
        status: if db_ok { "healthy" } else { "degraded" },
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        sessions,
        database: if db_ok { "ok" } else { "error" },
    }
}
