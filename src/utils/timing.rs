use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

pub const TIMING_TARGET: &str = "topup.timing";

/// Emits a `request_received` event on creation and exactly one
/// `request_completed` event, either from [`RequestTimer::complete`] or on drop.
#[derive(Debug)]
pub struct RequestTimer {
    route: &'static str,
    request_id: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RequestTimer {
    pub fn start(route: &'static str, request_id: &str) -> Self {
        let timer = RequestTimer {
            route,
            request_id: request_id.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        };
        info!(
            target: TIMING_TARGET,
            event = "request_received",
            route = timer.route,
            request_id = %timer.request_id,
            received_at = %rfc3339(timer.started_at)
        );
        timer
    }

    pub fn complete(&mut self, status: u16, detail: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;
        let duration_ms = self.started_perf.elapsed().as_secs_f64() * 1000.0;
        info!(
            target: TIMING_TARGET,
            event = "request_completed",
            route = self.route,
            request_id = %self.request_id,
            started_at = %rfc3339(self.started_at),
            completed_at = %rfc3339(Utc::now()),
            duration_ms,
            status,
            detail
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.completed {
            self.complete(0, Some("dropped before completion"));
        }
    }
}
