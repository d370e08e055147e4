//! Run context.
//!
//! One per pipeline call. Carries the run id used to correlate every log
//! line of a submission, and the optional display label.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

const MAX_LABEL_CHARS: usize = 64;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    log: LogContext,
}

impl RunContext {
    pub fn new(display_name: Option<&str>) -> Self {
        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);
        let base = LogContext::new(&run_id);

        let log = match display_name.map(sanitize_label).filter(|l| !l.is_empty()) {
            Some(label) => base.with_label(&label),
            None => base,
        };

        Self {
            run_id,
            started_at: Utc::now(),
            log,
        }
    }

    pub fn log_context(&self) -> &LogContext {
        &self.log
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

/// Labels go into single-line logs: drop control characters and
/// collapse whitespace.
fn sanitize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_LABEL_CHARS)
        .collect()
}
