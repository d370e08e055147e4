//! Structured logging utilities.
//!
//! Every pipeline log line starts with the run context so that all stages
//! of one submission can be grepped together. Submitter identities and
//! buffer contents never go through here; only the run id and the
//! optional non-PII display label do.

use std::fmt;

/// Logging context for a single pipeline run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub label: Option<String>,
}

impl LogContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            label: None,
        }
    }

    pub fn with_label(&self, label: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            label: Some(label.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "[run={}] [label={}]", self.run_id, label),
            None => write!(f, "[run={}]", self.run_id),
        }
    }
}

/// Shared body of the `log_*!` macros: `<ctx> <EVENT> key=value ...`.
///
/// Values are rendered with `Display`.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:expr, $ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__log::log!(
            $level,
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={} "),*), $($value),*)
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::__log::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::__log::Level::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::__log::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::__log_event!($crate::__log::Level::Debug, $($arg)+)
    };
}
