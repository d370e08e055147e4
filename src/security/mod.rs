//! Security module.
//!
//! Provides buffer wiping for confidential documents and PII scrubbing for
//! backend-supplied study summaries.

pub mod pii;
pub mod wipe;

pub use pii::*;
pub use wipe::*;
