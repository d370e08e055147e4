//! Duplicate detection.

pub mod guard;

pub use guard::{DuplicateGuard, DuplicateSource};
