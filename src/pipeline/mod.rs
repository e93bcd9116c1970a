//! Pipeline entry points.
//!
//! - `run_check`: Fetch, diff against the snapshot, notify, persist
//! - `calculate_diff`: Classify the current listing against the previous one

pub mod check;
pub mod diff;

pub use check::{CheckOptions, CheckOutcome, CheckReport, run_check, run_check_with};
pub use diff::{DiffCalculator, DiffResult, calculate_diff, classify};
