//! Error plumbing for the flowsmith crates.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error enums
//! and wraps them in a rootcause `Report` at I/O boundaries, where callers add
//! their own context as the error travels up.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
