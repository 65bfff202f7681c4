//! Core types shared across the flowsmith crates.
//!
//! This crate provides the identifier newtypes used by workflow graphs and the
//! `Result` alias that boundary operations report errors through.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{EdgeId, NodeId, ParseIdError};
