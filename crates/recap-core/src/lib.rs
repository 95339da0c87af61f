//! Shared model and primitives for the chat recap engine.
//!
//! Holds the report data model, the error type, timestamp normalization,
//! timezone helpers, CLI settings and number formatting used by the
//! ingestion and runtime crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
pub mod timestamp;

pub use error::{RecapError, Result};
