//! Data layer for chat recaps.
//!
//! Finds the active chat log of every partner, reads the line-delimited logs,
//! tokenizes human messages and folds everything into an annual report.

pub mod aggregator;
pub mod analysis;
pub mod card;
pub mod discovery;
pub mod finalizer;
pub mod reader;
pub mod tokenizer;

pub use recap_core as core;
