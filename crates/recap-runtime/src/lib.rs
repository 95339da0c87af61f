//! Runtime layer for chat recaps.
//!
//! Hosts the report cache and the generation service that sits between a
//! report consumer and the data layer.

pub mod cache;
pub mod service;

pub use recap_core as core;
pub use recap_data as data;
