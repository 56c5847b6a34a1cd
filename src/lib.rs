//! Conflict Risk Engine
//!
//! Trains and serves a binary conflict-risk classifier over monthly
//! region-level tabular data. The pipeline label-encodes the categorical
//! columns, standardizes all features, fits a seeded random forest, and
//! persists the result as an artifact bundle the inference service loads
//! and swaps atomically.

pub mod api;
pub mod bundle;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod ml;
pub mod models;
pub mod pipeline;

pub use error::{AppError, Result};
