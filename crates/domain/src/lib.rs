//! # RateWatch Domain
//!
//! Business domain types and models for RateWatch.
//!
//! This crate contains:
//! - Result and report data types (MetricRateResult, CycleReport, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and defaults
//!
//! ## Architecture
//! - No dependencies on other RateWatch crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
