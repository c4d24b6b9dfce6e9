//! NoiseWatch - How much internet background noise is in your logs?
//!
//! This library scans log files for client addresses, looks each unique
//! address up in the GreyNoise community API through a bounded worker pool,
//! and summarizes how many of them are known scanners.
pub mod aggregator;
pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod pool;
pub mod reputation;
pub mod scanner;

// Re-export core types for convenience
pub use crate::core::*;
