//! wastectl library
//!
//! Core functionality for the wastectl cost-waste scanner: the data model,
//! the pricing resolver, the per-kind scanners, and the run orchestrator.
//! The binary in `src/main.rs` is a thin clap wrapper around these.

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod pricing;
pub mod provider;
pub mod providers;
pub mod report;
pub mod retry;
pub mod scanners;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, WastectlError};
pub use model::{Finding, Report, ResourceKind, RunStatus};
