//! Saltforge – compiles node manifests into configuration-management state files
//!
//! This crate implements:
//! - A registry of per-type resource processors (service, package, file, template, group)
//! - A run-scoped action/context protocol with guaranteed payload restoration
//! - Deterministic artifact emission, one state file per resource
//! - A status-classified error taxonomy shared with the HTTP action API

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Rendering of outcomes for the HTTP action API
pub mod api;

/// Manifest compilation pipeline
pub mod compiler;

// Re-export key types for convenience
pub use compiler::{CompilerConfig, Pipeline};

/// Current version of Saltforge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
