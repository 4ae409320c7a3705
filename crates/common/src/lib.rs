//! Shared infrastructure for the ppeg workspace.
//!
//! - [`debug`] - Per-component logging controlled via the `DEBUG` environment
//!   variable

pub mod debug;

pub use debug::{create_logger, Logger};
