//! annex - search and retrieval client for a shadow-library catalog.
//!
//! This library provides functionality for:
//! - Searching the catalog and extracting book records from result listings
//! - Resolving DOIs to paper records through a two-phase lookup
//! - Downloading books (via the secret-keyed fast-download API) and papers
//!   with atomic cleanup of partial files

pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use catalog::{Book, Catalog, Paper, SkipReason};
pub use config::Config;
pub use console::Console;
pub use error::{CatalogError, ConfigError};
