//! Stream catalog
//!
//! The catalog is a JSON array of resorts, each listing its cameras. It is
//! produced by a separate scraper; this crate only reads it.

pub mod loader;
pub mod types;

pub use loader::{load_targets, truncate_targets};
pub use types::CaptureTarget;
