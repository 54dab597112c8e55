//! Storage subsystem
//!
//! This module persists captured frames.
//!
//! Components:
//! - `storage_trait`: the FrameStore trait defining a uniform API.
//! - `types`: the `CapturedFrame` record.
//! - `database_storage`: SeaORM implementation, MySQL in production.
//! - `db_entities`: column identifiers and row model of the frame table.

pub mod database_storage;
pub mod db_entities;
pub mod storage_trait;
pub mod types;

pub use database_storage::DatabaseStorage;
pub use storage_trait::FrameStore;
pub use types::CapturedFrame;
