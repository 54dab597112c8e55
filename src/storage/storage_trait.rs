//! Storage Trait
//!
//! This module defines the `FrameStore` trait, the interface between a capture
//! run and the table holding captured frames.
//!
//! Implementors are responsible for:
//! - Creating the frame table when it does not exist yet
//! - Upserting one frame per call, committed on its own
//! - Reading back the frames of a given run
//!
//! All methods return a `Result` to handle potential storage errors.

use chrono::NaiveDateTime;

use crate::error_handling::types::StorageError;
use crate::storage::types::CapturedFrame;

#[allow(async_fn_in_trait)]
pub trait FrameStore {
    /// Creates the frame table and its unique capture index if absent.
    /// Safe to call on every run.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Inserts `frame`, or overwrites stream URL, format and bytes of the
    /// row with the same resort, slope and capture instant.
    async fn save_frame(&self, frame: &CapturedFrame) -> Result<(), StorageError>;

    /// Frames stored for one capture instant, in insertion order.
    async fn frames_at(&self, captured_at: NaiveDateTime)
        -> Result<Vec<CapturedFrame>, StorageError>;

    /// Releases the underlying connection.
    async fn close(self) -> Result<(), StorageError>
    where
        Self: Sized;
}
