//! Column identifiers and row model of the frame table.
//!
//! The table name is configurable, so statements are built with sea-query
//! against an alias rather than through a static entity.

use chrono::NaiveDateTime;
use sea_orm::{DeriveIden, FromQueryResult};

use crate::storage::types::CapturedFrame;

/// Name of the unique index on `(resort_id, slope_name, captured_at)`.
pub const UNIQUE_CAPTURE_INDEX: &str = "uniq_capture";

#[derive(DeriveIden, Clone, Copy, Debug)]
pub enum FrameColumn {
    /// Surrogate auto-increment key
    Id,
    ResortId,
    ResortName,
    SlopeName,
    StreamUrl,
    CapturedAt,
    ImageFormat,
    ImageBytes,
    /// Filled by the database on insert
    CreatedAt,
}

/// Row shape returned by frame queries.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct FrameRow {
    pub resort_id: String,
    pub resort_name: String,
    pub slope_name: String,
    pub stream_url: Option<String>,
    pub captured_at: NaiveDateTime,
    pub image_format: String,
    pub image_bytes: Vec<u8>,
}

impl From<FrameRow> for CapturedFrame {
    fn from(row: FrameRow) -> Self {
        CapturedFrame {
            resort_id: row.resort_id,
            resort_name: row.resort_name,
            slope_name: row.slope_name,
            stream_url: row.stream_url.unwrap_or_default(),
            captured_at: row.captured_at,
            image_format: row.image_format,
            image_bytes: row.image_bytes,
        }
    }
}
