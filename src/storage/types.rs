use chrono::NaiveDateTime;

use crate::catalog::CaptureTarget;
use crate::data_capture::CapturedImage;

/// A captured still as persisted.
///
/// `(resort_id, slope_name, captured_at)` identifies a row; saving the same
/// triple again replaces the stream URL, format and image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub resort_id: String,
    pub resort_name: String,
    pub slope_name: String,
    pub stream_url: String,
    /// Shared by every frame of one run, UTC without offset, whole seconds
    pub captured_at: NaiveDateTime,
    pub image_format: String,
    pub image_bytes: Vec<u8>,
}

impl CapturedFrame {
    pub fn new(target: &CaptureTarget, captured_at: NaiveDateTime, image: CapturedImage) -> Self {
        Self {
            resort_id: target.resort_id.clone(),
            resort_name: target.resort_name.clone(),
            slope_name: target.slope_name.clone(),
            stream_url: target.stream_url.clone(),
            captured_at,
            image_format: image.format.tag().to_string(),
            image_bytes: image.bytes,
        }
    }
}
