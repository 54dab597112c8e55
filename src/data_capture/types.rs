//! Common data types used across the data_capture subsystem.

use std::fmt;
use std::time::Duration;

/// Still-image formats the encoder is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillFormat {
    /// AV1 still picture, the stored format
    Avif,
    /// Lossless intermediate used when direct AVIF capture fails
    Png,
}

impl StillFormat {
    /// Tag stored alongside the image bytes.
    pub fn tag(&self) -> &'static str {
        match self {
            StillFormat::Avif => "avif",
            StillFormat::Png => "png",
        }
    }
}

impl fmt::Display for StillFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where the encoder reads its input from.
#[derive(Debug, Clone, Copy)]
pub enum EncodeSource<'a> {
    /// Network stream, read by the encoder itself
    Stream(&'a str),
    /// An already captured still, fed through stdin
    Piped { data: &'a [u8], format: StillFormat },
}

/// One encoder invocation producing exactly one frame.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub source: EncodeSource<'a>,
    pub output: StillFormat,
    /// Target width, `None` keeps the source size
    pub scale_width: Option<u32>,
    pub timeout: Duration,
}

/// Which path through the fallback chain produced the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePath {
    Direct,
    /// Captured as an intermediate still, then transcoded
    Reencoded,
}

/// A frame in its final format, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub format: StillFormat,
    pub path: CapturePath,
}
