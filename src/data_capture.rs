pub mod encoder;
pub mod fallback;
pub mod ffmpeg;
pub mod types;

pub use encoder::FrameEncoder;
pub use fallback::capture_frame;
pub use ffmpeg::FfmpegEncoder;
pub use types::{CapturePath, CapturedImage, EncodeRequest, EncodeSource, StillFormat};
