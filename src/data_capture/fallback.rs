use log::{info, warn};

use super::encoder::FrameEncoder;
use super::types::{CapturePath, CapturedImage, EncodeRequest, EncodeSource, StillFormat};
use crate::configuration::CaptureSettings;
use crate::error_handling::types::CaptureError;

/// Captures one frame of `stream_url` as AVIF.
///
/// Stages, each with its own timeout:
/// 1. grab and encode straight to AVIF;
/// 2. on failure, grab a PNG instead, which far more sources can produce;
/// 3. transcode that PNG to AVIF without touching the network again.
///
/// A PNG that cannot be transcoded is discarded, only AVIF is ever returned.
pub async fn capture_frame<E: FrameEncoder>(
    encoder: &E,
    stream_url: &str,
    settings: &CaptureSettings,
) -> Result<CapturedImage, CaptureError> {
    let primary = match encoder
        .encode(EncodeRequest {
            source: EncodeSource::Stream(stream_url),
            output: StillFormat::Avif,
            scale_width: Some(settings.scale_width),
            timeout: settings.timeout,
        })
        .await
    {
        Ok(bytes) => {
            return Ok(CapturedImage {
                bytes,
                format: StillFormat::Avif,
                path: CapturePath::Direct,
            })
        }
        Err(e) => {
            warn!("ffmpeg AVIF capture failed for {}: {}", stream_url, e);
            e
        }
    };

    let png = match encoder
        .encode(EncodeRequest {
            source: EncodeSource::Stream(stream_url),
            output: StillFormat::Png,
            scale_width: Some(settings.scale_width),
            timeout: settings.timeout,
        })
        .await
    {
        Ok(bytes) => {
            info!("Captured PNG fallback for {}", stream_url);
            bytes
        }
        Err(fallback) => {
            warn!("PNG capture failed for {}: {}", stream_url, fallback);
            return Err(CaptureError::FallbackFailed { primary, fallback });
        }
    };

    match encoder
        .encode(EncodeRequest {
            source: EncodeSource::Piped {
                data: &png,
                format: StillFormat::Png,
            },
            output: StillFormat::Avif,
            scale_width: None,
            timeout: settings.timeout,
        })
        .await
    {
        Ok(bytes) => Ok(CapturedImage {
            bytes,
            format: StillFormat::Avif,
            path: CapturePath::Reencoded,
        }),
        Err(reencode) => {
            warn!("PNG->AVIF conversion failed for {}: {}", stream_url, reencode);
            Err(CaptureError::ReencodeFailed { primary, reencode })
        }
    }
}
