use super::types::EncodeRequest;
use crate::error_handling::types::EncodeError;

/// External still-frame encoder.
///
/// Implementations run one bounded encoding job and return the produced
/// bytes. Success means the job finished in time, reported success and
/// wrote at least one byte; every other outcome is an [`EncodeError`].
#[allow(async_fn_in_trait)]
pub trait FrameEncoder {
    async fn encode(&self, request: EncodeRequest<'_>) -> Result<Vec<u8>, EncodeError>;
}
