//! QR code publishing port
//!
//! After a booking is admitted, a QR image pointing at the booking is
//! rendered and uploaded to an image host. Failures are reported to the
//! caller but never undo the booking.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR publishing is not configured")]
    NotConfigured,

    #[error("Failed to render QR code: {0}")]
    Render(String),

    #[error("Failed to upload QR code: {0}")]
    Upload(String),
}

impl QrError {
    /// Upload failures may succeed on retry; configuration and rendering errors never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, QrError::Upload(_))
    }
}

#[async_trait]
pub trait QrCodePublisher: Send + Sync {
    /// Render the QR code for a booking and return the hosted image URL
    async fn generate_and_upload(&self, booking_id: i32) -> Result<String, QrError>;
}

/// Publisher used when no image host is configured
pub struct DisabledQrPublisher;

#[async_trait]
impl QrCodePublisher for DisabledQrPublisher {
    async fn generate_and_upload(&self, _booking_id: i32) -> Result<String, QrError> {
        Err(QrError::NotConfigured)
    }
}
