//! Cloudinary-backed QR publisher
//!
//! Renders the booking URL as a PNG QR code and uploads it as a base64
//! data URI through Cloudinary's signed upload API.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::QrConfig;
use crate::domain::{QrCodePublisher, QrError};
use crate::shared::utills::retry::{retry_with_backoff, RetryConfig};
use crate::shared::InfraError;

const UPLOAD_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

pub struct CloudinaryQrPublisher {
    config: QrConfig,
    client: reqwest::Client,
}

/// Render `content` as a PNG QR code at least `size` pixels wide
pub fn render_png(content: &str, size: u32) -> Result<Vec<u8>, QrError> {
    let code = QrCode::new(content.as_bytes()).map_err(|e| QrError::Render(e.to_string()))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .quiet_zone(true)
        .build();

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| QrError::Render(e.to_string()))?;
    Ok(png.into_inner())
}

/// Cloudinary request signature: SHA-256 over the sorted
/// `key=value` pairs joined by `&`, followed by the API secret.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryQrPublisher {
    pub fn new(config: QrConfig) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs.max(1)))
            .build()?;
        Ok(Self { config, client })
    }

    fn booking_url(&self, booking_id: i32) -> String {
        format!(
            "{}/bookings/{}",
            self.config.content_base_url.trim_end_matches('/'),
            booking_id
        )
    }

    async fn upload(&self, booking_id: i32, data_uri: &str) -> Result<String, QrError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = vec![
            ("folder", self.config.folder.clone()),
            ("overwrite", "true".to_string()),
            ("public_id", format!("booking_{}", booking_id)),
            ("timestamp", timestamp),
        ];
        let signature = sign(&signed, &self.config.api_secret);

        let mut form: Vec<(&str, String)> = signed;
        form.push(("file", data_uri.to_string()));
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature_algorithm", "sha256".to_string()));
        form.push(("signature", signature));

        let url = format!("{}/{}/image/upload", UPLOAD_ENDPOINT, self.config.cloud_name);
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| QrError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QrError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| QrError::Upload(format!("unexpected response: {}", e)))?;
        Ok(body.secure_url)
    }
}

#[async_trait]
impl QrCodePublisher for CloudinaryQrPublisher {
    async fn generate_and_upload(&self, booking_id: i32) -> Result<String, QrError> {
        let png = render_png(&self.booking_url(booking_id), self.config.image_size)?;
        let data_uri = format!("data:image/png;base64,{}", STANDARD.encode(png));

        let url = retry_with_backoff(
            RetryConfig::with_attempts(self.config.retry_attempts),
            || self.upload(booking_id, &data_uri),
            QrError::is_transient,
            "qr_upload",
        )
        .await?;

        debug!(booking_id, url = %url, "QR code uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_png_of_requested_size() {
        let png = render_png("http://localhost/bookings/7", 300).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert!(decoded.width() >= 300);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn signature_sorts_parameters() {
        let a = sign(
            &[("timestamp", "1".into()), ("folder", "qr".into())],
            "secret",
        );
        let b = sign(
            &[("folder", "qr".into()), ("timestamp", "1".into())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=qr&timestamp=1secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn booking_url_ignores_trailing_slash() {
        let publisher = CloudinaryQrPublisher::new(QrConfig {
            content_base_url: "https://parking.example/api/v1/".into(),
            ..QrConfig::default()
        })
        .unwrap();
        assert_eq!(
            publisher.booking_url(12),
            "https://parking.example/api/v1/bookings/12"
        );
    }
}
