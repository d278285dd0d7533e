//! QR code publishing adapters

mod cloudinary;

pub use cloudinary::{render_png, CloudinaryQrPublisher};

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::QrConfig;
use crate::domain::{DisabledQrPublisher, QrCodePublisher};

/// Pick the publisher for a configuration.
///
/// Falls back to [`DisabledQrPublisher`] when QR publishing is off or the
/// image host credentials are incomplete.
pub fn build_publisher(config: &QrConfig) -> Arc<dyn QrCodePublisher> {
    if !config.enabled {
        info!("QR code publishing disabled");
        return Arc::new(DisabledQrPublisher);
    }
    if !config.has_credentials() {
        warn!("QR code publishing enabled but Cloudinary credentials are missing; disabling");
        return Arc::new(DisabledQrPublisher);
    }
    match CloudinaryQrPublisher::new(config.clone()) {
        Ok(publisher) => {
            info!(cloud = %config.cloud_name, folder = %config.folder, "QR codes uploaded to Cloudinary");
            Arc::new(publisher)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build QR HTTP client; disabling QR publishing");
            Arc::new(DisabledQrPublisher)
        }
    }
}
