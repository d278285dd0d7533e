//! Outbound ports: collaborators the booking core calls but does not own.

pub mod qr;

pub use qr::{DisabledQrPublisher, QrCodePublisher, QrError};
