//! Booking core: availability index, lifecycle and location matching

pub mod availability;
pub mod location;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use availability::{SlotAvailabilityIndex, SlotOccupancy};
pub use location::LocationMatcher;
pub use service::{validate_interval, BookingLifecycle, BookingOutcome, PaymentReceipt, PriceQuote};
