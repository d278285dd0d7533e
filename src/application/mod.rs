//! Application layer
//!
//! Use-case services over the domain repositories. HTTP handlers stay thin
//! and delegate here.

pub mod booking;
pub mod identity;
pub mod slots;

pub use booking::{
    validate_interval, BookingLifecycle, BookingOutcome, LocationMatcher, PaymentReceipt,
    PriceQuote, SlotAvailabilityIndex, SlotOccupancy,
};
pub use identity::{AuthResult, UserService};
pub use slots::{ParkingSlotService, SlotBookings};
