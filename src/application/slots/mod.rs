//! Parking slot administration and browsing

pub mod service;

pub use service::{ParkingSlotService, SlotBookings};
