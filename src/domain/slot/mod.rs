//! Parking slot aggregate
//!
//! Contains the ParkingSlot entity and its repository interface.

pub mod model;
pub mod repository;

pub use model::{NewParkingSlot, ParkingSlot, SlotChanges};
pub use repository::ParkingSlotRepository;
