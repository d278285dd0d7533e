//! Database entities module

pub mod booking;
pub mod parking_slot;
pub mod user;

pub use booking::Entity as Booking;
pub use parking_slot::Entity as ParkingSlot;
pub use user::Entity as User;
