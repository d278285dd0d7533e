//! Domain layer: entities, pricing rules and the repository / port traits
//! the application layer depends on.

pub mod booking;
pub mod ports;
pub mod pricing;
pub mod repositories;
pub mod slot;
pub mod user;

pub use booking::{Booking, BookingRepository, BookingState, BookingStatus, NewBooking};
pub use ports::{DisabledQrPublisher, QrCodePublisher, QrError};
pub use pricing::PricingPolicy;
pub use repositories::{DomainResult, RepositoryProvider};
pub use slot::{NewParkingSlot, ParkingSlot, ParkingSlotRepository, SlotChanges};
pub use user::{CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepository, UserRole};

pub use crate::shared::errors::DomainError;
