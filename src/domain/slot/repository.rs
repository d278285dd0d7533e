//! Parking slot repository interface

use async_trait::async_trait;

use super::model::{NewParkingSlot, ParkingSlot, SlotChanges};
use crate::domain::DomainResult;

#[async_trait]
pub trait ParkingSlotRepository: Send + Sync {
    /// Insert a new slot and return it with its assigned ID
    async fn create(&self, slot: NewParkingSlot) -> DomainResult<ParkingSlot>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ParkingSlot>>;

    /// All slots, ordered by ID ascending
    async fn find_all(&self) -> DomainResult<Vec<ParkingSlot>>;

    /// Slots whose location contains `location` (case-insensitive), ordered by ID
    async fn find_by_location(&self, location: &str) -> DomainResult<Vec<ParkingSlot>>;

    /// Slots with exactly this type, ordered by ID
    async fn find_by_type(&self, slot_type: &str) -> DomainResult<Vec<ParkingSlot>>;

    /// Number of slots with `is_active = true`
    async fn count_active(&self) -> DomainResult<u64>;

    /// Overwrite location and type; the active flag only when one is given
    async fn update(&self, id: i32, changes: SlotChanges) -> DomainResult<ParkingSlot>;

    /// Delete the slot and its finished bookings.
    ///
    /// Fails with `SlotInUse` while pending or booked bookings reference it.
    async fn delete(&self, id: i32) -> DomainResult<()>;
}
