//! Parking slot service
//!
//! Administrative CRUD plus the read-side views that attach derived
//! occupancy to slots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::application::booking::{validate_interval, SlotAvailabilityIndex, SlotOccupancy};
use crate::domain::{
    Booking, DomainError, DomainResult, NewParkingSlot, ParkingSlot, RepositoryProvider, SlotChanges,
};

/// A slot with its bookings, ordered by start time
#[derive(Debug, Clone)]
pub struct SlotBookings {
    pub slot: SlotOccupancy,
    pub bookings: Vec<Booking>,
}

pub struct ParkingSlotService {
    repos: Arc<dyn RepositoryProvider>,
    availability: SlotAvailabilityIndex,
}

fn require_text(location: &str, slot_type: &str) -> DomainResult<()> {
    if location.trim().is_empty() || slot_type.trim().is_empty() {
        return Err(DomainError::Validation("Location and type are required".into()));
    }
    Ok(())
}

impl ParkingSlotService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            availability: SlotAvailabilityIndex::new(repos.clone()),
            repos,
        }
    }

    // ── Commands ────────────────────────────────────────────────

    /// Register a slot; active unless stated otherwise
    pub async fn add_slot(
        &self,
        location: &str,
        slot_type: &str,
        is_active: Option<bool>,
    ) -> DomainResult<ParkingSlot> {
        require_text(location, slot_type)?;

        let slot = self
            .repos
            .slots()
            .create(NewParkingSlot {
                location: location.trim().to_string(),
                slot_type: slot_type.trim().to_string(),
                is_active: is_active.unwrap_or(true),
            })
            .await?;

        info!(slot_id = slot.id, location = %slot.location, slot_type = %slot.slot_type, "Parking slot added");
        Ok(slot)
    }

    /// Replace location and type; `is_active` stays as it is when not given
    pub async fn update_slot(
        &self,
        id: i32,
        location: &str,
        slot_type: &str,
        is_active: Option<bool>,
    ) -> DomainResult<ParkingSlot> {
        require_text(location, slot_type)?;

        let slot = self
            .repos
            .slots()
            .update(
                id,
                SlotChanges {
                    location: location.trim().to_string(),
                    slot_type: slot_type.trim().to_string(),
                    is_active,
                },
            )
            .await?;

        info!(slot_id = id, is_active = slot.is_active, "Parking slot updated");
        Ok(slot)
    }

    pub async fn delete_slot(&self, id: i32) -> DomainResult<()> {
        self.load(id).await?;
        self.repos.slots().delete(id).await?;
        info!(slot_id = id, "Parking slot deleted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_slots(&self) -> DomainResult<Vec<SlotOccupancy>> {
        let slots = self.repos.slots().find_all().await?;
        self.availability.with_occupancy(slots, Utc::now()).await
    }

    pub async fn get_slot(&self, id: i32) -> DomainResult<SlotOccupancy> {
        let slot = self.load(id).await?;
        let mut view = self.availability.with_occupancy(vec![slot], Utc::now()).await?;
        view.pop().ok_or(DomainError::SlotNotFound(id))
    }

    pub async fn count_active(&self) -> DomainResult<u64> {
        self.repos.slots().count_active().await
    }

    pub async fn slots_by_type(&self, slot_type: &str) -> DomainResult<Vec<ParkingSlot>> {
        self.repos.slots().find_by_type(slot_type).await
    }

    pub async fn slots_by_location(&self, location: &str) -> DomainResult<Vec<ParkingSlot>> {
        self.repos.slots().find_by_location(location).await
    }

    pub async fn available_slots(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingSlot>> {
        validate_interval(start, end)?;
        self.availability.available_slots(start, end).await
    }

    pub async fn available_slots_at(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingSlot>> {
        validate_interval(start, end)?;
        self.availability.available_slots_at(location, start, end).await
    }

    pub async fn check_availability(
        &self,
        id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        validate_interval(start, end)?;
        self.availability.is_available(id, start, end).await
    }

    pub async fn slot_bookings(&self, id: i32) -> DomainResult<SlotBookings> {
        let slot = self.get_slot(id).await?;
        let bookings = self.repos.bookings().find_by_slot(id).await?;
        Ok(SlotBookings { slot, bookings })
    }

    async fn load(&self, id: i32) -> DomainResult<ParkingSlot> {
        self.repos
            .slots()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::SlotNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::testing::at;
    use crate::domain::NewBooking;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service() -> (Arc<InMemoryRepositoryProvider>, ParkingSlotService) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let service = ParkingSlotService::new(repos.clone());
        (repos, service)
    }

    #[tokio::test]
    async fn add_defaults_to_active_and_trims() {
        let (_repos, svc) = service();
        let slot = svc.add_slot("  Lot A ", "car", None).await.unwrap();
        assert!(slot.is_active);
        assert_eq!(slot.location, "Lot A");

        let inactive = svc.add_slot("Lot A", "car", Some(false)).await.unwrap();
        assert!(!inactive.is_active);
    }

    #[tokio::test]
    async fn add_requires_location_and_type() {
        let (_repos, svc) = service();
        assert!(matches!(
            svc.add_slot("", "car", None).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.add_slot("Lot A", "  ", None).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_keeps_flag_when_absent() {
        let (_repos, svc) = service();
        let slot = svc.add_slot("Lot A", "car", Some(false)).await.unwrap();

        let updated = svc.update_slot(slot.id, "Lot B", "motor", None).await.unwrap();
        assert_eq!(updated.location, "Lot B");
        assert_eq!(updated.slot_type, "motor");
        assert!(!updated.is_active);

        let reactivated = svc.update_slot(slot.id, "Lot B", "motor", Some(true)).await.unwrap();
        assert!(reactivated.is_active);

        assert!(matches!(
            svc.update_slot(99, "Lot B", "motor", None).await,
            Err(DomainError::SlotNotFound(99))
        ));
    }

    #[tokio::test]
    async fn edit_without_flag_keeps_a_claim_made_meanwhile() {
        let (repos, svc) = service();
        let slot = svc.add_slot("Lot A", "car", None).await.unwrap();

        // The admin screen shows the slot as active, then a booking claims it
        let shown = svc.get_slot(slot.id).await.unwrap();
        assert!(shown.slot.is_active);
        repos
            .bookings()
            .admit(NewBooking {
                user_id: "u1".into(),
                slot_id: slot.id,
                start_time: at(14, 0),
                end_time: at(15, 0),
                price: 3000,
            })
            .await
            .unwrap();

        let updated = svc.update_slot(slot.id, "Lot A - Level 2", "car", None).await.unwrap();
        assert_eq!(updated.location, "Lot A - Level 2");
        assert!(!updated.is_active);
        assert_eq!(svc.count_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_refuses_held_slots() {
        let (repos, svc) = service();
        let slot = svc.add_slot("Lot A", "car", None).await.unwrap();
        let booking = repos
            .bookings()
            .admit(NewBooking {
                user_id: "u1".into(),
                slot_id: slot.id,
                start_time: at(14, 0),
                end_time: at(15, 0),
                price: 3000,
            })
            .await
            .unwrap();

        assert!(matches!(
            svc.delete_slot(slot.id).await,
            Err(DomainError::SlotInUse(_))
        ));

        let mut finished = booking.clone();
        finished.complete().unwrap();
        assert!(repos
            .bookings()
            .update_and_release_slot(&finished, booking.state())
            .await
            .unwrap());

        svc.delete_slot(slot.id).await.unwrap();
        assert!(matches!(svc.get_slot(slot.id).await, Err(DomainError::SlotNotFound(_))));
        assert!(repos.bookings().find_by_id(booking.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_and_filters() {
        let (_repos, svc) = service();
        svc.add_slot("Lot A", "car", None).await.unwrap();
        svc.add_slot("Lot A", "motor", Some(false)).await.unwrap();
        svc.add_slot("Lot B", "car", None).await.unwrap();

        assert_eq!(svc.count_active().await.unwrap(), 2);
        assert_eq!(svc.slots_by_type("car").await.unwrap().len(), 2);
        assert_eq!(svc.slots_by_location("lot a").await.unwrap().len(), 2);
        assert!(svc.slots_by_type("truck").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slot_bookings_are_ordered_by_start() {
        let (repos, svc) = service();
        let slot = svc.add_slot("Lot A", "car", None).await.unwrap();
        for (from, to) in [(16, 17), (14, 15)] {
            svc.update_slot(slot.id, "Lot A", "car", Some(true)).await.unwrap();
            repos
                .bookings()
                .admit(NewBooking {
                    user_id: "u1".into(),
                    slot_id: slot.id,
                    start_time: at(from, 0),
                    end_time: at(to, 0),
                    price: 3000,
                })
                .await
                .unwrap();
        }

        let view = svc.slot_bookings(slot.id).await.unwrap();
        let starts: Vec<_> = view.bookings.iter().map(|b| b.start_time).collect();
        assert_eq!(starts, vec![at(14, 0), at(16, 0)]);
        assert!(view.slot.is_occupied);
    }

    #[tokio::test]
    async fn availability_requires_valid_window() {
        let (_repos, svc) = service();
        let slot = svc.add_slot("Lot A", "car", None).await.unwrap();
        assert!(svc.check_availability(slot.id, at(14, 0), at(15, 0)).await.unwrap());
        assert!(matches!(
            svc.check_availability(slot.id, at(15, 0), at(14, 0)).await,
            Err(DomainError::InvalidInterval(_))
        ));
    }
}
