//! Slot availability queries
//!
//! Answers "is this slot free over this window" and the derived occupancy
//! view. Overlap always means a pending/booked booking whose closed interval
//! intersects the requested one.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{Booking, DomainError, DomainResult, ParkingSlot, RepositoryProvider};

/// A slot together with its derived occupancy at query time
#[derive(Debug, Clone)]
pub struct SlotOccupancy {
    pub slot: ParkingSlot,
    pub is_occupied: bool,
}

pub struct SlotAvailabilityIndex {
    repos: Arc<dyn RepositoryProvider>,
}

impl SlotAvailabilityIndex {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn find_overlapping(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        self.repos
            .bookings()
            .find_overlapping(slot_id, start, end)
            .await
    }

    /// No pending/booked booking of the slot intersects `[start, end]`.
    /// The slot's active flag is not consulted.
    pub async fn is_available(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        if self.repos.slots().find_by_id(slot_id).await?.is_none() {
            return Err(DomainError::SlotNotFound(slot_id));
        }
        Ok(self.find_overlapping(slot_id, start, end).await?.is_empty())
    }

    /// A pending/booked booking of the slot covers instant `at`
    pub async fn is_occupied(&self, slot_id: i32, at: DateTime<Utc>) -> DomainResult<bool> {
        Ok(!self.find_overlapping(slot_id, at, at).await?.is_empty())
    }

    /// Slots held by a booking at instant `at`
    pub async fn occupied_slot_ids(&self, at: DateTime<Utc>) -> DomainResult<HashSet<i32>> {
        let ids = self.repos.bookings().find_busy_slot_ids(at, at).await?;
        Ok(ids.into_iter().collect())
    }

    /// Attach `is_occupied = !is_active || booked now` to each slot
    pub async fn with_occupancy(
        &self,
        slots: Vec<ParkingSlot>,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<SlotOccupancy>> {
        let occupied = self.occupied_slot_ids(at).await?;
        Ok(slots
            .into_iter()
            .map(|slot| {
                let is_occupied = slot.is_occupied(occupied.contains(&slot.id));
                SlotOccupancy { slot, is_occupied }
            })
            .collect())
    }

    /// Active slots with no overlapping booking in `[start, end]`
    pub async fn available_slots(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingSlot>> {
        let slots = self.repos.slots().find_all().await?;
        self.filter_free(slots, start, end).await
    }

    /// Same as [`Self::available_slots`], restricted to a location substring
    pub async fn available_slots_at(
        &self,
        location: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingSlot>> {
        let slots = self.repos.slots().find_by_location(location).await?;
        self.filter_free(slots, start, end).await
    }

    async fn filter_free(
        &self,
        slots: Vec<ParkingSlot>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ParkingSlot>> {
        let busy: HashSet<i32> = self
            .repos
            .bookings()
            .find_busy_slot_ids(start, end)
            .await?
            .into_iter()
            .collect();

        Ok(slots
            .into_iter()
            .filter(|s| s.is_active && !busy.contains(&s.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewBooking, NewParkingSlot};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, h, m, 0).unwrap()
    }

    async fn setup() -> (Arc<InMemoryRepositoryProvider>, SlotAvailabilityIndex) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        for (location, slot_type, is_active) in [
            ("Lot A", "car", true),
            ("Lot A", "motor", true),
            ("Lot B", "car", false),
        ] {
            repos
                .slots()
                .create(NewParkingSlot {
                    location: location.into(),
                    slot_type: slot_type.into(),
                    is_active,
                })
                .await
                .unwrap();
        }
        let index = SlotAvailabilityIndex::new(repos.clone());
        (repos, index)
    }

    async fn book(repos: &InMemoryRepositoryProvider, slot_id: i32, from: u32, to: u32) -> Booking {
        repos
            .bookings()
            .admit(NewBooking {
                user_id: "u1".into(),
                slot_id,
                start_time: at(from, 0),
                end_time: at(to, 0),
                price: 0,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn availability_tracks_overlaps() {
        let (repos, index) = setup().await;
        book(&repos, 1, 14, 16).await;

        assert!(!index.is_available(1, at(15, 0), at(15, 30)).await.unwrap());
        assert!(!index.is_available(1, at(16, 0), at(17, 0)).await.unwrap());
        assert!(index.is_available(1, at(17, 0), at(18, 0)).await.unwrap());
        assert!(index.is_available(2, at(15, 0), at(15, 30)).await.unwrap());
    }

    #[tokio::test]
    async fn availability_of_missing_slot_is_an_error() {
        let (_repos, index) = setup().await;
        assert!(matches!(
            index.is_available(99, at(1, 0), at(2, 0)).await,
            Err(DomainError::SlotNotFound(99))
        ));
    }

    #[tokio::test]
    async fn occupancy_view_combines_flag_and_current_bookings() {
        let (repos, index) = setup().await;
        book(&repos, 2, 14, 16).await;

        let slots = repos.slots().find_all().await.unwrap();
        let view = index.with_occupancy(slots, at(15, 0)).await.unwrap();
        let occupied: Vec<(i32, bool)> = view.iter().map(|o| (o.slot.id, o.is_occupied)).collect();

        // slot 2 is inactive after admission and booked now; slot 3 was created inactive
        assert_eq!(occupied, vec![(1, false), (2, true), (3, true)]);
        assert!(index.is_occupied(2, at(15, 0)).await.unwrap());
        assert!(!index.is_occupied(2, at(17, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn available_slots_skip_inactive_and_busy() {
        let (repos, index) = setup().await;
        book(&repos, 1, 14, 16).await;

        let free: Vec<i32> = index
            .available_slots(at(15, 0), at(15, 30))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(free, vec![2]);

        let at_lot_a: Vec<i32> = index
            .available_slots_at("lot a", at(15, 0), at(15, 30))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(at_lot_a, vec![2]);

        assert!(index
            .available_slots_at("Lot B", at(15, 0), at(15, 30))
            .await
            .unwrap()
            .is_empty());
    }
}
