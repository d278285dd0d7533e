//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingState, NewBooking};
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>>;

    /// All bookings, newest first
    async fn find_all(&self) -> DomainResult<Vec<Booking>>;

    /// Bookings owned by a user, newest first
    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Booking>>;

    /// Bookings of a slot, ordered by start time
    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>>;

    /// Pending/booked bookings of a slot overlapping the closed interval `[start, end]`
    async fn find_overlapping(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>>;

    /// IDs of slots with a pending/booked booking overlapping `[start, end]`
    async fn find_busy_slot_ids(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>>;

    /// Atomically claim the slot and insert the booking.
    ///
    /// In one transaction: flip the slot from active to inactive, re-check
    /// overlaps, insert with status `pending`. Fails with `SlotConflict` when
    /// an overlapping booking exists, `SlotUnavailable` when the slot is
    /// already inactive, `SlotNotFound` when it vanished.
    async fn admit(&self, booking: NewBooking) -> DomainResult<Booking>;

    /// Persist status/payment fields, provided the stored booking is still in
    /// the `expected` state.
    ///
    /// Returns `false` without writing when the booking changed or vanished
    /// since it was read.
    async fn update(&self, booking: &Booking, expected: BookingState) -> DomainResult<bool>;

    /// Conditional write as in [`update`](Self::update), plus reactivation of
    /// the slot in the same transaction. The slot is left alone when the
    /// booking write did not apply. A slot that no longer exists is skipped.
    async fn update_and_release_slot(
        &self,
        booking: &Booking,
        expected: BookingState,
    ) -> DomainResult<bool>;

    async fn set_qr_code_url(&self, id: i32, url: &str) -> DomainResult<()>;

    /// Permanently remove a booking. Slot state is left untouched.
    async fn delete(&self, id: i32) -> DomainResult<()>;
}
