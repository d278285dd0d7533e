//! Shared fixtures for booking tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Barrier;

use crate::domain::{
    Booking, BookingRepository, BookingState, DomainResult, NewBooking, ParkingSlotRepository,
    QrCodePublisher, QrError, RepositoryProvider, UserRepository,
};
use crate::infrastructure::storage::InMemoryRepositoryProvider;

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, h, m, 0).unwrap()
}

/// Publisher returning a predictable URL, or failing on demand
pub struct StubQrPublisher {
    failing: AtomicBool,
}

impl StubQrPublisher {
    pub fn working() -> Self {
        Self {
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QrCodePublisher for StubQrPublisher {
    async fn generate_and_upload(&self, booking_id: i32) -> Result<String, QrError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QrError::Upload("image host unreachable".into()));
        }
        Ok(format!("https://qr.test/booking_{}.png", booking_id))
    }
}

/// In-memory provider whose first `parties` booking lookups wait for each
/// other, so concurrent operations all start from the same snapshot.
/// Later lookups pass straight through.
pub struct LockstepReads {
    inner: Arc<InMemoryRepositoryProvider>,
    barrier: Barrier,
    parties: usize,
    reads: AtomicUsize,
}

impl LockstepReads {
    pub fn new(inner: Arc<InMemoryRepositoryProvider>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            reads: AtomicUsize::new(0),
        }
    }
}

impl RepositoryProvider for LockstepReads {
    fn slots(&self) -> &dyn ParkingSlotRepository {
        self.inner.slots()
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self.inner.users()
    }
}

#[async_trait]
impl BookingRepository for LockstepReads {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait().await;
        }
        self.inner.bookings().find_by_id(id).await
    }

    async fn find_all(&self) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_all().await
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_by_user(user_id).await
    }

    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_by_slot(slot_id).await
    }

    async fn find_overlapping(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_overlapping(slot_id, start, end).await
    }

    async fn find_busy_slot_ids(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>> {
        self.inner.bookings().find_busy_slot_ids(start, end).await
    }

    async fn admit(&self, booking: NewBooking) -> DomainResult<Booking> {
        self.inner.bookings().admit(booking).await
    }

    async fn update(&self, booking: &Booking, expected: BookingState) -> DomainResult<bool> {
        self.inner.bookings().update(booking, expected).await
    }

    async fn update_and_release_slot(
        &self,
        booking: &Booking,
        expected: BookingState,
    ) -> DomainResult<bool> {
        self.inner
            .bookings()
            .update_and_release_slot(booking, expected)
            .await
    }

    async fn set_qr_code_url(&self, id: i32, url: &str) -> DomainResult<()> {
        self.inner.bookings().set_qr_code_url(id, url).await
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        self.inner.bookings().delete(id).await
    }
}
