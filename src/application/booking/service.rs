//! Booking lifecycle: admission, cancellation, completion, payment, deletion.
//!
//! Every mutation re-reads the booking, applies the status guard on the
//! domain entity, then writes back on condition that the stored status and
//! payment flag are still the ones read. A write that loses that race is
//! retried from a fresh read, so the guard always judges current state.
//! Slot activation changes travel in the same repository transaction as the
//! booking write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::availability::SlotAvailabilityIndex;
use crate::domain::{
    Booking, BookingStatus, DomainError, DomainResult, NewBooking, ParkingSlot, PricingPolicy,
    QrCodePublisher, RepositoryProvider,
};

/// Result of a successful admission
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    /// The slot the booking holds, as it is after admission
    pub slot: ParkingSlot,
    /// The QR step failed; the booking itself stands
    pub qr_failed: bool,
}

impl BookingOutcome {
    pub fn message(&self) -> &'static str {
        if self.qr_failed {
            "Booking created successfully, but QR generation failed"
        } else {
            "Booking created successfully"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_hours: i64,
    pub price: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub booking_id: i32,
    pub amount_paid: i32,
    pub paid_at: DateTime<Utc>,
    pub status: BookingStatus,
}

/// Rounds of re-reading after a lost write. A booking changes state at most
/// three times.
const TRANSITION_ATTEMPTS: usize = 4;

/// Reject empty and inverted intervals
pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<()> {
    if end <= start {
        return Err(DomainError::InvalidInterval(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

pub struct BookingLifecycle {
    repos: Arc<dyn RepositoryProvider>,
    availability: SlotAvailabilityIndex,
    pricing: PricingPolicy,
    qr: Arc<dyn QrCodePublisher>,
}

impl BookingLifecycle {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        pricing: PricingPolicy,
        qr: Arc<dyn QrCodePublisher>,
    ) -> Self {
        Self {
            availability: SlotAvailabilityIndex::new(repos.clone()),
            repos,
            pricing,
            qr,
        }
    }

    pub fn availability(&self) -> &SlotAvailabilityIndex {
        &self.availability
    }

    // ── Admission ───────────────────────────────────────────────

    /// Book a specific slot for `[start, end]`.
    pub async fn create_booking(
        &self,
        user_id: &str,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<BookingOutcome> {
        validate_interval(start, end)?;

        let slot = self
            .repos
            .slots()
            .find_by_id(slot_id)
            .await?
            .ok_or(DomainError::SlotNotFound(slot_id))?;

        self.admit_on(user_id, slot, start, end).await
    }

    /// Admit a booking on an already loaded slot.
    ///
    /// Overlap is checked before the active flag, so a slot held by an
    /// intersecting booking reports `SlotConflict` rather than `SlotUnavailable`.
    pub(crate) async fn admit_on(
        &self,
        user_id: &str,
        slot: ParkingSlot,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<BookingOutcome> {
        if !self
            .availability
            .find_overlapping(slot.id, start, end)
            .await?
            .is_empty()
        {
            metrics::counter!("booking_rejections_total", "reason" => "conflict").increment(1);
            return Err(DomainError::SlotConflict(slot.id));
        }
        if !slot.is_active {
            metrics::counter!("booking_rejections_total", "reason" => "unavailable").increment(1);
            return Err(DomainError::SlotUnavailable(slot.id));
        }

        let price = self.pricing.compute_price(start, end);
        let booking = self
            .repos
            .bookings()
            .admit(NewBooking {
                user_id: user_id.to_string(),
                slot_id: slot.id,
                start_time: start,
                end_time: end,
                price,
            })
            .await?;

        metrics::counter!("bookings_created_total").increment(1);
        info!(
            booking_id = booking.id,
            slot_id = slot.id,
            user_id,
            price,
            "Booking admitted"
        );

        let (booking, qr_failed) = self.attach_qr(booking).await;

        Ok(BookingOutcome {
            booking,
            slot: ParkingSlot {
                is_active: false,
                ..slot
            },
            qr_failed,
        })
    }

    /// Best-effort QR step. Never fails the admission.
    async fn attach_qr(&self, mut booking: Booking) -> (Booking, bool) {
        let url = match self.qr.generate_and_upload(booking.id).await {
            Ok(url) => url,
            Err(e) => {
                metrics::counter!("booking_qr_failures_total").increment(1);
                warn!(booking_id = booking.id, error = %e, "QR generation failed");
                return (booking, true);
            }
        };

        match self.repos.bookings().set_qr_code_url(booking.id, &url).await {
            Ok(()) => {
                booking.qr_code_url = Some(url);
                (booking, false)
            }
            Err(e) => {
                metrics::counter!("booking_qr_failures_total").increment(1);
                warn!(booking_id = booking.id, error = %e, "Failed to store QR code URL");
                (booking, true)
            }
        }
    }

    // ── Transitions ─────────────────────────────────────────────

    /// Owner cancels a live booking; the slot becomes active again.
    pub async fn cancel_booking(&self, user_id: &str, booking_id: i32) -> DomainResult<Booking> {
        let booking = self
            .transition(booking_id, true, |booking| {
                if !booking.is_owned_by(user_id) {
                    return Err(DomainError::Forbidden(
                        "You are not authorized to cancel this booking".into(),
                    ));
                }
                booking.cancel()
            })
            .await?;

        metrics::counter!("bookings_cancelled_total").increment(1);
        info!(booking_id, slot_id = booking.slot_id, user_id, "Booking cancelled");
        Ok(booking)
    }

    /// Operator completes a live booking; the slot becomes active again.
    pub async fn complete_booking(&self, booking_id: i32) -> DomainResult<Booking> {
        let booking = self
            .transition(booking_id, true, |booking| booking.complete())
            .await?;

        metrics::counter!("bookings_completed_total").increment(1);
        info!(booking_id, slot_id = booking.slot_id, "Booking completed");
        Ok(booking)
    }

    /// Simulated payment
    pub async fn pay_booking(&self, booking_id: i32) -> DomainResult<PaymentReceipt> {
        let paid_at = Utc::now();
        let booking = self
            .transition(booking_id, false, |booking| booking.pay(paid_at))
            .await?;

        metrics::counter!("bookings_paid_total").increment(1);
        info!(booking_id, amount = booking.price, "Booking paid");

        Ok(PaymentReceipt {
            booking_id: booking.id,
            amount_paid: booking.price,
            paid_at,
            status: booking.status,
        })
    }

    /// Remove a booking permanently. The slot flag is not touched.
    pub async fn delete_booking(&self, booking_id: i32) -> DomainResult<()> {
        let booking = self.load(booking_id).await?;
        self.repos.bookings().delete(booking.id).await?;
        info!(booking_id, slot_id = booking.slot_id, "Booking deleted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn quote(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<PriceQuote> {
        validate_interval(start, end)?;
        Ok(PriceQuote {
            start_time: start,
            end_time: end,
            duration_hours: self.pricing.billable_hours(start, end),
            price: self.pricing.compute_price(start, end),
        })
    }

    pub async fn get_booking(&self, booking_id: i32) -> DomainResult<Booking> {
        self.load(booking_id).await
    }

    pub async fn list_bookings(&self) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_all().await
    }

    pub async fn bookings_for_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_by_user(user_id).await
    }

    /// QR URL of a booking, visible to its owner only
    pub async fn qr_code_url(&self, user_id: &str, booking_id: i32) -> DomainResult<Option<String>> {
        let booking = self.load(booking_id).await?;
        if !booking.is_owned_by(user_id) {
            return Err(DomainError::Forbidden(
                "You are not authorized to view this booking's QR code".into(),
            ));
        }
        Ok(booking.qr_code_url)
    }

    /// Read, apply `change`, write back if nothing else wrote in between.
    /// With `release_slot` the slot is reactivated in the same write.
    async fn transition<F>(
        &self,
        booking_id: i32,
        release_slot: bool,
        change: F,
    ) -> DomainResult<Booking>
    where
        F: Fn(&mut Booking) -> DomainResult<()> + Send,
    {
        let bookings = self.repos.bookings();
        for attempt in 1..=TRANSITION_ATTEMPTS {
            let mut booking = self.load(booking_id).await?;
            let read = booking.state();
            change(&mut booking)?;

            let written = if release_slot {
                bookings.update_and_release_slot(&booking, read).await?
            } else {
                bookings.update(&booking, read).await?
            };
            if written {
                return Ok(booking);
            }
            debug!(booking_id, attempt, "Booking changed concurrently, re-reading");
        }

        warn!(booking_id, "Booking transition gave up after repeated concurrent changes");
        Err(DomainError::Unexpected(format!(
            "Booking {} is being modified concurrently",
            booking_id
        )))
    }

    async fn load(&self, booking_id: i32) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or(DomainError::BookingNotFound(booking_id))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::testing::{at, LockstepReads, StubQrPublisher};
    use crate::domain::NewParkingSlot;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    struct Fixture {
        repos: Arc<InMemoryRepositoryProvider>,
        lifecycle: BookingLifecycle,
        qr: Arc<StubQrPublisher>,
    }

    async fn fixture() -> Fixture {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .slots()
            .create(NewParkingSlot {
                location: "Lot A".into(),
                slot_type: "car".into(),
                is_active: true,
            })
            .await
            .unwrap();
        let qr = Arc::new(StubQrPublisher::working());
        let lifecycle = BookingLifecycle::new(repos.clone(), PricingPolicy::default(), qr.clone());
        Fixture {
            repos,
            lifecycle,
            qr,
        }
    }

    async fn slot_active(repos: &InMemoryRepositoryProvider, id: i32) -> bool {
        repos.slots().find_by_id(id).await.unwrap().unwrap().is_active
    }

    #[tokio::test]
    async fn create_prices_and_deactivates_slot() {
        let f = fixture().await;
        let outcome = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap();

        assert_eq!(outcome.booking.price, 5000);
        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert!(!outcome.qr_failed);
        assert_eq!(
            outcome.booking.qr_code_url.as_deref(),
            Some("https://qr.test/booking_1.png")
        );
        assert!(!outcome.slot.is_active);
        assert!(!slot_active(&f.repos, 1).await);

        let stored = f.lifecycle.get_booking(outcome.booking.id).await.unwrap();
        assert_eq!(stored.qr_code_url, outcome.booking.qr_code_url);
    }

    #[tokio::test]
    async fn invalid_interval_is_rejected_before_lookup() {
        let f = fixture().await;
        assert!(matches!(
            f.lifecycle.create_booking("u1", 99, at(16, 0), at(14, 0)).await,
            Err(DomainError::InvalidInterval(_))
        ));
        assert!(matches!(
            f.lifecycle.create_booking("u1", 1, at(14, 0), at(14, 0)).await,
            Err(DomainError::InvalidInterval(_))
        ));
    }

    #[tokio::test]
    async fn unknown_slot() {
        let f = fixture().await;
        assert!(matches!(
            f.lifecycle.create_booking("u1", 42, at(14, 0), at(15, 0)).await,
            Err(DomainError::SlotNotFound(42))
        ));
    }

    #[tokio::test]
    async fn overlapping_request_conflicts() {
        let f = fixture().await;
        f.lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap();

        assert!(matches!(
            f.lifecycle.create_booking("u2", 1, at(15, 0), at(15, 30)).await,
            Err(DomainError::SlotConflict(1))
        ));
    }

    #[tokio::test]
    async fn inactive_slot_without_overlap_is_unavailable() {
        let f = fixture().await;
        f.lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap();

        assert!(matches!(
            f.lifecycle.create_booking("u2", 1, at(18, 0), at(19, 0)).await,
            Err(DomainError::SlotUnavailable(1))
        ));
    }

    #[tokio::test]
    async fn qr_failure_is_soft() {
        let f = fixture().await;
        f.qr.fail();

        let outcome = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(15, 0))
            .await
            .unwrap();

        assert!(outcome.qr_failed);
        assert!(outcome.booking.qr_code_url.is_none());
        assert_eq!(
            outcome.message(),
            "Booking created successfully, but QR generation failed"
        );
        assert!(f.lifecycle.get_booking(outcome.booking.id).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_by_owner_releases_slot_and_allows_rebooking() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;

        let cancelled = f.lifecycle.cancel_booking("u1", b.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(slot_active(&f.repos, 1).await);

        f.lifecycle
            .create_booking("u2", 1, at(15, 0), at(15, 30))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_by_stranger_is_forbidden() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;

        assert!(matches!(
            f.lifecycle.cancel_booking("u2", b.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(!slot_active(&f.repos, 1).await);
    }

    #[tokio::test]
    async fn terminal_bookings_reject_transitions() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;
        f.lifecycle.complete_booking(b.id).await.unwrap();
        assert!(slot_active(&f.repos, 1).await);

        assert!(matches!(
            f.lifecycle.cancel_booking("u1", b.id).await,
            Err(DomainError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.lifecycle.complete_booking(b.id).await,
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn pay_then_pay_again() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;

        let receipt = f.lifecycle.pay_booking(b.id).await.unwrap();
        assert_eq!(receipt.amount_paid, 5000);
        assert_eq!(receipt.status, BookingStatus::Booked);

        let stored = f.lifecycle.get_booking(b.id).await.unwrap();
        assert!(stored.is_paid);
        assert_eq!(stored.status, BookingStatus::Booked);
        assert_eq!(stored.paid_at, Some(receipt.paid_at));

        assert!(matches!(
            f.lifecycle.pay_booking(b.id).await,
            Err(DomainError::AlreadyPaid(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_paid() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;
        f.lifecycle.cancel_booking("u1", b.id).await.unwrap();

        assert!(matches!(
            f.lifecycle.pay_booking(b.id).await,
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    /// Lifecycle whose first two booking reads line up, plus an admitted booking
    async fn lockstep(f: &Fixture) -> (BookingLifecycle, Booking) {
        let booking = f
            .repos
            .bookings()
            .admit(NewBooking {
                user_id: "u1".into(),
                slot_id: 1,
                start_time: at(14, 0),
                end_time: at(16, 0),
                price: 5000,
            })
            .await
            .unwrap();
        let repos = Arc::new(LockstepReads::new(f.repos.clone(), 2));
        let lifecycle = BookingLifecycle::new(repos, PricingPolicy::default(), f.qr.clone());
        (lifecycle, booking)
    }

    #[tokio::test]
    async fn cancel_racing_payment_is_never_undone() {
        for pay_first in [true, false] {
            let f = fixture().await;
            let (racing, booking) = lockstep(&f).await;

            let (cancelled, paid) = if pay_first {
                let (p, c) = tokio::join!(
                    racing.pay_booking(booking.id),
                    racing.cancel_booking("u1", booking.id)
                );
                (c, p)
            } else {
                tokio::join!(
                    racing.cancel_booking("u1", booking.id),
                    racing.pay_booking(booking.id)
                )
            };

            // Cancel always lands: on the pending booking, or on the paid one
            assert_eq!(cancelled.unwrap().status, BookingStatus::Cancelled);
            let payment_went_through = match paid {
                Ok(receipt) => {
                    assert_eq!(receipt.status, BookingStatus::Booked);
                    true
                }
                Err(e) => {
                    assert!(matches!(e, DomainError::InvalidTransition { .. }), "{}", e);
                    false
                }
            };

            let stored = f.lifecycle.get_booking(booking.id).await.unwrap();
            assert_eq!(stored.status, BookingStatus::Cancelled);
            assert_eq!(stored.is_paid, payment_went_through);
            assert!(slot_active(&f.repos, 1).await);
        }
    }

    #[tokio::test]
    async fn racing_payments_charge_once() {
        let f = fixture().await;
        let (racing, booking) = lockstep(&f).await;

        let (a, b) = tokio::join!(racing.pay_booking(booking.id), racing.pay_booking(booking.id));
        let (receipt, rejected) = match (a, b) {
            (Ok(r), Err(e)) | (Err(e), Ok(r)) => (r, e),
            (a, b) => panic!("expected one payment, got {:?} and {:?}", a, b),
        };
        assert!(matches!(rejected, DomainError::AlreadyPaid(_)));

        let stored = f.lifecycle.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.paid_at, Some(receipt.paid_at));
    }

    #[tokio::test]
    async fn completion_racing_cancel_picks_one_outcome() {
        let f = fixture().await;
        let (racing, booking) = lockstep(&f).await;

        let (cancelled, completed) = tokio::join!(
            racing.cancel_booking("u1", booking.id),
            racing.complete_booking(booking.id)
        );
        assert!(cancelled.is_ok() != completed.is_ok());

        let stored = f.lifecycle.get_booking(booking.id).await.unwrap();
        let expected = if cancelled.is_ok() {
            BookingStatus::Cancelled
        } else {
            BookingStatus::Completed
        };
        assert_eq!(stored.status, expected);
        assert!(slot_active(&f.repos, 1).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_for_one_window_admit_once() {
        let f = fixture().await;
        let lifecycle = Arc::new(f.lifecycle);

        let mut requests = tokio::task::JoinSet::new();
        for i in 0..8 {
            let lifecycle = lifecycle.clone();
            requests.spawn(async move {
                lifecycle
                    .create_booking(&format!("u{}", i), 1, at(14, 0), at(16, 0))
                    .await
            });
        }

        let mut granted = 0;
        while let Some(joined) = requests.join_next().await {
            match joined.unwrap() {
                Ok(_) => granted += 1,
                Err(e) => assert!(
                    matches!(e, DomainError::SlotConflict(1) | DomainError::SlotUnavailable(1)),
                    "unexpected error: {}",
                    e
                ),
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(f.repos.bookings().find_by_slot(1).await.unwrap().len(), 1);
        assert!(!slot_active(&f.repos, 1).await);
    }

    #[tokio::test]
    async fn delete_keeps_slot_flag() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;

        f.lifecycle.delete_booking(b.id).await.unwrap();
        assert!(matches!(
            f.lifecycle.get_booking(b.id).await,
            Err(DomainError::BookingNotFound(_))
        ));
        assert!(!slot_active(&f.repos, 1).await);
        assert!(matches!(
            f.lifecycle.delete_booking(b.id).await,
            Err(DomainError::BookingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn qr_lookup_is_owner_only() {
        let f = fixture().await;
        let b = f
            .lifecycle
            .create_booking("u1", 1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .booking;

        assert!(f.lifecycle.qr_code_url("u1", b.id).await.unwrap().is_some());
        assert!(matches!(
            f.lifecycle.qr_code_url("u2", b.id).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn quote_reports_rounded_hours() {
        let f = fixture().await;
        let quote = f.lifecycle.quote(at(14, 0), at(15, 30)).unwrap();
        assert_eq!(quote.duration_hours, 2);
        assert_eq!(quote.price, 5000);
        assert!(f.lifecycle.quote(at(15, 0), at(14, 0)).is_err());
    }
}
