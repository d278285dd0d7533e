//! Booking by location
//!
//! Picks the first free slot at a location (optionally of a given type)
//! and admits the booking on it through [`BookingLifecycle`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::service::{validate_interval, BookingLifecycle, BookingOutcome};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct LocationMatcher {
    repos: Arc<dyn RepositoryProvider>,
    lifecycle: Arc<BookingLifecycle>,
}

impl LocationMatcher {
    pub fn new(repos: Arc<dyn RepositoryProvider>, lifecycle: Arc<BookingLifecycle>) -> Self {
        Self { repos, lifecycle }
    }

    /// Book the lowest-ID active slot at `location` that is free over `[start, end]`.
    ///
    /// A candidate lost to a concurrent request between selection and
    /// commit is skipped in favour of the next one.
    pub async fn find_and_book(
        &self,
        user_id: &str,
        location: &str,
        slot_type: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<BookingOutcome> {
        validate_interval(start, end)?;

        let slots = self.repos.slots().find_by_location(location).await?;
        if slots.is_empty() {
            return Err(DomainError::NoSlotsAtLocation {
                location: location.to_string(),
                only_inactive: false,
            });
        }

        let active: Vec<_> = slots.into_iter().filter(|s| s.is_active).collect();
        if active.is_empty() {
            return Err(DomainError::NoSlotsAtLocation {
                location: location.to_string(),
                only_inactive: true,
            });
        }

        let candidates = match slot_type {
            Some(t) => {
                let typed: Vec<_> = active.into_iter().filter(|s| s.is_of_type(t)).collect();
                if typed.is_empty() {
                    return Err(DomainError::NoSlotsOfType {
                        location: location.to_string(),
                        slot_type: t.to_string(),
                    });
                }
                typed
            }
            None => active,
        };

        for slot in candidates {
            let slot_id = slot.id;
            let free = self
                .lifecycle
                .availability()
                .find_overlapping(slot_id, start, end)
                .await?
                .is_empty();
            if !free {
                debug!(slot_id, "Candidate slot has overlapping bookings");
                continue;
            }

            match self.lifecycle.admit_on(user_id, slot, start, end).await {
                Ok(outcome) => {
                    info!(
                        booking_id = outcome.booking.id,
                        slot_id,
                        location,
                        "Slot matched by location"
                    );
                    return Ok(outcome);
                }
                Err(e) if e.is_slot_claim_lost() => {
                    debug!(slot_id, error = %e, "Candidate slot claimed concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::AllSlotsBooked {
            location: location.to_string(),
            slot_type: slot_type.map(str::to_string),
        })
    }
}
