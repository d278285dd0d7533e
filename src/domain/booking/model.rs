//! Booking domain entity

use chrono::{DateTime, Utc};

use crate::domain::{DomainError, DomainResult};

/// Booking status
///
/// `pending → booked → completed`, with `cancelled` reachable from either
/// live state. `cancelled` and `completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    /// Created, not paid yet
    Pending,
    /// Paid
    Booked,
    /// Cancelled by the owner
    Cancelled,
    /// Finished by an operator
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Statuses that hold the slot for their interval
    pub const HOLDING: [BookingStatus; 2] = [Self::Pending, Self::Booked];

    pub fn holds_slot(&self) -> bool {
        Self::HOLDING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "booked" => Ok(Self::Booked),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::Unexpected(format!(
                "Unknown booking status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fields a transition reads before deciding, used to detect
/// concurrent writes to the same booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingState {
    pub status: BookingStatus,
    pub is_paid: bool,
}

/// Time-bounded reservation of a parking slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: i32,
    /// Owner
    pub user_id: String,
    pub slot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    /// Computed at creation, never changes
    pub price: i32,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn state(&self) -> BookingState {
        BookingState {
            status: self.status,
            is_paid: self.is_paid,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Closed-interval overlap against `[start, end]`, only for slot-holding statuses.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status.holds_slot() && self.start_time <= end && self.end_time >= start
    }

    /// Whether this booking holds its slot at instant `at`
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.overlaps(at, at)
    }

    /// Cancel a live booking
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.guard_live("cancelled")?;
        self.status = BookingStatus::Cancelled;
        Ok(())
    }

    /// Complete a live booking
    pub fn complete(&mut self) -> DomainResult<()> {
        self.guard_live("completed")?;
        self.status = BookingStatus::Completed;
        Ok(())
    }

    /// Record payment.
    ///
    /// A pending booking becomes booked; a completed one stays completed.
    pub fn pay(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.is_paid {
            return Err(DomainError::AlreadyPaid(self.id));
        }
        if self.status == BookingStatus::Cancelled {
            return Err(self.invalid("paid"));
        }
        self.is_paid = true;
        self.paid_at = Some(at);
        if self.status == BookingStatus::Pending {
            self.status = BookingStatus::Booked;
        }
        Ok(())
    }

    fn guard_live(&self, action: &'static str) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            id: self.id,
            action,
            status: self.status.as_str().to_string(),
        }
    }
}

/// Data for admitting a new booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub slot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: i32,
}

impl NewBooking {
    /// Materialize as a freshly created pending booking
    pub fn into_booking(self, id: i32, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            slot_id: self.slot_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: BookingStatus::Pending,
            price: self.price,
            is_paid: false,
            paid_at: None,
            qr_code_url: None,
            created_at,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
