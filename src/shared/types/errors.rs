use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid time interval: {0}")]
    InvalidInterval(String),

    #[error("Parking slot {0} not found")]
    SlotNotFound(i32),

    #[error("Booking {0} not found")]
    BookingNotFound(i32),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Parking slot {0} is not available")]
    SlotUnavailable(i32),

    #[error("Parking slot {0} is already booked for the selected time")]
    SlotConflict(i32),

    #[error("All parking slots at location '{location}'{} are booked for the selected time", type_suffix(.slot_type))]
    AllSlotsBooked {
        location: String,
        slot_type: Option<String>,
    },

    #[error("{} parking slots found at location '{location}'", location_prefix(.only_inactive))]
    NoSlotsAtLocation {
        location: String,
        only_inactive: bool,
    },

    #[error("No available parking slots of type '{slot_type}' found at location '{location}'")]
    NoSlotsOfType { location: String, slot_type: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Booking {0} is already paid")]
    AlreadyPaid(i32),

    #[error("Booking {id} cannot be {action} (status: {status})")]
    InvalidTransition {
        id: i32,
        action: &'static str,
        status: String,
    },

    #[error("Parking slot {0} has pending or booked bookings")]
    SlotInUse(i32),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unexpected: {0}")]
    Unexpected(String),
}

fn type_suffix(slot_type: &Option<String>) -> String {
    slot_type
        .as_deref()
        .map(|t| format!(" of type '{}'", t))
        .unwrap_or_default()
}

fn location_prefix(only_inactive: &bool) -> &'static str {
    if *only_inactive {
        "No available"
    } else {
        "No"
    }
}

impl DomainError {
    /// Whether admission lost a race for the slot and another candidate may succeed.
    pub fn is_slot_claim_lost(&self) -> bool {
        matches!(
            self,
            DomainError::SlotConflict(_) | DomainError::SlotUnavailable(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        DomainError::Unexpected(e.to_string())
    }
}
