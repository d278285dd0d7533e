//! Booking DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{BookingOutcome, PaymentReceipt, PriceQuote};
use crate::domain::Booking;
use crate::interfaces::http::modules::parking_slots::SlotDto;

/// Booking API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: i32,
    pub user_id: String,
    pub slot_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// pending, booked, cancelled or completed
    pub status: String,
    pub price: i32,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            slot_id: b.slot_id,
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status.as_str().to_string(),
            price: b.price,
            is_paid: b.is_paid,
            paid_at: b.paid_at,
            qr_code_url: b.qr_code_url,
            created_at: b.created_at,
        }
    }
}

/// A new booking together with the slot it holds
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedBookingDto {
    #[serde(flatten)]
    pub booking: BookingDto,
    pub parking_slot: SlotDto,
}

impl From<BookingOutcome> for CreatedBookingDto {
    fn from(o: BookingOutcome) -> Self {
        Self {
            booking: o.booking.into(),
            parking_slot: o.slot.into(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "slot_id must be a positive integer"))]
    pub slot_id: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookByLocationRequest {
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    /// Optional exact slot type, e.g. "car"
    #[serde(rename = "type", default)]
    pub slot_type: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PriceQuoteRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PriceQuoteDto {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Billable hours, partial hours rounded up
    pub duration_hours: i64,
    pub price: i32,
}

impl From<PriceQuote> for PriceQuoteDto {
    fn from(q: PriceQuote) -> Self {
        Self {
            start_time: q.start_time,
            end_time: q.end_time,
            duration_hours: q.duration_hours,
            price: q.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentReceiptDto {
    pub booking_id: i32,
    pub amount_paid: i32,
    pub paid_at: DateTime<Utc>,
    pub status: String,
}

impl From<PaymentReceipt> for PaymentReceiptDto {
    fn from(r: PaymentReceipt) -> Self {
        Self {
            booking_id: r.booking_id,
            amount_paid: r.amount_paid,
            paid_at: r.paid_at,
            status: r.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrCodeResponse {
    pub booking_id: i32,
    pub qr_code_url: Option<String>,
}
