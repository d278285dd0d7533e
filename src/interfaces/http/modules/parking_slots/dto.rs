//! Parking slot DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{SlotBookings, SlotOccupancy};
use crate::domain::{Booking, ParkingSlot};
use crate::shared::{parse_boolean, parse_instant, ParseError};

/// Parking slot API representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotDto {
    pub id: i32,
    pub location: String,
    #[serde(rename = "type")]
    pub slot_type: String,
    pub is_active: bool,
    /// Present on list/detail views: inactive, or covered by a booking right now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_occupied: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<ParkingSlot> for SlotDto {
    fn from(s: ParkingSlot) -> Self {
        Self {
            id: s.id,
            location: s.location,
            slot_type: s.slot_type,
            is_active: s.is_active,
            is_occupied: None,
            created_at: s.created_at,
        }
    }
}

impl From<SlotOccupancy> for SlotDto {
    fn from(v: SlotOccupancy) -> Self {
        Self {
            is_occupied: Some(v.is_occupied),
            ..Self::from(v.slot)
        }
    }
}

/// Create / update body. `is_active` accepts booleans, 0/1 and
/// "true"/"false"/"1"/"0".
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SlotRequest {
    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: String,
    #[serde(rename = "type")]
    #[validate(length(max = 50, message = "type must be at most 50 characters"))]
    pub slot_type: String,
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub is_active: Option<Value>,
}

impl SlotRequest {
    pub fn active_flag(&self) -> Result<Option<bool>, ParseError> {
        match &self.is_active {
            Some(raw) => parse_boolean(raw),
            None => Ok(None),
        }
    }
}

/// Query window, both bounds required
#[derive(Debug, Deserialize, IntoParams)]
pub struct TimeWindowParams {
    /// RFC 3339 or `YYYY-MM-DDTHH:MM[:SS]` (UTC)
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

pub type Window = (DateTime<Utc>, DateTime<Utc>);

/// Parse both bounds; `Err` carries the client-facing message
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<Window, String> {
    let (Some(start), Some(end)) = (
        start.filter(|s| !s.trim().is_empty()),
        end.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err("Start time and end time are required".to_string());
    };
    let start = parse_instant(start).map_err(|e| e.to_string())?;
    let end = parse_instant(end).map_err(|e| e.to_string())?;
    Ok((start, end))
}

impl TimeWindowParams {
    pub fn window(&self) -> Result<Window, String> {
        parse_window(self.start_time.as_deref(), self.end_time.as_deref())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationWindowRequest {
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub slot_id: i32,
    pub available: bool,
}

/// Booking as shown on a slot's public timeline: no owner, no QR link
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotBookingDto {
    pub id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub price: i32,
    pub is_paid: bool,
}

impl From<Booking> for SlotBookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status.as_str().to_string(),
            price: b.price,
            is_paid: b.is_paid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotBookingsResponse {
    pub slot: SlotDto,
    pub bookings: Vec<SlotBookingDto>,
}

impl From<SlotBookings> for SlotBookingsResponse {
    fn from(v: SlotBookings) -> Self {
        Self {
            slot: v.slot.into(),
            bookings: v.bookings.into_iter().map(SlotBookingDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_requires_both_bounds() {
        assert_eq!(
            parse_window(Some("2025-06-01T10:00:00Z"), None).unwrap_err(),
            "Start time and end time are required"
        );
        assert!(parse_window(Some(" "), Some("2025-06-01T10:00:00Z")).is_err());
        assert!(parse_window(Some("yesterday"), Some("2025-06-01T10:00:00Z"))
            .unwrap_err()
            .contains("not a valid date-time"));

        let (start, end) =
            parse_window(Some("2025-06-01T10:00"), Some("2025-06-01T12:30:00+00:00")).unwrap();
        assert_eq!((end - start).num_minutes(), 150);
    }

    #[test]
    fn slot_request_flag_forms() {
        let req: SlotRequest =
            serde_json::from_str(r#"{"location":"Lot A","type":"car","is_active":"0"}"#).unwrap();
        assert_eq!(req.active_flag().unwrap(), Some(false));

        let req: SlotRequest =
            serde_json::from_str(r#"{"location":"Lot A","type":"car"}"#).unwrap();
        assert_eq!(req.active_flag().unwrap(), None);

        let req: SlotRequest =
            serde_json::from_str(r#"{"location":"Lot A","type":"car","is_active":"maybe"}"#)
                .unwrap();
        assert!(req.active_flag().is_err());
    }

    #[test]
    fn slot_dto_uses_type_key() {
        let dto = SlotDto {
            id: 1,
            location: "Lot A".into(),
            slot_type: "car".into(),
            is_active: true,
            is_occupied: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["type"], "car");
        assert!(json.get("is_occupied").is_none());
    }
}
