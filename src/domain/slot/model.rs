//! Parking slot domain entity

use chrono::{DateTime, Utc};

/// A bookable parking place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingSlot {
    pub id: i32,
    /// Free-text location, matched case-insensitively by substring
    pub location: String,
    /// Vehicle type tag, e.g. "car" or "motor"
    pub slot_type: String,
    /// Cleared while a booking holds the slot
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ParkingSlot {
    /// Case-insensitive substring match on the location
    pub fn is_at(&self, location: &str) -> bool {
        self.location
            .to_lowercase()
            .contains(&location.to_lowercase())
    }

    pub fn is_of_type(&self, slot_type: &str) -> bool {
        self.slot_type == slot_type
    }

    /// Derived occupancy: an inactive slot, or one covered by a booking right now.
    pub fn is_occupied(&self, has_current_booking: bool) -> bool {
        !self.is_active || has_current_booking
    }
}

/// Data for registering a new slot
#[derive(Debug, Clone)]
pub struct NewParkingSlot {
    pub location: String,
    pub slot_type: String,
    pub is_active: bool,
}

/// Administrative edit of a slot
#[derive(Debug, Clone)]
pub struct SlotChanges {
    pub location: String,
    pub slot_type: String,
    /// `None` leaves the stored flag alone, so a slot claimed in the
    /// meantime is not reactivated
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(location: &str, slot_type: &str, is_active: bool) -> ParkingSlot {
        ParkingSlot {
            id: 1,
            location: location.into(),
            slot_type: slot_type.into(),
            is_active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn location_match_is_case_insensitive_substring() {
        let s = slot("Mall Lot A - Level 2", "car", true);
        assert!(s.is_at("lot a"));
        assert!(s.is_at("LEVEL"));
        assert!(s.is_at(""));
        assert!(!s.is_at("Lot B"));
    }

    #[test]
    fn type_match_is_exact() {
        let s = slot("Lot A", "car", true);
        assert!(s.is_of_type("car"));
        assert!(!s.is_of_type("Car"));
        assert!(!s.is_of_type("motor"));
    }

    #[test]
    fn occupancy_view() {
        assert!(!slot("A", "car", true).is_occupied(false));
        assert!(slot("A", "car", true).is_occupied(true));
        assert!(slot("A", "car", false).is_occupied(false));
    }
}
