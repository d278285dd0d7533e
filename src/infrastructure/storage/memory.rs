//! In-memory repository provider
//!
//! Mirrors the SQL repositories closely enough for the services to be
//! tested without a database. Writes that touch both a slot and its
//! bookings run under one lock, which plays the role of the transaction.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    Booking, BookingRepository, BookingState, CreateUserDto, DomainError, DomainResult, GetUserDto, NewBooking,
    NewParkingSlot, ParkingSlot, ParkingSlotRepository, RepositoryProvider, SlotChanges, UpdateUserDto, User,
    UserRepository,
};
use crate::shared::{validate_pagination, PaginatedResult};

/// In-memory storage for development and testing
pub struct InMemoryRepositoryProvider {
    slots: DashMap<i32, ParkingSlot>,
    bookings: DashMap<i32, Booking>,
    users: DashMap<String, User>,
    slot_counter: AtomicI32,
    booking_counter: AtomicI32,
    write_lock: Mutex<()>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            bookings: DashMap::new(),
            users: DashMap::new(),
            slot_counter: AtomicI32::new(1),
            booking_counter: AtomicI32::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| DomainError::Unexpected("in-memory store lock poisoned".into()))
    }

    fn overlapping(&self, slot_id: i32, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Booking> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.slot_id == slot_id && b.overlaps(start, end))
            .map(|b| b.value().clone())
            .collect();
        found.sort_by_key(|b| b.start_time);
        found
    }

    fn sorted_slots(&self, keep: impl Fn(&ParkingSlot) -> bool) -> Vec<ParkingSlot> {
        let mut slots: Vec<ParkingSlot> = self
            .slots
            .iter()
            .filter(|s| keep(s.value()))
            .map(|s| s.value().clone())
            .collect();
        slots.sort_by_key(|s| s.id);
        slots
    }

    /// Replace a stored booking still in `expected`. Caller holds the write lock.
    fn write_if(&self, booking: &Booking, expected: BookingState) -> bool {
        match self.bookings.get_mut(&booking.id) {
            Some(mut stored) if stored.state() == expected => {
                *stored = booking.clone();
                true
            }
            _ => false,
        }
    }

    fn newest_first(&self, keep: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| keep(b.value()))
            .map(|b| b.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        bookings
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn slots(&self) -> &dyn ParkingSlotRepository {
        self
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }
}

// ── Slots ──────────────────────────────────────────────────────

#[async_trait]
impl ParkingSlotRepository for InMemoryRepositoryProvider {
    async fn create(&self, slot: NewParkingSlot) -> DomainResult<ParkingSlot> {
        let id = self.slot_counter.fetch_add(1, Ordering::SeqCst);
        let slot = ParkingSlot {
            id,
            location: slot.location,
            slot_type: slot.slot_type,
            is_active: slot.is_active,
            created_at: Utc::now(),
        };
        self.slots.insert(id, slot.clone());
        Ok(slot)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ParkingSlot>> {
        Ok(self.slots.get(&id).map(|s| s.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<ParkingSlot>> {
        Ok(self.sorted_slots(|_| true))
    }

    async fn find_by_location(&self, location: &str) -> DomainResult<Vec<ParkingSlot>> {
        Ok(self.sorted_slots(|s| s.is_at(location)))
    }

    async fn find_by_type(&self, slot_type: &str) -> DomainResult<Vec<ParkingSlot>> {
        Ok(self.sorted_slots(|s| s.is_of_type(slot_type)))
    }

    async fn count_active(&self) -> DomainResult<u64> {
        Ok(self.slots.iter().filter(|s| s.is_active).count() as u64)
    }

    async fn update(&self, id: i32, changes: SlotChanges) -> DomainResult<ParkingSlot> {
        let mut stored = self.slots.get_mut(&id).ok_or(DomainError::SlotNotFound(id))?;
        stored.location = changes.location;
        stored.slot_type = changes.slot_type;
        if let Some(is_active) = changes.is_active {
            stored.is_active = is_active;
        }
        Ok(stored.clone())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let _guard = self.lock()?;
        if !self.slots.contains_key(&id) {
            return Err(DomainError::SlotNotFound(id));
        }
        if self
            .bookings
            .iter()
            .any(|b| b.slot_id == id && b.status.holds_slot())
        {
            return Err(DomainError::SlotInUse(id));
        }
        self.bookings.retain(|_, b| b.slot_id != id);
        self.slots.remove(&id);
        Ok(())
    }
}

// ── Bookings ───────────────────────────────────────────────────

#[async_trait]
impl BookingRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<Booking>> {
        Ok(self.newest_first(|_| true))
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        Ok(self.newest_first(|b| b.is_owned_by(user_id)))
    }

    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.slot_id == slot_id)
            .map(|b| b.value().clone())
            .collect();
        bookings.sort_by_key(|b| (b.start_time, b.id));
        Ok(bookings)
    }

    async fn find_overlapping(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self.overlapping(slot_id, start, end))
    }

    async fn find_busy_slot_ids(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>> {
        let mut ids: Vec<i32> = self
            .bookings
            .iter()
            .filter(|b| b.overlaps(start, end))
            .map(|b| b.slot_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn admit(&self, booking: NewBooking) -> DomainResult<Booking> {
        let _guard = self.lock()?;
        let slot_id = booking.slot_id;

        let mut slot = self
            .slots
            .get_mut(&slot_id)
            .ok_or(DomainError::SlotNotFound(slot_id))?;

        if !self
            .overlapping(slot_id, booking.start_time, booking.end_time)
            .is_empty()
        {
            return Err(DomainError::SlotConflict(slot_id));
        }
        if !slot.is_active {
            return Err(DomainError::SlotUnavailable(slot_id));
        }

        slot.is_active = false;
        drop(slot);

        let id = self.booking_counter.fetch_add(1, Ordering::SeqCst);
        let booking = booking.into_booking(id, Utc::now());
        self.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, booking: &Booking, expected: BookingState) -> DomainResult<bool> {
        let _guard = self.lock()?;
        Ok(self.write_if(booking, expected))
    }

    async fn update_and_release_slot(
        &self,
        booking: &Booking,
        expected: BookingState,
    ) -> DomainResult<bool> {
        let _guard = self.lock()?;
        if !self.write_if(booking, expected) {
            return Ok(false);
        }
        if let Some(mut slot) = self.slots.get_mut(&booking.slot_id) {
            slot.is_active = true;
        }
        Ok(true)
    }

    async fn set_qr_code_url(&self, id: i32, url: &str) -> DomainResult<()> {
        let mut stored = self
            .bookings
            .get_mut(&id)
            .ok_or(DomainError::BookingNotFound(id))?;
        stored.qr_code_url = Some(url.to_string());
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        self.bookings
            .remove(&id)
            .ok_or(DomainError::BookingNotFound(id))?;
        Ok(())
    }
}

// ── Users ──────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for InMemoryRepositoryProvider {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let _guard = self.lock()?;
        if self
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&dto.email))
        {
            return Err(DomainError::Conflict("Email already registered".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: dto.name,
            email: dto.email,
            password_hash: dto.password_hash,
            role: dto.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);
        let search = dto.search.map(|s| s.to_lowercase());

        let mut matching: Vec<User> = self
            .users
            .iter()
            .filter(|u| match &search {
                Some(q) => {
                    u.name.to_lowercase().contains(q) || u.email.to_lowercase().contains(q)
                }
                None => true,
            })
            .map(|u| u.value().clone())
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(PaginatedResult::<User>::offset(page, page_size) as usize)
            .take(page_size as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.value().clone()))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = dto.name {
            user.name = name;
        }
        if let Some(email) = dto.email {
            user.email = email;
        }
        if let Some(hash) = dto.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.users
            .remove(id)
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))?;
        Ok(())
    }
}
