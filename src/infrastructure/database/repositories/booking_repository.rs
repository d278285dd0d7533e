//! SeaORM implementation of BookingRepository
//!
//! Admission and release write the booking and the slot flag inside one
//! transaction. Admission claims the slot with a conditional update
//! (`is_active = true → false`), so two concurrent requests for the same
//! slot cannot both commit. Transitions are compare-and-set on the status
//! and payment flag the caller read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::sea_query::Expr;
use sea_orm::*;

use super::db_err;
use crate::domain::{
    Booking, BookingRepository, BookingState, BookingStatus, DomainError, DomainResult, NewBooking,
};
use crate::infrastructure::database::entities::{booking, parking_slot};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn booking_model_to_domain(m: booking::Model) -> Booking {
    Booking {
        id: m.id,
        user_id: m.user_id,
        slot_id: m.slot_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: m.status.parse().unwrap_or_else(|e| {
            warn!("Booking {}: {}; treating it as cancelled", m.id, e);
            BookingStatus::Cancelled
        }),
        price: m.price,
        is_paid: m.is_paid,
        paid_at: m.paid_at,
        qr_code_url: m.qr_code_url,
        created_at: m.created_at,
    }
}

fn holding_statuses() -> [&'static str; 2] {
    BookingStatus::HOLDING.map(|s| s.as_str())
}

/// Pending/booked bookings intersecting the closed interval `[start, end]`
fn overlapping(start: DateTime<Utc>, end: DateTime<Utc>) -> Select<booking::Entity> {
    booking::Entity::find()
        .filter(booking::Column::Status.is_in(holding_statuses()))
        .filter(booking::Column::StartTime.lte(end))
        .filter(booking::Column::EndTime.gte(start))
}

/// Write the mutable fields of a booking if its row still holds `expected`.
/// Returns whether a row was written.
async fn write_booking<C: ConnectionTrait>(
    conn: &C,
    b: &Booking,
    expected: BookingState,
) -> DomainResult<bool> {
    let result = booking::Entity::update_many()
        .col_expr(booking::Column::Status, Expr::value(b.status.as_str()))
        .col_expr(booking::Column::IsPaid, Expr::value(b.is_paid))
        .col_expr(booking::Column::PaidAt, Expr::value(b.paid_at))
        .col_expr(booking::Column::QrCodeUrl, Expr::value(b.qr_code_url.clone()))
        .filter(booking::Column::Id.eq(b.id))
        .filter(booking::Column::Status.eq(expected.status.as_str()))
        .filter(booking::Column::IsPaid.eq(expected.is_paid))
        .exec(conn)
        .await
        .map_err(db_err)?;

    Ok(result.rows_affected == 1)
}

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(booking_model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .order_by_desc(booking::Column::CreatedAt)
            .order_by_desc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(booking_model_to_domain).collect())
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::CreatedAt)
            .order_by_desc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(booking_model_to_domain).collect())
    }

    async fn find_by_slot(&self, slot_id: i32) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::SlotId.eq(slot_id))
            .order_by_asc(booking::Column::StartTime)
            .order_by_asc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(booking_model_to_domain).collect())
    }

    async fn find_overlapping(
        &self,
        slot_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        let models = overlapping(start, end)
            .filter(booking::Column::SlotId.eq(slot_id))
            .order_by_asc(booking::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(booking_model_to_domain).collect())
    }

    async fn find_busy_slot_ids(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>> {
        overlapping(start, end)
            .select_only()
            .column(booking::Column::SlotId)
            .distinct()
            .order_by_asc(booking::Column::SlotId)
            .into_tuple::<i32>()
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn admit(&self, new: NewBooking) -> DomainResult<Booking> {
        let slot_id = new.slot_id;
        let txn = self.db.begin().await.map_err(db_err)?;

        let claimed = parking_slot::Entity::update_many()
            .col_expr(parking_slot::Column::IsActive, Expr::value(false))
            .filter(parking_slot::Column::Id.eq(slot_id))
            .filter(parking_slot::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected
            == 1;

        let overlaps = overlapping(new.start_time, new.end_time)
            .filter(booking::Column::SlotId.eq(slot_id))
            .count(&txn)
            .await
            .map_err(db_err)?;

        // Dropping `txn` on the error paths rolls the claim back.
        if overlaps > 0 {
            debug!("Admission on slot {} lost: overlapping booking", slot_id);
            return Err(DomainError::SlotConflict(slot_id));
        }
        if !claimed {
            let exists = parking_slot::Entity::find_by_id(slot_id)
                .one(&txn)
                .await
                .map_err(db_err)?
                .is_some();
            return Err(if exists {
                DomainError::SlotUnavailable(slot_id)
            } else {
                DomainError::SlotNotFound(slot_id)
            });
        }

        let model = booking::ActiveModel {
            user_id: Set(new.user_id),
            slot_id: Set(slot_id),
            start_time: Set(new.start_time),
            end_time: Set(new.end_time),
            status: Set(BookingStatus::Pending.as_str().to_string()),
            price: Set(new.price),
            is_paid: Set(false),
            paid_at: Set(None),
            qr_code_url: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let inserted = model.insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        debug!("Admitted booking {} on slot {}", inserted.id, slot_id);
        Ok(booking_model_to_domain(inserted))
    }

    async fn update(&self, booking: &Booking, expected: BookingState) -> DomainResult<bool> {
        let written = write_booking(&self.db, booking, expected).await?;
        if !written {
            debug!("Booking {} changed since it was read; not written", booking.id);
        }
        Ok(written)
    }

    async fn update_and_release_slot(
        &self,
        booking: &Booking,
        expected: BookingState,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;

        if !write_booking(&txn, booking, expected).await? {
            debug!("Booking {} changed since it was read; slot kept", booking.id);
            return Ok(false);
        }

        let released = parking_slot::Entity::update_many()
            .col_expr(parking_slot::Column::IsActive, Expr::value(true))
            .filter(parking_slot::Column::Id.eq(booking.slot_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if released.rows_affected == 0 {
            warn!(
                "Slot {} of booking {} no longer exists; nothing to release",
                booking.slot_id, booking.id
            );
        }

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn set_qr_code_url(&self, id: i32, url: &str) -> DomainResult<()> {
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::QrCodeUrl, Expr::value(url))
            .filter(booking::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::BookingNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = booking::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::BookingNotFound(id));
        }
        Ok(())
    }
}
