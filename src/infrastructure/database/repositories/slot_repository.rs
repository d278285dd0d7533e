//! SeaORM implementation of ParkingSlotRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::*;

use super::db_err;
use crate::domain::{
    BookingStatus, DomainError, DomainResult, NewParkingSlot, ParkingSlot, ParkingSlotRepository,
    SlotChanges,
};
use crate::infrastructure::database::entities::{booking, parking_slot};

pub struct SeaOrmParkingSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmParkingSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn slot_model_to_domain(m: parking_slot::Model) -> ParkingSlot {
    ParkingSlot {
        id: m.id,
        location: m.location,
        slot_type: m.slot_type,
        is_active: m.is_active,
        created_at: m.created_at,
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn contains_pattern(needle: &str) -> LikeExpr {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{}%", escaped)).escape('\\')
}

#[async_trait]
impl ParkingSlotRepository for SeaOrmParkingSlotRepository {
    async fn create(&self, slot: NewParkingSlot) -> DomainResult<ParkingSlot> {
        debug!("Creating parking slot at {} ({})", slot.location, slot.slot_type);

        let model = parking_slot::ActiveModel {
            location: Set(slot.location),
            slot_type: Set(slot.slot_type),
            is_active: Set(slot.is_active),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        Ok(slot_model_to_domain(inserted))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ParkingSlot>> {
        let model = parking_slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(slot_model_to_domain))
    }

    async fn find_all(&self) -> DomainResult<Vec<ParkingSlot>> {
        let models = parking_slot::Entity::find()
            .order_by_asc(parking_slot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(slot_model_to_domain).collect())
    }

    async fn find_by_location(&self, location: &str) -> DomainResult<Vec<ParkingSlot>> {
        let models = parking_slot::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(parking_slot::Column::Location)))
                    .like(contains_pattern(location)),
            )
            .order_by_asc(parking_slot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(slot_model_to_domain).collect())
    }

    async fn find_by_type(&self, slot_type: &str) -> DomainResult<Vec<ParkingSlot>> {
        let models = parking_slot::Entity::find()
            .filter(parking_slot::Column::SlotType.eq(slot_type))
            .order_by_asc(parking_slot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(slot_model_to_domain).collect())
    }

    async fn count_active(&self) -> DomainResult<u64> {
        parking_slot::Entity::find()
            .filter(parking_slot::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update(&self, id: i32, changes: SlotChanges) -> DomainResult<ParkingSlot> {
        let existing = parking_slot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::SlotNotFound(id))?;

        // Unchanged columns are left out of the UPDATE
        let mut active: parking_slot::ActiveModel = existing.into();
        active.location = Set(changes.location);
        active.slot_type = Set(changes.slot_type);
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(&self.db).await.map_err(db_err)?;
        debug!("Updated parking slot {}", updated.id);
        Ok(slot_model_to_domain(updated))
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        if parking_slot::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_none()
        {
            return Err(DomainError::SlotNotFound(id));
        }

        let live = booking::Entity::find()
            .filter(booking::Column::SlotId.eq(id))
            .filter(booking::Column::Status.is_in(BookingStatus::HOLDING.map(|s| s.as_str())))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if live > 0 {
            return Err(DomainError::SlotInUse(id));
        }

        let removed = booking::Entity::delete_many()
            .filter(booking::Column::SlotId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        parking_slot::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        debug!(
            "Deleted parking slot {} with {} finished bookings",
            id, removed.rows_affected
        );
        Ok(())
    }
}
