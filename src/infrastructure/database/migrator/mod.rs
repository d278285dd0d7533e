//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250501_000001_create_users;
mod m20250501_000002_create_parking_slots;
mod m20250501_000003_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250501_000001_create_users::Migration),
            Box::new(m20250501_000002_create_parking_slots::Migration),
            Box::new(m20250501_000003_create_bookings::Migration),
        ]
    }
}
