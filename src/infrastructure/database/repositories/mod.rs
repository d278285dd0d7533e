//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod repository_provider;
pub mod slot_repository;
pub mod user_repository;

pub use booking_repository::SeaOrmBookingRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use slot_repository::SeaOrmParkingSlotRepository;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Unexpected(format!("Database error: {}", e))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::domain::{
        BookingStatus, CreateUserDto, GetUserDto, NewBooking, NewParkingSlot, RepositoryProvider,
        SlotChanges, UpdateUserDto, UserRole,
    };
    use crate::infrastructure::database::test_database;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, h, m, 0).unwrap()
    }

    async fn seeded() -> (SeaOrmRepositoryProvider, String) {
        seed(test_database().await).await
    }

    async fn seed(db: sea_orm::DatabaseConnection) -> (SeaOrmRepositoryProvider, String) {
        let repos = SeaOrmRepositoryProvider::new(db);
        let user = repos
            .users()
            .create_user(CreateUserDto {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role: UserRole::User,
            })
            .await
            .unwrap();
        for (location, slot_type) in [("Central Lot A", "car"), ("Lot B", "motor")] {
            repos
                .slots()
                .create(NewParkingSlot {
                    location: location.into(),
                    slot_type: slot_type.into(),
                    is_active: true,
                })
                .await
                .unwrap();
        }
        (repos, user.id)
    }

    fn changes(location: &str, slot_type: &str, is_active: Option<bool>) -> SlotChanges {
        SlotChanges {
            location: location.into(),
            slot_type: slot_type.into(),
            is_active,
        }
    }

    fn request(user_id: &str, slot_id: i32, from: (u32, u32), to: (u32, u32)) -> NewBooking {
        NewBooking {
            user_id: user_id.to_string(),
            slot_id,
            start_time: at(from.0, from.1),
            end_time: at(to.0, to.1),
            price: 5000,
        }
    }

    #[tokio::test]
    async fn slot_queries() {
        let (repos, _) = seeded().await;

        let by_location = repos.slots().find_by_location("lot a").await.unwrap();
        assert_eq!(by_location.len(), 1);
        assert_eq!(by_location[0].location, "Central Lot A");

        assert!(repos.slots().find_by_location("50%").await.unwrap().is_empty());
        assert_eq!(repos.slots().find_by_type("motor").await.unwrap()[0].id, 2);
        assert_eq!(repos.slots().count_active().await.unwrap(), 2);

        repos
            .slots()
            .update(2, changes("Lot B", "motor", Some(false)))
            .await
            .unwrap();
        assert_eq!(repos.slots().count_active().await.unwrap(), 1);

        // Without a flag only location and type change
        let renamed = repos
            .slots()
            .update(2, changes("Lot C", "car", None))
            .await
            .unwrap();
        assert_eq!(renamed.location, "Lot C");
        assert!(!renamed.is_active);
        assert!(matches!(
            repos.slots().update(42, changes("Lot C", "car", None)).await,
            Err(DomainError::SlotNotFound(42))
        ));
    }

    #[tokio::test]
    async fn admit_claims_slot_and_detects_overlap() {
        let (repos, user_id) = seeded().await;

        let booking = repos
            .bookings()
            .admit(request(&user_id, 1, (14, 0), (16, 0)))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(!repos.slots().find_by_id(1).await.unwrap().unwrap().is_active);

        // Touching endpoint counts as overlap
        assert!(matches!(
            repos.bookings().admit(request(&user_id, 1, (16, 0), (17, 0))).await,
            Err(DomainError::SlotConflict(1))
        ));
        assert!(matches!(
            repos.bookings().admit(request(&user_id, 1, (18, 0), (19, 0))).await,
            Err(DomainError::SlotUnavailable(1))
        ));
        assert!(matches!(
            repos.bookings().admit(request(&user_id, 9, (18, 0), (19, 0))).await,
            Err(DomainError::SlotNotFound(9))
        ));

        let busy = repos
            .bookings()
            .find_busy_slot_ids(at(15, 0), at(15, 0))
            .await
            .unwrap();
        assert_eq!(busy, vec![1]);
    }

    #[tokio::test]
    async fn failed_admission_leaves_slot_untouched() {
        let (repos, user_id) = seeded().await;
        let mut first = repos
            .bookings()
            .admit(request(&user_id, 1, (14, 0), (16, 0)))
            .await
            .unwrap();

        // Reactivate the flag while the booking still holds the interval
        repos
            .slots()
            .update(1, changes("Central Lot A", "car", Some(true)))
            .await
            .unwrap();
        assert!(matches!(
            repos.bookings().admit(request(&user_id, 1, (15, 0), (15, 30))).await,
            Err(DomainError::SlotConflict(1))
        ));
        assert!(repos.slots().find_by_id(1).await.unwrap().unwrap().is_active);

        let read = first.state();
        first.cancel().unwrap();
        assert!(repos
            .bookings()
            .update_and_release_slot(&first, read)
            .await
            .unwrap());
        assert!(repos
            .bookings()
            .find_overlapping(1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn booking_updates_persist() {
        let (repos, user_id) = seeded().await;
        let mut booking = repos
            .bookings()
            .admit(request(&user_id, 2, (9, 0), (10, 30)))
            .await
            .unwrap();

        let read = booking.state();
        booking.pay(at(9, 5)).unwrap();
        assert!(repos.bookings().update(&booking, read).await.unwrap());
        repos
            .bookings()
            .set_qr_code_url(booking.id, "https://img.example/qr.png")
            .await
            .unwrap();

        let stored = repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Booked);
        assert!(stored.is_paid);
        assert_eq!(stored.paid_at, Some(at(9, 5)));
        assert_eq!(stored.qr_code_url.as_deref(), Some("https://img.example/qr.png"));

        assert_eq!(repos.bookings().find_by_user(&user_id).await.unwrap().len(), 1);
        assert_eq!(repos.bookings().find_by_slot(2).await.unwrap().len(), 1);

        repos.bookings().delete(booking.id).await.unwrap();
        assert!(matches!(
            repos.bookings().delete(booking.id).await,
            Err(DomainError::BookingNotFound(_))
        ));
        // Deleting a booking does not touch the slot flag
        assert!(!repos.slots().find_by_id(2).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn transition_from_a_stale_read_is_rejected() {
        let (repos, user_id) = seeded().await;
        let admitted = repos
            .bookings()
            .admit(request(&user_id, 1, (14, 0), (16, 0)))
            .await
            .unwrap();
        let read = admitted.state();

        let mut cancelled = admitted.clone();
        cancelled.cancel().unwrap();
        assert!(repos
            .bookings()
            .update_and_release_slot(&cancelled, read)
            .await
            .unwrap());

        // A payment decided on the pending copy finds the row changed
        let mut paid = admitted;
        paid.pay(at(14, 5)).unwrap();
        assert!(!repos.bookings().update(&paid, read).await.unwrap());

        // So does a second release: it must not flip the slot again
        repos.bookings().admit(request(&user_id, 1, (18, 0), (19, 0))).await.unwrap();
        assert!(!repos
            .bookings()
            .update_and_release_slot(&cancelled, read)
            .await
            .unwrap());
        assert!(!repos.slots().find_by_id(1).await.unwrap().unwrap().is_active);

        let stored = repos.bookings().find_by_id(cancelled.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert!(!stored.is_paid);
    }

    #[tokio::test]
    async fn racing_admissions_commit_once() {
        let (repos, user_id) = seeded().await;
        let bookings = repos.bookings();
        let (a, b, c, d) = tokio::join!(
            bookings.admit(request(&user_id, 1, (14, 0), (16, 0))),
            bookings.admit(request(&user_id, 1, (14, 0), (16, 0))),
            bookings.admit(request(&user_id, 1, (15, 0), (17, 0))),
            bookings.admit(request(&user_id, 1, (13, 0), (14, 30))),
        );

        let mut granted = 0;
        for result in [a, b, c, d] {
            match result {
                Ok(_) => granted += 1,
                Err(e) => assert!(e.is_slot_claim_lost(), "unexpected error: {}", e),
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(bookings.find_by_slot(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_status_is_read_as_cancelled() {
        use crate::infrastructure::database::entities::booking as booking_entity;
        use sea_orm::sea_query::Expr;
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let db = test_database().await;
        let (repos, user_id) = seed(db.clone()).await;
        let booking = repos
            .bookings()
            .admit(request(&user_id, 1, (14, 0), (16, 0)))
            .await
            .unwrap();

        booking_entity::Entity::update_many()
            .col_expr(booking_entity::Column::Status, Expr::value("refunded"))
            .filter(booking_entity::Column::Id.eq(booking.id))
            .exec(&db)
            .await
            .unwrap();

        let stored = repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert!(repos
            .bookings()
            .find_overlapping(1, at(14, 0), at(16, 0))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn slot_delete_guards_live_bookings() {
        let (repos, user_id) = seeded().await;
        let mut booking = repos
            .bookings()
            .admit(request(&user_id, 1, (14, 0), (16, 0)))
            .await
            .unwrap();

        assert!(matches!(
            repos.slots().delete(1).await,
            Err(DomainError::SlotInUse(1))
        ));

        let read = booking.state();
        booking.complete().unwrap();
        assert!(repos
            .bookings()
            .update_and_release_slot(&booking, read)
            .await
            .unwrap());
        repos.slots().delete(1).await.unwrap();

        assert!(repos.slots().find_by_id(1).await.unwrap().is_none());
        assert!(repos.bookings().find_by_id(booking.id).await.unwrap().is_none());
        assert!(matches!(
            repos.slots().delete(1).await,
            Err(DomainError::SlotNotFound(1))
        ));
    }

    #[tokio::test]
    async fn user_repository_roundtrip() {
        let (repos, user_id) = seeded().await;

        assert!(matches!(
            repos
                .users()
                .create_user(CreateUserDto {
                    name: "Other".into(),
                    email: "alice@example.com".into(),
                    password_hash: "hash".into(),
                    role: UserRole::User,
                })
                .await,
            Err(DomainError::Conflict(_))
        ));

        let updated = repos
            .users()
            .update_user(
                &user_id,
                UpdateUserDto {
                    name: Some("Alice B".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Alice B");
        assert_eq!(updated.email, "alice@example.com");

        let page = repos
            .users()
            .list_users(GetUserDto {
                search: Some("Alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        repos.users().delete_user(&user_id).await.unwrap();
        assert_eq!(repos.users().count_users().await.unwrap(), 0);
    }
}
