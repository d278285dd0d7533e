//! Infrastructure layer: persistence, crypto and outbound adapters

pub mod crypto;
pub mod database;
pub mod qr;
pub mod storage;

pub use database::{init_database, DatabaseConfig, Migrator, SeaOrmRepositoryProvider};
pub use qr::{build_publisher, CloudinaryQrPublisher};
pub use storage::InMemoryRepositoryProvider;
