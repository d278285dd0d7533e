//! # Parking Slot Booking Service
//!
//! Users book parking slots for a time window, either a specific slot or the
//! first free slot at a location. Prices follow an hourly policy and every
//! admitted booking gets a QR ticket.
//!
//! ## Architecture
//!
//! - **domain**: entities, pricing policy, repository and port traits
//! - **application**: booking lifecycle, availability, location matching,
//!   identity and slot administration
//! - **infrastructure**: SeaORM persistence, in-memory store, JWT/bcrypt,
//!   QR publishing
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError, CONFIG_ENV};

pub use infrastructure::{init_database, DatabaseConfig, InMemoryRepositoryProvider};

pub use interfaces::http::{create_api_router, ApiServices};

pub use server::{init_tracing, ServerHandle, ServerOptions};
