//! Identity module: registration, login and user management
//!
//! Token issuance and password hashing live in `infrastructure::crypto`;
//! `UserService` only orchestrates them.

pub mod service;

pub use service::{AuthResult, UserService};
