//! # Inkwell Infrastructure
//!
//! Concrete implementations of the ports defined in `inkwell-core`:
//! the SeaORM database layer, the page cache, authentication and media storage.

pub mod auth;
pub mod cache;
pub mod database;
pub mod media;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use cache::InMemoryCache;
pub use database::{DatabaseConfig, DatabaseConnections};
pub use media::FsMediaStore;
