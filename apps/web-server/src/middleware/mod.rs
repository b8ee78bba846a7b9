//! Request extractors and error responses.

pub mod auth;
pub mod error;
