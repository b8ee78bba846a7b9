//! # Inkwell Core
//!
//! The domain layer of the Inkwell blog.
//! Entities, pagination, form contracts and the ports infrastructure implements.
//! No database, HTTP or filesystem code lives here.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::DomainError;
pub use pagination::{POSTS_PER_PAGE, Page, PageRequest};
