//! # Inkwell Shared
//!
//! Request payloads submitted by the blog's HTML forms.

pub mod dto;

pub use dto::PageQuery;
