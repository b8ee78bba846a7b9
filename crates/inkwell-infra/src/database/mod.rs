//! Database connection management, entities and repositories.

mod base;
mod connections;
pub mod entity;
mod repositories;
pub mod schema;

pub use base::{CascadeDelete, SeaOrmRepository};
pub use connections::{DatabaseConfig, DatabaseConnections};
pub use repositories::{
    SeaOrmCommentRepository, SeaOrmFollowRepository, SeaOrmGroupRepository,
    SeaOrmPostRepository, SeaOrmUserRepository,
};
