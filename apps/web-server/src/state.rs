//! Application state - shared across all handlers.

use std::sync::Arc;

use sea_orm::{DbConn, DbErr};

use inkwell_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, MediaStore, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use inkwell_infra::auth::{Argon2PasswordService, JwtTokenService};
use inkwell_infra::cache::InMemoryCache;
use inkwell_infra::database::{
    DatabaseConnections, SeaOrmCommentRepository, SeaOrmFollowRepository, SeaOrmGroupRepository,
    SeaOrmPostRepository, SeaOrmUserRepository,
};
use inkwell_infra::media::FsMediaStore;

use crate::config::{AppConfig, Settings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub media: Arc<dyn MediaStore>,
    pub settings: Settings,
}

impl AppState {
    /// Connect to the database and wire every adapter.
    pub async fn new(config: &AppConfig) -> Result<Self, DbErr> {
        let connections = DatabaseConnections::init(&config.database).await?;

        let state = Self::from_parts(
            connections.main,
            JwtTokenService::from_env(),
            FsMediaStore::new(config.media_root.clone()),
            config.settings.clone(),
        );

        tracing::info!("Application state initialized");
        Ok(state)
    }

    pub fn from_parts(
        db: DbConn,
        tokens: JwtTokenService,
        media: FsMediaStore,
        settings: Settings,
    ) -> Self {
        Self {
            cache: Arc::new(InMemoryCache::new()),
            users: Arc::new(SeaOrmUserRepository::new(db.clone())),
            groups: Arc::new(SeaOrmGroupRepository::new(db.clone())),
            posts: Arc::new(SeaOrmPostRepository::new(db.clone())),
            comments: Arc::new(SeaOrmCommentRepository::new(db.clone())),
            follows: Arc::new(SeaOrmFollowRepository::new(db)),
            tokens: Arc::new(tokens),
            passwords: Arc::new(Argon2PasswordService::new()),
            media: Arc::new(media),
            settings,
        }
    }
}
