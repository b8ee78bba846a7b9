//! SeaORM repository implementations.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ColumnTrait, DbConn, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Set,
};

use inkwell_core::domain::{Comment, Follow, Group, Post, User};
use inkwell_core::error::RepoError;
use inkwell_core::pagination::{Page, PageRequest};
use inkwell_core::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};

use super::base::{SeaOrmRepository, query_err};
use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::group::{self, Entity as GroupEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};

/// SeaORM user repository.
pub type SeaOrmUserRepository = SeaOrmRepository<UserEntity>;

/// SeaORM group repository.
pub type SeaOrmGroupRepository = SeaOrmRepository<GroupEntity>;

/// SeaORM post repository.
pub type SeaOrmPostRepository = SeaOrmRepository<PostEntity>;

/// SeaORM comment repository.
pub type SeaOrmCommentRepository = SeaOrmRepository<CommentEntity>;

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = match email.split_once('@') {
            Some((local, domain)) => {
                let first: String = local.chars().take(1).collect();
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        };
        tracing::debug!(user_email = %masked, "Finding users by email");

        let result = UserEntity::find()
            .filter(Expr::expr(Func::lower(Expr::col(user::Column::Email))).eq(email.to_lowercase()))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl GroupRepository for SeaOrmGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .order_by_asc(group::Column::Title)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Group>, RepoError> {
        let result = GroupEntity::find()
            .filter(group::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

impl SeaOrmPostRepository {
    /// Count, clamp the requested page, then fetch it newest first.
    async fn fetch_page(
        &self,
        select: Select<PostEntity>,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let count = select.clone().count(&self.db).await.map_err(query_err)?;
        let window = request.resolve(count);

        let models = select
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .offset(window.offset)
            .limit(window.limit)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        tracing::debug!(
            page = window.number,
            num_pages = window.num_pages,
            count,
            "Fetched post page"
        );
        Ok(window.into_page(models.into_iter().map(Into::into).collect()))
    }
}

#[async_trait]
impl PostRepository for SeaOrmPostRepository {
    async fn page_all(&self, request: PageRequest) -> Result<Page<Post>, RepoError> {
        self.fetch_page(PostEntity::find(), request).await
    }

    async fn page_by_group(
        &self,
        group_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find().filter(post::Column::GroupId.eq(group_id));
        self.fetch_page(select, request).await
    }

    async fn page_by_author(
        &self,
        author_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let select = PostEntity::find().filter(post::Column::AuthorId.eq(author_id));
        self.fetch_page(select, request).await
    }

    async fn page_by_authors(
        &self,
        author_ids: &[i32],
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let select =
            PostEntity::find().filter(post::Column::AuthorId.is_in(author_ids.iter().copied()));
        self.fetch_page(select, request).await
    }

    async fn count_by_author(&self, author_id: i32) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(query_err)
    }
}

#[async_trait]
impl CommentRepository for SeaOrmCommentRepository {
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::PubDate)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// SeaORM follow repository.
pub struct SeaOrmFollowRepository {
    db: DbConn,
}

impl SeaOrmFollowRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FollowRepository for SeaOrmFollowRepository {
    async fn follow(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let Some(pair) = Follow::new(user_id, author_id) else {
            tracing::debug!(user_id, "Ignoring self-follow");
            return Ok(false);
        };

        let model = follow::ActiveModel {
            user_id: Set(pair.user_id),
            author_id: Set(pair.author_id),
        };
        let inserted = FollowEntity::insert(model)
            .on_conflict(
                OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(query_err)?;

        Ok(inserted > 0)
    }

    async fn unfollow(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let result = FollowEntity::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn is_following(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let count = FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(query_err)?;

        Ok(count > 0)
    }

    async fn followed_author_ids(&self, user_id: i32) -> Result<Vec<i32>, RepoError> {
        let result = FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(query_err)?;

        Ok(result.into_iter().map(|f| f.author_id).collect())
    }

    async fn followers_count(&self, author_id: i32) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(query_err)
    }

    async fn following_count(&self, user_id: i32) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(query_err)
    }
}
