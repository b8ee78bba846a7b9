use async_trait::async_trait;

use crate::domain::{Comment, Group, Post, User};
use crate::error::RepoError;
use crate::pagination::{Page, PageRequest};

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create when its id is unset, update otherwise).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID, applying the entity's cascade rule.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, i32> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Users registered with this email, compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, RepoError>;

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, i32> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// All groups ordered by title.
    async fn list_all(&self) -> Result<Vec<Group>, RepoError>;

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<Group>, RepoError>;
}

/// Post repository. Every listing is newest first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i32> {
    async fn page_all(&self, request: PageRequest) -> Result<Page<Post>, RepoError>;

    async fn page_by_group(
        &self,
        group_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    async fn page_by_author(
        &self,
        author_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    /// Posts written by any of `author_ids`.
    async fn page_by_authors(
        &self,
        author_ids: &[i32],
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    async fn count_by_author(&self, author_id: i32) -> Result<u64, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i32> {
    /// Comments on one post, newest first.
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError>;
}

/// Follow repository. A follow is keyed by the (user, author) pair.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Returns `false` when nothing was created: a duplicate pair or a
    /// self-follow.
    async fn follow(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError>;

    /// Returns `false` when there was nothing to remove.
    async fn unfollow(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError>;

    async fn is_following(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError>;

    async fn followed_author_ids(&self, user_id: i32) -> Result<Vec<i32>, RepoError>;

    /// How many users follow `author_id`.
    async fn followers_count(&self, author_id: i32) -> Result<u64, RepoError>;

    /// How many authors `user_id` follows.
    async fn following_count(&self, user_id: i32) -> Result<u64, RepoError>;
}
