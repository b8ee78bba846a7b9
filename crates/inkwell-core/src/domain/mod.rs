//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod meta;
mod post;
mod user;

pub use comment::Comment;
pub use follow::Follow;
pub use group::Group;
pub use meta::{FieldMeta, FieldMetadata};
pub use post::{Post, SHORT_TEXT_LEN};
pub use user::User;
