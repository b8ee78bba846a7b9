//! User entity for SeaORM.

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Condition, DatabaseTransaction, Set};

use super::{comment, follow, post};
use crate::database::base::CascadeDelete;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub date_joined: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Removing a user removes everything they own or authored.
#[async_trait]
impl CascadeDelete for Entity {
    async fn cascade(txn: &DatabaseTransaction, id: i32) -> Result<(), DbErr> {
        follow::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(follow::Column::UserId.eq(id))
                    .add(follow::Column::AuthorId.eq(id)),
            )
            .exec(txn)
            .await?;

        let post_ids: Vec<i32> = post::Entity::find()
            .filter(post::Column::AuthorId.eq(id))
            .all(txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let comments = comment::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(comment::Column::AuthorId.eq(id))
                    .add(comment::Column::PostId.is_in(post_ids.clone())),
            )
            .exec(txn)
            .await?;

        post::Entity::delete_many()
            .filter(post::Column::AuthorId.eq(id))
            .exec(txn)
            .await?;

        tracing::info!(
            user_id = id,
            posts = post_ids.len(),
            comments = comments.rows_affected,
            "Cascading user delete"
        );
        Ok(())
    }
}

/// Conversion from SeaORM Model to Domain User.
impl From<Model> for inkwell_core::domain::User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            password_hash: model.password_hash,
            date_joined: model.date_joined.into(),
        }
    }
}

/// Conversion from Domain User to SeaORM ActiveModel.
impl From<inkwell_core::domain::User> for ActiveModel {
    fn from(user: inkwell_core::domain::User) -> Self {
        Self {
            id: if user.id == 0 { NotSet } else { Set(user.id) },
            username: Set(user.username),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            password_hash: Set(user.password_hash),
            date_joined: Set(user.date_joined.into()),
        }
    }
}
