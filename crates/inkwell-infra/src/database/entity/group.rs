//! Group entity for SeaORM.

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, DatabaseTransaction, Set, Value};

use super::post;
use crate::database::base::CascadeDelete;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Posts outlive their group; they just lose the reference.
#[async_trait]
impl CascadeDelete for Entity {
    async fn cascade(txn: &DatabaseTransaction, id: i32) -> Result<(), DbErr> {
        let detached = post::Entity::update_many()
            .col_expr(post::Column::GroupId, Expr::value(Value::Int(None)))
            .filter(post::Column::GroupId.eq(id))
            .exec(txn)
            .await?;

        tracing::info!(
            group_id = id,
            posts = detached.rows_affected,
            "Detaching posts from deleted group"
        );
        Ok(())
    }
}

impl From<Model> for inkwell_core::domain::Group {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            slug: model.slug,
            description: model.description,
        }
    }
}

impl From<inkwell_core::domain::Group> for ActiveModel {
    fn from(group: inkwell_core::domain::Group) -> Self {
        Self {
            id: if group.id == 0 { NotSet } else { Set(group.id) },
            title: Set(group.title),
            slug: Set(group.slug),
            description: Set(group.description),
        }
    }
}
