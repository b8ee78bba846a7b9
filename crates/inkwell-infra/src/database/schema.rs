//! Schema bootstrap: create missing tables from the entity definitions.

use sea_orm::{ConnectionTrait, DbConn, DbErr, EntityName, EntityTrait, Schema};

use super::entity::{comment, follow, group, post, user};

/// Create every table that does not exist yet, parents before children.
pub async fn create_tables(db: &DbConn) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, group::Entity).await?;
    create_table(db, post::Entity).await?;
    create_table(db, comment::Entity).await?;
    create_table(db, follow::Entity).await?;
    Ok(())
}

async fn create_table<E>(db: &DbConn, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();

    db.execute(backend.build(&stmt)).await?;
    tracing::debug!(table = entity.table_name(), "Table ready");
    Ok(())
}
