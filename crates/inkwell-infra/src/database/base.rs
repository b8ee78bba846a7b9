use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseTransaction, DbConn, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, SqlErr, TransactionTrait, TryIntoModel,
};

use inkwell_core::error::RepoError;
use inkwell_core::ports::BaseRepository;

/// What else has to go when a row of this entity is deleted.
///
/// Runs inside the delete transaction, before the row itself is removed.
#[async_trait]
pub trait CascadeDelete: EntityTrait {
    async fn cascade(txn: &DatabaseTransaction, id: i32) -> Result<(), DbErr>;
}

pub(crate) fn query_err(e: DbErr) -> RepoError {
    match e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
        _ => RepoError::Query(e.to_string()),
    }
}

/// Generic SeaORM repository implementation.
pub struct SeaOrmRepository<E>
where
    E: EntityTrait,
{
    pub(crate) db: DbConn,
    _entity: PhantomData<E>,
}

impl<E> SeaOrmRepository<E>
where
    E: EntityTrait,
{
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E, T> BaseRepository<T, i32> for SeaOrmRepository<E>
where
    E: EntityTrait + CascadeDelete,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E>
        + ActiveModelBehavior
        + TryIntoModel<E::Model>
        + Send
        + Sync,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    T: From<E::Model> + Into<E::ActiveModel> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: i32) -> Result<Option<T>, RepoError> {
        let result = E::find_by_id(id).one(&self.db).await.map_err(query_err)?;

        Ok(result.map(Into::into))
    }

    async fn save(&self, entity: T) -> Result<T, RepoError> {
        let active_model: E::ActiveModel = entity.into();
        let result = active_model.save(&self.db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RepoError::Constraint(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => RepoError::Constraint(detail),
            _ => query_err(e),
        })?;

        let model = result.try_into_model().map_err(query_err)?;
        Ok(model.into())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(query_err)?;

        E::cascade(&txn, id).await.map_err(query_err)?;
        let result = E::delete_by_id(id).exec(&txn).await.map_err(query_err)?;

        // Dropping the transaction rolls the cascade back.
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        txn.commit().await.map_err(query_err)?;
        Ok(())
    }
}
