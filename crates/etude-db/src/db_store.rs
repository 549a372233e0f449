//! SeaORM-backed [`AuthStore`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{refresh_token, user};
use crate::store::{AuthStore, NewRefreshToken, NewUser, RefreshTokenLock, StoreError};

/// Relational store. Row locks map to `SELECT ... FOR UPDATE SKIP LOCKED`
/// inside a short-lived transaction.
///
/// SQLite ignores the lock clause (its writers are serialized anyway);
/// PostgreSQL provides real skip-locked semantics.
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn map_insert_err(err: sea_orm::DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => StoreError::Conflict(msg),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl AuthStore for DbStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<user::Model>, StoreError> {
        let found = user::Entity::find()
            .filter(user::Column::Login.eq(login))
            .one(&self.db)
            .await?;

        Ok(found)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<user::Model>, StoreError> {
        let found = user::Entity::find_by_id(id).one(&self.db).await?;

        Ok(found)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<user::Model, StoreError> {
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(new_user.id),
            login: Set(new_user.login),
            password_hash: Set(new_user.password_hash),
            role: Set(new_user.role),
            last_login_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(&self.db).await.map_err(map_insert_err)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let found = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut active: user::ActiveModel = found.into();
        active.last_login_at = Set(at);
        active.updated_at = Set(at);
        active.update(&self.db).await?;

        Ok(())
    }

    async fn insert_refresh_token(
        &self,
        new_token: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError> {
        let model = refresh_token::ActiveModel {
            id: NotSet,
            token: Set(new_token.token),
            user_id: Set(new_token.user_id),
            used: Set(false),
            expires_at: Set(new_token.expires_at),
            created_at: Set(Utc::now()),
        };

        model.insert(&self.db).await.map_err(map_insert_err)
    }

    async fn try_lock_refresh_token(
        &self,
        token: &str,
    ) -> Result<Box<dyn RefreshTokenLock>, StoreError> {
        let txn = self.db.begin().await?;

        let locked = refresh_token::Entity::find()
            .filter(refresh_token::Column::Token.eq(token))
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        match locked {
            Some(record) => Ok(Box::new(DbRefreshTokenLock { txn, record })),
            None => {
                // Skip-locked returns nothing both for a missing row and
                // for a row held elsewhere; a plain re-read splits the two.
                let exists = refresh_token::Entity::find()
                    .filter(refresh_token::Column::Token.eq(token))
                    .one(&txn)
                    .await?;
                txn.rollback().await?;

                if exists.is_some() {
                    Err(StoreError::RowLocked)
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }
}

/// Lock held through an open transaction. Dropping it without consuming
/// rolls the transaction back.
struct DbRefreshTokenLock {
    txn: DatabaseTransaction,
    record: refresh_token::Model,
}

#[async_trait]
impl RefreshTokenLock for DbRefreshTokenLock {
    fn record(&self) -> &refresh_token::Model {
        &self.record
    }

    async fn consume(
        self: Box<Self>,
        replacement: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError> {
        let this = *self;

        let mut current: refresh_token::ActiveModel = this.record.into();
        current.used = Set(true);
        current.update(&this.txn).await?;

        let inserted = refresh_token::ActiveModel {
            id: NotSet,
            token: Set(replacement.token),
            user_id: Set(replacement.user_id),
            used: Set(false),
            expires_at: Set(replacement.expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&this.txn)
        .await
        .map_err(map_insert_err)?;

        this.txn.commit().await?;

        Ok(inserted)
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await?;

        Ok(())
    }
}
