//! Storage contract consumed by the authentication service.
//!
//! Two implementations exist: [`crate::DbStore`] on SeaORM for real
//! deployments and [`crate::MemoryStore`] for protocol tests that need
//! deterministic row-lock behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{refresh_token, user};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the lookup
    #[error("record not found")]
    NotFound,

    /// The row exists but another redemption holds its lock
    #[error("row is held by another transaction")]
    RowLocked,

    /// A unique constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// New user record to persist
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub login: String,
    pub password_hash: String,
    pub role: user::UserRole,
}

/// New refresh token row to persist
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: i64,
}

/// Capability interface over user and refresh token storage.
///
/// Every call reads or writes the store directly; nothing is cached in
/// process, so state checks always see the latest committed row.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<user::Model>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<user::Model>, StoreError>;

    /// Insert a user. A duplicate login surfaces as [`StoreError::Conflict`].
    async fn insert_user(&self, new_user: NewUser) -> Result<user::Model, StoreError>;

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Insert a refresh token row. A duplicate token value surfaces as
    /// [`StoreError::Conflict`].
    async fn insert_refresh_token(
        &self,
        new_token: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError>;

    /// Acquire an exclusive lock on a refresh token row without waiting.
    ///
    /// Returns [`StoreError::NotFound`] if the row does not exist and
    /// [`StoreError::RowLocked`] if a concurrent redemption holds it.
    /// The caller must finish the returned lock with
    /// [`RefreshTokenLock::consume`] or [`RefreshTokenLock::release`].
    async fn try_lock_refresh_token(
        &self,
        token: &str,
    ) -> Result<Box<dyn RefreshTokenLock>, StoreError>;
}

/// Exclusive hold on a single refresh token row.
#[async_trait]
pub trait RefreshTokenLock: Send {
    /// The locked row as it was when the lock was taken.
    fn record(&self) -> &refresh_token::Model;

    /// Mark the locked row used and insert its replacement, atomically.
    ///
    /// Both writes commit together; afterwards the old row still exists
    /// with `used = true` next to the fresh replacement.
    async fn consume(
        self: Box<Self>,
        replacement: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError>;

    /// Give the lock up without changing the row.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}
