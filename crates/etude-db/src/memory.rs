//! In-memory [`AuthStore`] honoring the same contract as [`crate::DbStore`].
//!
//! Row locks are explicit here, so redemption races stay deterministic
//! under test regardless of database backend behavior.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::{refresh_token, user};
use crate::store::{AuthStore, NewRefreshToken, NewUser, RefreshTokenLock, StoreError};

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, user::Model>,
    logins: HashMap<String, Uuid>,
    tokens: HashMap<String, refresh_token::Model>,
    locked: HashSet<String>,
    next_token_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user and their login mapping, as an external deletion
    /// would. Tokens already issued for the user are left in place.
    pub async fn remove_user(&self, id: Uuid) {
        let mut inner = self.inner.lock().await;

        if let Some(removed) = inner.users.remove(&id) {
            inner.logins.remove(&removed.login);
        }
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<user::Model>, StoreError> {
        let inner = self.inner.lock().await;

        let found = inner
            .logins
            .get(login)
            .and_then(|id| inner.users.get(id))
            .cloned();

        Ok(found)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<user::Model>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.users.get(&id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<user::Model, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.logins.contains_key(&new_user.login) {
            return Err(StoreError::Conflict(format!(
                "users.login: {}",
                new_user.login
            )));
        }

        let now = Utc::now();
        let model = user::Model {
            id: new_user.id,
            login: new_user.login.clone(),
            password_hash: new_user.password_hash,
            role: new_user.role,
            last_login_at: now,
            created_at: now,
            updated_at: now,
        };

        inner.logins.insert(new_user.login, new_user.id);
        inner.users.insert(new_user.id, model.clone());

        Ok(model)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        let found = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        found.last_login_at = at;
        found.updated_at = at;

        Ok(())
    }

    async fn insert_refresh_token(
        &self,
        new_token: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.tokens.contains_key(&new_token.token) {
            return Err(StoreError::Conflict(format!(
                "refresh_tokens.token: {}",
                new_token.token
            )));
        }

        inner.next_token_id += 1;
        let model = refresh_token::Model {
            id: inner.next_token_id,
            token: new_token.token.clone(),
            user_id: new_token.user_id,
            used: false,
            expires_at: new_token.expires_at,
            created_at: Utc::now(),
        };

        inner.tokens.insert(new_token.token, model.clone());

        Ok(model)
    }

    async fn try_lock_refresh_token(
        &self,
        token: &str,
    ) -> Result<Box<dyn RefreshTokenLock>, StoreError> {
        let mut inner = self.inner.lock().await;

        let record = match inner.tokens.get(token) {
            Some(record) => record.clone(),
            None => return Err(StoreError::NotFound),
        };

        if !inner.locked.insert(token.to_string()) {
            return Err(StoreError::RowLocked);
        }

        Ok(Box::new(MemoryRefreshTokenLock {
            inner: Arc::clone(&self.inner),
            record,
        }))
    }
}

struct MemoryRefreshTokenLock {
    inner: Arc<Mutex<MemoryInner>>,
    record: refresh_token::Model,
}

#[async_trait]
impl RefreshTokenLock for MemoryRefreshTokenLock {
    fn record(&self) -> &refresh_token::Model {
        &self.record
    }

    async fn consume(
        self: Box<Self>,
        replacement: NewRefreshToken,
    ) -> Result<refresh_token::Model, StoreError> {
        let mut inner = self.inner.lock().await;

        inner.locked.remove(&self.record.token);

        // Nothing may change on a conflict: the old row stays unused.
        if inner.tokens.contains_key(&replacement.token) {
            return Err(StoreError::Conflict(format!(
                "refresh_tokens.token: {}",
                replacement.token
            )));
        }

        if let Some(row) = inner.tokens.get_mut(&self.record.token) {
            row.used = true;
        }

        inner.next_token_id += 1;
        let model = refresh_token::Model {
            id: inner.next_token_id,
            token: replacement.token.clone(),
            user_id: replacement.user_id,
            used: false,
            expires_at: replacement.expires_at,
            created_at: Utc::now(),
        };

        inner.tokens.insert(replacement.token, model.clone());

        Ok(model)
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.locked.remove(&self.record.token);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;

    fn sample_user(login: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            password_hash: "$2b$04$fakehashfakehashfakehash".to_string(),
            role: UserRole::User,
        }
    }

    fn sample_token(token: &str, user_id: Uuid) -> NewRefreshToken {
        NewRefreshToken {
            token: token.to_string(),
            user_id,
            expires_at: Utc::now().timestamp() + 3600,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = MemoryStore::new();

        let inserted = store.insert_user(sample_user("alice")).await.unwrap();

        let by_login = store.find_user_by_login("alice").await.unwrap().unwrap();
        assert_eq!(by_login.id, inserted.id);

        let by_id = store.find_user_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id.login, "alice");

        assert!(store.find_user_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_login_conflicts() {
        let store = MemoryStore::new();

        store.insert_user(sample_user("alice")).await.unwrap();
        let result = store.insert_user(sample_user("alice")).await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_touch_last_login() {
        let store = MemoryStore::new();
        let inserted = store.insert_user(sample_user("alice")).await.unwrap();

        let later = Utc::now() + chrono::Duration::hours(1);
        store.touch_last_login(inserted.id, later).await.unwrap();

        let found = store.find_user_by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(found.last_login_at, later);

        let missing = store.touch_last_login(Uuid::new_v4(), later).await;
        assert!(matches!(missing, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_token_conflicts() {
        let store = MemoryStore::new();
        let user = store.insert_user(sample_user("alice")).await.unwrap();

        store
            .insert_refresh_token(sample_token("tok-1", user.id))
            .await
            .unwrap();
        let result = store
            .insert_refresh_token(sample_token("tok-1", user.id))
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lock_missing_token() {
        let store = MemoryStore::new();

        let result = store.try_lock_refresh_token("nope").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let store = MemoryStore::new();
        let user = store.insert_user(sample_user("alice")).await.unwrap();
        store
            .insert_refresh_token(sample_token("tok-1", user.id))
            .await
            .unwrap();

        let lock = store.try_lock_refresh_token("tok-1").await.unwrap();
        assert_eq!(lock.record().token, "tok-1");

        let contended = store.try_lock_refresh_token("tok-1").await;
        assert!(matches!(contended, Err(StoreError::RowLocked)));

        lock.release().await.unwrap();

        let relocked = store.try_lock_refresh_token("tok-1").await;
        assert!(relocked.is_ok());
    }

    #[tokio::test]
    async fn test_consume_marks_used_and_inserts_replacement() {
        let store = MemoryStore::new();
        let user = store.insert_user(sample_user("alice")).await.unwrap();
        store
            .insert_refresh_token(sample_token("tok-old", user.id))
            .await
            .unwrap();

        let lock = store.try_lock_refresh_token("tok-old").await.unwrap();
        let replacement = lock
            .consume(sample_token("tok-new", user.id))
            .await
            .unwrap();

        assert_eq!(replacement.token, "tok-new");
        assert!(!replacement.used);
        assert_eq!(replacement.user_id, user.id);

        // Old row still exists, marked used, and is lockable again
        let lock = store.try_lock_refresh_token("tok-old").await.unwrap();
        assert!(lock.record().used);
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_consume_conflict_leaves_old_row_unused() {
        let store = MemoryStore::new();
        let user = store.insert_user(sample_user("alice")).await.unwrap();
        store
            .insert_refresh_token(sample_token("tok-a", user.id))
            .await
            .unwrap();
        store
            .insert_refresh_token(sample_token("tok-b", user.id))
            .await
            .unwrap();

        let lock = store.try_lock_refresh_token("tok-a").await.unwrap();
        let result = lock.consume(sample_token("tok-b", user.id)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // Rolled back: not used, not locked
        let lock = store.try_lock_refresh_token("tok-a").await.unwrap();
        assert!(!lock.record().used);
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_lock_single_winner() {
        let store = MemoryStore::new();
        let user = store.insert_user(sample_user("alice")).await.unwrap();
        store
            .insert_refresh_token(sample_token("tok-1", user.id))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_lock_refresh_token("tok-1").await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1, "exactly one task may hold the row lock");
    }
}
