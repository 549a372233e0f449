//! Authentication orchestration
//!
//! `AuthService` composes the password hasher, the access token issuer
//! and the refresh token ledger on top of an [`AuthStore`]. Handlers and
//! middleware call into this layer only; the single `AuthError` type
//! carries the full client-facing error taxonomy.

use std::sync::Arc;

use axum::{http::StatusCode, Json};
use chrono::Utc;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use etude_auth::{
    AccessTokenIssuer, IssuedAccessToken, JwtError, PasswordError, PasswordHasher,
    RefreshTokenGenerator,
};
use etude_db::entities::refresh_token;
use etude_db::entities::user::{self, UserRole};
use etude_db::{AuthStore, NewRefreshToken, NewUser, StoreError};

use crate::models::ErrorResponse;

/// Security parameters, supplied explicitly at construction
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Symmetric secret for signing access tokens
    pub jwt_secret: String,
    /// Issuer claim stamped into every access token
    pub jwt_issuer: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// Bcrypt cost factor for password hashing
    pub bcrypt_cost: u32,
}

/// Authentication failures, mapped one-to-one onto HTTP responses
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("User already exists")]
    AlreadyExists,

    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Refresh token already used")]
    RefreshTokenAlreadyUsed,

    #[error("Refresh token is being redeemed, retry")]
    Contention,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token invalid: {0}")]
    InvalidToken(String),

    #[error("User removed")]
    UserRemoved,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::AlreadyExists
            | AuthError::RefreshTokenExpired
            | AuthError::RefreshTokenAlreadyUsed => StatusCode::BAD_REQUEST,
            AuthError::RefreshTokenNotFound => StatusCode::NOT_FOUND,
            AuthError::Contention => StatusCode::CONFLICT,
            AuthError::NotAuthenticated | AuthError::InvalidToken(_) | AuthError::UserRemoved => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Password(_) | AuthError::Jwt(_) | AuthError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AuthError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: AuthError) -> Self {
        let status = err.status();

        // Internal failures get logged in full but leave the response generic
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Auth operation failed: {}", err);
            return (
                status,
                Json(ErrorResponse {
                    detail: "Internal server error".to_string(),
                }),
            );
        }

        (
            status,
            Json(ErrorResponse {
                detail: err.to_string(),
            }),
        )
    }
}

/// Access + refresh pair minted for one session
#[derive(Debug)]
pub struct SessionTokens {
    pub access: IssuedAccessToken,
    pub refresh: refresh_token::Model,
}

/// Issues and redeems single-use refresh tokens against the store.
pub struct RefreshTokenLedger {
    store: Arc<dyn AuthStore>,
    validity_secs: i64,
}

impl RefreshTokenLedger {
    pub fn new(store: Arc<dyn AuthStore>, validity_secs: i64) -> Self {
        Self {
            store,
            validity_secs,
        }
    }

    /// Mint and persist a fresh token for the user.
    ///
    /// A generated token colliding with an existing row surfaces as a
    /// store error rather than being silently retried: at 256 bits of
    /// entropy a collision means something is broken.
    pub async fn issue(&self, user_id: Uuid) -> Result<refresh_token::Model, AuthError> {
        let token = RefreshTokenGenerator::generate();
        let expires_at = Utc::now().timestamp() + self.validity_secs;

        let inserted = self
            .store
            .insert_refresh_token(NewRefreshToken {
                token: token.into_string(),
                user_id,
                expires_at,
            })
            .await?;

        Ok(inserted)
    }

    /// Redeem a presented token for its replacement.
    ///
    /// Classification order is fixed: unknown before expired, expired
    /// before already-used. A row held by a concurrent redemption is
    /// reported as [`AuthError::Contention`], which the client may retry.
    /// Marking the old row used and inserting the replacement commit in
    /// one transaction.
    pub async fn redeem(&self, presented: &str) -> Result<refresh_token::Model, AuthError> {
        let lock = self
            .store
            .try_lock_refresh_token(presented)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => AuthError::RefreshTokenNotFound,
                StoreError::RowLocked => AuthError::Contention,
                other => AuthError::Store(other),
            })?;

        let (user_id, expires_at, used) = {
            let record = lock.record();
            (record.user_id, record.expires_at, record.used)
        };

        if expires_at < Utc::now().timestamp() {
            lock.release().await?;
            return Err(AuthError::RefreshTokenExpired);
        }

        if used {
            lock.release().await?;
            return Err(AuthError::RefreshTokenAlreadyUsed);
        }

        let token = RefreshTokenGenerator::generate();
        let replacement_expires_at = Utc::now().timestamp() + self.validity_secs;

        let replacement = lock
            .consume(NewRefreshToken {
                token: token.into_string(),
                user_id,
                expires_at: replacement_expires_at,
            })
            .await?;

        Ok(replacement)
    }
}

/// The authentication facade used by handlers and middleware.
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    hasher: PasswordHasher,
    issuer: AccessTokenIssuer,
    ledger: RefreshTokenLedger,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>, config: &SecurityConfig) -> Result<Self, PasswordError> {
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        let issuer = AccessTokenIssuer::new(
            config.jwt_secret.as_bytes(),
            config.jwt_issuer.clone(),
            config.access_token_ttl_secs,
        );
        let ledger = RefreshTokenLedger::new(Arc::clone(&store), config.refresh_token_ttl_secs);

        Ok(Self {
            store,
            hasher,
            issuer,
            ledger,
        })
    }

    /// Verify credentials and mint a session.
    ///
    /// Unknown logins and wrong passwords are indistinguishable to the
    /// caller; the dummy verification keeps both paths at bcrypt cost.
    pub async fn login(&self, login: &str, password: &str) -> Result<SessionTokens, AuthError> {
        let found = match self.store.find_user_by_login(login).await? {
            Some(found) => found,
            None => {
                self.hasher.verify_dummy(password);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &found.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.store.touch_last_login(found.id, Utc::now()).await?;

        self.mint_session(found.id).await
    }

    /// Rotate a refresh token and mint a new access token for its user.
    pub async fn refresh(&self, presented: &str) -> Result<SessionTokens, AuthError> {
        let replacement = self.ledger.redeem(presented).await?;
        let access = self.issuer.issue(replacement.user_id.to_string())?;

        Ok(SessionTokens {
            access,
            refresh: replacement,
        })
    }

    /// Create a user with a unique login.
    ///
    /// The pre-check gives a friendly fast path; the storage uniqueness
    /// constraint is what actually guards against concurrent registration.
    pub async fn register(&self, login: &str, password: &str) -> Result<user::Model, AuthError> {
        if self.store.find_user_by_login(login).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let new_user = NewUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            password_hash,
            role: UserRole::User,
        };

        match self.store.insert_user(new_user).await {
            Ok(created) => Ok(created),
            Err(StoreError::Conflict(_)) => Err(AuthError::AlreadyExists),
            Err(other) => Err(AuthError::Store(other)),
        }
    }

    /// Resolve a bearer access token to its live user row.
    pub async fn current_user(&self, token: &str) -> Result<user::Model, AuthError> {
        let claims = self
            .issuer
            .verify(token)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserRemoved)
    }

    async fn mint_session(&self, user_id: Uuid) -> Result<SessionTokens, AuthError> {
        let access = self.issuer.issue(user_id.to_string())?;
        let refresh = self.ledger.issue(user_id).await?;

        Ok(SessionTokens { access, refresh })
    }
}
