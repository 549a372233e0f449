//! User entity backing authentication

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User role in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum UserRole {
    /// System administrator with full access
    #[sea_orm(string_value = "admin")]
    Admin,

    /// Regular user
    #[sea_orm(string_value = "user")]
    User,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// User UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login name (unique, immutable)
    #[sea_orm(unique)]
    pub login: String,

    /// Bcrypt password hash
    pub password_hash: String,

    /// User role (admin or user)
    pub role: UserRole,

    /// When the user last logged in
    pub last_login_at: ChronoDateTimeUtc,

    /// When the user account was created
    pub created_at: ChronoDateTimeUtc,

    /// When the user record was last updated
    pub updated_at: ChronoDateTimeUtc,
}

// Refresh tokens reference users by id; navigation is a query on
// refresh_tokens.user_id, never a collection hanging off the user.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
