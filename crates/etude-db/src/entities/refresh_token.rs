//! RefreshToken entity: single-use rotating session tokens

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    /// Row id (primary key, the identity rows are locked by)
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Opaque token value handed to the client (unique)
    #[sea_orm(unique)]
    pub token: String,

    /// User this token belongs to
    pub user_id: Uuid,

    /// Whether the token has been redeemed. Flips to true exactly once.
    pub used: bool,

    /// Absolute expiry (epoch seconds)
    pub expires_at: i64,

    /// When the token was issued
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Refresh token belongs to a user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
