use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Never serialized directly; clients only
/// ever see the `PublicUser` projection.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // argon2 hash
    pub profile: serde_json::Value, // extra registration fields, passed through
    pub created_at: OffsetDateTime,
}
