use super::UnknownVariant;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::User => "User",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Administrator" => Ok(Role::Administrator),
            "User" => Ok(Role::User),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is making a request, as far as ownership checks care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub gender: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub gender: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub gender: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verification_token: Option<String>,
}

impl NewUser {
    pub fn into_user(self, id: Uuid, now: DateTime<Utc>) -> User {
        User {
            id,
            full_name: self.full_name,
            gender: self.gender,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            email_verified: false,
            verification_token: self.verification_token,
            reset_token: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }
}

pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }

    pub fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires) {
            (Some(stored), Some(expires)) => stored == token && expires > now,
            _ => false,
        }
    }

    pub fn reset_expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(RESET_TOKEN_TTL_HOURS)
    }

    pub async fn create(pool: &PgPool, new: NewUser) -> Result<Self> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, full_name, gender, email, password_hash, role,
                email_verified, verification_token, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, false, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.full_name)
        .bind(&new.gender)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.verification_token)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    pub async fn verify_email(pool: &PgPool, token: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email_verified = true, verification_token = NULL, updated_at = $1
            WHERE verification_token = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn set_reset_token(pool: &PgPool, id: Uuid, token: &str, expires: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $1, reset_token_expires = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn reset_password(pool: &PgPool, token: &str, new_password_hash: &str) -> Result<Option<Self>> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_token_expires = NULL, updated_at = $2
            WHERE reset_token = $3 AND reset_token_expires > $2
            RETURNING *
            "#,
        )
        .bind(new_password_hash)
        .bind(now)
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn save(&self, pool: &PgPool) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $1, gender = $2, email = $3, password_hash = $4, updated_at = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&self.full_name)
        .bind(&self.gender)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(Utc::now())
        .bind(self.id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        NewUser {
            full_name: "Siti Rahma".to_string(),
            gender: Some("female".to_string()),
            email: "siti@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            verification_token: Some("tok".to_string()),
        }
        .into_user(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn role_parses_exact_names() {
        assert_eq!(Role::try_from("Administrator".to_string()).unwrap(), Role::Administrator);
        assert_eq!(Role::try_from("User".to_string()).unwrap(), Role::User);
        assert!(Role::try_from("admin".to_string()).is_err());
    }

    #[test]
    fn actor_access_rules() {
        let owner = Uuid::new_v4();
        let me = Actor { id: owner, role: Role::User };
        let stranger = Actor { id: Uuid::new_v4(), role: Role::User };
        let admin = Actor { id: Uuid::new_v4(), role: Role::Administrator };

        assert!(me.can_access(owner));
        assert!(!stranger.can_access(owner));
        assert!(admin.can_access(owner));
    }

    #[test]
    fn reset_token_expires() {
        let mut u = user();
        let now = Utc::now();
        u.reset_token = Some("abc".to_string());
        u.reset_token_expires = Some(User::reset_expiry_from(now));

        assert!(u.reset_token_valid("abc", now));
        assert!(!u.reset_token_valid("xyz", now));
        assert!(!u.reset_token_valid("abc", now + Duration::hours(25)));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
        assert_eq!(json["role"], "User");
    }
}
