/// Account manager: registration, login, and session validation
use crate::{
    account::{Principal, Session, User},
    error::{ApiError, ApiResult, ValidationCode},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    session_ttl: Duration,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, session_ttl: Duration) -> Self {
        Self { db, session_ttl }
    }

    /// Register a new user
    pub async fn register(&self, email: &str, password: &str) -> ApiResult<User> {
        self.validate_email(email)?;
        self.validate_password(password)?;

        let password_hash = hash_password(password)?;
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(email)
        .bind(&password_hash)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ApiError::EmailTaken
            } else {
                ApiError::Database(e)
            }
        })?;

        Ok(User {
            id: row.get("id"),
            email: email.to_string(),
            password_hash,
            created_at: now,
        })
    }

    /// Authenticate and open a session
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(User, Session)> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(ApiError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(user.id).await?;

        Ok((user, session))
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: i64) -> ApiResult<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            token: generate_token(),
            created_at: Utc::now(),
            expires_at: Utc::now() + self.session_ttl,
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await?;

        Ok(session)
    }

    /// Resolve a session token to its principal
    pub async fn validate_session(&self, token: &str) -> ApiResult<Principal> {
        let row = sqlx::query(
            "SELECT sessions.user_id, sessions.expires_at, users.email
             FROM sessions JOIN users ON users.id = sessions.user_id
             WHERE sessions.token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::Authentication("Invalid or expired session".to_string()))?;

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if Utc::now() > expires_at {
            return Err(ApiError::Authentication("Session expired".to_string()));
        }

        Ok(Principal {
            user_id: row.get("user_id"),
            email: row.get("email"),
        })
    }

    /// Delete a session (logout). Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        }))
    }

    fn validate_email(&self, email: &str) -> ApiResult<()> {
        let (local, domain) = email
            .split_once('@')
            .ok_or(ApiError::Validation(ValidationCode::EmailInvalid))?;

        if local.is_empty() || domain.is_empty() {
            return Err(ApiError::Validation(ValidationCode::EmailInvalid));
        }

        Ok(())
    }

    fn validate_password(&self, password: &str) -> ApiResult<()> {
        if password.len() < 6 {
            return Err(ApiError::Validation(ValidationCode::PasswordTooShort));
        }

        Ok(())
    }
}

/// Opaque session token: 32 random bytes, hex encoded
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
