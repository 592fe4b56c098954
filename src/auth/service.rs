//! Password hashing, JWT issuance/verification and user administration.

use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row, postgres::PgRow};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, map_unique_violation};

use super::models::{Role, User};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. `kind` keeps refresh tokens out of the request gate.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub kind: TokenKind,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("malformed subject claim".into()))
    }
}

/// Tokens + user returned by login and refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

pub struct AuthService {
    pool: PgPool,
    jwt_secret: String,
    access_minutes: i64,
    refresh_days: i64,
}

fn row_to_user(row: &PgRow) -> AppResult<User> {
    let role_str: String = row.get("role");
    let role = Role::parse(&role_str)
        .ok_or_else(|| AppError::Internal(anyhow!("invalid role in db: {role_str}")))?;
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        role,
        created_at: row.get("created_at"),
    })
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_secret: String, access_minutes: i64, refresh_days: i64) -> Self {
        Self {
            pool,
            jwt_secret,
            access_minutes,
            refresh_days,
        }
    }

    fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(anyhow!("hashing failed: {e}")))
    }

    fn verify_password(password: &str, hash: &str) -> AppResult<()> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow!("invalid hash format: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AppError::Unauthorized("invalid username or password".into()))
    }

    fn check_password_policy(password: &str) -> AppResult<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    fn issue_token(&self, user: &User, kind: TokenKind) -> AppResult<String> {
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(self.access_minutes),
            TokenKind::Refresh => Duration::days(self.refresh_days),
        };
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(anyhow!("token expiry overflow")))?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            kind,
            jti: uuid::Uuid::new_v4().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow!("failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthResponse> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, role, created_at
             FROM users_tb WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid username or password".into()))?;

        let hash: String = row.get("password_hash");
        Self::verify_password(password, &hash)?;

        let user = row_to_user(&row)?;
        Ok(AuthResponse {
            access_token: self.issue_token(&user, TokenKind::Access)?,
            refresh_token: self.issue_token(&user, TokenKind::Refresh)?,
            user,
        })
    }

    /// Exchange a refresh token for a fresh pair. The user row is
    /// reloaded so role changes and deletions take effect here.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.verify_token(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::Unauthorized("not a refresh token".into()));
        }

        let user = self.get_user(claims.user_id()?).await?;
        Ok(AuthResponse {
            access_token: self.issue_token(&user, TokenKind::Access)?,
            refresh_token: self.issue_token(&user, TokenKind::Refresh)?,
            user,
        })
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        Self::check_password_policy(new_password)?;

        let row = sqlx::query("SELECT password_hash FROM users_tb WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        let hash: String = row.get("password_hash");
        Self::verify_password(current_password, &hash)
            .map_err(|_| AppError::Unauthorized("current password is incorrect".into()))?;

        let new_hash = Self::hash_password(new_password)?;
        sqlx::query("UPDATE users_tb SET password_hash = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // User administration
    // ------------------------------------------------------------------

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query("SELECT id, username, role, created_at FROM users_tb WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
        row_to_user(&row)
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows =
            sqlx::query("SELECT id, username, role, created_at FROM users_tb ORDER BY username")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_user).collect()
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> AppResult<User> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("username must not be empty".into()));
        }
        Self::check_password_policy(password)?;
        let hash = Self::hash_password(password)?;

        let row = sqlx::query(
            "INSERT INTO users_tb (username, password_hash, role)
             VALUES ($1, $2, $3)
             RETURNING id, username, role, created_at",
        )
        .bind(username.trim())
        .bind(hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "username"))?;
        row_to_user(&row)
    }

    pub async fn update_user_role(&self, id: i64, role: Role) -> AppResult<User> {
        let updated = sqlx::query("UPDATE users_tb SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        self.get_user(id).await
    }

    pub async fn delete_user(&self, id: i64, acting_user_id: i64) -> AppResult<()> {
        if id == acting_user_id {
            return Err(AppError::Validation("cannot delete your own account".into()));
        }
        let target = self.get_user(id).await?;
        if target.role == Role::Superadmin {
            let remaining: i64 = sqlx::query(
                "SELECT COUNT(*) AS n FROM users_tb WHERE role = 'superadmin' AND id <> $1",
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?
            .get("n");
            if remaining == 0 {
                return Err(AppError::Validation(
                    "cannot delete the last superadmin".into(),
                ));
            }
        }

        sqlx::query("DELETE FROM users_tb WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Admin-side reset: no current-password check.
    pub async fn reset_password(&self, id: i64, new_password: &str) -> AppResult<()> {
        Self::check_password_policy(new_password)?;
        let hash = Self::hash_password(new_password)?;
        let updated = sqlx::query("UPDATE users_tb SET password_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// First-boot bootstrap: create the superadmin when no users exist.
    pub async fn seed_superadmin(&self, username: &str, password: &str) -> AppResult<()> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users_tb")
            .fetch_one(&self.pool)
            .await?
            .get("n");
        if count > 0 {
            return Ok(());
        }

        let hash = Self::hash_password(password)?;
        sqlx::query("INSERT INTO users_tb (username, password_hash, role) VALUES ($1, $2, 'superadmin')")
            .bind(username)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        tracing::warn!(username, "seeded initial superadmin; change the password immediately");
        Ok(())
    }
}
