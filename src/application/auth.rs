//! Admin authentication: Argon2id password hashes and HS256 session tokens.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::application::repos::{AdminsRepo, NewAdmin, RepoError};
use crate::domain::entities::AdminRecord;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("an admin with this username or email already exists")]
    Conflict,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn admin_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct CreateAdminCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub admin: AdminRecord,
    pub token: String,
}

pub struct AuthService {
    admins: Arc<dyn AdminsRepo>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(admins: Arc<dyn AdminsRepo>, secret: &[u8], token_ttl: Duration) -> Self {
        Self {
            admins,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// `identifier` may be the email or the username. Unknown accounts and
    /// wrong passwords fail identically.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "email and password are required".into(),
            ));
        }

        let Some(admin) = self.admins.find_for_login(identifier.trim()).await? else {
            warn!("Login rejected: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &admin.password_hash)? {
            warn!(admin_id = admin.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(admin.id)?;
        info!(admin_id = admin.id, "Admin logged in");
        Ok(LoginOutcome { admin, token })
    }

    pub async fn create_admin(&self, command: CreateAdminCommand) -> Result<AdminRecord, AuthError> {
        let username = command.username.trim();
        let email = command.email.trim();
        if username.is_empty() || email.is_empty() || command.password.is_empty() {
            return Err(AuthError::InvalidInput(
                "username, email and password are required".into(),
            ));
        }
        if !looks_like_email(email) {
            return Err(AuthError::InvalidInput(format!(
                "`{email}` is not an email address"
            )));
        }

        if self.admins.admin_exists(username, email).await? {
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(&command.password)?;
        let admin = self
            .admins
            .insert_admin(NewAdmin {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthError::Conflict,
                other => AuthError::Repo(other),
            })?;

        info!(admin_id = admin.id, username = %admin.username, "Admin created");
        Ok(admin)
    }

    pub fn issue_token(&self, admin_id: i64) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: admin_id.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.token_ttl).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    /// Validates signature, expiry and role.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.role != ADMIN_ROLE {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|err| AuthError::Hashing(err.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Hashing(err.to_string())),
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
