use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use sqlx::SqlitePool;

use crate::{
    config::PasswordHashingConfig,
    error::{is_unique_violation, AppError},
    models::user::{AuthResponse, User},
    repos::{NewUser, UserRepo},
    token::{IssuedToken, TokenCodec, TokenError, TokenSubject},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    AlreadyExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Signing(TokenError),
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AlreadyExists => AppError::Conflict("Email already registered"),
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid email or password"),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid or expired token"),
            AuthError::UserNotFound => AppError::Unauthorized("User no longer exists"),
            AuthError::Store(e) => AppError::Sqlx(e),
            AuthError::Hash(e) => AppError::PasswordHash(e),
            AuthError::Signing(e) => AppError::Token(e),
            AuthError::Task(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Registration, login and token lifecycle over the credential store.
///
/// Holds no state of its own beyond the token codec; every check that depends
/// on the user record (refresh, admin status) re-reads storage.
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    codec: TokenCodec,
    hasher: Argon2<'static>,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        codec: TokenCodec,
        hashing: &PasswordHashingConfig,
    ) -> Result<Self, argon2::Error> {
        let params = Params::new(
            hashing.memory_kib,
            hashing.iterations,
            hashing.parallelism,
            None,
        )?;
        Ok(Self {
            pool,
            codec,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub async fn user_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(UserRepo::exists_by_email(&self.pool, email).await?)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthResponse, AuthError> {
        let password_hash = self.hash_password(password).await?;
        let user = UserRepo::create(
            &self.pool,
            &NewUser {
                email,
                password_hash: &password_hash,
                name,
                is_admin: false,
            },
        )
        .await
        .map_err(|e| {
            // the UNIQUE constraint is the authority on duplicate emails
            if is_unique_violation(&e) {
                AuthError::AlreadyExists
            } else {
                AuthError::Store(e)
            }
        })?;

        tracing::info!(user_id = user.id, "user registered");
        self.respond(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(user) = UserRepo::get_by_email(&self.pool, email).await? else {
            // burn comparable time so unknown emails are not distinguishable
            let _ = self.hash_password(password).await;
            tracing::debug!("login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::debug!(user_id = user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.respond(&user)
    }

    /// Exchange a still-valid token for a fresh one carrying the current
    /// persisted user fields.
    pub async fn refresh_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self.parse(token)?;
        let user = UserRepo::get_by_id(&self.pool, claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.respond(&user)
    }

    pub fn validate_token(&self, token: &str) -> Result<i64, AuthError> {
        Ok(self.parse(token)?.user_id)
    }

    pub async fn is_admin(&self, user_id: i64) -> Result<bool, AuthError> {
        let user = UserRepo::get_by_id(&self.pool, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.is_admin)
    }

    /// Make sure an admin account with this email exists.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        if let Some(user) = UserRepo::get_by_email(&self.pool, email).await? {
            if !user.is_admin {
                UserRepo::set_admin(&self.pool, user.id, true).await?;
                tracing::info!(user_id = user.id, "promoted existing user to admin");
            }
            return UserRepo::get_by_id(&self.pool, user.id)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        let password_hash = self.hash_password(password).await?;
        let user = UserRepo::create(
            &self.pool,
            &NewUser {
                email,
                password_hash: &password_hash,
                name,
                is_admin: true,
            },
        )
        .await?;
        tracing::info!(user_id = user.id, "created initial admin");
        Ok(user)
    }

    fn parse(&self, token: &str) -> Result<crate::token::Claims, AuthError> {
        self.codec.parse(token).map_err(|e| {
            tracing::debug!(reason = %e, "token rejected");
            AuthError::InvalidToken
        })
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let IssuedToken {
            token, expires_in, ..
        } = self
            .codec
            .issue(&TokenSubject {
                user_id: user.id,
                email: &user.email,
                is_admin: user.is_admin,
            })
            .map_err(AuthError::Signing)?;

        Ok(AuthResponse {
            token,
            expires_in,
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
        })
        .await?
        .map_err(AuthError::Hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || -> Result<bool, argon2::password_hash::Error> {
            let parsed_hash = PasswordHash::new(&hash)?;
            Ok(hasher
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok())
        })
        .await?
        .map_err(AuthError::Hash)
    }
}
