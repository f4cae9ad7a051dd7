use chrono::{Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Identity claims embedded in a signed bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// The user fields a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: i64,
    pub email: &'a str,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until expiry
    pub expires_in: i64,
    pub claims: Claims,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// HS256 codec for identity claims, keyed by a single process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token expiring `ttl` from now.
    pub fn issue(&self, subject: &TokenSubject<'_>) -> Result<IssuedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: subject.user_id,
            email: subject.email.to_string(),
            is_admin: subject.is_admin,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
            claims,
        })
    }

    /// Sign an arbitrary claim set as-is.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;
        let claims = data.claims;

        if claims.exp <= claims.iat {
            return Err(TokenError::Malformed);
        }
        // jsonwebtoken accepts exp == now; expiry is exclusive here
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
