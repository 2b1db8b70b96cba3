use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::MAX_TOKEN_TTL_HOURS;
use crate::error::{Error, HtmlError};
use crate::schema::{Uuid, User};

use super::permissions::{authorize, ActionType, Target};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub jti: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User, token_id: String, ttl: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            is_admin: user.is_admin(),
            jti: token_id,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Utc::now().timestamp()).is_negative()
    }
}

/// Identity of an authenticated caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub token_id: String,
}

impl SessionData {
    /// Built from the stored user so role changes apply to live tokens.
    pub fn from_user(user: &User, token_id: String) -> Self {
        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            is_admin: user.is_admin(),
            token_id,
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        authorize(Some(self), action, Target::Any)
    }
}

/// Signing key and lifetime for login tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self, Error> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl_hours) {
            return Err(HtmlError::InternalServerError.new("Invalid token lifetime"));
        }
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|_| HtmlError::InternalServerError.new("Invalid token secret"))?;

        Ok(Self {
            key,
            ttl: Duration::hours(ttl_hours),
        })
    }

    pub fn generate_jwt_session(&self, user: &User, token_id: String) -> Result<String, Error> {
        let claims = JwtSessionData::new(user, token_id, self.ttl);

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session token: {e}");
            HtmlError::InternalServerError.default()
        })
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| HtmlError::InvalidSession.new("Invalid token"))?;

        if session.is_expired() {
            return Err(HtmlError::InvalidSession.new("Token expired"));
        }

        Ok(session)
    }
}
