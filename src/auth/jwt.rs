use jsonwebtoken::{encode, EncodingKey, Header};
#[cfg(test)]
use jsonwebtoken::{decode, DecodingKey, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig};

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::hours(24);

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    // Nothing served here checks tokens; verification exists for tests.
    #[cfg(test)]
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            #[cfg(test)]
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// `None` when no secret is configured.
    pub fn from_config(config: &JwtConfig) -> Option<Self> {
        config.secret.as_deref().map(Self::from_secret)
    }

    pub fn sign(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn sign_at(&self, user_id: i64, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            user_id,
            exp: (now + TOKEN_TTL).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    #[cfg(test)]
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}
