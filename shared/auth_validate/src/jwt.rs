use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("invalid signing key: {0}")]
    Key(jsonwebtoken::errors::Error),

    #[error("token encode failed: {0}")]
    Encode(jsonwebtoken::errors::Error),

    #[error("invalid token")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,
}

/// Signing material for session tokens.
///
/// RS256 keys come as PEM strings, possibly with escaped `\n` when they
/// were read from a single-line environment variable.
#[derive(Clone)]
pub struct JwtKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_rsa_pem(private_key: &str, public_key: &str) -> Result<Self, JwtError> {
        let encoding = EncodingKey::from_rsa_pem(private_key.replace("\\n", "\n").as_bytes())
            .map_err(JwtError::Key)?;
        let decoding = DecodingKey::from_rsa_pem(public_key.replace("\\n", "\n").as_bytes())
            .map_err(JwtError::Key)?;
        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
        })
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub fn issue_jwt(
    keys: &JwtKeys,
    user_id: &str,
    email: &str,
    role: Role,
    expires_at: DateTime<Utc>,
) -> Result<String, JwtError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: expires_at.timestamp().max(0) as usize,
    };
    encode(&Header::new(keys.algorithm), &claims, &keys.encoding).map_err(JwtError::Encode)
}

/// Checks signature and expiry. `exp` is compared with `now` rather than the
/// wall clock, so the caller's clock decides both issue and expiry.
pub fn verify_jwt(token: &str, keys: &JwtKeys, now: DateTime<Utc>) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(keys.algorithm);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &keys.decoding, &validation).map_err(JwtError::Invalid)?;

    if i64::try_from(token_data.claims.exp).unwrap_or(i64::MAX) <= now.timestamp() {
        return Err(JwtError::Expired);
    }
    Ok(token_data.claims)
}
