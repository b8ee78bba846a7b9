//! JWT token service implementation.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use inkwell_core::domain::User;
use inkwell_core::ports::{AuthError, SessionClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";
const SESSION: &str = "session";
const PASSWORD_RESET: &str = "password_reset";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub reset_expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            // Two weeks, the usual session cookie age.
            expiration_hours: 336,
            reset_expiration_hours: 1,
            issuer: "inkwell".to_string(),
        }
    }
}

/// Internal JWT claims structure for serialization.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id
    name: String,
    purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fp: Option<String>,
    exp: i64,
    iat: i64,
    iss: String,
}

/// JWT-based token service.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        let defaults = JwtConfig::default();
        let config = JwtConfig {
            secret,
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.expiration_hours),
            reset_expiration_hours: defaults.reset_expiration_hours,
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        };
        Self::new(config)
    }

    /// A short tag of the password hash. Changing the password changes the
    /// salt, so reset links issued before the change stop matching.
    fn fingerprint(user: &User) -> String {
        let hash = &user.password_hash;
        let start = hash
            .char_indices()
            .rev()
            .nth(15)
            .map(|(i, _)| i)
            .unwrap_or(0);
        hash[start..].to_string()
    }

    fn issue(
        &self,
        user: &User,
        purpose: &str,
        fp: Option<String>,
        hours: i64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::hours(hours);

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            purpose: purpose.to_string(),
            fp,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn decode(&self, token: &str, purpose: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if token_data.claims.purpose != purpose {
            return Err(AuthError::InvalidToken(format!(
                "expected a {purpose} token"
            )));
        }
        Ok(token_data.claims)
    }
}

impl TokenService for JwtTokenService {
    fn issue_session(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user, SESSION, None, self.config.expiration_hours)
    }

    fn validate_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let claims = self.decode(token, SESSION)?;

        let user_id = claims
            .sub
            .parse()
            .map_err(|e: std::num::ParseIntError| AuthError::InvalidToken(e.to_string()))?;

        Ok(SessionClaims {
            user_id,
            username: claims.name,
            exp: claims.exp,
        })
    }

    fn issue_password_reset(&self, user: &User) -> Result<String, AuthError> {
        self.issue(
            user,
            PASSWORD_RESET,
            Some(Self::fingerprint(user)),
            self.config.reset_expiration_hours,
        )
    }

    fn validate_password_reset(&self, token: &str, user: &User) -> Result<(), AuthError> {
        let claims = self.decode(token, PASSWORD_RESET)?;

        if claims.sub != user.id.to_string() {
            return Err(AuthError::InvalidToken("issued for another user".into()));
        }
        if claims.fp.as_deref() != Some(Self::fingerprint(user).as_str()) {
            return Err(AuthError::InvalidToken("password changed since issue".into()));
        }
        Ok(())
    }

    fn session_ttl_seconds(&self) -> i64 {
        self.config.expiration_hours * 3600
    }
}
