//! Authentication ports: session tokens and password hashing.

use crate::domain::User;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i32,
    pub username: String,
    pub exp: i64,
}

/// Signed tokens for sessions and password reset links.
pub trait TokenService: Send + Sync {
    /// Issue a session token for a signed-in user.
    fn issue_session(&self, user: &User) -> Result<String, AuthError>;

    /// Validate and decode a session token.
    fn validate_session(&self, token: &str) -> Result<SessionClaims, AuthError>;

    /// Issue a single-use password reset token.
    ///
    /// The token is bound to the user's current password hash, so it stops
    /// validating once the password changes.
    fn issue_password_reset(&self, user: &User) -> Result<String, AuthError>;

    /// Check a password reset token against the user it was issued for.
    fn validate_password_reset(&self, token: &str, user: &User) -> Result<(), AuthError>;

    /// Lifetime of a session token.
    fn session_ttl_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Hashing error: {0}")]
    HashingError(String),
}
