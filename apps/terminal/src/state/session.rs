//! # Session Context
//!
//! Who is operating this terminal, and whether they can authorize credit
//! above a client's limit.
//!
//! ```text
//! settle --authorize <password>
//!      │
//!      ▼
//! SessionContext::authorize_credit(password)
//!      │  argon2 verify against CAJA_ADMIN_PASSWORD_HASH
//!      ├── ok ────► CreditOverride { authorized_by: operator } ──► settle()
//!      └── fail ──► AUTHORIZATION_DENIED (nothing is written)
//! ```
//!
//! The plaintext password is never stored or logged.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use tracing::{info, warn};

use crate::error::{ApiError, ErrorCode};
use crate::state::ConfigState;
use caja_core::CreditOverride;

#[derive(Debug, Clone)]
pub struct SessionContext {
    operator: String,
    admin_password_hash: Option<String>,
}

impl SessionContext {
    pub fn new(operator: impl Into<String>, admin_password_hash: Option<String>) -> Self {
        SessionContext {
            operator: operator.into(),
            admin_password_hash,
        }
    }

    pub fn from_config(config: &ConfigState) -> Self {
        SessionContext::new(config.operator.clone(), config.admin_password_hash.clone())
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Verifies the administrative password and issues a credit override.
    ///
    /// ## Returns
    /// * `Err(AuthorizationUnavailable)` - no hash configured, or it is malformed
    /// * `Err(AuthorizationDenied)` - the password does not match
    pub fn authorize_credit(&self, password: &str) -> Result<CreditOverride, ApiError> {
        let hash = self.admin_password_hash.as_deref().ok_or_else(|| {
            ApiError::new(
                ErrorCode::AuthorizationUnavailable,
                "Credit overrides are not configured on this terminal",
            )
        })?;

        let parsed = PasswordHash::new(hash).map_err(|e| {
            warn!(error = %e, "Administrative password hash is malformed");
            ApiError::new(
                ErrorCode::AuthorizationUnavailable,
                "Administrative password hash is malformed",
            )
        })?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!(operator = %self.operator, "Credit override denied");
            return Err(ApiError::new(
                ErrorCode::AuthorizationDenied,
                "Administrative password is incorrect",
            ));
        }

        info!(operator = %self.operator, "Credit override granted");
        Ok(CreditOverride::new(self.operator.clone()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString};

    /// argon2 PHC string for `password`, fixed salt.
    pub(crate) fn hash(password: &str) -> String {
        let salt = SaltString::encode_b64(b"caja-test-salt!!").unwrap();
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_correct_password_issues_override() {
        let session = SessionContext::new("gerente", Some(hash("s3creto")));
        let grant = session.authorize_credit("s3creto").unwrap();
        assert_eq!(grant.authorized_by(), "gerente");
    }

    #[test]
    fn test_wrong_password_is_denied() {
        let session = SessionContext::new("gerente", Some(hash("s3creto")));
        let err = session.authorize_credit("S3creto").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthorizationDenied);
    }

    #[test]
    fn test_missing_or_bad_hash_is_unavailable() {
        let session = SessionContext::new("caja", None);
        let err = session.authorize_credit("anything").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthorizationUnavailable);

        let session = SessionContext::new("caja", Some("plaintext".to_string()));
        let err = session.authorize_credit("plaintext").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthorizationUnavailable);
    }
}
