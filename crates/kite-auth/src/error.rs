//! Typed errors for the authentication and authorization core.

use thiserror::Error;

use kite_core::error::{AppError, ErrorKind};

/// Every way an authentication or RBAC operation can fail.
///
/// Credential failures carry deliberately vague messages: an unknown user
/// and a wrong password produce the same [`AuthError::InvalidCredentials`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password, or unknown phone.
    #[error("Invalid username or password")]
    InvalidCredentials,
    /// The one-time code was wrong, already used, or expired.
    #[error("Verification code is invalid or has expired")]
    CodeExpiredOrInvalid,
    /// A code was sent to this phone too recently.
    #[error("Verification code was sent recently, retry in {retry_after_secs}s")]
    ResendTooSoon {
        /// Seconds until another code may be requested.
        retry_after_secs: u64,
    },
    /// The principal exists but may not sign in.
    #[error("Account is disabled")]
    AccountDisabled,
    /// The external identity is not linked to any principal.
    #[error("External account is not linked to a user")]
    AccountNotLinked,
    /// No credential source is registered for the requested login type.
    #[error("Unsupported login type")]
    UnsupportedLoginType,
    /// The refresh token is unknown, expired, or already used.
    #[error("Refresh token is invalid or has expired")]
    InvalidRefreshToken,
    /// The access token failed signature, expiry, issuer, or audience checks.
    #[error("Access token is invalid: {0}")]
    InvalidAccessToken(String),
    /// The requested parent would make a node its own ancestor.
    #[error("Menu hierarchy would contain a cycle")]
    CycleDetected,
    /// The parent's kind does not accept a child of this kind.
    #[error("A {parent} node cannot contain a {child} node")]
    InvalidKindNesting {
        /// Kind of the would-be parent.
        parent: String,
        /// Kind of the would-be child.
        child: String,
    },
    /// The requested parent does not exist.
    #[error("Parent menu {0} not found")]
    ParentNotFound(i64),
    /// Another menu already uses this code.
    #[error("Menu code '{0}' already exists")]
    DuplicateCode(String),
    /// The node still has children.
    #[error("Menu has child nodes")]
    HasChildren,
    /// The node is still granted to at least one role.
    #[error("Menu is assigned to roles")]
    InUse,
    /// The addressed entity does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Stored data violates an invariant the code relies on.
    #[error("Internal consistency violation: {0}")]
    InternalConsistency(String),
    /// The cache, database, or an external service failed.
    #[error("Service unavailable: {0}")]
    Unavailable(#[source] AppError),
}

/// Result alias for the authentication core.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Whether the failure is transient. Only idempotent reads should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Short machine-friendly reason, used in login logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::CodeExpiredOrInvalid => "code_expired_or_invalid",
            Self::ResendTooSoon { .. } => "resend_too_soon",
            Self::AccountDisabled => "account_disabled",
            Self::AccountNotLinked => "account_not_linked",
            Self::UnsupportedLoginType => "unsupported_login_type",
            Self::InvalidRefreshToken => "invalid_refresh_token",
            Self::InvalidAccessToken(_) => "invalid_access_token",
            Self::CycleDetected => "cycle_detected",
            Self::InvalidKindNesting { .. } => "invalid_kind_nesting",
            Self::ParentNotFound(_) => "parent_not_found",
            Self::DuplicateCode(_) => "duplicate_code",
            Self::HasChildren => "has_children",
            Self::InUse => "in_use",
            Self::NotFound(_) => "not_found",
            Self::InternalConsistency(_) => "internal_consistency",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::NotFound => Self::NotFound(err.message),
            ErrorKind::Authentication => Self::InvalidCredentials,
            ErrorKind::Serialization => Self::InternalConsistency(err.message),
            ErrorKind::Validation | ErrorKind::Internal => Self::InternalConsistency(err.message),
            _ => Self::Unavailable(err),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let kind = match &err {
            AuthError::InvalidCredentials
            | AuthError::CodeExpiredOrInvalid
            | AuthError::AccountNotLinked
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidAccessToken(_) => ErrorKind::Authentication,
            AuthError::AccountDisabled => ErrorKind::Authorization,
            AuthError::ResendTooSoon { .. } => ErrorKind::RateLimit,
            AuthError::UnsupportedLoginType
            | AuthError::CycleDetected
            | AuthError::InvalidKindNesting { .. }
            | AuthError::ParentNotFound(_) => ErrorKind::Validation,
            AuthError::DuplicateCode(_) | AuthError::HasChildren | AuthError::InUse => {
                ErrorKind::Conflict
            }
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::InternalConsistency(_) => ErrorKind::Internal,
            AuthError::Unavailable(inner) => {
                if inner.kind.is_infrastructure() {
                    ErrorKind::ServiceUnavailable
                } else {
                    inner.kind
                }
            }
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_are_retryable() {
        let err: AuthError = AppError::cache("connection reset").into();
        assert!(err.is_retryable());
        assert!(matches!(err, AuthError::Unavailable(_)));

        let err: AuthError = AppError::authentication("provider rejected code").into();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err: AuthError = AppError::new(ErrorKind::Serialization, "bad json").into();
        assert!(!err.is_retryable());
        assert!(matches!(err, AuthError::InternalConsistency(_)));
    }

    #[test]
    fn test_boundary_mapping() {
        let app: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(app.kind, ErrorKind::Authentication);
        assert_eq!(app.message, "Invalid username or password");

        let app: AppError = AuthError::ResendTooSoon { retry_after_secs: 42 }.into();
        assert_eq!(app.kind, ErrorKind::RateLimit);

        let app: AppError = AuthError::Unavailable(AppError::database("down")).into();
        assert_eq!(app.kind, ErrorKind::ServiceUnavailable);

        let app: AppError = AuthError::InUse.into();
        assert_eq!(app.kind, ErrorKind::Conflict);
    }
}
