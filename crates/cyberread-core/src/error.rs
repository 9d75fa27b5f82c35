//! User-facing error taxonomy.
//!
//! Every remote failure is translated into one of these before it leaves the
//! session manager or the gateway; raw transport errors never reach a front end.

use thiserror::Error;

use crate::api::ApiError;

pub const NETWORK_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";

const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Input rejected by the backend; messages are shown verbatim.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// Bad credentials, or the session credential was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but the account lacks the role for this action.
    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    /// Local persistence of the session record failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation(vec![message.into()])
    }

    pub fn session_expired() -> Self {
        AuthError::Authentication("Your session has expired. Please log in again.".to_string())
    }

    pub fn not_logged_in() -> Self {
        AuthError::Authentication("Please log in to continue.".to_string())
    }

    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(messages) => messages.join("\n"),
            AuthError::Authentication(message) => message.clone(),
            AuthError::Forbidden(message) if !message.is_empty() => message.clone(),
            AuthError::Forbidden(_) => "You don't have permission to do that.".to_string(),
            AuthError::Network(_) => NETWORK_MESSAGE.to_string(),
            AuthError::NotFound(_) => "The requested item could not be found.".to_string(),
            AuthError::Server(_) | AuthError::Storage(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, AuthError::Authentication(_))
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Validation { message, errors } => {
                if errors.is_empty() {
                    AuthError::Validation(vec![message])
                } else {
                    AuthError::Validation(errors)
                }
            }
            ApiError::Unauthorized => AuthError::session_expired(),
            ApiError::AccessDenied(message) => AuthError::Forbidden(message),
            ApiError::NotFound(message) => AuthError::NotFound(message),
            ApiError::NetworkError(e) => AuthError::Network(e.to_string()),
            ApiError::RateLimited => {
                AuthError::Server("Too many requests. Please wait and try again.".to_string())
            }
            ApiError::ServerError(message) | ApiError::InvalidResponse(message) => {
                AuthError::Server(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_list_is_preserved() {
        let err: AuthError = ApiError::Validation {
            message: "Validation failed".to_string(),
            errors: vec!["Username is taken".to_string(), "Email is invalid".to_string()],
        }
        .into();
        assert_eq!(
            err,
            AuthError::Validation(vec![
                "Username is taken".to_string(),
                "Email is invalid".to_string()
            ])
        );
        assert_eq!(err.user_message(), "Username is taken\nEmail is invalid");
    }

    #[test]
    fn test_validation_falls_back_to_message() {
        let err: AuthError = ApiError::Validation {
            message: "Email already registered".to_string(),
            errors: vec![],
        }
        .into();
        assert_eq!(err, AuthError::validation("Email already registered"));
    }

    #[test]
    fn test_categories() {
        assert!(AuthError::from(ApiError::Unauthorized).is_authentication());
        assert!(matches!(
            AuthError::from(ApiError::NotFound("gone".to_string())),
            AuthError::NotFound(_)
        ));
        assert!(matches!(
            AuthError::from(ApiError::ServerError("boom".to_string())),
            AuthError::Server(_)
        ));
        assert_eq!(
            AuthError::Network("dns".to_string()).user_message(),
            NETWORK_MESSAGE
        );
    }

    #[test]
    fn test_access_denied_is_not_an_authentication_failure() {
        let err = AuthError::from(ApiError::AccessDenied("Admin access required".to_string()));
        assert_eq!(err, AuthError::Forbidden("Admin access required".to_string()));
        assert!(!err.is_authentication());
        assert_eq!(err.user_message(), "Admin access required");
        assert_eq!(
            AuthError::Forbidden(String::new()).user_message(),
            "You don't have permission to do that."
        );
    }
}
