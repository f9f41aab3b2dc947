//! Authorization error types

/// Error type for authorization attempts
///
/// Both variants are reported to the requesting connection as a
/// `subscription_error` event; neither is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The auth endpoint rejected the request, or a rejection is cached
    Denied(String),
    /// The auth endpoint could not be reached or returned no response
    Unavailable(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Denied(detail) => write!(f, "Authorization denied: {}", detail),
            AuthError::Unavailable(detail) => {
                write!(f, "Authorization endpoint unavailable: {}", detail)
            }
        }
    }
}

impl std::error::Error for AuthError {}
