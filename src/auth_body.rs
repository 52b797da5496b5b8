//! Authentication response structures.
//!
//! Standard response format for a login endpoint handing out tokens.

use serde::{Deserialize, Serialize};

/// Authentication response with access token.
///
/// # JSON Format
///
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "token_type": "Bearer"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthBody {
    /// The access token.
    pub access_token: String,
    /// The authorization schema the token is to be presented with.
    pub token_type: String,
}

impl AuthBody {
    /// Creates a new authentication response.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ez_jwt::auth_body::AuthBody;
    ///
    /// let response = AuthBody::new("some_token".to_string(), "Bearer");
    /// assert_eq!(response.authorization(), "Bearer some_token");
    /// ```
    pub fn new(access_token: String, token_type: impl Into<String>) -> Self {
        Self {
            access_token,
            token_type: token_type.into(),
        }
    }

    /// The `Authorization` header value for this token.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
