//! Axum extractors resolving the caller from the `Authorization` header.
//!
//! The state only has to provide a [`JwtCodec`] through [`FromRef`].
//!
//! # Examples
//!
//! ```rust
//! use axum::{Router, routing::get};
//! use ez_jwt::config::JwtConfig;
//! use ez_jwt::extract::{AuthUser, RequiredUser};
//! use ez_jwt::jwt::JwtCodec;
//! use jsonwebtoken::Algorithm;
//!
//! async fn whoami(AuthUser(user): AuthUser) -> String {
//!     if user.is_anon() { String::from("anonymous") } else { user.id }
//! }
//!
//! async fn private(RequiredUser(user): RequiredUser) -> String {
//!     user.id
//! }
//!
//! let config = JwtConfig::new("0123456789abcdef0123456789abcdef", Algorithm::HS256).unwrap();
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .route("/private", get(private))
//!     .with_state(JwtCodec::new(config));
//! ```

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::error::DecodeError;
use crate::jwt::JwtCodec;
use crate::user::JwtUser;

/// The caller, or the anonymous user when no token was presented.
///
/// A token presented with the right schema that fails verification rejects
/// the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub JwtUser);

/// The caller; anonymous requests are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredUser(pub JwtUser);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    #[error(transparent)]
    Token(#[from] DecodeError),

    #[error("Authentication required")]
    Missing,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        debug!("Rejecting request: {self}");
        let message = match self {
            AuthRejection::Missing => "Authentication required",
            AuthRejection::Token(DecodeError::Expired) => "Authentication token expired",
            AuthRejection::Token(DecodeError::SchemaMismatch) => "Unsupported authorization schema",
            AuthRejection::Token(_) => "Invalid authentication token",
        };
        let status = StatusCode::UNAUTHORIZED;

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}

/// Same rules as [`JwtCodec::resolve_from_headers`], with the schema matched
/// on raw header bytes. A matching value that is not UTF-8 is malformed.
fn resolve(parts: &Parts, codec: &JwtCodec) -> Result<JwtUser, DecodeError> {
    let prefix = codec.config().prefix().as_bytes();
    let matching = parts
        .headers
        .get_all(AUTHORIZATION)
        .iter()
        .find(|value| value.as_bytes().starts_with(prefix));
    match matching {
        Some(value) => {
            let value = value.to_str().map_err(|_| DecodeError::Malformed)?;
            codec.decode_with_prefix(value)
        }
        None => Ok(JwtUser::anon()),
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    JwtCodec: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = JwtCodec::from_ref(state);
        Ok(Self(resolve(parts, &codec)?))
    }
}

impl<S> FromRequestParts<S> for RequiredUser
where
    JwtCodec: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_anon() {
            return Err(AuthRejection::Missing);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, Request};
    use jsonwebtoken::Algorithm;

    use super::*;
    use crate::config::JwtConfig;

    fn codec() -> JwtCodec {
        JwtCodec::new(JwtConfig::new("0123456789abcdef0123456789abcdef", Algorithm::HS256).unwrap())
    }

    fn parts(authorization: &[&str]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for value in authorization {
            builder = builder.header(AUTHORIZATION, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn no_header_is_anonymous() {
        let codec = codec();
        let AuthUser(user) = AuthUser::from_request_parts(&mut parts(&[]), &codec)
            .await
            .unwrap();
        assert!(user.is_anon());
    }

    #[tokio::test]
    async fn resolves_bearer_among_other_values() {
        let codec = codec();
        let alice = JwtUser::new("alice", ["dev"], ["read"]);
        let header = codec.encode_with_prefix(&alice).unwrap();

        let mut parts = parts(&["Basic Zm9vOmJhcg==", header.as_str()]);
        let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &codec)
            .await
            .unwrap();
        assert_eq!(user, alice);
    }

    #[tokio::test]
    async fn non_utf8_bearer_value_is_rejected() {
        let codec = codec();
        let alice = JwtUser::new("alice", ["dev"], ["read"]);
        let header = codec.encode_with_prefix(&alice).unwrap();

        let mut parts = parts(&[]);
        parts.headers.append(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        parts
            .headers
            .append(AUTHORIZATION, HeaderValue::from_str(&header).unwrap());

        let rejection = AuthUser::from_request_parts(&mut parts, &codec)
            .await
            .unwrap_err();
        assert_eq!(rejection, AuthRejection::Token(DecodeError::Malformed));
    }

    #[tokio::test]
    async fn non_utf8_values_of_other_schemas_are_skipped() {
        let codec = codec();
        let alice = JwtUser::new("alice", ["dev"], ["read"]);
        let header = codec.encode_with_prefix(&alice).unwrap();

        let mut parts = parts(&[]);
        parts.headers.append(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap(),
        );
        parts
            .headers
            .append(AUTHORIZATION, HeaderValue::from_str(&header).unwrap());

        let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &codec)
            .await
            .unwrap();
        assert_eq!(user, alice);
    }

    #[tokio::test]
    async fn bad_token_is_rejected() {
        let codec = codec();
        let rejection = AuthUser::from_request_parts(&mut parts(&["Bearer nope"]), &codec)
            .await
            .unwrap_err();
        assert_eq!(rejection, AuthRejection::Token(DecodeError::Malformed));
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn required_user_rejects_anonymous() {
        let codec = codec();
        let rejection = RequiredUser::from_request_parts(&mut parts(&["Basic xyz"]), &codec)
            .await
            .unwrap_err();
        assert_eq!(rejection, AuthRejection::Missing);

        let header = codec.encode_with_prefix(&JwtUser::new("bob", ["ops"], ["x"])).unwrap();
        let RequiredUser(user) = RequiredUser::from_request_parts(&mut parts(&[header.as_str()]), &codec)
            .await
            .unwrap();
        assert_eq!(user.id, "bob");
    }
}
