//! JWT token management.
//!
//! [`JwtCodec`] mints signed tokens for a [`JwtUser`] and turns presented
//! tokens back into one. Verification happens in two phases:
//!
//! 1. The compact token is split, its signature checked against the configured
//!    secret and algorithm, and `exp` compared to the current time.
//!
//! `iat` and `exp` are written as NumericDates with millisecond precision
//! (`1760000000.123`), so a token lives exactly as long as its ttl.
//! 2. Only then is the user claim read, field by field.
//!
//! # Examples
//!
//! ```rust
//! use ez_jwt::config::JwtConfig;
//! use ez_jwt::jwt::JwtCodec;
//! use ez_jwt::user::JwtUser;
//! use jsonwebtoken::Algorithm;
//!
//! let config = JwtConfig::new("0123456789abcdef0123456789abcdef", Algorithm::HS256).unwrap();
//! let codec = JwtCodec::new(config);
//!
//! let user = JwtUser::new("42", ["admin"], ["jobs:read", "jobs:write"]);
//! let header = codec.encode_with_prefix(&user).unwrap();
//! assert!(header.starts_with("Bearer "));
//!
//! let resolved = codec.resolve_from_headers(Some(["Basic Zm9vOmJhcg==", header.as_str()])).unwrap();
//! assert_eq!(resolved, user);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{Level, debug, info, warn};
use uuid::Uuid;

use crate::auth_body::AuthBody;
use crate::config::JwtConfig;
use crate::error::{DecodeError, EncodeError};
use crate::user::JwtUser;

/// Cryptographic key pair for JWT signing and verification.
#[derive(Clone)]
struct Keys {
    /// Key used for signing new JWT tokens.
    encoding: EncodingKey,
    /// Key used for verifying existing JWT tokens.
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Claims written into a new token.
///
/// The user lands under a configurable key, so this serializes by hand.
struct IssuedClaims<'a> {
    jti: Uuid,
    iat_millis: i64,
    exp_millis: Option<i64>,
    user_field: &'a str,
    user: &'a JwtUser,
}

impl Serialize for IssuedClaims<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jti", &self.jti)?;
        map.serialize_entry("iat", &numeric_date(self.iat_millis))?;
        if let Some(exp_millis) = self.exp_millis {
            map.serialize_entry("exp", &numeric_date(exp_millis))?;
        }
        map.serialize_entry(self.user_field, self.user)?;
        map.end()
    }
}

/// Claims read back from a verified token, before the user claim is checked.
#[derive(Debug, Deserialize)]
struct VerifiedClaims {
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(default)]
    exp: Option<f64>,
    #[serde(flatten)]
    custom: Map<String, Value>,
}

/// A verified token with its registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedToken {
    /// Token id, used to correlate audit logs.
    pub jti: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    /// `None` for tokens that never expire.
    pub expires_at: Option<DateTime<Utc>>,
    pub user: JwtUser,
}

/// Signs and verifies user tokens for one [`JwtConfig`].
///
/// Cheap to clone, and safe to share between threads.
#[derive(Clone)]
pub struct JwtCodec {
    config: Arc<JwtConfig>,
    keys: Keys,
    validation: Validation,
}

/// Milliseconds since the epoch as fractional NumericDate seconds.
fn numeric_date(millis: i64) -> f64 {
    millis as f64 / 1000.0
}

/// Inverse of [`numeric_date`]. Integer NumericDates from other issuers read
/// back as whole seconds.
fn numeric_date_millis(seconds: f64) -> Result<i64, DecodeError> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return Err(DecodeError::Malformed);
    }
    Ok(millis as i64)
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> DecodeError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => DecodeError::BadSignature,
        ErrorKind::ExpiredSignature => DecodeError::Expired,
        _ => DecodeError::Malformed,
    }
}

/// Strings stay as they are, any other JSON value becomes its JSON text.
fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn string_set(claim: &Map<String, Value>, name: &str) -> Result<HashSet<String>, DecodeError> {
    match claim.get(name) {
        Some(Value::Array(items)) => Ok(items.iter().map(coerce_to_string).collect()),
        _ => Err(DecodeError::invalid_field(name)),
    }
}

fn user_from_claim(claim: &Map<String, Value>) -> Result<JwtUser, DecodeError> {
    let id = match claim.get("id") {
        Some(Value::String(id)) => id.clone(),
        _ => return Err(DecodeError::invalid_field("id")),
    };
    Ok(JwtUser {
        id,
        roles: string_set(claim, "roles")?,
        perms: string_set(claim, "perms")?,
    })
}

impl JwtCodec {
    pub fn new(config: JwtConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    pub fn from_shared(config: Arc<JwtConfig>) -> Self {
        let mut validation = Validation::new(config.algorithm());
        // exp is optional and checked by hand with millisecond precision
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            keys: Keys::new(config.secret()),
            config,
            validation,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Creates a token valid for the configured default ttl.
    pub fn encode(&self, user: &JwtUser) -> Result<String, EncodeError> {
        self.encode_with_ttl(user, self.config.default_ttl_seconds())
    }

    /// Creates a token valid for `ttl_seconds`; a negative ttl means it never
    /// expires.
    ///
    /// # Errors
    ///
    /// * [`EncodeError::AnonymousUser`] - `user` is anonymous
    /// * [`EncodeError::TtlOutOfRange`] - the expiration overflows the calendar
    /// * [`EncodeError::Signing`] - serialization or signing failed
    pub fn encode_with_ttl(&self, user: &JwtUser, ttl_seconds: i64) -> Result<String, EncodeError> {
        if user.is_anon() {
            return Err(EncodeError::AnonymousUser);
        }

        let now_millis = Utc::now().timestamp_millis();
        let exp_millis = if ttl_seconds >= 0 {
            let expiration = ttl_seconds
                .checked_mul(1000)
                .and_then(|ttl_millis| now_millis.checked_add(ttl_millis))
                .filter(|millis| DateTime::from_timestamp_millis(*millis).is_some())
                .ok_or(EncodeError::TtlOutOfRange(ttl_seconds))?;
            Some(expiration)
        } else {
            None
        };

        let claims = IssuedClaims {
            jti: Uuid::new_v4(),
            iat_millis: now_millis,
            exp_millis,
            user_field: self.config.user_field(),
            user,
        };
        let header = Header::new(self.config.algorithm());
        let token = encode(&header, &claims, &self.keys.encoding)?;

        if tracing::enabled!(Level::DEBUG) {
            debug!(user = %user.id, jti = %claims.jti, "new jwt, content: {token}");
        } else {
            info!(user = %user.id, jti = %claims.jti, "new jwt");
        }
        Ok(token)
    }

    /// Creates a token prefixed with the authorization schema, ready to be
    /// used as an `Authorization` header value.
    pub fn encode_with_prefix(&self, user: &JwtUser) -> Result<String, EncodeError> {
        self.encode_with_prefix_and_ttl(user, self.config.default_ttl_seconds())
    }

    pub fn encode_with_prefix_and_ttl(
        &self,
        user: &JwtUser,
        ttl_seconds: i64,
    ) -> Result<String, EncodeError> {
        let token = self.encode_with_ttl(user, ttl_seconds)?;
        Ok(format!("{}{token}", self.config.prefix()))
    }

    /// Creates a token and wraps it in a login response body.
    pub fn auth_body(&self, user: &JwtUser) -> Result<AuthBody, EncodeError> {
        let token = self.encode(user)?;
        Ok(AuthBody::new(token, self.config.schema()))
    }

    /// Verifies a token (without schema prefix) and returns its user.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::Malformed`] - not a compact JWT, or unreadable claims
    /// * [`DecodeError::BadSignature`] - signature or algorithm mismatch
    /// * [`DecodeError::Expired`] - `exp` is in the past
    /// * [`DecodeError::MissingUserClaim`] - no user claim
    /// * [`DecodeError::InvalidField`] - the user claim has a bad field
    pub fn decode(&self, token: &str) -> Result<JwtUser, DecodeError> {
        Ok(self.inspect(token)?.user)
    }

    /// Like [`JwtCodec::decode`], but also returns the registered claims.
    pub fn inspect(&self, token: &str) -> Result<DecodedToken, DecodeError> {
        debug!("parse jwt: {token}");
        let claims = decode::<VerifiedClaims>(token, &self.keys.decoding, &self.validation)
            .map_err(|err| {
                debug!("Failed to decode jwt token: {err}");
                map_jwt_error(&err)
            })?
            .claims;
        let issued_at = claims.iat.map(numeric_date_millis).transpose()?;
        let expires_at = claims.exp.map(numeric_date_millis).transpose()?;
        self.check_expiration(expires_at)?;

        let user = self.user_from_claims(&claims.custom).inspect_err(|err| {
            debug!(claims = ?claims.custom, "Invalid user claim in jwt {:?}: {err}", claims.jti);
        })?;

        Ok(DecodedToken {
            jti: claims.jti,
            issued_at: issued_at.and_then(DateTime::from_timestamp_millis),
            expires_at: expires_at.and_then(DateTime::from_timestamp_millis),
            user,
        })
    }

    /// Expired once the clock is strictly past `exp` plus leeway, in milliseconds.
    fn check_expiration(&self, exp_millis: Option<i64>) -> Result<(), DecodeError> {
        let Some(exp_millis) = exp_millis else {
            return Ok(());
        };
        let leeway_millis = i64::try_from(self.config.leeway_seconds())
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let deadline_millis = exp_millis.saturating_add(leeway_millis);
        if Utc::now().timestamp_millis() > deadline_millis {
            return Err(DecodeError::Expired);
        }
        Ok(())
    }

    fn user_from_claims(&self, custom: &Map<String, Value>) -> Result<JwtUser, DecodeError> {
        let user_field = self.config.user_field();
        match custom.get(user_field) {
            None | Some(Value::Null) => Err(DecodeError::MissingUserClaim),
            Some(Value::Object(claim)) => user_from_claim(claim),
            Some(_) => Err(DecodeError::invalid_field(user_field)),
        }
    }

    /// Whether `token_with_prefix` starts with the exact schema prefix.
    pub fn verify_schema(&self, token_with_prefix: &str) -> bool {
        token_with_prefix.starts_with(self.config.prefix())
    }

    /// Verifies an `Authorization` header value of the form `<schema> <token>`.
    pub fn decode_with_prefix(&self, token_with_prefix: &str) -> Result<JwtUser, DecodeError> {
        let token = token_with_prefix
            .strip_prefix(self.config.prefix())
            .ok_or(DecodeError::SchemaMismatch)?;
        self.decode(token)
    }

    /// Resolves the user from the values of an `Authorization` header.
    ///
    /// Values not carrying the configured schema are skipped. No values, or no
    /// matching value, resolve to the anonymous user. The first matching value
    /// decides: if its token is bad the error is returned rather than falling
    /// back to anonymous.
    pub fn resolve_from_headers<I>(&self, header_values: Option<I>) -> Result<JwtUser, DecodeError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let matching = header_values.and_then(|values| {
            values
                .into_iter()
                .find(|value| self.verify_schema(value.as_ref()))
        });
        match matching {
            Some(value) => self.decode_with_prefix(value.as_ref()),
            None => Ok(JwtUser::anon()),
        }
    }

    /// Lenient [`JwtCodec::resolve_from_headers`]: a bad token is logged and
    /// treated as anonymous.
    pub fn resolve_or_anon<I>(&self, header_values: Option<I>) -> JwtUser
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.resolve_from_headers(header_values).unwrap_or_else(|err| {
            warn!("Rejected authorization header, continuing as anonymous: {err}");
            JwtUser::anon()
        })
    }
}
