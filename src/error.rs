//! Main Crate Error

use jsonwebtoken::Algorithm;

/// Errors raised while building a [`JwtConfig`](crate::config::JwtConfig).
///
/// These are startup errors: a host should refuse to boot rather than run
/// with a configuration that produced one.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No secret key configured.
    #[error("JWT secret missing, set `secretKey` or JWT_SECRET")]
    MissingSecret,

    /// Secret key shorter than the HMAC digest.
    #[error("JWT secret too short for {algorithm:?}: {actual_bits} bits, at least {required_bits} required")]
    WeakSecret {
        algorithm: Algorithm,
        required_bits: usize,
        actual_bits: usize,
    },

    /// Algorithm is not an HMAC one.
    #[error("Unsupported JWT algorithm {0:?}, only HS256, HS384 and HS512 are allowed")]
    UnsupportedAlgorithm(Algorithm),

    /// User claim key is empty or a registered claim name.
    #[error("Invalid user claim field `{0}`")]
    InvalidUserField(String),

    /// Schema is empty or contains whitespace.
    #[error("Invalid authorization schema `{0}`")]
    InvalidSchema(String),

    /// Environment variable could not be parsed.
    #[error("Invalid value for env variable '{var}': {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error(transparent)]
    Deserialization(#[from] toml::de::Error),
}

/// Errors raised while minting a token.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// Anonymous identity can not be signed.
    #[error("Refusing to sign a token for the anonymous user")]
    AnonymousUser,

    /// Expiration does not fit the calendar.
    #[error("Token ttl of {0} seconds is out of range")]
    TtlOutOfRange(i64),

    /// Claim serialization or signing failed.
    #[error(transparent)]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Reasons a presented token was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a compact JWT, or its claims are unreadable.
    #[error("Malformed Token")]
    Malformed,

    /// Signature or algorithm does not match the configured key.
    #[error("Bad Token Signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("Token Expired")]
    Expired,

    /// Header value does not start with the schema prefix.
    #[error("Authorization Schema Mismatch")]
    SchemaMismatch,

    /// User claim absent or null.
    #[error("User Claim Missing")]
    MissingUserClaim,

    /// User claim field has the wrong shape.
    #[error("Invalid Claim Field {0}")]
    InvalidField(String),
}

impl DecodeError {
    pub(crate) fn invalid_field(name: &str) -> Self {
        Self::InvalidField(String::from(name))
    }
}

/// Main crate error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Token could not be minted.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Token was rejected.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// JSON serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
