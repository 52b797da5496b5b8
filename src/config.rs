//! Token configuration.
//!
//! [`JwtUserConfig`] is what a host writes down (a TOML file or environment
//! variables). [`JwtConfig`] is the validated, immutable form the codec is
//! built from.
//!
//! # Usage
//!
//! ```rust
//! use ez_jwt::config::{JwtConfig, JwtUserConfig};
//!
//! let user_config = JwtUserConfig::from_toml(
//!     r#"
//!     secretKey = "0123456789abcdef0123456789abcdef"
//!     tokenExpireSeconds = 3600
//!     authorizationSchema = "Token"
//!     "#,
//! )
//! .unwrap();
//!
//! let config = JwtConfig::from_user_config(user_config).unwrap();
//! assert_eq!(config.prefix(), "Token ");
//! assert_eq!(config.default_ttl_seconds(), 3600);
//! ```

use std::fmt::{self, Debug, Display};
use std::path::Path;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_TOKEN_EXPIRE_SECONDS: i64 = 86400;
pub const DEFAULT_USER_FIELD: &str = "user";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";
pub const DEFAULT_AUTHORIZATION_SCHEMA: &str = "Bearer";

/// Claims written by the codec itself; the user claim can't reuse them.
const RESERVED_CLAIMS: [&str; 3] = ["jti", "iat", "exp"];

/// Length of the secret generated by
/// [`JwtConfig::from_user_config_or_generated_secret`]. Enough for HS512.
const GENERATED_SECRET_LEN: usize = 64;

type Result<T> = core::result::Result<T, ConfigError>;

/// User-provided configuration.
///
/// Every field is optional in the source document. `secretKey` has no usable
/// default: leaving it out makes [`JwtConfig::from_user_config`] fail.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtUserConfig {
    /// Symmetric signing secret.
    pub secret_key: Option<String>,
    /// Default token ttl in seconds, negative means tokens never expire.
    pub token_expire_seconds: i64,
    /// Signing algorithm, one of HS256, HS384 or HS512.
    pub algorithm: Algorithm,
    /// Claims field holding the user.
    pub user_field: String,
    /// Role name of the administrator.
    pub admin_role: String,
    /// Scheme expected before the token in the Authorization header.
    pub authorization_schema: String,
    /// Tolerated clock skew when checking `exp`.
    pub leeway_seconds: u64,
}

impl Default for JwtUserConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            token_expire_seconds: DEFAULT_TOKEN_EXPIRE_SECONDS,
            algorithm: Algorithm::HS256,
            user_field: String::from(DEFAULT_USER_FIELD),
            admin_role: String::from(DEFAULT_ADMIN_ROLE),
            authorization_schema: String::from(DEFAULT_AUTHORIZATION_SCHEMA),
            leeway_seconds: 0,
        }
    }
}

impl Debug for JwtUserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtUserConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "REDACTED"))
            .field("token_expire_seconds", &self.token_expire_seconds)
            .field("algorithm", &self.algorithm)
            .field("user_field", &self.user_field)
            .field("admin_role", &self.admin_role)
            .field("authorization_schema", &self.authorization_schema)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

fn env_variable(var: &'static str) -> Option<String> {
    std::env::var(var).ok()
}

fn parse_env_variable<T>(var: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_variable(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|err| ConfigError::InvalidEnv {
                var,
                reason: err.to_string(),
            })
        })
        .transpose()
}

impl JwtUserConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Read configuration from `JWT_*` environment variables.
    ///
    /// Unset variables keep their default; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.secret_key = env_variable("JWT_SECRET");
        if let Some(ttl) = parse_env_variable("JWT_TOKEN_EXPIRE_SECONDS")? {
            config.token_expire_seconds = ttl;
        }
        if let Some(algorithm) = parse_env_variable("JWT_ALGORITHM")? {
            config.algorithm = algorithm;
        }
        if let Some(user_field) = env_variable("JWT_USER_FIELD") {
            config.user_field = user_field;
        }
        if let Some(admin_role) = env_variable("JWT_ADMIN_ROLE") {
            config.admin_role = admin_role;
        }
        if let Some(schema) = env_variable("JWT_AUTHORIZATION_SCHEMA") {
            config.authorization_schema = schema;
        }
        if let Some(leeway) = parse_env_variable("JWT_LEEWAY_SECONDS")? {
            config.leeway_seconds = leeway;
        }
        Ok(config)
    }
}

/// Validated token configuration.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtConfig {
    secret: Vec<u8>,
    algorithm: Algorithm,
    default_ttl_seconds: i64,
    user_field: String,
    admin_role: String,
    schema: String,
    prefix: String,
    leeway_seconds: u64,
}

/// Minimum secret size in bits, the digest size of the HMAC.
fn required_secret_bits(algorithm: Algorithm) -> Result<usize> {
    match algorithm {
        Algorithm::HS256 => Ok(256),
        Algorithm::HS384 => Ok(384),
        Algorithm::HS512 => Ok(512),
        other => Err(ConfigError::UnsupportedAlgorithm(other)),
    }
}

fn check_secret(secret: &[u8], algorithm: Algorithm) -> Result<()> {
    let required_bits = required_secret_bits(algorithm)?;
    let actual_bits = secret.len() * 8;
    if actual_bits < required_bits {
        return Err(ConfigError::WeakSecret {
            algorithm,
            required_bits,
            actual_bits,
        });
    }
    Ok(())
}

fn check_user_field(user_field: &str) -> Result<()> {
    if user_field.is_empty() || RESERVED_CLAIMS.contains(&user_field) {
        return Err(ConfigError::InvalidUserField(String::from(user_field)));
    }
    Ok(())
}

fn check_schema(schema: &str) -> Result<()> {
    if schema.is_empty() || schema.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidSchema(String::from(schema)));
    }
    Ok(())
}

impl JwtConfig {
    /// Creates a configuration with default ttl, claim field, admin role and
    /// schema.
    ///
    /// Fails if `algorithm` is not an HMAC algorithm or `secret` is shorter
    /// than its digest.
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: Algorithm) -> Result<Self> {
        let secret = secret.into();
        check_secret(&secret, algorithm)?;
        Ok(Self {
            secret,
            algorithm,
            default_ttl_seconds: DEFAULT_TOKEN_EXPIRE_SECONDS,
            user_field: String::from(DEFAULT_USER_FIELD),
            admin_role: String::from(DEFAULT_ADMIN_ROLE),
            schema: String::from(DEFAULT_AUTHORIZATION_SCHEMA),
            prefix: format!("{DEFAULT_AUTHORIZATION_SCHEMA} "),
            leeway_seconds: 0,
        })
    }

    /// Validates user configuration. A missing or empty `secretKey` is an error.
    pub fn from_user_config(config: JwtUserConfig) -> Result<Self> {
        let secret = config
            .secret_key
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        Self::build(secret.into_bytes(), config)
    }

    /// Like [`JwtConfig::from_user_config`], but generates a random secret when
    /// none is configured.
    ///
    /// Tokens signed with a generated secret stop verifying once the process
    /// restarts, so this is only meant for development setups.
    pub fn from_user_config_or_generated_secret(config: JwtUserConfig) -> Result<Self> {
        let configured = config
            .secret_key
            .as_deref()
            .is_some_and(|secret| !secret.is_empty());
        if configured {
            return Self::from_user_config(config);
        }

        warn!("No JWT secret configured, using a random one. Tokens will not survive a restart");
        let mut secret = vec![0u8; GENERATED_SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        Self::build(secret, config)
    }

    fn build(secret: Vec<u8>, config: JwtUserConfig) -> Result<Self> {
        Self::new(secret, config.algorithm)?
            .with_default_ttl_seconds(config.token_expire_seconds)
            .with_admin_role(config.admin_role)
            .with_leeway_seconds(config.leeway_seconds)
            .with_user_field(config.user_field)?
            .with_schema(config.authorization_schema)
    }

    pub fn with_default_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.default_ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_admin_role(mut self, admin_role: impl Into<String>) -> Self {
        self.admin_role = admin_role.into();
        self
    }

    pub fn with_leeway_seconds(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    pub fn with_user_field(mut self, user_field: impl Into<String>) -> Result<Self> {
        let user_field = user_field.into();
        check_user_field(&user_field)?;
        self.user_field = user_field;
        Ok(self)
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        check_schema(&schema)?;
        self.prefix = format!("{schema} ");
        self.schema = schema;
        Ok(self)
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn default_ttl_seconds(&self) -> i64 {
        self.default_ttl_seconds
    }

    pub fn user_field(&self) -> &str {
        &self.user_field
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// `schema` followed by a single space.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn leeway_seconds(&self) -> u64 {
        self.leeway_seconds
    }
}

impl Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"REDACTED")
            .field("algorithm", &self.algorithm)
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .field("user_field", &self.user_field)
            .field("admin_role", &self.admin_role)
            .field("schema", &self.schema)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl Display for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} schema={} user_field={} ttl={}s secret=REDACTED",
            self.algorithm, self.schema, self.user_field, self.default_ttl_seconds
        )
    }
}
