//! Signed identity tokens for HTTP authentication.
//!
//! A host builds a [`JwtConfig`](config::JwtConfig) once at startup, wraps it
//! in a [`JwtCodec`](jwt::JwtCodec), mints tokens for users after login and
//! resolves the user back from the `Authorization` header on every request.
//!
//! # Usage
//!
//! ```rust
//! use ez_jwt::config::{JwtConfig, JwtUserConfig};
//! use ez_jwt::error::DecodeError;
//! use ez_jwt::jwt::JwtCodec;
//! use ez_jwt::user::JwtUser;
//!
//! let user_config = JwtUserConfig {
//!     secret_key: Some(String::from("0123456789abcdef0123456789abcdef")),
//!     ..Default::default()
//! };
//! let codec = JwtCodec::new(JwtConfig::from_user_config(user_config).unwrap());
//!
//! let token = codec.encode(&JwtUser::new("7", ["dev"], ["read"])).unwrap();
//! assert_eq!(codec.decode(&token).unwrap().id, "7");
//! assert_eq!(codec.decode_with_prefix(&token), Err(DecodeError::SchemaMismatch));
//! ```

pub mod auth_body;
pub mod config;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod prelude;
pub mod user;
