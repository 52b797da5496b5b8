use ez_jwt::{
    config::{JwtConfig, JwtUserConfig},
    jwt::{DecodedToken, JwtCodec},
    prelude::*,
    user::JwtUser,
};
use std::path::Path;
use tracing::info;

use crate::cli::EncodeArgs;

pub fn load_codec(config_path: Option<&Path>) -> Result<JwtCodec> {
    let user_config = match config_path {
        Some(path) => {
            info!("Loading token configuration from {}", path.display());
            JwtUserConfig::from_file(path)?
        }
        None => JwtUserConfig::from_env()?,
    };
    let config = JwtConfig::from_user_config(user_config)?;
    info!("Using {config}");
    Ok(JwtCodec::new(config))
}

pub fn handle_encode(codec: &JwtCodec, args: EncodeArgs) -> Result<()> {
    let user = JwtUser::from(&args);
    let ttl = args.ttl.unwrap_or(codec.config().default_ttl_seconds());
    let token = if args.prefix {
        codec.encode_with_prefix_and_ttl(&user, ttl)?
    } else {
        codec.encode_with_ttl(&user, ttl)?
    };
    println!("{token}");
    Ok(())
}

pub fn handle_decode(codec: &JwtCodec, token: &str) -> Result<()> {
    let decoded = inspect_argument(codec, token)?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

/// Accepts a bare token or an exact `<schema> <token>` header value.
fn inspect_argument(codec: &JwtCodec, argument: &str) -> Result<DecodedToken> {
    let token = if codec.verify_schema(argument) {
        &argument[codec.config().prefix().len()..]
    } else {
        argument
    };
    Ok(codec.inspect(token)?)
}
