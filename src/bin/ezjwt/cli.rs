use clap::{Args, Parser, Subcommand};
use ez_jwt::user::JwtUser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ezjwt")]
#[command(about = "Mint and verify signed identity tokens")]
pub struct Cli {
    /// Path to a TOML token configuration. Read from JWT_* env variables when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mint a token for a user
    Encode {
        #[command(flatten)]
        user: EncodeArgs,
    },

    /// Verify a token, or an Authorization header value, and print its claims
    Decode {
        /// Token, optionally preceded by the authorization schema
        token: String,
    },
}

#[derive(Args)]
pub struct EncodeArgs {
    /// User id
    #[arg(long)]
    pub id: String,

    /// Role granted to the user, repeatable
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Permission granted to the user, repeatable
    #[arg(long = "perm")]
    pub perms: Vec<String>,

    /// Token ttl in seconds, negative for a token that never expires
    #[arg(long, allow_negative_numbers = true)]
    pub ttl: Option<i64>,

    /// Print the token with the authorization schema prefix
    #[arg(long)]
    pub prefix: bool,
}

impl From<&EncodeArgs> for JwtUser {
    fn from(value: &EncodeArgs) -> Self {
        JwtUser::new(value.id.clone(), value.roles.clone(), value.perms.clone())
    }
}
