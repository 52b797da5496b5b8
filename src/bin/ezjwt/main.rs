mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{handle_decode, handle_encode, load_codec};
use ez_jwt::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,ez_jwt=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = load_codec(cli.config.as_deref()).and_then(|codec| match cli.command {
        Commands::Encode { user } => handle_encode(&codec, user),
        Commands::Decode { token } => handle_decode(&codec, &token),
    });

    if let Err(ref e) = result {
        tracing::error!("Error: {e}");
    }

    result
}
