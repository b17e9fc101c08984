use anyhow::Result;
use clap::Parser;

use wallet_relay_cli::cli::{Cli, Command};
use wallet_relay_cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let cli = Cli::parse();

	match &cli.command {
		Command::Login { method, token } => {
			commands::login::run(&cli, method.as_ref(), token.as_deref()).await
		}
		Command::Logout { callback_url } => {
			commands::logout::run(&cli, callback_url.as_deref()).await
		}
		Command::Sign {
			batch,
			callback_route,
			no_redirect,
		} => commands::sign::run(&cli, batch, callback_route.as_deref(), *no_redirect).await,
		Command::Status => commands::status::run(&cli),
		Command::Session { command } => commands::session::run(command),
	}
}
