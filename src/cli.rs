use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
	name = "wallet-relay",
	about = "Keyless CLI that signs transaction batches with an external wallet.",
	version
)]
pub struct Cli {
	/// Network to connect to.
	#[arg(long, default_value = "testnet", global = true)]
	pub network: Network,

	/// Override the account API endpoint URL.
	#[arg(long, global = true)]
	pub api_url: Option<String>,

	/// Override the login method.
	#[arg(long, global = true)]
	pub method: Option<MethodArg>,

	/// Override the active wallet address.
	#[arg(long, global = true)]
	pub address: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Clone, ValueEnum)]
pub enum Network {
	Testnet,
	Mainnet,
}

impl Network {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Testnet => "testnet",
			Self::Mainnet => "mainnet",
		}
	}
}

#[derive(Clone, ValueEnum)]
pub enum MethodArg {
	Extension,
	Webwallet,
	Relay,
}

#[derive(Subcommand)]
pub enum Command {
	/// Authenticate with an external wallet.
	Login {
		/// Login method to use for this attempt.
		#[arg(long)]
		method: Option<MethodArg>,

		/// Opaque login token to attach to the pairing deep link.
		#[arg(long)]
		token: Option<String>,
	},

	/// End the wallet session.
	Logout {
		/// URL to send the user to after logout.
		#[arg(long)]
		callback_url: Option<String>,
	},

	/// Sign a batch of transactions with the connected wallet.
	Sign {
		/// Path to a JSON file holding the unsigned transactions.
		batch: PathBuf,

		/// Route the wallet sends the user back to after signing.
		#[arg(long)]
		callback_route: Option<String>,

		/// Skip the post-sign redirect.
		#[arg(long)]
		no_redirect: bool,
	},

	/// Show current session configuration.
	Status,

	/// Manage stored session defaults.
	Session {
		#[command(subcommand)]
		command: SessionCommand,
	},
}

// -- Session subcommands --

#[derive(Subcommand)]
pub enum SessionCommand {
	/// Set the default login method.
	SetMethod {
		/// Login method to store.
		#[arg(long)]
		method: MethodArg,
	},
}
