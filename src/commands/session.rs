use anyhow::Result;

use crate::cli::SessionCommand;
use crate::commands::{method_from_arg, method_label};
use crate::config::Config;

pub fn run(cmd: &SessionCommand) -> Result<()> {
	match cmd {
		SessionCommand::SetMethod { method } => {
			let method = method_from_arg(method);

			let mut config = Config::load()?;
			config.signer.method = Some(method);
			config.save()?;
			println!("Login method set to: {}", method_label(method));
			Ok(())
		}
	}
}
