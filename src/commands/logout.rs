use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use crate::commands::resolve_method;
use crate::config::{Config, SignerMethod};
use crate::navigate::{Navigator, SystemNavigator};
use crate::session::SessionStore;
use crate::signer::{self, Signer};

pub async fn run(cli: &Cli, callback_url: Option<&str>) -> Result<()> {
	let mut config = Config::load()?;
	let method = resolve_method(cli, &config)?;

	let store = Arc::new(SessionStore::new());
	let navigator: Arc<dyn Navigator> = Arc::new(SystemNavigator);

	// Relay pairings do not survive the process that created them, so
	// there is no remote session to end here; the other methods get a
	// proper provider logout.
	if method != SignerMethod::Relay {
		let address = cli.address.clone().or_else(|| config.signer.address.clone());
		let provider = signer::from_method(
			method,
			address,
			&config,
			Arc::clone(&navigator),
			None,
			&store,
		)?;

		// Make sure the signer is reachable before asking it to log
		// out; an unusable signer has no remote session to end.
		if provider.init().await? {
			provider.logout(callback_url).await?;
		}
	}
	store.clear_login();

	if let Some(url) = callback_url {
		navigator.navigate_to(url)?;
	}

	config.signer.address = None;
	config.save()?;
	println!("Logged out.");

	Ok(())
}
