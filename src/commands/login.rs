use std::sync::Arc;

use anyhow::Result;

use crate::bridge::{BridgeConfig, BridgeManager, BridgeState};
use crate::cli::{Cli, MethodArg};
use crate::commands::method_from_arg;
use crate::config::{Config, SignerMethod};
use crate::navigate::{Navigator, SystemNavigator};
use crate::pairing::{pairing_code, PairingCode};
use crate::session::SessionStore;
use crate::signer::extension::ExtensionSigner;
use crate::signer::webwallet::WebWalletSigner;
use crate::signer::Signer;

pub async fn run(cli: &Cli, method: Option<&MethodArg>, token: Option<&str>) -> Result<()> {
	let config = Config::load()?;
	let method = match method.or(cli.method.as_ref()) {
		Some(arg) => method_from_arg(arg),
		None => config.signer.method.ok_or_else(|| {
			anyhow::anyhow!("No login method set. Run: wallet-relay login --method <method>")
		})?,
	};

	match method {
		SignerMethod::Extension => login_extension(config).await,
		SignerMethod::Webwallet => login_webwallet(config, cli.address.clone()),
		SignerMethod::Relay => login_relay(config, token).await,
	}
}

async fn login_extension(mut config: Config) -> Result<()> {
	let signer = ExtensionSigner::new(&config.signer.extension_host, None);

	if !signer.init().await? {
		anyhow::bail!(
			"Extension host is not reachable at {}. Is the wallet extension running?",
			config.signer.extension_host
		);
	}

	let address = signer.connect().await?;
	println!("Connected: {address}");

	config.signer.method = Some(SignerMethod::Extension);
	config.signer.address = Some(address);
	config.save()?;
	println!("Address saved to config.");

	Ok(())
}

/// The web wallet authenticates on its own pages; the user comes back
/// on the callback route with the address in the query string.
fn login_webwallet(mut config: Config, address: Option<String>) -> Result<()> {
	let navigator: Arc<dyn Navigator> = Arc::new(SystemNavigator);
	let wallet = WebWalletSigner::new(&config.signer.webwallet_url, None, navigator);

	let callback = format!("{}{}", config.routes.origin, config.routes.callback_route);
	let url = wallet.login_url(&callback);

	println!("Opening the web wallet...");
	println!("  {url}");
	SystemNavigator.navigate_to(&url)?;
	println!("Complete the login in your browser.");

	config.signer.method = Some(SignerMethod::Webwallet);
	if let Some(address) = address {
		config.signer.address = Some(address);
		println!("Address saved to config.");
	}
	config.save()?;

	Ok(())
}

async fn login_relay(mut config: Config, token: Option<&str>) -> Result<()> {
	let store = Arc::new(SessionStore::new());
	let navigator: Arc<dyn Navigator> = Arc::new(SystemNavigator);
	let manager = BridgeManager::new(
		BridgeConfig::from_config(&config),
		Arc::clone(&store),
		navigator,
	);

	let Some(uri) = manager.init_from_config().await? else {
		anyhow::bail!(
			"No relay endpoint configured. Set relay.endpoint in {}",
			Config::path().display()
		);
	};

	match pairing_code(&config.relay.deep_link_base, &uri, token)? {
		PairingCode::Ready { deep_link, qr } => {
			println!("{qr}");
			println!();
			println!("Scan the code with your wallet, or open:");
			println!("  {deep_link}");
		}
		PairingCode::Loading => unreachable!("init returned a non-empty pairing URI"),
	}
	println!();
	println!("Waiting for the wallet to connect (Ctrl-C to abort)...");

	let mut states = manager.subscribe();
	loop {
		match *states.borrow_and_update() {
			BridgeState::Connected => break,
			BridgeState::Disconnected | BridgeState::LoggedOut => {
				anyhow::bail!("The wallet ended the login attempt.");
			}
			_ => {}
		}
		states.changed().await?;
	}

	let address = store
		.address()
		.ok_or_else(|| anyhow::anyhow!("connected without an address"))?;
	println!("Connected: {address}");
	if store.login_signature().is_some() {
		println!("Login signature received.");
	}

	config.signer.method = Some(SignerMethod::Relay);
	config.signer.address = Some(address);
	config.save()?;
	println!("Address saved to config.");

	Ok(())
}
