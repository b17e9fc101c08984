use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{resolve_address, resolve_api, resolve_method};
use crate::config::{Config, SignerMethod};
use crate::navigate::{Navigator, SystemNavigator};
use crate::relay::{HttpRelayClient, RelayClient};
use crate::rpc::ApiClient;
use crate::session::SessionStore;
use crate::signer;
use crate::signing::{SignStep, SigningFlow};
use crate::tx::{self, TransactionBatch, UnsignedTransaction};

pub async fn run(
	cli: &Cli,
	batch_path: &Path,
	callback_route: Option<&str>,
	no_redirect: bool,
) -> Result<()> {
	let config = Config::load()?;
	let api_url = resolve_api(cli, &config);
	let method = resolve_method(cli, &config)?;
	let address = resolve_address(cli, &config)?;

	// 1. Read the unsigned batch.
	let raw = std::fs::read_to_string(batch_path)?;
	let transactions: Vec<UnsignedTransaction> = serde_json::from_str(&raw)?;
	if transactions.is_empty() {
		anyhow::bail!("Batch file contains no transactions.");
	}
	println!("Batch: {} transaction(s)", transactions.len());

	// 2. Wire up the session.
	let store = Arc::new(SessionStore::new());
	let navigator: Arc<dyn Navigator> = Arc::new(SystemNavigator);

	let relay: Option<Arc<dyn RelayClient>> = match method {
		SignerMethod::Relay => {
			let endpoint = config.relay.endpoint.as_deref().ok_or_else(|| {
				anyhow::anyhow!(
					"No relay endpoint configured. Set relay.endpoint in {}",
					Config::path().display()
				)
			})?;
			Some(HttpRelayClient::connect(endpoint))
		}
		_ => None,
	};

	let provider = signer::from_method(
		method,
		Some(address.clone()),
		&config,
		Arc::clone(&navigator),
		relay,
		&store,
	)?;
	store.set_login(method, address.clone(), None);
	store.set_provider(Arc::from(provider));

	// 3. Submit the batch.
	let session_id = tx::new_session_id(&address);
	let callback_route = callback_route
		.map(str::to_owned)
		.unwrap_or_else(|| config.routes.callback_route.clone());
	store.submit_batch(TransactionBatch {
		session_id: session_id.clone(),
		transactions,
		callback_route,
		redirect_after_sign: !no_redirect,
	})?;
	println!("Session: {session_id}");

	// 4. Drive the signing state machine.
	let flow = SigningFlow::new(
		Arc::clone(&store),
		Arc::new(ApiClient::new(&api_url)),
		navigator,
		config.routes.origin.clone(),
		"/",
	);
	let step = flow.process_pending().await?;

	match step {
		SignStep::Signed => {
			let batch = store
				.signed_batch(&session_id)
				.expect("signed step implies a committed batch");
			println!("Batch signed.");
			for tx in &batch.transactions {
				let nonce = tx.transaction.nonce.unwrap_or_default();
				println!("  nonce={nonce}  receiver={}", tx.transaction.receiver);
			}
		}
		SignStep::Cancelled => match flow.visible_error() {
			Some(message) => anyhow::bail!("Signing cancelled: {message}"),
			None => println!("Signing cancelled."),
		},
		SignStep::Dispatching => {
			println!("Handed off to the web wallet; finish signing in your browser.");
		}
		SignStep::Idle | SignStep::NonceAssignment => println!("Nothing to sign."),
	}

	Ok(())
}
