pub mod extension;
pub mod relay;
pub mod webwallet;

use std::sync::Arc;

use crate::config::{Config, SignerMethod};
use crate::error::{Result, WalletError};
use crate::navigate::Navigator;
use crate::relay::RelayClient;
use crate::session::SessionStore;
use crate::tx::{SignedTransaction, UnsignedTransaction};

/// Options passed along with a signing request.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
	/// Where a redirect-style signer should send the result.  Ignored
	/// by signers that return signatures in-band.
	pub callback_url: Option<String>,
}

/// How a signer resolved a signing request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignOutcome {
	/// Signatures returned in-band, one per requested transaction.
	Signed(Vec<SignedTransaction>),
	/// The signer navigated away; the result arrives on the callback
	/// route in a later page load.
	Redirected,
}

/// A signer that can produce signatures without holding private keys
/// locally.  Every implementation delegates to an external wallet: a
/// local extension host, a hosted web wallet, or a mobile wallet
/// reached through the relay bridge.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
	/// Prepare the signer for use.  Returns false, not an error, when
	/// the signer is unusable in the current environment.
	async fn init(&self) -> Result<bool>;

	/// The address this signer controls.  Fails until a login has
	/// completed.
	fn address(&self) -> Result<&str>;

	/// Present a batch to the wallet for approval.
	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
		options: &SignOptions,
	) -> Result<SignOutcome>;

	/// Ask the wallet to drop any pending approval prompt.  Safe to
	/// call when nothing is pending.
	async fn cancel_action(&self) -> Result<()> {
		Ok(())
	}

	/// End the wallet session, optionally sending the user to a
	/// callback URL.
	async fn logout(&self, callback_url: Option<&str>) -> Result<()>;
}

/// Build a signer for the active login method.
pub fn from_method(
	method: SignerMethod,
	address: Option<String>,
	config: &Config,
	navigator: Arc<dyn Navigator>,
	relay: Option<Arc<dyn RelayClient>>,
	store: &Arc<SessionStore>,
) -> Result<Box<dyn Signer>> {
	match method {
		SignerMethod::Extension => Ok(Box::new(extension::ExtensionSigner::new(
			&config.signer.extension_host,
			address,
		))),
		SignerMethod::Webwallet => Ok(Box::new(webwallet::WebWalletSigner::new(
			&config.signer.webwallet_url,
			address,
			navigator,
		))),
		SignerMethod::Relay => {
			let client = relay.ok_or_else(|| {
				WalletError::Relay("no active relay session; run: wallet-relay login --method relay".into())
			})?;
			let address = address.ok_or(WalletError::AddressUnavailable)?;
			Ok(Box::new(relay::RelaySigner::new(
				client,
				address,
				store.next_handle_version(),
				Arc::clone(store),
			)))
		}
	}
}
