use std::sync::Arc;

use crate::error::{Result, WalletError};
use crate::relay::RelayClient;
use crate::session::SessionStore;
use crate::signer::{SignOptions, SignOutcome, Signer};
use crate::tx::UnsignedTransaction;

/// Signs through the mobile wallet on the other side of the relay
/// bridge.  The handle is stamped with the session's handle version at
/// construction; once a newer login attempt claims a fresh version,
/// this handle refuses to sign.
pub struct RelaySigner {
	client: Arc<dyn RelayClient>,
	address: String,
	version: u64,
	store: Arc<SessionStore>,
}

impl RelaySigner {
	pub fn new(
		client: Arc<dyn RelayClient>,
		address: String,
		version: u64,
		store: Arc<SessionStore>,
	) -> Self {
		Self {
			client,
			address,
			version,
			store,
		}
	}

	fn check_fresh(&self) -> Result<()> {
		if self.store.handle_version() != self.version {
			return Err(WalletError::SigningAborted(
				"signer handle is stale; a newer login attempt replaced it".into(),
			));
		}
		Ok(())
	}
}

#[async_trait::async_trait]
impl Signer for RelaySigner {
	async fn init(&self) -> Result<bool> {
		// Usable only while the bridge session is live.
		Ok(self.check_fresh().is_ok() && self.client.is_connected())
	}

	fn address(&self) -> Result<&str> {
		Ok(&self.address)
	}

	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
		_options: &SignOptions,
	) -> Result<SignOutcome> {
		self.check_fresh()?;
		let signed = self.client.sign_transactions(transactions).await?;
		Ok(SignOutcome::Signed(signed))
	}

	async fn logout(&self, _callback_url: Option<&str>) -> Result<()> {
		self.client.disconnect().await
	}
}
