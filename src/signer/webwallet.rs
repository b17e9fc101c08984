use std::sync::Arc;

use crate::error::{Result, WalletError};
use crate::navigate::Navigator;
use crate::signer::{SignOptions, SignOutcome, Signer};
use crate::tx::UnsignedTransaction;

/// Signs through the hosted web wallet.  Every operation is a full-page
/// handoff: the user is sent to the wallet with the payload in the URL,
/// approves there, and comes back on the callback route.  No result is
/// ever returned in-band.
pub struct WebWalletSigner {
	wallet_url: String,
	address: Option<String>,
	navigator: Arc<dyn Navigator>,
}

impl WebWalletSigner {
	pub fn new(wallet_url: &str, address: Option<String>, navigator: Arc<dyn Navigator>) -> Self {
		Self {
			wallet_url: wallet_url.trim_end_matches('/').to_owned(),
			address,
			navigator,
		}
	}

	/// The wallet's login page, parameterized with where to send the
	/// user back once they have authenticated.
	pub fn login_url(&self, callback_url: &str) -> String {
		format!(
			"{}/login?callbackUrl={}",
			self.wallet_url,
			urlencoding::encode(callback_url)
		)
	}
}

#[async_trait::async_trait]
impl Signer for WebWalletSigner {
	async fn init(&self) -> Result<bool> {
		// The hosted wallet needs no local setup.
		Ok(true)
	}

	fn address(&self) -> Result<&str> {
		self.address.as_deref().ok_or(WalletError::AddressUnavailable)
	}

	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
		options: &SignOptions,
	) -> Result<SignOutcome> {
		let callback_url = options.callback_url.as_deref().ok_or_else(|| {
			WalletError::SigningAborted("web wallet signing requires a callback URL".into())
		})?;

		let payload = serde_json::to_string(transactions)
			.map_err(|e| WalletError::SigningAborted(e.to_string()))?;
		// The reply URL is percent-encoded as a whole so the wallet
		// hands it back untouched.
		let url = format!(
			"{}/sign?transactions={}&callbackUrl={}",
			self.wallet_url,
			urlencoding::encode(&payload),
			urlencoding::encode(callback_url)
		);

		self.navigator
			.navigate_to(&url)
			.map_err(|e| WalletError::Relay(e.to_string()))?;

		Ok(SignOutcome::Redirected)
	}

	async fn logout(&self, callback_url: Option<&str>) -> Result<()> {
		let url = match callback_url {
			Some(cb) => format!(
				"{}/logout?callbackUrl={}",
				self.wallet_url,
				urlencoding::encode(cb)
			),
			None => format!("{}/logout", self.wallet_url),
		};
		self.navigator
			.navigate_to(&url)
			.map_err(|e| WalletError::Relay(e.to_string()))?;
		Ok(())
	}
}
