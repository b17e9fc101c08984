use serde_json::{json, Value};

use crate::error::{Result, WalletError};
use crate::signer::{SignOptions, SignOutcome, Signer};
use crate::tx::UnsignedTransaction;

/// Signs through the browser-extension host: a small local HTTP service
/// the extension exposes for native clients.  The extension raises the
/// approval popup and reports the user's decision back.
pub struct ExtensionSigner {
	host: String,
	address: Option<String>,
	http: reqwest::Client,
}

impl ExtensionSigner {
	pub fn new(host: &str, address: Option<String>) -> Self {
		Self {
			host: host.trim_end_matches('/').to_owned(),
			address,
			http: reqwest::Client::new(),
		}
	}

	/// Ask the extension which address it controls.  Used once at login.
	pub async fn connect(&self) -> Result<String> {
		let url = format!("{}/address", self.host);
		let resp: Value = self
			.http
			.get(&url)
			.send()
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?
			.json()
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;

		resp.get("address")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or(WalletError::AddressUnavailable)
	}
}

#[async_trait::async_trait]
impl Signer for ExtensionSigner {
	async fn init(&self) -> Result<bool> {
		// An unreachable host means no extension in this environment,
		// which is "unusable", not a failure.
		let url = format!("{}/status", self.host);
		match self.http.get(&url).send().await {
			Ok(resp) => Ok(resp.status().is_success()),
			Err(_) => Ok(false),
		}
	}

	fn address(&self) -> Result<&str> {
		self.address.as_deref().ok_or(WalletError::AddressUnavailable)
	}

	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
		_options: &SignOptions,
	) -> Result<SignOutcome> {
		let url = format!("{}/sign", self.host);
		let resp: Value = self
			.http
			.post(&url)
			.json(&json!({ "transactions": transactions }))
			.send()
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?
			.json()
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;

		// A user decline comes back as an error message, with the
		// cancellation sentinel left intact for the signing flow.
		if let Some(message) = resp.get("error").and_then(Value::as_str) {
			return Err(WalletError::SigningAborted(message.to_owned()));
		}

		let signed = resp
			.get("transactions")
			.cloned()
			.ok_or_else(|| WalletError::SigningAborted("extension returned no transactions".into()))?;
		let signed = serde_json::from_value(signed)
			.map_err(|e| WalletError::SigningAborted(format!("malformed signed batch: {e}")))?;

		Ok(SignOutcome::Signed(signed))
	}

	async fn cancel_action(&self) -> Result<()> {
		// Dismisses the approval popup if one is open; a failure here
		// means there was nothing to cancel.
		let url = format!("{}/cancel", self.host);
		let _ = self.http.post(&url).send().await;
		Ok(())
	}

	async fn logout(&self, callback_url: Option<&str>) -> Result<()> {
		let url = format!("{}/logout", self.host);
		self.http
			.post(&url)
			.json(&json!({ "callback_url": callback_url }))
			.send()
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;
		Ok(())
	}
}
