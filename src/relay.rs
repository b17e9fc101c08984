use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, WalletError};
use crate::tx::{SignedTransaction, UnsignedTransaction};

/// Events the relay service raises about the remote wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
	/// The wallet completed the pairing and logged in.
	LoggedIn,
	/// The wallet ended the session from its side.
	LoggedOut,
	/// The relay reported the transport as gone.
	ConnectionLost,
}

/// Client for the relay service that connects this process to a remote
/// wallet.  The wire protocol is the relay's business; this trait only
/// exposes pairing, identity, liveness, signing, and the event feed.
#[async_trait::async_trait]
pub trait RelayClient: Send + Sync {
	/// Request a fresh pairing URI for one login attempt.  A URI is
	/// single-use; every call returns a new one.
	async fn pairing_uri(&self) -> Result<String>;

	/// Complete the login after the wallet has paired, returning the
	/// wallet's address and an optional login signature.
	async fn login(&self) -> Result<(String, Option<String>)>;

	/// Send a liveness probe.  An error means the session is gone.
	async fn send_heartbeat(&self) -> Result<()>;

	/// Whether the transport currently reports a live session.
	fn is_connected(&self) -> bool;

	/// Ask the remote wallet to sign a batch of transactions.
	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
	) -> Result<Vec<SignedTransaction>>;

	/// Tear the relay session down.
	async fn disconnect(&self) -> Result<()>;

	/// Take the event feed.  Yields `None` once the feed has already
	/// been handed to a consumer; there is exactly one dispatch loop.
	fn take_events(&self) -> Option<mpsc::Receiver<RelayEvent>>;
}

/// Relay client speaking JSON-RPC over HTTP.  Events arrive by long
/// polling `next_event` on a background task.
pub struct HttpRelayClient {
	url: String,
	http: reqwest::Client,
	connected: AtomicBool,
	events: Mutex<Option<mpsc::Receiver<RelayEvent>>>,
}

impl HttpRelayClient {
	/// Build a client for the given relay endpoint and start the event
	/// poll task.
	pub fn connect(url: &str) -> Arc<Self> {
		let (tx, rx) = mpsc::channel(16);
		let client = Arc::new(Self {
			url: url.trim_end_matches('/').to_owned(),
			http: reqwest::Client::new(),
			connected: AtomicBool::new(false),
			events: Mutex::new(Some(rx)),
		});
		tokio::spawn(poll_events(Arc::clone(&client), tx));
		client
	}

	async fn call(&self, method: &str, params: Value) -> anyhow::Result<Value> {
		let body = json!({
			"id": 1,
			"jsonrpc": "2.0",
			"method": method,
			"params": params
		});

		let resp: Value = self.http.post(&self.url).json(&body).send().await?.json().await?;

		resp.get("result").cloned().ok_or_else(|| {
			let err = resp.get("error").cloned().unwrap_or(Value::Null);
			anyhow::anyhow!("{method} RPC error: {err}")
		})
	}
}

#[async_trait::async_trait]
impl RelayClient for HttpRelayClient {
	async fn pairing_uri(&self) -> Result<String> {
		let result = self
			.call("pairing_uri", json!({}))
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;
		result
			.get("uri")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| WalletError::Relay("relay returned no pairing URI".into()))
	}

	async fn login(&self) -> Result<(String, Option<String>)> {
		let result = self
			.call("login", json!({}))
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;

		let address = result
			.get("address")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or(WalletError::AddressUnavailable)?;
		let signature = result
			.get("signature")
			.and_then(Value::as_str)
			.map(str::to_owned);

		self.connected.store(true, Ordering::SeqCst);
		Ok((address, signature))
	}

	async fn send_heartbeat(&self) -> Result<()> {
		if !self.is_connected() {
			return Err(WalletError::ConnectionLost);
		}
		self.call("heartbeat", json!({}))
			.await
			.map_err(|_| WalletError::ConnectionLost)?;
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
	) -> Result<Vec<SignedTransaction>> {
		let result = self
			.call("sign_transactions", json!({ "transactions": transactions }))
			.await
			.map_err(|e| WalletError::SigningAborted(e.to_string()))?;

		// The wallet's decline message rides back in the error field.
		if let Some(message) = result.get("error").and_then(Value::as_str) {
			return Err(WalletError::SigningAborted(message.to_owned()));
		}

		let signed = result
			.get("transactions")
			.cloned()
			.ok_or_else(|| WalletError::SigningAborted("relay returned no transactions".into()))?;
		serde_json::from_value(signed)
			.map_err(|e| WalletError::SigningAborted(format!("malformed signed batch: {e}")))
	}

	async fn disconnect(&self) -> Result<()> {
		self.connected.store(false, Ordering::SeqCst);
		self.call("disconnect", json!({}))
			.await
			.map_err(|e| WalletError::Relay(e.to_string()))?;
		Ok(())
	}

	fn take_events(&self) -> Option<mpsc::Receiver<RelayEvent>> {
		self.events.lock().unwrap().take()
	}
}

/// Long-poll the relay for session events and forward them onto the
/// channel.  Stops when the consumer goes away or the session ends.
async fn poll_events(client: Arc<HttpRelayClient>, tx: mpsc::Sender<RelayEvent>) {
	loop {
		if tx.is_closed() {
			break;
		}

		match client.call("next_event", json!({})).await {
			Ok(value) => match value.get("event").and_then(Value::as_str) {
				Some("login") => {
					client.connected.store(true, Ordering::SeqCst);
					if tx.send(RelayEvent::LoggedIn).await.is_err() {
						break;
					}
				}
				Some("logout") => {
					client.connected.store(false, Ordering::SeqCst);
					let _ = tx.send(RelayEvent::LoggedOut).await;
					break;
				}
				Some("connection_lost") => {
					client.connected.store(false, Ordering::SeqCst);
					let _ = tx.send(RelayEvent::ConnectionLost).await;
					break;
				}
				// Keepalive or unknown event; poll again.
				_ => {}
			},
			Err(e) => {
				debug!(error = %e, "relay event poll failed, retrying");
				tokio::time::sleep(Duration::from_secs(1)).await;
			}
		}
	}
}
