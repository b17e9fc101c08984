use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{Config, SignerMethod};
use crate::error::{Result, WalletError};
use crate::navigate::Navigator;
use crate::relay::{HttpRelayClient, RelayClient, RelayEvent};
use crate::session::SessionStore;
use crate::signer::relay::RelaySigner;

/// Lifecycle of one relay login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
	/// No relay endpoint, or no attempt started.
	Uninitialized,
	/// A pairing URI exists and is waiting to be scanned.
	Pairing,
	/// The wallet logged in; the liveness probe is running.
	Connected,
	/// The liveness probe failed or the relay reported the transport gone.
	Disconnected,
	/// The wallet, or this process, ended the session.
	LoggedOut,
}

/// Settings the manager needs from [`Config`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
	pub endpoint: Option<String>,
	pub heartbeat_interval: Duration,
	pub origin: String,
	pub callback_route: String,
	pub logout_route: String,
}

impl BridgeConfig {
	pub fn from_config(config: &Config) -> Self {
		Self {
			endpoint: config.relay.endpoint.clone(),
			heartbeat_interval: Duration::from_secs(config.relay.heartbeat_secs),
			origin: config.routes.origin.clone(),
			callback_route: config.routes.callback_route.clone(),
			logout_route: config.routes.logout_route.clone(),
		}
	}
}

struct Inner {
	config: BridgeConfig,
	store: Arc<SessionStore>,
	navigator: Arc<dyn Navigator>,
	state: watch::Sender<BridgeState>,
	client: Mutex<Option<Arc<dyn RelayClient>>>,
}

/// Owns the connection to the remote signer: pairing URI generation,
/// the login/logout event loop, and the liveness probe.  Cheap to
/// clone; all clones share one session.
///
/// Each `init` invalidates the previous attempt wholesale: the signer
/// handle is version-stamped, a fresh pairing URI is generated (a
/// previous unused URI is never shown again), and events from the old
/// attempt are ignored.
#[derive(Clone)]
pub struct BridgeManager {
	inner: Arc<Inner>,
}

impl BridgeManager {
	pub fn new(
		config: BridgeConfig,
		store: Arc<SessionStore>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		let (state, _) = watch::channel(BridgeState::Uninitialized);
		Self {
			inner: Arc::new(Inner {
				config,
				store,
				navigator,
				state,
				client: Mutex::new(None),
			}),
		}
	}

	pub fn state(&self) -> BridgeState {
		*self.inner.state.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<BridgeState> {
		self.inner.state.subscribe()
	}

	/// Start a login attempt against the configured relay endpoint.
	/// Returns `None`, staying `Uninitialized`, when no endpoint is
	/// configured: bridge login is simply not set up for this
	/// deployment.
	pub async fn init_from_config(&self) -> Result<Option<String>> {
		let Some(endpoint) = self.inner.config.endpoint.clone() else {
			debug!("no relay endpoint configured; bridge login disabled");
			return Ok(None);
		};
		let client = HttpRelayClient::connect(&endpoint);
		Ok(Some(self.init(client).await?))
	}

	/// Start a login attempt with the given relay client, tearing down
	/// any previous attempt first.  Returns the fresh pairing URI.
	pub async fn init(&self, client: Arc<dyn RelayClient>) -> Result<String> {
		// Tear down the previous attempt before the new handle goes live.
		let previous = self.inner.client.lock().unwrap().take();
		if let Some(previous) = previous {
			if let Err(e) = previous.disconnect().await {
				debug!(error = %e, "previous relay session did not disconnect cleanly");
			}
		}

		let version = self.inner.store.next_handle_version();
		let events = client
			.take_events()
			.ok_or_else(|| WalletError::Relay("relay event feed was already consumed".into()))?;
		let uri = client.pairing_uri().await?;

		*self.inner.client.lock().unwrap() = Some(Arc::clone(&client));
		self.inner.state.send_replace(BridgeState::Pairing);
		info!(version, "bridge pairing started");

		tokio::spawn(run_dispatch(self.clone(), version, events));
		tokio::spawn(run_heartbeat(self.clone(), version));

		Ok(uri)
	}

	/// End the session from this side.
	pub async fn logout(&self) {
		let version = self.inner.store.handle_version();
		self.trigger_logout(version, BridgeState::LoggedOut).await;
	}

	fn current_client(&self) -> Option<Arc<dyn RelayClient>> {
		self.inner.client.lock().unwrap().clone()
	}

	/// Handle the wallet completing a login: capture address and login
	/// signature, publish the provider, and land the user on the
	/// callback route.
	async fn handle_login(&self, version: u64) {
		if self.inner.store.handle_version() != version {
			debug!(version, "ignoring login event from a stale attempt");
			return;
		}
		// The handle may still be mid-construction when the wallet is
		// quick; the probe tolerates the same window.
		let Some(client) = self.current_client() else {
			return;
		};

		let (address, signature) = match client.login().await {
			Ok(login) => login,
			Err(e) => {
				warn!(error = %e, "relay login completion failed");
				return;
			}
		};

		self.inner
			.store
			.set_login(SignerMethod::Relay, address.clone(), signature);
		self.inner.store.set_provider(Arc::new(RelaySigner::new(
			client,
			address.clone(),
			version,
			Arc::clone(&self.inner.store),
		)));
		self.inner.state.send_replace(BridgeState::Connected);
		info!(%address, "bridge wallet connected");

		let callback = format!("{}{}", self.inner.config.origin, self.inner.config.callback_route);
		if let Err(e) = self.inner.navigator.navigate_to(&callback) {
			warn!(error = %e, "post-login navigation failed");
		}
	}

	/// Funnel for every way a session ends: heartbeat failure, remote
	/// logout, or a local one.  Runs at most once per attempt; the
	/// post-logout redirect is suppressed when the session never
	/// reached `Connected`.
	async fn trigger_logout(&self, version: u64, to: BridgeState) {
		if self.inner.store.handle_version() != version {
			return;
		}

		let mut was_connected = false;
		let transitioned = self.inner.state.send_if_modified(|state| match state {
			BridgeState::Disconnected | BridgeState::LoggedOut => false,
			previous => {
				was_connected = *previous == BridgeState::Connected;
				*previous = to;
				true
			}
		});
		if !transitioned {
			return;
		}

		info!(?to, was_connected, "bridge session ended");
		self.inner.store.clear_login();

		let client = self.inner.client.lock().unwrap().take();
		if let Some(client) = client {
			if let Err(e) = client.disconnect().await {
				debug!(error = %e, "relay disconnect failed during logout");
			}
		}

		if was_connected {
			let logout = format!("{}{}", self.inner.config.origin, self.inner.config.logout_route);
			if let Err(e) = self.inner.navigator.navigate_to(&logout) {
				warn!(error = %e, "post-logout navigation failed");
			}
		}
	}
}

/// Single consumer of the relay's event feed for one attempt.
async fn run_dispatch(
	manager: BridgeManager,
	version: u64,
	mut events: mpsc::Receiver<RelayEvent>,
) {
	while let Some(event) = events.recv().await {
		if manager.inner.store.handle_version() != version {
			break;
		}
		match event {
			RelayEvent::LoggedIn => manager.handle_login(version).await,
			RelayEvent::LoggedOut => {
				manager.trigger_logout(version, BridgeState::LoggedOut).await;
				break;
			}
			RelayEvent::ConnectionLost => {
				manager.trigger_logout(version, BridgeState::Disconnected).await;
				break;
			}
		}
	}
}

/// Liveness probe for one attempt.  Probes only while `Connected`; a
/// failed probe takes the same exit as a remote logout.  A hung probe
/// delays its own next tick and nothing else.
async fn run_heartbeat(manager: BridgeManager, version: u64) {
	let mut interval = tokio::time::interval(manager.inner.config.heartbeat_interval);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		interval.tick().await;
		if manager.inner.store.handle_version() != version {
			break;
		}
		match manager.state() {
			BridgeState::Connected => {}
			BridgeState::Disconnected | BridgeState::LoggedOut => break,
			// Still pairing; nothing to probe yet.
			_ => continue,
		}
		// Login may be mid-flight on the dispatch loop.
		let Some(client) = manager.current_client() else {
			continue;
		};

		let healthy = client.is_connected() && client.send_heartbeat().await.is_ok();
		if !healthy {
			warn!("bridge heartbeat failed; treating the session as lost");
			manager
				.trigger_logout(version, BridgeState::Disconnected)
				.await;
			break;
		}
	}
}
