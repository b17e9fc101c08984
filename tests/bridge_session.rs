//! Lifecycle tests for the bridge session manager, driven by a
//! scripted fake relay.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use wallet_relay_cli::bridge::{BridgeConfig, BridgeManager, BridgeState};
use wallet_relay_cli::config::SignerMethod;
use wallet_relay_cli::error::{Result as WalletResult, WalletError};
use wallet_relay_cli::navigate::Navigator;
use wallet_relay_cli::relay::{RelayClient, RelayEvent};
use wallet_relay_cli::session::SessionStore;
use wallet_relay_cli::signer::{SignOptions, Signer};
use wallet_relay_cli::tx::{SignedTransaction, UnsignedTransaction};

// -- Fakes --

struct RecordingNavigator {
	urls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			urls: Mutex::new(Vec::new()),
		})
	}

	fn urls(&self) -> Vec<String> {
		self.urls.lock().unwrap().clone()
	}
}

impl Navigator for RecordingNavigator {
	fn navigate_to(&self, url: &str) -> anyhow::Result<()> {
		self.urls.lock().unwrap().push(url.to_owned());
		Ok(())
	}
}

struct FakeRelay {
	address: String,
	uris: AtomicUsize,
	connected: AtomicBool,
	heartbeat_ok: AtomicBool,
	event_tx: Mutex<Option<mpsc::Sender<RelayEvent>>>,
}

impl FakeRelay {
	fn new(address: &str) -> Arc<Self> {
		Arc::new(Self {
			address: address.to_owned(),
			uris: AtomicUsize::new(0),
			connected: AtomicBool::new(false),
			heartbeat_ok: AtomicBool::new(true),
			event_tx: Mutex::new(None),
		})
	}

	async fn emit(&self, event: RelayEvent) {
		let tx = self
			.event_tx
			.lock()
			.unwrap()
			.clone()
			.expect("take_events was never called");
		tx.send(event).await.unwrap();
	}
}

#[async_trait::async_trait]
impl RelayClient for FakeRelay {
	async fn pairing_uri(&self) -> WalletResult<String> {
		let n = self.uris.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(format!("wc:pair-{n}@1?relay=fake"))
	}

	async fn login(&self) -> WalletResult<(String, Option<String>)> {
		self.connected.store(true, Ordering::SeqCst);
		Ok((self.address.clone(), Some("login-sig".into())))
	}

	async fn send_heartbeat(&self) -> WalletResult<()> {
		if self.heartbeat_ok.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(WalletError::ConnectionLost)
		}
	}

	fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	async fn sign_transactions(
		&self,
		transactions: &[UnsignedTransaction],
	) -> WalletResult<Vec<SignedTransaction>> {
		Ok(transactions
			.iter()
			.map(|tx| SignedTransaction {
				transaction: tx.clone(),
				signature: "relay-sig".into(),
			})
			.collect())
	}

	async fn disconnect(&self) -> WalletResult<()> {
		self.connected.store(false, Ordering::SeqCst);
		Ok(())
	}

	fn take_events(&self) -> Option<mpsc::Receiver<RelayEvent>> {
		// A fresh feed per attempt so one fake can serve repeated inits.
		let (tx, rx) = mpsc::channel(8);
		*self.event_tx.lock().unwrap() = Some(tx);
		Some(rx)
	}
}

// -- Helpers --

fn bridge_config(endpoint: Option<&str>) -> BridgeConfig {
	BridgeConfig {
		endpoint: endpoint.map(str::to_owned),
		heartbeat_interval: Duration::from_millis(25),
		origin: "http://localhost:3000".into(),
		callback_route: "/dashboard".into(),
		logout_route: "/unlock".into(),
	}
}

fn setup() -> (BridgeManager, Arc<SessionStore>, Arc<RecordingNavigator>) {
	let store = Arc::new(SessionStore::new());
	let navigator = RecordingNavigator::new();
	let manager = BridgeManager::new(
		bridge_config(Some("https://relay.test")),
		Arc::clone(&store),
		Arc::clone(&navigator) as Arc<dyn Navigator>,
	);
	(manager, store, navigator)
}

async fn wait_for(states: &mut watch::Receiver<BridgeState>, want: BridgeState) {
	timeout(Duration::from_secs(2), async {
		loop {
			if *states.borrow_and_update() == want {
				return;
			}
			states.changed().await.unwrap();
		}
	})
	.await
	.unwrap_or_else(|_| panic!("timed out waiting for {want:?}"));
}

// -- Scenarios --

#[tokio::test]
async fn pairing_then_login_reaches_connected() {
	let (manager, store, navigator) = setup();
	let relay = FakeRelay::new("wr1qmobile");

	let uri = manager
		.init(Arc::clone(&relay) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	assert!(uri.contains("pair-1"));
	assert_eq!(manager.state(), BridgeState::Pairing);

	let mut states = manager.subscribe();
	relay.emit(RelayEvent::LoggedIn).await;
	wait_for(&mut states, BridgeState::Connected).await;

	assert_eq!(store.address().as_deref(), Some("wr1qmobile"));
	assert_eq!(store.login_method(), Some(SignerMethod::Relay));
	assert_eq!(store.login_signature().as_deref(), Some("login-sig"));
	assert!(store.active_signer().is_ok());
	// Login lands the user on the callback route.
	assert_eq!(navigator.urls(), vec!["http://localhost:3000/dashboard".to_owned()]);
}

#[tokio::test]
async fn each_attempt_gets_a_fresh_pairing_uri() {
	let (manager, _store, _navigator) = setup();
	let relay = FakeRelay::new("wr1qmobile");

	let first = manager
		.init(Arc::clone(&relay) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	let second = manager
		.init(Arc::clone(&relay) as Arc<dyn RelayClient>)
		.await
		.unwrap();

	assert_ne!(first, second);
	assert!(second.contains("pair-2"));
}

#[tokio::test]
async fn heartbeat_failure_logs_out_exactly_once() {
	let (manager, store, navigator) = setup();
	let relay = FakeRelay::new("wr1qmobile");

	manager
		.init(Arc::clone(&relay) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	let mut states = manager.subscribe();
	relay.emit(RelayEvent::LoggedIn).await;
	wait_for(&mut states, BridgeState::Connected).await;

	relay.heartbeat_ok.store(false, Ordering::SeqCst);
	wait_for(&mut states, BridgeState::Disconnected).await;

	// The session is cleared and the logout route is activated.
	assert!(store.address().is_none());
	assert!(store.active_signer().is_err());
	let logout_navs = |urls: Vec<String>| {
		urls.iter().filter(|u| u.ends_with("/unlock")).count()
	};
	assert_eq!(logout_navs(navigator.urls()), 1);

	// Later timer ticks must not dispatch a second logout.
	tokio::time::sleep(Duration::from_millis(120)).await;
	assert_eq!(logout_navs(navigator.urls()), 1);
}

#[tokio::test]
async fn remote_logout_before_connecting_suppresses_the_redirect() {
	let (manager, store, navigator) = setup();
	let relay = FakeRelay::new("wr1qmobile");

	manager
		.init(Arc::clone(&relay) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	let mut states = manager.subscribe();
	relay.emit(RelayEvent::LoggedOut).await;
	wait_for(&mut states, BridgeState::LoggedOut).await;

	// Never connected: no navigation away from the login page.
	assert!(navigator.urls().is_empty());
	assert!(store.address().is_none());
}

#[tokio::test]
async fn missing_endpoint_stays_uninitialized() {
	let store = Arc::new(SessionStore::new());
	let navigator = RecordingNavigator::new();
	let manager = BridgeManager::new(
		bridge_config(None),
		Arc::clone(&store),
		navigator as Arc<dyn Navigator>,
	);

	// Not configured is not an error; the manager just never starts.
	let uri = manager.init_from_config().await.unwrap();
	assert!(uri.is_none());
	assert_eq!(manager.state(), BridgeState::Uninitialized);
}

#[tokio::test]
async fn events_from_a_superseded_attempt_are_ignored() {
	let (manager, store, _navigator) = setup();
	let first = FakeRelay::new("wr1qfirst");
	let second = FakeRelay::new("wr1qsecond");

	manager
		.init(Arc::clone(&first) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	manager
		.init(Arc::clone(&second) as Arc<dyn RelayClient>)
		.await
		.unwrap();

	// A login completing on the replaced attempt must not win.
	first.emit(RelayEvent::LoggedIn).await;
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(store.address().is_none());
	assert_eq!(manager.state(), BridgeState::Pairing);

	let mut states = manager.subscribe();
	second.emit(RelayEvent::LoggedIn).await;
	wait_for(&mut states, BridgeState::Connected).await;
	assert_eq!(store.address().as_deref(), Some("wr1qsecond"));
}

#[tokio::test]
async fn a_replaced_signer_handle_refuses_to_sign() {
	let (manager, store, _navigator) = setup();
	let first = FakeRelay::new("wr1qfirst");

	manager
		.init(Arc::clone(&first) as Arc<dyn RelayClient>)
		.await
		.unwrap();
	let mut states = manager.subscribe();
	first.emit(RelayEvent::LoggedIn).await;
	wait_for(&mut states, BridgeState::Connected).await;

	let stale = store.active_signer().unwrap();
	assert!(stale.init().await.unwrap());

	// A new attempt invalidates the old handle wholesale.
	let second = FakeRelay::new("wr1qsecond");
	manager
		.init(Arc::clone(&second) as Arc<dyn RelayClient>)
		.await
		.unwrap();

	assert!(!stale.init().await.unwrap());
	let tx = UnsignedTransaction {
		receiver: "wr1qdest".into(),
		value: "1".into(),
		data: String::new(),
		gas_limit: 50_000,
		gas_price: 1_000_000_000,
		chain_id: "T".into(),
		nonce: Some(0),
	};
	let err = stale
		.sign_transactions(&[tx], &SignOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, WalletError::SigningAborted(message) if message.contains("stale")));
}
