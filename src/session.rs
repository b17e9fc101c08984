use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::config::SignerMethod;
use crate::error::{Result, WalletError};
use crate::signer::Signer;
use crate::tx::{BatchStatus, SignedBatch, SignedTransaction, TransactionBatch};

/// Marker recorded before a redirect-style signing handoff, so a
/// resuming process can correlate the reloaded page back to the batch
/// that triggered the navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalConfirmation {
	pub session_id: String,
	pub callback_route: String,
}

#[derive(Default)]
struct SessionInner {
	method: Option<SignerMethod>,
	address: Option<String>,
	login_signature: Option<String>,
	provider: Option<Arc<dyn Signer>>,
	handle_version: u64,
	pending: Option<TransactionBatch>,
	signed: HashMap<String, SignedBatch>,
	awaiting_external: Option<ExternalConfirmation>,
}

/// Shared session state for one wallet session: the active provider,
/// the logged-in address, and the pending/resolved transaction batches.
///
/// All writes go through one lock and apply whole: an update either
/// fully clears the session or fully records a batch result, never a
/// mix.  Subscribers observe writes in issue order through a
/// monotonically increasing revision counter.
pub struct SessionStore {
	inner: Mutex<SessionInner>,
	revision: watch::Sender<u64>,
}

impl SessionStore {
	pub fn new() -> Self {
		let (revision, _) = watch::channel(0);
		Self {
			inner: Mutex::new(SessionInner::default()),
			revision,
		}
	}

	/// Watch the store's revision counter.  Every committed write bumps
	/// it, so a reader that re-checks state on each change observes
	/// updates in the order they were issued.
	pub fn subscribe(&self) -> watch::Receiver<u64> {
		self.revision.subscribe()
	}

	pub fn revision(&self) -> u64 {
		*self.revision.borrow()
	}

	fn bump(&self) {
		self.revision.send_modify(|r| *r += 1);
	}

	// -- Login state --

	/// Record a completed login.  Applies method, address, and the
	/// optional login signature in one write.
	pub fn set_login(&self, method: SignerMethod, address: String, signature: Option<String>) {
		{
			let mut inner = self.inner.lock().unwrap();
			inner.method = Some(method);
			inner.address = Some(address);
			inner.login_signature = signature;
		}
		self.bump();
	}

	/// Record the chosen login method before the address is known
	/// (redirect-style logins learn the address on the callback route).
	pub fn set_login_method(&self, method: SignerMethod) {
		self.inner.lock().unwrap().method = Some(method);
		self.bump();
	}

	pub fn set_provider(&self, provider: Arc<dyn Signer>) {
		self.inner.lock().unwrap().provider = Some(provider);
		self.bump();
	}

	/// The provider for the active login, or `NoActiveSigner`.
	pub fn active_signer(&self) -> Result<Arc<dyn Signer>> {
		self.inner
			.lock()
			.unwrap()
			.provider
			.clone()
			.ok_or(WalletError::NoActiveSigner)
	}

	pub fn login_method(&self) -> Option<SignerMethod> {
		self.inner.lock().unwrap().method
	}

	pub fn address(&self) -> Option<String> {
		self.inner.lock().unwrap().address.clone()
	}

	pub fn login_signature(&self) -> Option<String> {
		self.inner.lock().unwrap().login_signature.clone()
	}

	/// Tear the session down: login identity, provider handle, and any
	/// unresolved signing state go in a single write.  The handle
	/// version advances so stale signers reject further use.
	pub fn clear_login(&self) {
		{
			let mut inner = self.inner.lock().unwrap();
			let version = inner.handle_version + 1;
			*inner = SessionInner {
				handle_version: version,
				..SessionInner::default()
			};
		}
		self.bump();
	}

	// -- Signer handle versioning --

	/// Claim a fresh handle version, invalidating every handle stamped
	/// with an earlier one.
	pub fn next_handle_version(&self) -> u64 {
		let version = {
			let mut inner = self.inner.lock().unwrap();
			inner.handle_version += 1;
			inner.handle_version
		};
		self.bump();
		version
	}

	pub fn handle_version(&self) -> u64 {
		self.inner.lock().unwrap().handle_version
	}

	// -- Batches --

	/// Accept a batch for signing.  At most one batch may be unresolved
	/// at a time, and a session id that already reached a terminal state
	/// cannot be reused.
	pub fn submit_batch(&self, batch: TransactionBatch) -> Result<()> {
		{
			let mut inner = self.inner.lock().unwrap();
			if let Some(pending) = &inner.pending {
				return Err(WalletError::BatchInFlight(pending.session_id.clone()));
			}
			if let Some(external) = &inner.awaiting_external {
				return Err(WalletError::BatchInFlight(external.session_id.clone()));
			}
			if inner.signed.contains_key(&batch.session_id) {
				return Err(WalletError::SigningAborted(format!(
					"batch {} was already resolved",
					batch.session_id
				)));
			}
			inner.pending = Some(batch);
		}
		self.bump();
		Ok(())
	}

	pub fn pending_batch(&self) -> Option<TransactionBatch> {
		self.inner.lock().unwrap().pending.clone()
	}

	/// Record that a batch was handed off to an external confirmation
	/// flow.  The batch stays unresolved until the callback lands.
	pub fn record_external(&self, confirmation: ExternalConfirmation) {
		self.inner.lock().unwrap().awaiting_external = Some(confirmation);
		self.bump();
	}

	pub fn awaiting_external(&self) -> Option<ExternalConfirmation> {
		self.inner.lock().unwrap().awaiting_external.clone()
	}

	/// Resolve a batch.  The terminal record is written exactly once;
	/// the pending slot and any handoff marker for the same session id
	/// clear in the same write.
	pub fn commit_signed(
		&self,
		session_id: &str,
		transactions: Vec<SignedTransaction>,
		status: BatchStatus,
	) -> Result<()> {
		{
			let mut inner = self.inner.lock().unwrap();
			if inner.signed.contains_key(session_id) {
				return Err(WalletError::SigningAborted(format!(
					"batch {session_id} was already resolved"
				)));
			}
			inner.signed.insert(
				session_id.to_owned(),
				SignedBatch {
					session_id: session_id.to_owned(),
					transactions,
					status,
				},
			);
			if inner.pending.as_ref().is_some_and(|b| b.session_id == session_id) {
				inner.pending = None;
			}
			if inner
				.awaiting_external
				.as_ref()
				.is_some_and(|e| e.session_id == session_id)
			{
				inner.awaiting_external = None;
			}
		}
		debug!(session_id, ?status, "batch resolved");
		self.bump();
		Ok(())
	}

	pub fn signed_batch(&self, session_id: &str) -> Option<SignedBatch> {
		self.inner.lock().unwrap().signed.get(session_id).cloned()
	}

	/// Drop all unresolved signing state.  Used by the explicit abort
	/// path; the login itself stays intact.
	pub fn abort(&self) {
		{
			let mut inner = self.inner.lock().unwrap();
			inner.pending = None;
			inner.awaiting_external = None;
		}
		self.bump();
	}
}

impl Default for SessionStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tx::UnsignedTransaction;

	fn batch(session_id: &str) -> TransactionBatch {
		TransactionBatch {
			session_id: session_id.into(),
			transactions: vec![UnsignedTransaction {
				receiver: "wr1qdest".into(),
				value: "1".into(),
				data: String::new(),
				gas_limit: 50_000,
				gas_price: 1_000_000_000,
				chain_id: "T".into(),
				nonce: None,
			}],
			callback_route: "/dashboard".into(),
			redirect_after_sign: false,
		}
	}

	#[test]
	fn second_batch_is_rejected_while_one_is_pending() {
		let store = SessionStore::new();
		store.submit_batch(batch("s1")).unwrap();

		let err = store.submit_batch(batch("s2")).unwrap_err();
		assert!(matches!(err, WalletError::BatchInFlight(id) if id == "s1"));
	}

	#[test]
	fn commit_clears_pending_and_is_write_once() {
		let store = SessionStore::new();
		store.submit_batch(batch("s1")).unwrap();
		store
			.commit_signed("s1", Vec::new(), BatchStatus::Cancelled)
			.unwrap();

		assert!(store.pending_batch().is_none());
		assert_eq!(store.signed_batch("s1").unwrap().status, BatchStatus::Cancelled);

		// Terminal state is written exactly once.
		assert!(store
			.commit_signed("s1", Vec::new(), BatchStatus::Signed)
			.is_err());
		// And the session id cannot be resubmitted.
		assert!(store.submit_batch(batch("s1")).is_err());
	}

	#[test]
	fn abort_unblocks_the_next_batch() {
		let store = SessionStore::new();
		store.submit_batch(batch("s1")).unwrap();
		store.abort();
		assert!(store.pending_batch().is_none());
		store.submit_batch(batch("s2")).unwrap();
	}

	#[test]
	fn external_handoff_counts_as_in_flight() {
		let store = SessionStore::new();
		store.submit_batch(batch("s1")).unwrap();
		store.record_external(ExternalConfirmation {
			session_id: "s1".into(),
			callback_route: "/dashboard".into(),
		});
		store.commit_signed("s1", Vec::new(), BatchStatus::Signed).unwrap();
		// Commit cleared the handoff marker along with the pending slot.
		assert!(store.awaiting_external().is_none());
		store.submit_batch(batch("s2")).unwrap();
	}

	#[test]
	fn revision_increases_with_every_write() {
		let store = SessionStore::new();
		let before = store.revision();
		store.set_login(SignerMethod::Extension, "wr1qtest".into(), None);
		store.submit_batch(batch("s1")).unwrap();
		store.abort();
		assert_eq!(store.revision(), before + 3);
	}

	#[test]
	fn clear_login_invalidates_handles_and_signing_state() {
		let store = SessionStore::new();
		let version = store.next_handle_version();
		store.set_login(SignerMethod::Relay, "wr1qtest".into(), Some("sig".into()));
		store.submit_batch(batch("s1")).unwrap();

		store.clear_login();

		assert!(store.address().is_none());
		assert!(store.login_method().is_none());
		assert!(store.pending_batch().is_none());
		assert!(store.active_signer().is_err());
		assert!(store.handle_version() > version);
	}
}
