use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::SignerMethod;
use crate::error::{is_user_cancellation, Result, WalletError};
use crate::navigate::Navigator;
use crate::rpc::AccountQuery;
use crate::session::{ExternalConfirmation, SessionStore};
use crate::signer::{SignOptions, SignOutcome, Signer};
use crate::tx::{assign_nonces, BatchStatus, TransactionBatch, UnsignedTransaction};

/// Query parameter carrying the session id on a reply URL.
pub const SIGN_SESSION_PARAM: &str = "signSession";

/// Where a batch currently sits in the signing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStep {
	Idle,
	NonceAssignment,
	Dispatching,
	Signed,
	Cancelled,
}

/// Build the URL a redirect-style wallet replies to:
/// `<origin><callback route>?signSession=<session id>`, plus any extra
/// caller-supplied parameters with their values percent-encoded.
pub fn build_reply_url(
	origin: &str,
	callback_route: &str,
	session_id: &str,
	extra: &[(&str, &str)],
) -> String {
	let mut url = format!("{origin}{callback_route}?{SIGN_SESSION_PARAM}={session_id}");
	for (key, value) in extra {
		url.push('&');
		url.push_str(key);
		url.push('=');
		url.push_str(&urlencoding::encode(value));
	}
	url
}

/// Drives a pending batch from the session store to a terminal state:
/// fetch the confirmed nonce, assign sequence numbers, dispatch to the
/// active signer, and commit the outcome.
pub struct SigningFlow {
	store: Arc<SessionStore>,
	accounts: Arc<dyn AccountQuery>,
	navigator: Arc<dyn Navigator>,
	origin: String,
	current_route: String,
	error: Mutex<Option<String>>,
}

impl SigningFlow {
	pub fn new(
		store: Arc<SessionStore>,
		accounts: Arc<dyn AccountQuery>,
		navigator: Arc<dyn Navigator>,
		origin: impl Into<String>,
		current_route: impl Into<String>,
	) -> Self {
		Self {
			store,
			accounts,
			navigator,
			origin: origin.into(),
			current_route: current_route.into(),
			error: Mutex::new(None),
		}
	}

	/// The last surfaced error message.  User-initiated cancellations
	/// never appear here.
	pub fn visible_error(&self) -> Option<String> {
		self.error.lock().unwrap().clone()
	}

	/// Run the state machine over the currently pending batch, if any.
	///
	/// Batch-level failures resolve the batch to `Cancelled` and return
	/// `Ok(Cancelled)`; only conditions the caller must fix (no active
	/// signer) come back as errors.
	pub async fn process_pending(&self) -> Result<SignStep> {
		let Some(batch) = self.store.pending_batch() else {
			return Ok(SignStep::Idle);
		};
		// Nothing to sign yet; not an error.
		if batch.session_id.is_empty() || batch.transactions.is_empty() {
			return Ok(SignStep::Idle);
		}

		let signer = match self.store.active_signer() {
			Ok(signer) => signer,
			Err(e) => {
				// Without a provider the batch can never resolve, so it
				// is not accepted at all.
				self.store.abort();
				return Err(e);
			}
		};
		let Some(method) = self.store.login_method() else {
			self.store.abort();
			return Err(WalletError::NoActiveSigner);
		};
		let Some(address) = self.store.address() else {
			// Login has not finished; leave the batch pending and let a
			// later pass pick it up.
			debug!(session_id = %batch.session_id, "no address yet, deferring batch");
			return Ok(SignStep::Idle);
		};

		// NonceAssignment: the confirmed nonce is fetched fresh for
		// every batch.
		let account = match self.accounts.get_account(&address).await {
			Ok(account) => account,
			Err(e) => {
				return self
					.cancel_batch(&signer, &batch.session_id, e.to_string())
					.await;
			}
		};
		let transactions = assign_nonces(account.nonce, &batch.transactions);
		debug!(
			session_id = %batch.session_id,
			first_nonce = account.nonce,
			count = transactions.len(),
			"nonces assigned"
		);

		match method {
			SignerMethod::Webwallet => self.dispatch_handoff(&signer, &batch, &transactions).await,
			_ => self.dispatch_in_band(&signer, &batch, &transactions).await,
		}
	}

	/// Extension and relay signers return signatures in-band.
	async fn dispatch_in_band(
		&self,
		signer: &Arc<dyn Signer>,
		batch: &TransactionBatch,
		transactions: &[UnsignedTransaction],
	) -> Result<SignStep> {
		match signer.init().await {
			Ok(true) => {}
			Ok(false) => {
				// A signer that is not ready can never resolve the
				// batch; cancel instead of leaving it stuck pending.
				return self
					.cancel_batch(
						signer,
						&batch.session_id,
						"signer is not available in this environment".into(),
					)
					.await;
			}
			Err(e) => {
				return self
					.cancel_batch(signer, &batch.session_id, error_message(e))
					.await;
			}
		}

		match signer.sign_transactions(transactions, &SignOptions::default()).await {
			Ok(SignOutcome::Signed(signed)) => {
				// Anything short of a full response is a failure for
				// the whole batch; nothing is committed partially.
				if signed.len() != transactions.len() {
					let message = WalletError::PartialSignature {
						expected: transactions.len(),
						signed: signed.len(),
					}
					.to_string();
					return self.cancel_batch(signer, &batch.session_id, message).await;
				}

				self.store
					.commit_signed(&batch.session_id, signed, BatchStatus::Signed)?;
				self.redirect_after_sign(batch);
				Ok(SignStep::Signed)
			}
			Ok(SignOutcome::Redirected) => {
				// An in-band signer that navigated away resolves like a
				// handoff: out of core, on the callback route.
				self.record_handoff(batch);
				Ok(SignStep::Dispatching)
			}
			Err(e) => {
				self.cancel_batch(signer, &batch.session_id, error_message(e))
					.await
			}
		}
	}

	/// The web wallet signs on its own pages; the batch stays
	/// unresolved here until the callback route is loaded.
	async fn dispatch_handoff(
		&self,
		signer: &Arc<dyn Signer>,
		batch: &TransactionBatch,
		transactions: &[UnsignedTransaction],
	) -> Result<SignStep> {
		let callback_route = self.effective_route(batch);
		let reply_url = build_reply_url(&self.origin, &callback_route, &batch.session_id, &[]);

		// Persist the handoff before navigating so the reloaded page
		// can correlate the redirect back to this batch.
		self.record_handoff(batch);

		let options = SignOptions {
			callback_url: Some(reply_url),
		};
		match signer.sign_transactions(transactions, &options).await {
			Ok(_) => Ok(SignStep::Dispatching),
			Err(e) => {
				self.cancel_batch(signer, &batch.session_id, error_message(e))
					.await
			}
		}
	}

	/// Explicit caller abort: clears the visible error and all pending
	/// signing state, then asks the signer to drop any open prompt.
	pub async fn abort(&self) {
		*self.error.lock().unwrap() = None;
		let signer = self.store.active_signer().ok();
		self.store.abort();
		if let Some(signer) = signer {
			if let Err(e) = signer.cancel_action().await {
				debug!(error = %e, "cancel_action after abort failed");
			}
		}
	}

	fn record_handoff(&self, batch: &TransactionBatch) {
		self.store.record_external(ExternalConfirmation {
			session_id: batch.session_id.clone(),
			callback_route: self.effective_route(batch),
		});
	}

	fn effective_route(&self, batch: &TransactionBatch) -> String {
		if batch.callback_route.is_empty() {
			self.current_route.clone()
		} else {
			batch.callback_route.clone()
		}
	}

	fn redirect_after_sign(&self, batch: &TransactionBatch) {
		let route = self.effective_route(batch);
		if !batch.redirect_after_sign || self.current_route.contains(&route) {
			return;
		}
		let url = format!("{}{}", self.origin, route);
		if let Err(e) = self.navigator.navigate_to(&url) {
			warn!(error = %e, "post-sign navigation failed");
		}
	}

	/// Resolve the batch to `Cancelled`.  The signer gets a chance to
	/// drop its pending prompt; the message becomes visible unless it
	/// is the user-cancellation sentinel.
	async fn cancel_batch(
		&self,
		signer: &Arc<dyn Signer>,
		session_id: &str,
		message: String,
	) -> Result<SignStep> {
		if let Err(e) = signer.cancel_action().await {
			debug!(error = %e, "cancel_action during batch cancel failed");
		}
		self.store
			.commit_signed(session_id, Vec::new(), BatchStatus::Cancelled)?;

		if is_user_cancellation(&message) {
			debug!(session_id, "batch cancelled by the user");
		} else {
			warn!(session_id, message = %message, "batch cancelled");
			*self.error.lock().unwrap() = Some(message);
		}
		Ok(SignStep::Cancelled)
	}
}

/// The message a wallet reported, without the taxonomy prefix, so the
/// cancellation sentinel survives intact.
fn error_message(err: WalletError) -> String {
	match err {
		WalletError::SigningAborted(message) | WalletError::Relay(message) => message,
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reply_url_carries_the_session_id() {
		let url = build_reply_url("http://localhost:3000", "/dashboard", "abc123", &[]);
		assert_eq!(url, "http://localhost:3000/dashboard?signSession=abc123");
	}

	#[test]
	fn reply_url_encodes_extra_params() {
		let url = build_reply_url(
			"http://localhost:3000",
			"/dashboard",
			"abc123",
			&[("status", "all good & done")],
		);
		assert!(url.ends_with("?signSession=abc123&status=all%20good%20%26%20done"));
	}

	#[test]
	fn error_message_unwraps_wallet_reported_text() {
		let aborted = WalletError::SigningAborted("Transaction cancelled".into());
		assert_eq!(error_message(aborted), "Transaction cancelled");

		let partial = WalletError::PartialSignature { expected: 2, signed: 1 };
		assert_eq!(
			error_message(partial),
			"signer returned 1 of 2 requested signatures"
		);
	}
}
