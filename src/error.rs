use thiserror::Error;

/// A specialized result type for wallet and signing operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Error kinds surfaced by the session and signing flows.  Transport
/// failures are converted into one of these at the boundary where they
/// occur; nothing else propagates out of the flows.
#[derive(Debug, Error)]
pub enum WalletError {
	/// The address was requested before a login completed.
	#[error("no address available: login has not completed")]
	AddressUnavailable,

	/// Signing was attempted with no provider in the session.
	#[error("no active signer: log in with an extension, web wallet, or relay wallet first")]
	NoActiveSigner,

	/// Nonce fetch or the signer call failed; the batch is cancelled.
	#[error("signing aborted: {0}")]
	SigningAborted(String),

	/// The relay heartbeat failed; the session is being logged out.
	#[error("bridge connection lost")]
	ConnectionLost,

	/// The signer returned fewer signatures than requested.
	#[error("signer returned {signed} of {expected} requested signatures")]
	PartialSignature { expected: usize, signed: usize },

	/// A batch for this session has not reached a terminal state yet.
	#[error("batch {0} is still awaiting signatures")]
	BatchInFlight(String),

	/// Transport-level failure talking to the relay or a wallet host.
	#[error("relay error: {0}")]
	Relay(String),
}

/// The exact message wallets report when the user declines to sign.
/// Recognized cancellations are user actions, not failures, and never
/// populate the visible error.
pub const CANCELLATION_SENTINEL: &str = "Transaction cancelled";

/// Whether an error message is the user-cancellation sentinel.
pub fn is_user_cancellation(message: &str) -> bool {
	message == CANCELLATION_SENTINEL
}
