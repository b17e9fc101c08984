use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// -- Transactions --

/// A transaction as prepared by the caller, before any wallet has seen
/// it.  The nonce is absent until the signing flow assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub receiver: String,
	pub value: String,
	#[serde(default)]
	pub data: String,
	pub gas_limit: u64,
	pub gas_price: u64,
	pub chain_id: String,
	#[serde(default)]
	pub nonce: Option<u64>,
}

/// A transaction as returned by a wallet, normalized to the same field
/// layout plus the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
	#[serde(flatten)]
	pub transaction: UnsignedTransaction,
	pub signature: String,
}

// -- Batches --

/// Terminal status of a batch.  Written exactly once per session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
	Signed,
	Cancelled,
}

/// A batch of transactions awaiting signature.  Immutable once created;
/// a retry is a new batch with a new session id.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBatch {
	pub session_id: String,
	pub transactions: Vec<UnsignedTransaction>,
	pub callback_route: String,
	pub redirect_after_sign: bool,
}

/// The resolved form of a batch: signed transactions in the original
/// order, or an empty list when the batch was cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedBatch {
	pub session_id: String,
	pub transactions: Vec<SignedTransaction>,
	pub status: BatchStatus,
}

// -- Nonce assignment --

/// Assign sequential nonces starting from the latest confirmed account
/// nonce: `tx[i].nonce = latest + i`, in the batch's declared order.
pub fn assign_nonces(
	latest_nonce: u64,
	transactions: &[UnsignedTransaction],
) -> Vec<UnsignedTransaction> {
	transactions
		.iter()
		.enumerate()
		.map(|(i, tx)| {
			let mut tx = tx.clone();
			tx.nonce = Some(latest_nonce + i as u64);
			tx
		})
		.collect()
}

// -- Session IDs --

/// Compute a deterministic signing-session ID from the signer's address,
/// a unix timestamp, and a random nonce.  Result is a 64-character hex
/// string.
pub fn compute_session_id(address: &str, timestamp_secs: i64, nonce: &str) -> String {
	let mut h = Sha256::new();
	h.update(address.as_bytes());
	h.update(timestamp_secs.to_le_bytes());
	h.update(nonce.as_bytes());
	hex::encode(h.finalize())
}

/// Generate a fresh session ID for a new batch.
pub fn new_session_id(address: &str) -> String {
	let timestamp = chrono::Utc::now().timestamp();
	let nonce = hex::encode(rand::random::<[u8; 16]>());
	compute_session_id(address, timestamp, &nonce)
}
