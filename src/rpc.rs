use anyhow::{anyhow, Result};
use serde::Deserialize;

/// On-chain account state as reported by the network API.  Only the
/// fields the signing flow reads; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
	pub address: String,
	pub nonce: u64,
	#[serde(default)]
	pub balance: String,
}

/// Source of the latest confirmed account nonce.  Fetched fresh for
/// every batch; results are never cached across batches.
#[async_trait::async_trait]
pub trait AccountQuery: Send + Sync {
	async fn get_account(&self, address: &str) -> Result<Account>;
}

/// Thin wrapper around the network's account API.
pub struct ApiClient {
	url: String,
	http: reqwest::Client,
}

impl ApiClient {
	pub fn new(url: &str) -> Self {
		Self {
			url: url.trim_end_matches('/').to_owned(),
			http: reqwest::Client::new(),
		}
	}
}

#[async_trait::async_trait]
impl AccountQuery for ApiClient {
	async fn get_account(&self, address: &str) -> Result<Account> {
		let url = format!("{}/accounts/{address}", self.url);
		let resp = self.http.get(&url).send().await?;

		if !resp.status().is_success() {
			return Err(anyhow!(
				"account query for {address} failed with status {}",
				resp.status()
			));
		}

		Ok(resp.json().await?)
	}
}
