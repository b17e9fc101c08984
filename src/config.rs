use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub network: NetworkConfig,
	pub relay: RelayConfig,
	pub routes: RouteConfig,
	pub signer: SignerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub default: String,
	pub testnet_api: String,
	pub mainnet_api: String,
}

/// Relay bridge settings.  An absent endpoint means bridge login is not
/// configured for this deployment; the session manager stays idle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
	pub endpoint: Option<String>,
	pub deep_link_base: String,
	pub heartbeat_secs: u64,
}

/// Where the wallet sends the user back after login, signing, and logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
	pub origin: String,
	pub callback_route: String,
	pub logout_route: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
	pub method: Option<SignerMethod>,
	pub address: Option<String>,
	pub extension_host: String,
	pub webwallet_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerMethod {
	Extension,
	Webwallet,
	Relay,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			network: NetworkConfig {
				default: "testnet".into(),
				testnet_api: "https://testnet-api.chaingate.dev".into(),
				mainnet_api: "https://api.chaingate.dev".into(),
			},
			relay: RelayConfig {
				endpoint: None,
				deep_link_base: "https://m.chaingate.dev/connect".into(),
				heartbeat_secs: 15,
			},
			routes: RouteConfig {
				origin: "http://localhost:3000".into(),
				callback_route: "/dashboard".into(),
				logout_route: "/unlock".into(),
			},
			signer: SignerConfig {
				method: None,
				address: None,
				extension_host: "http://127.0.0.1:7391".into(),
				webwallet_url: "https://wallet.chaingate.dev".into(),
			},
		}
	}
}

impl Config {
	/// Directory where CLI state is stored (~/.wallet-relay/).
	pub fn dir() -> PathBuf {
		dirs::home_dir()
			.expect("could not determine home directory")
			.join(".wallet-relay")
	}

	/// Path to the config file.
	pub fn path() -> PathBuf {
		Self::dir().join("config.toml")
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> anyhow::Result<Self> {
		let path = Self::path();
		if path.exists() {
			let content = std::fs::read_to_string(&path)?;
			Ok(toml::from_str(&content)?)
		} else {
			Ok(Self::default())
		}
	}

	/// Persist the current config to disk, creating the directory if needed.
	pub fn save(&self) -> anyhow::Result<()> {
		let path = Self::path();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, toml::to_string_pretty(self)?)?;
		Ok(())
	}

	/// Return the account API URL for the given network name.
	pub fn api_url(&self, network: &str) -> &str {
		match network {
			"mainnet" => &self.network.mainnet_api,
			_ => &self.network.testnet_api,
		}
	}
}
