pub mod login;
pub mod logout;
pub mod session;
pub mod sign;
pub mod status;

use anyhow::Result;

use crate::cli::{Cli, MethodArg};
use crate::config::{Config, SignerMethod};

/// Resolve the account API URL from CLI flag or config.
pub fn resolve_api(cli: &Cli, config: &Config) -> String {
	cli.api_url
		.clone()
		.unwrap_or_else(|| config.api_url(cli.network.as_str()).to_owned())
}

/// Resolve the login method from CLI flag or config, failing if neither
/// is set.
pub fn resolve_method(cli: &Cli, config: &Config) -> Result<SignerMethod> {
	match &cli.method {
		Some(arg) => Ok(method_from_arg(arg)),
		None => config.signer.method.ok_or_else(|| {
			anyhow::anyhow!(
				"No login method configured. Run: wallet-relay session set-method --method <method>"
			)
		}),
	}
}

/// Resolve the active address from CLI flag or config, failing if
/// neither is set.
pub fn resolve_address(cli: &Cli, config: &Config) -> Result<String> {
	cli.address
		.clone()
		.or_else(|| config.signer.address.clone())
		.ok_or_else(|| anyhow::anyhow!("No address configured. Run: wallet-relay login"))
}

pub fn method_from_arg(arg: &MethodArg) -> SignerMethod {
	match arg {
		MethodArg::Extension => SignerMethod::Extension,
		MethodArg::Webwallet => SignerMethod::Webwallet,
		MethodArg::Relay => SignerMethod::Relay,
	}
}

pub fn method_label(method: SignerMethod) -> &'static str {
	match method {
		SignerMethod::Extension => "extension",
		SignerMethod::Webwallet => "webwallet",
		SignerMethod::Relay => "relay",
	}
}
