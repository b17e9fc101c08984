use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{method_label, resolve_api};
use crate::config::Config;

pub fn run(cli: &Cli) -> Result<()> {
	let config = Config::load()?;

	let method = config
		.signer
		.method
		.map(method_label)
		.unwrap_or("not set");

	let address = config
		.signer
		.address
		.as_deref()
		.unwrap_or("not connected");

	let relay = config
		.relay
		.endpoint
		.as_deref()
		.unwrap_or("not configured");

	println!("Session");
	println!("  Method:   {method}");
	println!("  Address:  {address}");
	println!("  Network:  {}", cli.network.as_str());
	println!("  API:      {}", resolve_api(cli, &config));
	println!("  Relay:    {relay}");
	println!("  Origin:   {}", config.routes.origin);
	println!("  Callback: {}", config.routes.callback_route);
	println!("  Logout:   {}", config.routes.logout_route);
	Ok(())
}
