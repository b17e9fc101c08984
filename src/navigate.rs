use anyhow::Result;

/// Full-page navigation as seen by the wallet flows: opening the web
/// wallet for a redirect-style signing handoff, and landing the user on
/// the callback or logout route afterwards.
pub trait Navigator: Send + Sync {
	fn navigate_to(&self, url: &str) -> Result<()>;
}

/// Opens URLs with the operating system's default handler.
pub struct SystemNavigator;

impl Navigator for SystemNavigator {
	fn navigate_to(&self, url: &str) -> Result<()> {
		opener::open(url)?;
		Ok(())
	}
}
