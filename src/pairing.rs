use anyhow::Result;

/// What the login surface should show for the current pairing state.
#[derive(Debug, Clone, PartialEq)]
pub enum PairingCode {
	/// The session manager has not produced a pairing URI yet.
	Loading,
	/// Scannable code plus a tappable deep link for the same URI.
	Ready { deep_link: String, qr: String },
}

/// Build the wallet deep link:
/// `<base>?session=<percent-encoded URI>[&token=<opaque token>]`.
pub fn build_deep_link(base: &str, pairing_uri: &str, token: Option<&str>) -> String {
	let mut link = format!("{base}?session={}", urlencoding::encode(pairing_uri));
	if let Some(token) = token {
		link.push_str("&token=");
		link.push_str(token);
	}
	link
}

/// Render a pairing URI as a terminal QR code.
pub fn render_qr(pairing_uri: &str) -> Result<String> {
	let code = qrcode::QrCode::new(pairing_uri)?;
	let rendered = code
		.render::<char>()
		.quiet_zone(false)
		.module_dimensions(2, 1)
		.build();
	Ok(rendered)
}

/// Derive the renderable pairing code for the current session state.
/// Pure: recompute on every URI change, never reuse a stale code.  An
/// empty URI means pairing has not started; that is a loading state,
/// not an error.
pub fn pairing_code(
	deep_link_base: &str,
	pairing_uri: &str,
	token: Option<&str>,
) -> Result<PairingCode> {
	if pairing_uri.is_empty() {
		return Ok(PairingCode::Loading);
	}

	Ok(PairingCode::Ready {
		deep_link: build_deep_link(deep_link_base, pairing_uri, token),
		qr: render_qr(pairing_uri)?,
	})
}
