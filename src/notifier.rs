//! Relaying the message through WhatsApp Web in the same browser session.

use v_utils::log;

use crate::{
	config::AppConfig,
	driver::{Driver, wait_until},
	error::{Error, Result},
};

/// `{whatsapp_url}/send?phone=<id>&text=<message>`, with the message percent-encoded.
pub fn compose_url(whatsapp_url: &str, destination_id: &str, message: &str) -> String {
	format!(
		"{}/send?phone={}&text={}",
		whatsapp_url.trim_end_matches('/'),
		urlencoding::encode(destination_id),
		urlencoding::encode(message)
	)
}

/// Open the pre-filled composer and press send.
///
/// Needs a profile that already scanned the WhatsApp QR code; otherwise the
/// send button never shows up and this fails with [`Error::SendTimeout`].
/// A click is all that is confirmed, never delivery.
pub async fn send<D: Driver>(driver: &D, config: &AppConfig, destination_id: &str, message: &str) -> Result<()> {
	let waits = config.waits();
	let url = compose_url(&config.whatsapp_url, destination_id, message);
	tracing::debug!(%url, "opening composer");
	driver.goto(&url).await?;

	// WhatsApp Web boots slowly; give it the long wait.
	let button = &config.send_button();
	wait_until(waits.long_timeout, waits.poll_interval, move || async move { Ok(driver.interactable(button).await?.then_some(())) })
		.await?
		.ok_or(Error::SendTimeout { timeout: waits.long_timeout })?;
	driver.click(button).await?;

	// The button is swapped for the mic icon once the message leaves the composer.
	let settled = wait_until(waits.timeout, waits.poll_interval, move || async move { Ok(driver.texts(button).await?.is_empty().then_some(())) }).await?;
	if settled.is_none() {
		tracing::warn!(%button, "send button still present after clicking; the message may not have left");
	}

	log!("Message sent to {}: {}", destination_id, message);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		driver::Locator,
		fixture::{FixtureDriver, FixtureElement, FixturePage},
	};

	#[test]
	fn encodes_message_into_compose_url() {
		let url = compose_url("https://web.whatsapp.com/", "5511999999999", "Hoje temos aula de DevOps — tema: CI/CD");
		assert_eq!(
			url,
			"https://web.whatsapp.com/send?phone=5511999999999&text=Hoje%20temos%20aula%20de%20DevOps%20%E2%80%94%20tema%3A%20CI%2FCD"
		);
	}

	#[tokio::test(start_paused = true)]
	async fn unauthenticated_session_times_out() {
		let driver = FixtureDriver::new().page("https://web.whatsapp.com", FixturePage::default().with("div.landing-title", FixtureElement::text("Use WhatsApp on your computer")));
		let err = send(&driver, &AppConfig::default(), "5511999999999", "oi").await.unwrap_err();
		assert!(matches!(err, Error::SendTimeout { .. }), "{err}");
		assert!(driver.clicks().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn disabled_button_is_never_clicked() {
		let driver = FixtureDriver::new().page(
			"https://web.whatsapp.com/send",
			FixturePage::default().with("//button[@aria-label='Enviar']", FixtureElement::text("").disabled()),
		);
		let err = send(&driver, &AppConfig::default(), "5511999999999", "oi").await.unwrap_err();
		assert!(matches!(err, Error::SendTimeout { .. }), "{err}");
		assert!(driver.clicks().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn clicks_send_once() {
		let driver = FixtureDriver::new().page(
			"https://web.whatsapp.com/send",
			FixturePage::default().with("//button[@aria-label='Enviar']", FixtureElement::text("").navigates_to("https://web.whatsapp.com/")),
		);
		send(&driver, &AppConfig::default(), "5511999999999", "oi").await.unwrap();
		assert_eq!(driver.clicks(), vec![Locator::from("//button[@aria-label='Enviar']")]);
	}
}
