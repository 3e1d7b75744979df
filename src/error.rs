//! Error types for the relay pipeline.
//!
//! Every failure aborts the run; the variant tells which boundary gave up.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Browser binary or CDP connection could not be brought up.
	#[error("Failed to launch browser: {0}")]
	DriverInit(String),

	/// A page never reached the awaited state.
	#[error("Timed out after {timeout:?} waiting for {what}")]
	PageLoadTimeout { what: String, timeout: Duration },

	/// Polling finished without any element matching.
	#[error("No element matching {what} after {timeout:?}")]
	ElementNotFound { what: String, timeout: Duration },

	/// The WhatsApp send control never became clickable.
	#[error("Send button not clickable after {timeout:?} (is WhatsApp Web authenticated in this profile?)")]
	SendTimeout { timeout: Duration },

	/// Submitting credentials left us on the login page.
	#[error("Login failed: still at {url} after {timeout:?}")]
	LoginFailed { url: String, timeout: Duration },

	#[error("Invalid configuration: {0}")]
	Config(String),

	/// A CDP command failed outright.
	#[error("Browser command failed: {0}")]
	Browser(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
	fn from(e: chromiumoxide::error::CdpError) -> Self {
		Error::Browser(e.to_string())
	}
}
