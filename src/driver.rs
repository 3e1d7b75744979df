//! The automation boundary: how elements are located, what can be done to them,
//! and the bounded polling every step uses instead of fixed sleeps.

use std::{fmt, future::Future, str::FromStr, time::Duration};

use derive_new::new;
use tokio::time::Instant;

use crate::error::Result;

/// Element locator strategy.
///
/// String form: `id:username`, `xpath://ul[@data-for='cmlist']`, `css:div.course-content`.
/// Without a prefix, anything starting with `/` or `(` is XPath and the rest is CSS.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Locator {
	Id(String),
	Css(String),
	XPath(String),
}

impl Locator {
	/// CSS form of the locator, if it has one.
	pub fn as_css(&self) -> Option<String> {
		match self {
			Locator::Id(id) => Some(format!(r#"[id="{}"]"#, id.replace('"', "\\\""))),
			Locator::Css(css) => Some(css.clone()),
			Locator::XPath(_) => None,
		}
	}

	/// JS expression evaluating to the first matching node, or `null`.
	pub fn first_node_js(&self) -> String {
		match self {
			Locator::XPath(xpath) => format!(
				"document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
				js_string(xpath)
			),
			other => format!("document.querySelector({})", js_string(&other.as_css().unwrap_or_default())),
		}
	}
}

impl FromStr for Locator {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		let s = s.trim();
		Ok(if let Some(id) = s.strip_prefix("id:") {
			Locator::Id(id.to_string())
		} else if let Some(xpath) = s.strip_prefix("xpath:") {
			Locator::XPath(xpath.to_string())
		} else if let Some(css) = s.strip_prefix("css:") {
			Locator::Css(css.to_string())
		} else if s.starts_with('/') || s.starts_with('(') {
			Locator::XPath(s.to_string())
		} else {
			Locator::Css(s.to_string())
		})
	}
}

impl From<&str> for Locator {
	fn from(s: &str) -> Self {
		match s.parse() {
			Ok(locator) => locator,
			Err(never) => match never {},
		}
	}
}

impl fmt::Display for Locator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Locator::Id(id) => write!(f, "id:{id}"),
			Locator::Css(css) => write!(f, "css:{css}"),
			Locator::XPath(xpath) => write!(f, "xpath:{xpath}"),
		}
	}
}

/// Quote a string as a JS literal.
pub fn js_string(s: &str) -> String {
	serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// A child element read out of a container, in DOM order.
#[derive(Clone, Debug, Default, Eq, PartialEq, new)]
pub struct Node {
	pub text: String,
	/// Own `href`, or that of the first `<a>` inside it.
	pub href: Option<String>,
}

/// What the pipeline needs from a browser.
///
/// Lookups return empty results rather than errors when nothing matches; only a
/// failing browser command is an `Err`. Waiting is layered on top with [`wait_until`].
#[allow(async_fn_in_trait)]
pub trait Driver {
	async fn goto(&self, url: &str) -> Result<()>;

	async fn current_url(&self) -> Result<String>;

	/// Text of every element matching `locator`, in DOM order.
	async fn texts(&self, locator: &Locator) -> Result<Vec<String>>;

	/// Children of the first `container` match selected by `child_css`.
	/// `None` when the container itself is absent.
	async fn children(&self, container: &Locator, child_css: &str) -> Result<Option<Vec<Node>>>;

	/// First match exists, is rendered and is not disabled.
	async fn interactable(&self, locator: &Locator) -> Result<bool>;

	async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

	async fn click(&self, locator: &Locator) -> Result<()>;

	async fn click_child(&self, container: &Locator, child_css: &str, index: usize) -> Result<()>;

	async fn scroll_to_bottom(&self) -> Result<()>;

	async fn page_html(&self) -> Result<String>;
}

/// A [`Driver`] that holds a browser and must hand it back.
#[allow(async_fn_in_trait)]
pub trait Teardown: Driver {
	/// Release the browser. Calling it again does nothing.
	async fn stop(&mut self);
}

/// Timing shared by every wait of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, new)]
pub struct Waits {
	pub timeout: Duration,
	pub long_timeout: Duration,
	pub poll_interval: Duration,
}

/// Poll `probe` until it yields `Some`, or until `timeout` elapses.
///
/// The probe runs at least once, even with a zero timeout. Errors from the probe end the wait.
pub async fn wait_until<T, F, Fut>(timeout: Duration, poll_interval: Duration, mut probe: F) -> Result<Option<T>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Option<T>>>, {
	let deadline = Instant::now() + timeout;
	let mut attempts = 0u32;
	loop {
		attempts += 1;
		if let Some(value) = probe().await? {
			tracing::debug!(attempts, "wait satisfied");
			return Ok(Some(value));
		}
		let now = Instant::now();
		if now >= deadline {
			tracing::debug!(attempts, ?timeout, "wait timed out");
			return Ok(None);
		}
		tokio::time::sleep(poll_interval.min(deadline - now)).await;
	}
}
