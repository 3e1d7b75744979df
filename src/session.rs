//! Chromium session: launching, driving and tearing down the browser.

use std::{path::PathBuf, time::Duration};

use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use v_utils::{elog, log};

use crate::{
	config::AppConfig,
	driver::{Driver, Locator, Node, Teardown},
	error::{Error, Result},
};

/// Flags every session is launched with, on top of chromiumoxide's defaults.
const LAUNCH_ARGS: [&str; 4] = ["--disable-notifications", "--start-maximized", "--disable-gpu", "--disable-dev-shm-usage"];

#[derive(Clone, Debug)]
pub struct SessionOptions {
	pub headless: bool,
	/// Persistent user-data dir (keeps the WhatsApp Web login between runs)
	pub profile_dir: Option<PathBuf>,
	pub executable: Option<PathBuf>,
	/// Per-command CDP timeout
	pub request_timeout: Duration,
}

impl From<&AppConfig> for SessionOptions {
	fn from(config: &AppConfig) -> Self {
		Self {
			headless: !config.visible,
			profile_dir: config.profile_dir.as_ref().map(PathBuf::from),
			executable: config.browser_executable.as_ref().map(PathBuf::from),
			request_timeout: Duration::from_secs(config.long_wait_timeout_secs.max(30)),
		}
	}
}

/// One browser process with one page.
///
/// Call [`Teardown::stop`] when done. If that is skipped (panic, early return),
/// dropping the session aborts the event task and chromiumoxide kills the
/// browser process on drop.
pub struct Session {
	browser: Option<Browser>,
	handler: Option<JoinHandle<()>>,
	page: Page,
}

impl Session {
	pub async fn start(options: &SessionOptions) -> Result<Self> {
		let mut builder = BrowserConfig::builder().no_sandbox().request_timeout(options.request_timeout);
		for arg in LAUNCH_ARGS {
			builder = builder.arg(arg);
		}
		if !options.headless {
			builder = builder.with_head();
		}
		if let Some(dir) = &options.profile_dir {
			builder = builder.user_data_dir(dir);
		}
		if let Some(exe) = &options.executable {
			builder = builder.chrome_executable(exe);
		}
		let config = builder.build().map_err(|e| Error::DriverInit(format!("invalid browser config: {e}")))?;

		let (browser, mut handler) = Browser::launch(config).await.map_err(|e| Error::DriverInit(e.to_string()))?;

		// CDP events must be drained or the browser hangs; they are mostly noise.
		let handler = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if let Err(e) = event {
					tracing::debug!("CDP handler: {e}");
				}
			}
		});

		let page = browser.new_page("about:blank").await.map_err(|e| Error::DriverInit(format!("failed to open a page: {e}")))?;

		log!("Browser started (headless: {}).", options.headless);
		Ok(Self {
			browser: Some(browser),
			handler: Some(handler),
			page,
		})
	}

	async fn find_all(&self, locator: &Locator) -> Vec<Element> {
		let found = match locator {
			Locator::XPath(xpath) => self.page.find_xpaths(xpath.as_str()).await,
			other => self.page.find_elements(other.as_css().unwrap_or_default()).await,
		};
		// CDP reports "no node" as an error on some lookups; both mean not there yet.
		found.unwrap_or_else(|e| {
			tracing::trace!(%locator, "lookup failed: {e}");
			Vec::new()
		})
	}

	async fn first(&self, locator: &Locator) -> Result<Element> {
		self.find_all(locator).await.into_iter().next().ok_or_else(|| Error::ElementNotFound {
			what: locator.to_string(),
			timeout: Duration::ZERO,
		})
	}

	async fn child_elements(&self, container: &Locator, child_css: &str) -> Option<Vec<Element>> {
		let container = self.find_all(container).await.into_iter().next()?;
		Some(container.find_elements(child_css).await.unwrap_or_default())
	}
}

impl Teardown for Session {
	/// Close the browser and wait for the process to exit.
	async fn stop(&mut self) {
		let Some(mut browser) = self.browser.take() else {
			return;
		};
		if let Err(e) = browser.close().await {
			elog!("Failed to close browser: {}", e);
		}
		if let Err(e) = browser.wait().await {
			tracing::debug!("waiting for browser exit: {e}");
		}
		if let Some(handler) = self.handler.take() {
			handler.abort();
		}
		log!("Browser closed.");
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		if let Some(handler) = self.handler.take() {
			handler.abort();
		}
	}
}

async fn href_of(element: &Element) -> Option<String> {
	if let Ok(Some(href)) = element.attribute("href").await {
		return Some(href);
	}
	let link = element.find_element("a").await.ok()?;
	link.attribute("href").await.ok().flatten()
}

impl Driver for Session {
	async fn goto(&self, url: &str) -> Result<()> {
		self.page.goto(url).await?;
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.page.url().await?.unwrap_or_default())
	}

	async fn texts(&self, locator: &Locator) -> Result<Vec<String>> {
		let mut texts = Vec::new();
		for element in self.find_all(locator).await {
			// Nodes can detach between lookup and read while the page re-renders.
			if let Ok(text) = element.inner_text().await {
				texts.push(text.unwrap_or_default());
			}
		}
		Ok(texts)
	}

	async fn children(&self, container: &Locator, child_css: &str) -> Result<Option<Vec<Node>>> {
		let Some(elements) = self.child_elements(container, child_css).await else {
			return Ok(None);
		};
		let mut nodes = Vec::with_capacity(elements.len());
		for element in &elements {
			let text = element.inner_text().await.ok().flatten().unwrap_or_default();
			nodes.push(Node::new(text, href_of(element).await));
		}
		Ok(Some(nodes))
	}

	async fn interactable(&self, locator: &Locator) -> Result<bool> {
		let script = format!(
			r#"
			(function() {{
				const el = {};
				if (!el) return false;
				const rect = el.getBoundingClientRect();
				const style = window.getComputedStyle(el);
				return !el.disabled && rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.pointerEvents !== 'none';
			}})()
			"#,
			locator.first_node_js()
		);
		let result = self.page.evaluate(script).await?;
		Ok(result.value().and_then(|v| v.as_bool()).unwrap_or(false))
	}

	async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
		let element = self.first(locator).await?;
		element.click().await?;
		element.type_str(text).await?;
		Ok(())
	}

	async fn click(&self, locator: &Locator) -> Result<()> {
		self.first(locator).await?.click().await?;
		Ok(())
	}

	async fn click_child(&self, container: &Locator, child_css: &str, index: usize) -> Result<()> {
		let element = self
			.child_elements(container, child_css)
			.await
			.and_then(|children| children.into_iter().nth(index))
			.ok_or_else(|| Error::ElementNotFound {
				what: format!("{child_css}[{index}] inside {container}"),
				timeout: Duration::ZERO,
			})?;
		element.click().await?;
		Ok(())
	}

	async fn scroll_to_bottom(&self) -> Result<()> {
		self.page.evaluate("window.scrollTo(0, document.body.scrollHeight)").await?;
		Ok(())
	}

	async fn page_html(&self) -> Result<String> {
		Ok(self.page.content().await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn options_follow_config() {
		let config = AppConfig {
			visible: true,
			profile_dir: Some("/tmp/relay-profile".into()),
			long_wait_timeout_secs: 45,
			..Default::default()
		};
		let options = SessionOptions::from(&config);
		assert!(!options.headless);
		assert_eq!(options.profile_dir, Some(PathBuf::from("/tmp/relay-profile")));
		assert_eq!(options.executable, None);
		assert_eq!(options.request_timeout, Duration::from_secs(45));
	}

	#[test]
	fn headless_by_default() {
		let options = SessionOptions::from(&AppConfig::default());
		assert!(options.headless);
		assert_eq!(options.request_timeout, Duration::from_secs(30));
	}
}
