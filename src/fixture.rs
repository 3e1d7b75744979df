//! In-memory [`Driver`] serving fixed DOM fixtures, for tests. Behind the `fixture` feature.
//!
//! Pages are keyed by URL; the page whose key is the longest prefix of the
//! current URL is the one being "rendered". Clicking an element can navigate.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
	driver::{Driver, Locator, Node, Teardown},
	error::{Error, Result},
};

#[derive(Clone, Debug)]
pub struct FixtureElement {
	pub text: String,
	pub href: Option<String>,
	pub interactable: bool,
	/// URL loaded when this element is clicked
	pub navigates_to: Option<String>,
}

impl FixtureElement {
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			href: None,
			interactable: true,
			navigates_to: None,
		}
	}

	pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
		let href = href.into();
		Self {
			navigates_to: Some(href.clone()),
			href: Some(href),
			..Self::text(text)
		}
	}

	pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
		self.navigates_to = Some(url.into());
		self
	}

	pub fn disabled(mut self) -> Self {
		self.interactable = false;
		self
	}
}

#[derive(Clone, Debug, Default)]
pub struct FixturePage {
	elements: HashMap<Locator, Vec<FixtureElement>>,
	children: HashMap<(Locator, String), Vec<FixtureElement>>,
}

impl FixturePage {
	pub fn with(mut self, locator: impl Into<Locator>, element: FixtureElement) -> Self {
		self.elements.entry(locator.into()).or_default().push(element);
		self
	}

	/// Register `items` as the `child_css` children of `container`; the container itself becomes present.
	pub fn with_children(mut self, container: impl Into<Locator>, child_css: &str, items: Vec<FixtureElement>) -> Self {
		let container = container.into();
		self.elements.entry(container.clone()).or_insert_with(|| vec![FixtureElement::text("")]);
		self.children.insert((container, child_css.to_string()), items);
		self
	}
}

/// Something the driver was asked to do, in call order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
	Goto(String),
	Type(Locator, String),
	Click(Locator),
	ClickChild(Locator, String, usize),
	Scroll,
	Stop,
}

#[derive(Debug, Default)]
struct State {
	current: String,
	actions: Vec<Action>,
	stopped: bool,
}

#[derive(Debug, Default)]
pub struct FixtureDriver {
	pages: HashMap<String, FixturePage>,
	state: Mutex<State>,
}

impl FixtureDriver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn page(mut self, url: impl Into<String>, page: FixturePage) -> Self {
		self.pages.insert(url.into(), page);
		self
	}

	pub fn actions(&self) -> Vec<Action> {
		self.state.lock().actions.clone()
	}

	pub fn clicks(&self) -> Vec<Locator> {
		self.actions()
			.into_iter()
			.filter_map(|a| match a {
				Action::Click(locator) => Some(locator),
				_ => None,
			})
			.collect()
	}

	pub fn is_stopped(&self) -> bool {
		self.state.lock().stopped
	}

	fn with_page<T>(&self, f: impl FnOnce(Option<&FixturePage>) -> T) -> T {
		let current = self.state.lock().current.clone();
		let page = self.pages.iter().filter(|(url, _)| current.starts_with(url.as_str())).max_by_key(|(url, _)| url.len()).map(|(_, page)| page);
		f(page)
	}

	fn element(&self, locator: &Locator) -> Option<FixtureElement> {
		self.with_page(|page| page.and_then(|p| p.elements.get(locator)).and_then(|els| els.first().cloned()))
	}

	fn child(&self, container: &Locator, child_css: &str, index: usize) -> Option<FixtureElement> {
		self.with_page(|page| page.and_then(|p| p.children.get(&(container.clone(), child_css.to_string()))).and_then(|items| items.get(index).cloned()))
	}

	fn record(&self, action: Action) {
		self.state.lock().actions.push(action);
	}

	fn follow(&self, element: &FixtureElement) {
		if let Some(url) = &element.navigates_to {
			self.state.lock().current = url.clone();
		}
	}
}

impl Driver for FixtureDriver {
	async fn goto(&self, url: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.current = url.to_string();
		state.actions.push(Action::Goto(url.to_string()));
		Ok(())
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.state.lock().current.clone())
	}

	async fn texts(&self, locator: &Locator) -> Result<Vec<String>> {
		Ok(self.with_page(|page| page.and_then(|p| p.elements.get(locator)).map(|els| els.iter().map(|e| e.text.clone()).collect()).unwrap_or_default()))
	}

	async fn children(&self, container: &Locator, child_css: &str) -> Result<Option<Vec<Node>>> {
		Ok(self.with_page(|page| {
			let page = page?;
			page.elements.get(container)?;
			let items = page.children.get(&(container.clone(), child_css.to_string()));
			Some(items.map(|items| items.iter().map(|e| Node::new(e.text.clone(), e.href.clone())).collect()).unwrap_or_default())
		}))
	}

	async fn interactable(&self, locator: &Locator) -> Result<bool> {
		Ok(self.element(locator).is_some_and(|e| e.interactable))
	}

	async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
		self.element(locator).ok_or_else(|| Error::Browser(format!("nothing to type into at {locator}")))?;
		self.record(Action::Type(locator.clone(), text.to_string()));
		Ok(())
	}

	async fn click(&self, locator: &Locator) -> Result<()> {
		let element = self.element(locator).ok_or_else(|| Error::Browser(format!("nothing to click at {locator}")))?;
		self.record(Action::Click(locator.clone()));
		self.follow(&element);
		Ok(())
	}

	async fn click_child(&self, container: &Locator, child_css: &str, index: usize) -> Result<()> {
		let element = self
			.child(container, child_css, index)
			.ok_or_else(|| Error::Browser(format!("no child {child_css}[{index}] in {container}")))?;
		self.record(Action::ClickChild(container.clone(), child_css.to_string(), index));
		self.follow(&element);
		Ok(())
	}

	async fn scroll_to_bottom(&self) -> Result<()> {
		self.record(Action::Scroll);
		Ok(())
	}

	async fn page_html(&self) -> Result<String> {
		Ok(format!("<html><!-- fixture {} --></html>", self.state.lock().current))
	}
}

impl Teardown for FixtureDriver {
	async fn stop(&mut self) {
		let state = self.state.get_mut();
		if state.stopped {
			return;
		}
		state.stopped = true;
		state.actions.push(Action::Stop);
	}
}
