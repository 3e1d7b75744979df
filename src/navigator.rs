use std::time::Duration;

use regex::Regex;
use v_utils::log;

use crate::{
	config::AppConfig,
	driver::{Driver, Locator, wait_until},
	error::{Error, Result},
};

/// A course as listed on the Moodle course index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CourseLink {
	pub name: String,
	pub href: Option<String>,
}

/// Load the login page and wait for its username field.
pub async fn navigate_to_login<D: Driver>(driver: &D, config: &AppConfig) -> Result<()> {
	let waits = config.waits();
	let url = config.login_url();
	driver.goto(&url).await?;

	let field = config.username_field();
	wait_for_present(driver, &field, waits.timeout, waits.poll_interval)
		.await?
		.ok_or_else(|| Error::PageLoadTimeout {
			what: format!("login form ({field}) at {url}"),
			timeout: waits.timeout,
		})?;
	log!("Moodle login page loaded.");
	Ok(())
}

/// Fill the credentials and submit, then wait until Moodle lets us past the login page.
pub async fn login<D: Driver>(driver: &D, config: &AppConfig, username: &str, password: &str) -> Result<()> {
	let waits = config.waits();
	log!("Logging into Moodle...");

	let username_field = config.username_field();
	require_present(driver, &username_field, waits.timeout, waits.poll_interval).await?;
	driver.type_text(&username_field, username).await?;

	let password_field = config.password_field();
	require_present(driver, &password_field, waits.timeout, waits.poll_interval).await?;
	driver.type_text(&password_field, password).await?;

	let button = &config.login_button();
	wait_until(waits.timeout, waits.poll_interval, move || async move { Ok(driver.interactable(button).await?.then_some(())) })
		.await?
		.ok_or_else(|| Error::ElementNotFound {
			what: format!("clickable {button}"),
			timeout: waits.timeout,
		})?;
	driver.click(button).await?;

	// Off the login URL and the form gone; a rejected login re-renders the same page.
	let login_url = &config.login_url();
	let username_field = &username_field;
	let left = wait_until(waits.timeout, waits.poll_interval, move || async move {
		let url = driver.current_url().await?;
		let form_gone = driver.texts(username_field).await?.is_empty();
		Ok((!url.starts_with(login_url.as_str()) && form_gone).then_some(url))
	})
	.await?;
	match left {
		Some(url) => {
			log!("Logged in, now at: {}", url);
			Ok(())
		}
		None => Err(Error::LoginFailed {
			url: driver.current_url().await?,
			timeout: waits.timeout,
		}),
	}
}

/// Open the first course whose title matches `course_matcher`.
///
/// With several matches the first in DOM order wins; the others are logged.
pub async fn go_to_course<D: Driver>(driver: &D, config: &AppConfig, course_matcher: &Regex) -> Result<String> {
	let waits = config.waits();
	let list = &config.course_list();
	let title_css = config.course_title.as_str();

	let matches = wait_until(waits.long_timeout, waits.poll_interval, move || async move {
		let titles = driver.children(list, title_css).await?.unwrap_or_default();
		let matching: Vec<(usize, String)> = titles
			.into_iter()
			.enumerate()
			.filter(|(_, node)| course_matcher.is_match(&node.text))
			.map(|(i, node)| (i, node.text.trim().to_string()))
			.collect();
		Ok((!matching.is_empty()).then_some(matching))
	})
	.await?
	.ok_or_else(|| Error::ElementNotFound {
		what: format!("course matching /{course_matcher}/ in {list}"),
		timeout: waits.long_timeout,
	})?;

	if matches.len() > 1 {
		let names: Vec<&str> = matches.iter().map(|(_, name)| name.as_str()).collect();
		tracing::warn!(?names, "several courses match /{course_matcher}/, taking the first");
	}
	let (index, name) = matches.into_iter().next().ok_or_else(|| Error::ElementNotFound {
		what: format!("course matching /{course_matcher}/"),
		timeout: waits.long_timeout,
	})?;

	driver.click_child(list, title_css, index).await?;

	let entries = config.entry_list();
	wait_for_present(driver, &entries, waits.long_timeout, waits.poll_interval)
		.await?
		.ok_or_else(|| Error::PageLoadTimeout {
			what: format!("course page of {name} ({entries})"),
			timeout: waits.long_timeout,
		})?;
	driver.scroll_to_bottom().await?;
	log!("Opened course: {}", name);
	Ok(name)
}

/// Every course on the listing, in page order. Read-only: nothing is clicked.
pub async fn list_courses<D: Driver>(driver: &D, config: &AppConfig) -> Result<Vec<CourseLink>> {
	let waits = config.waits();
	let list = &config.course_list();
	let row_css = config.course_row.as_str();
	let rows = wait_until(waits.long_timeout, waits.poll_interval, move || async move { driver.children(list, row_css).await })
		.await?
		.ok_or_else(|| Error::ElementNotFound {
			what: list.to_string(),
			timeout: waits.long_timeout,
		})?;

	let courses: Vec<CourseLink> = rows
		.into_iter()
		.filter(|node| !node.text.trim().is_empty())
		.map(|node| CourseLink {
			name: node.text.trim().to_string(),
			href: node.href,
		})
		.collect();
	for course in &courses {
		log!("Course: {} ({})", course.name, course.href.as_deref().unwrap_or("no link"));
	}
	Ok(courses)
}

async fn wait_for_present<D: Driver>(driver: &D, locator: &Locator, timeout: Duration, poll_interval: Duration) -> Result<Option<()>> {
	wait_until(timeout, poll_interval, move || async move { Ok((!driver.texts(locator).await?.is_empty()).then_some(())) }).await
}

async fn require_present<D: Driver>(driver: &D, locator: &Locator, timeout: Duration, poll_interval: Duration) -> Result<()> {
	wait_for_present(driver, locator, timeout, poll_interval).await?.ok_or_else(|| Error::ElementNotFound {
		what: locator.to_string(),
		timeout,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixture::{Action, FixtureDriver, FixtureElement, FixturePage};

	const BASE: &str = "https://moodle.test/moodle";
	const LOGIN: &str = "https://moodle.test/moodle/login/index.php";
	const DASHBOARD: &str = "https://moodle.test/moodle/my/";
	const COURSE: &str = "https://moodle.test/moodle/course/view.php?id=42";

	fn config() -> AppConfig {
		AppConfig {
			base_url: BASE.into(),
			..Default::default()
		}
	}

	fn login_page(submit_to: &str) -> FixturePage {
		FixturePage::default()
			.with("id:username", FixtureElement::text(""))
			.with("id:password", FixtureElement::text(""))
			.with("id:loginbtn", FixtureElement::text("Acessar").navigates_to(submit_to))
	}

	fn course_list(titles: &[&str]) -> FixturePage {
		FixturePage::default().with_children(
			"id:category-course-list",
			"h4",
			titles.iter().map(|t| FixtureElement::text(*t).navigates_to(COURSE)).collect(),
		)
	}

	fn course_page() -> FixturePage {
		FixturePage::default().with_children("//ul[@data-for='cmlist']", "li", vec![FixtureElement::text("Aula 1")])
	}

	#[tokio::test(start_paused = true)]
	async fn login_types_credentials_then_submits() {
		let driver = FixtureDriver::new().page(LOGIN, login_page(DASHBOARD)).page(DASHBOARD, course_list(&[]));
		let config = config();

		navigate_to_login(&driver, &config).await.unwrap();
		login(&driver, &config, "6324605", "hunter2").await.unwrap();

		assert_eq!(driver.actions(), vec![
			Action::Goto(LOGIN.into()),
			Action::Type("id:username".into(), "6324605".into()),
			Action::Type("id:password".into(), "hunter2".into()),
			Action::Click("id:loginbtn".into()),
		]);
	}

	#[tokio::test(start_paused = true)]
	async fn login_page_without_form_times_out() {
		let driver = FixtureDriver::new().page(LOGIN, FixturePage::default());
		let err = navigate_to_login(&driver, &config()).await.unwrap_err();
		assert!(matches!(err, Error::PageLoadTimeout { .. }), "{err}");
	}

	#[tokio::test(start_paused = true)]
	async fn rejected_login_stays_on_form() {
		let driver = FixtureDriver::new().page(LOGIN, login_page(LOGIN));
		let config = config();
		navigate_to_login(&driver, &config).await.unwrap();

		let err = login(&driver, &config, "6324605", "wrong").await.unwrap_err();
		match err {
			Error::LoginFailed { url, .. } => assert_eq!(url, LOGIN),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn opens_first_matching_course() {
		let driver = FixtureDriver::new()
			.page(DASHBOARD, course_list(&["ALGORITMOS", "DEVOPS - Turma A", "DEVOPS - Turma B"]))
			.page(COURSE, course_page());
		driver.goto(DASHBOARD).await.unwrap();

		let name = go_to_course(&driver, &config(), &Regex::new("DEVOPS").unwrap()).await.unwrap();

		assert_eq!(name, "DEVOPS - Turma A");
		assert!(driver.actions().contains(&Action::ClickChild("id:category-course-list".into(), "h4".into(), 1)));
		assert_eq!(driver.actions().last(), Some(&Action::Scroll));
	}

	#[tokio::test(start_paused = true)]
	async fn unknown_course_is_element_not_found() {
		let driver = FixtureDriver::new().page(DASHBOARD, course_list(&["ALGORITMOS"]));
		driver.goto(DASHBOARD).await.unwrap();

		let err = go_to_course(&driver, &config(), &Regex::new("DEVOPS").unwrap()).await.unwrap_err();
		assert!(matches!(err, Error::ElementNotFound { .. }), "{err}");
		assert!(!driver.actions().iter().any(|a| matches!(a, Action::ClickChild(..))));
	}

	#[tokio::test(start_paused = true)]
	async fn lists_courses_with_links() {
		let page = FixturePage::default().with_children(
			"id:category-course-list",
			"li",
			vec![
				FixtureElement::link("ALGORITMOS", "https://moodle.test/moodle/course/view.php?id=1"),
				FixtureElement::text("   "),
				FixtureElement::link("DEVOPS", "https://moodle.test/moodle/course/view.php?id=42"),
			],
		);
		let driver = FixtureDriver::new().page(DASHBOARD, page);
		driver.goto(DASHBOARD).await.unwrap();

		let courses = list_courses(&driver, &config()).await.unwrap();
		assert_eq!(courses.len(), 2);
		assert_eq!(courses[1].name, "DEVOPS");
		assert_eq!(courses[1].href.as_deref(), Some("https://moodle.test/moodle/course/view.php?id=42"));
		assert_eq!(driver.actions(), vec![Action::Goto(DASHBOARD.into())]);
	}
}
