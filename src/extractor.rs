//! Reading text out of the course page.

use std::time::Duration;

use chrono::NaiveDate;
use v_utils::{elog, log};

use crate::{
	driver::{Driver, Locator, wait_until},
	error::{Error, Result},
	lesson::RawExtraction,
};

/// Text of the last `item_css` child of `container`.
///
/// "Latest" is last in DOM order. Moodle renders a course's activities oldest
/// first, so this is also the newest one; any date inside the text is ignored.
pub async fn extract_latest_entry<D: Driver>(driver: &D, container: &Locator, item_css: &str, timeout: Duration, poll_interval: Duration) -> Result<RawExtraction> {
	let last = wait_until(timeout, poll_interval, move || async move {
		Ok(driver.children(container, item_css).await?.and_then(|items| items.into_iter().last()))
	})
	.await?;
	let Some(last) = last else {
		let what = match driver.children(container, item_css).await? {
			Some(_) => format!("{item_css} inside {container}"),
			None => container.to_string(),
		};
		return Err(Error::ElementNotFound { what, timeout });
	};
	tracing::debug!(%container, "latest entry found");

	let text = last.text.trim().to_string();
	log!("Latest entry: {}", text);
	Ok(text.into())
}

/// Text of the lesson content node, or an empty extraction if it never shows up.
pub async fn extract_lesson_text<D: Driver>(driver: &D, locator: &Locator, timeout: Duration, poll_interval: Duration) -> Result<RawExtraction> {
	let text = wait_until(timeout, poll_interval, move || async move { Ok(driver.texts(locator).await?.into_iter().next()) }).await?;
	match text {
		Some(text) => Ok(text.into()),
		None => {
			elog!("Could not extract the lesson text: {} did not appear within {:?}", locator, timeout);
			Ok(RawExtraction::default())
		}
	}
}

/// Whether the entry mentions `date` written the Brazilian way (`dd/mm/YYYY`).
pub fn mentions_date(raw: &RawExtraction, date: NaiveDate) -> bool {
	raw.as_str().contains(&date.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixture::{FixtureDriver, FixtureElement, FixturePage};

	const COURSE: &str = "https://moodle.test/course/view.php?id=7";
	const POLL: Duration = Duration::from_millis(250);

	fn entries() -> Locator {
		"//ul[@data-for='cmlist']".into()
	}

	async fn on_course(page: FixturePage) -> FixtureDriver {
		let driver = FixtureDriver::new().page(COURSE, page);
		driver.goto(COURSE).await.unwrap();
		driver
	}

	#[tokio::test(start_paused = true)]
	async fn latest_is_last_in_dom_order_not_by_date() {
		let driver = on_course(FixturePage::default().with_children(
			entries(),
			"li",
			vec![
				FixtureElement::text("Aula 3 — 20/10/2026"),
				FixtureElement::text("Aula 1 — 06/10/2026"),
				FixtureElement::text("  Aula 2 — 13/10/2026  "),
			],
		))
		.await;

		let latest = extract_latest_entry(&driver, &entries(), "li", Duration::from_secs(10), POLL).await.unwrap();
		assert_eq!(latest.as_str(), "Aula 2 — 13/10/2026");
	}

	#[tokio::test(start_paused = true)]
	async fn missing_container_is_element_not_found() {
		let driver = on_course(FixturePage::default()).await;
		let err = extract_latest_entry(&driver, &entries(), "li", Duration::from_secs(10), POLL).await.unwrap_err();
		assert!(matches!(err, Error::ElementNotFound { .. }), "{err}");
	}

	#[tokio::test(start_paused = true)]
	async fn empty_container_is_element_not_found() {
		let driver = on_course(FixturePage::default().with_children(entries(), "li", vec![])).await;
		let err = extract_latest_entry(&driver, &entries(), "li", Duration::from_secs(10), POLL).await.unwrap_err();
		assert!(matches!(err, Error::ElementNotFound { .. }), "{err}");
	}

	#[tokio::test(start_paused = true)]
	async fn lesson_text_reads_first_match() {
		let driver = on_course(FixturePage::default().with("div.course-content", FixtureElement::text("DevOps — CI/CD"))).await;
		let raw = extract_lesson_text(&driver, &"div.course-content".into(), Duration::from_secs(10), POLL).await.unwrap();
		assert_eq!(raw.as_str(), "DevOps — CI/CD");
	}

	#[tokio::test(start_paused = true)]
	async fn lesson_text_degrades_to_empty_on_timeout() {
		let driver = on_course(FixturePage::default()).await;
		let raw = extract_lesson_text(&driver, &"div.course-content".into(), Duration::from_secs(10), POLL).await.unwrap();
		assert!(raw.is_empty());
	}

	#[test]
	fn date_check_uses_day_first_format() {
		let date = NaiveDate::from_ymd_opt(2026, 10, 6).unwrap();
		assert!(mentions_date(&"Aula 1 — 06/10/2026".into(), date));
		assert!(!mentions_date(&"Aula 1 — 10/06/2026".into(), date));
	}
}
