//! Run sequencing: session → login → course → lesson → message → send → close.
//!
//! Strictly linear. The first failure aborts the rest of the run; the browser
//! is closed either way.

#[cfg(feature = "xdg")]
use std::path::PathBuf;

use regex::Regex;
#[cfg(feature = "xdg")]
use v_utils::xdg_state_dir;
use v_utils::{elog, log};

use crate::{
	config::AppConfig,
	driver::{Driver, Teardown},
	error::{Error, Result},
	extractor::{extract_latest_entry, extract_lesson_text, mentions_date},
	lesson::{self, LessonRecord, RawExtraction},
	navigator::{self, CourseLink},
	notifier,
	session::{Session, SessionOptions},
};

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Stage {
	Idle,
	SessionStarted,
	LoggedIn,
	CourseOpen,
	LessonExtracted,
	MessageSent,
	Closed,
}

/// Where the run has got to. Only ever moves forward.
#[derive(Debug)]
pub struct Progress {
	stage: Stage,
}

impl Default for Progress {
	fn default() -> Self {
		Self { stage: Stage::Idle }
	}
}

impl Progress {
	pub fn stage(&self) -> Stage {
		self.stage
	}

	fn advance(&mut self, to: Stage) {
		debug_assert!(to > self.stage, "stage went backwards: {:?} -> {:?}", self.stage, to);
		tracing::info!(from = ?self.stage, ?to, "stage");
		self.stage = to;
	}
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
	/// Build the message but do not open WhatsApp
	pub dry_run: bool,
	/// Save the current page's HTML to the state dir when the run fails
	pub dump_html_on_error: bool,
}

#[derive(Clone, Debug)]
pub struct Outcome {
	pub course: String,
	pub courses: Vec<CourseLink>,
	pub latest_entry: RawExtraction,
	pub record: LessonRecord,
	pub message: String,
	pub sent: bool,
}

/// One configured relay, independent of the browser backend.
pub struct Relay<'a> {
	config: &'a AppConfig,
	course_matcher: Regex,
	options: RunOptions,
}

impl<'a> Relay<'a> {
	pub fn new(config: &'a AppConfig, options: RunOptions) -> Result<Self> {
		let course_matcher = Regex::new(&config.course_pattern).map_err(|e| Error::Config(format!("course_pattern {:?}: {e}", config.course_pattern)))?;
		Ok(Self { config, course_matcher, options })
	}

	/// Everything after the session is up, against any backend.
	pub async fn drive<D: Driver>(&self, driver: &D, progress: &mut Progress) -> Result<Outcome> {
		let config = self.config;
		let waits = config.waits();

		navigator::navigate_to_login(driver, config).await?;
		navigator::login(driver, config, &config.username, &config.password).await?;
		progress.advance(Stage::LoggedIn);

		let courses = if config.list_courses { navigator::list_courses(driver, config).await? } else { Vec::new() };
		let course = navigator::go_to_course(driver, config, &self.course_matcher).await?;
		progress.advance(Stage::CourseOpen);

		let latest_entry = extract_latest_entry(driver, &config.entry_list(), &config.entry_item, waits.timeout, waits.poll_interval).await?;
		let today = chrono::Local::now().date_naive();
		if mentions_date(&latest_entry, today) {
			log!("Latest entry is for today ({}).", today.format("%d/%m/%Y"));
		} else {
			log!("Latest entry is NOT for today ({}).", today.format("%d/%m/%Y"));
		}

		tracing::debug!(weekday = %today.format("%A"), "extracting lesson of the day");
		let raw = extract_lesson_text(driver, &config.lesson_content(), waits.timeout, waits.poll_interval).await?;
		let record = lesson::parse(&raw);
		let message = lesson::format(&record);
		progress.advance(Stage::LessonExtracted);

		let sent = if self.options.dry_run {
			log!("Dry run, not sending: {}", message);
			false
		} else {
			notifier::send(driver, config, &config.destination_id, &message).await?;
			progress.advance(Stage::MessageSent);
			true
		};

		Ok(Outcome {
			course,
			courses,
			latest_entry,
			record,
			message,
			sent,
		})
	}

	/// [`Relay::drive`], then report and release the driver whatever the result.
	pub async fn drive_and_close<D: Teardown>(&self, driver: &mut D, progress: &mut Progress) -> Result<Outcome> {
		let config = self.config;
		let result = self.drive(&*driver, progress).await;
		match &result {
			Ok(outcome) => {
				let hook_msg = if outcome.sent { format!("Relay sent: {}", outcome.message) } else { format!("Relay built: {}", outcome.message) };
				run_stop_hook(config, &hook_msg);
			}
			Err(e) => {
				elog!("Run aborted after {:?}: {}", progress.stage(), e);
				#[cfg(feature = "xdg")]
				if self.options.dump_html_on_error
					&& let Err(dump_err) = save_page_html(&*driver).await
				{
					elog!("Failed to save page HTML: {dump_err}");
				}
				run_stop_hook(config, &format!("Relay failed after {:?}: {e}", progress.stage()));
			}
		}

		driver.stop().await;
		progress.advance(Stage::Closed);
		result
	}
}

/// Launch Chromium, drive the whole relay and always close the browser.
pub async fn run(config: &AppConfig, options: RunOptions) -> Result<Outcome> {
	let relay = Relay::new(config, options)?;
	let mut progress = Progress::default();

	let mut session = match Session::start(&SessionOptions::from(config)).await {
		Ok(session) => session,
		Err(e) => {
			run_stop_hook(config, &format!("Relay failed before start: {e}"));
			return Err(e);
		}
	};
	progress.advance(Stage::SessionStarted);

	relay.drive_and_close(&mut session, &mut progress).await
}

/// Run the stop hook with a message if configured
fn run_stop_hook(config: &AppConfig, message: &str) {
	if let Some(ref hook) = config.stop_hook {
		log!("Running stop hook: {} {:?}", hook, message);
		// Escape single quotes for shell: replace ' with '\''
		let escaped = message.replace('\'', "'\\''");
		if let Err(e) = tokio::process::Command::new("sh").arg("-c").arg(format!("{hook} '{escaped}'")).spawn() {
			elog!("Failed to spawn stop hook: {e}");
		}
	}
}

/// Save the current page's HTML to disk for debugging
#[cfg(feature = "xdg")]
pub async fn save_page_html<D: Driver>(driver: &D) -> Result<PathBuf> {
	let session_id = chrono::Local::now().format("%Y%m%d").to_string();
	let html_dir = xdg_state_dir!("persist_htmls").join(session_id);
	std::fs::create_dir_all(&html_dir)?;

	let url = driver.current_url().await.unwrap_or_default();
	let label = url.replace("https://", "").replace("http://", "");
	let safe_label: String = label.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();

	let html = driver.page_html().await?;
	let timestamp = chrono::Local::now().format("%H%M%S");
	let filepath = html_dir.join(format!("{timestamp}_{safe_label}.html"));
	std::fs::write(&filepath, html)?;

	log!("Saved page HTML to: {}", filepath.display());
	Ok(filepath)
}
