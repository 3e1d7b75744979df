use std::time::Duration;

use v_utils::macros::{MyConfigPrimitives, Settings};

use crate::driver::{Locator, Waits};

#[derive(Clone, Debug, MyConfigPrimitives, Settings)]
pub struct AppConfig {
	/// Moodle username
	pub username: String,
	/// Moodle password
	pub password: String,
	/// WhatsApp destination, country code + area code + number (e.g. 5511999999999)
	pub destination_id: String,
	/// Moodle root, without the trailing `/login/index.php`
	#[serde(default = "default_base_url")]
	#[primitives(skip)]
	pub base_url: String,
	#[serde(default = "default_whatsapp_url")]
	#[primitives(skip)]
	pub whatsapp_url: String,
	/// Run with visible browser window (non-headless mode)
	#[serde(default)]
	pub visible: bool,
	/// Browser user-data dir; reuse one that has scanned the WhatsApp QR code
	#[serde(default)]
	pub profile_dir: Option<String>,
	/// Chrome/Chromium binary, if not on PATH
	#[serde(default)]
	pub browser_executable: Option<String>,
	/// Default wait for page elements, in seconds (default: 10)
	#[serde(default = "default_wait_timeout_secs")]
	pub wait_timeout_secs: u64,
	/// Wait for slow listings (course list, course page), in seconds (default: 20)
	#[serde(default = "default_long_wait_timeout_secs")]
	pub long_wait_timeout_secs: u64,
	/// Delay between element probes, in ms (default: 250)
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Regex the course title must match (default: "DEVOPS")
	#[serde(default = "default_course_pattern")]
	#[primitives(skip)]
	pub course_pattern: String,
	#[serde(default = "default_username_field")]
	#[primitives(skip)]
	pub username_field: String,
	#[serde(default = "default_password_field")]
	#[primitives(skip)]
	pub password_field: String,
	#[serde(default = "default_login_button")]
	#[primitives(skip)]
	pub login_button: String,
	#[serde(default = "default_course_list")]
	#[primitives(skip)]
	pub course_list: String,
	/// CSS of a course title inside `course_list`
	#[serde(default = "default_course_title")]
	#[primitives(skip)]
	pub course_title: String,
	/// CSS of a course row inside `course_list`, for `list_courses`
	#[serde(default = "default_course_row")]
	#[primitives(skip)]
	pub course_row: String,
	/// Container of the course's activity entries
	#[serde(default = "default_entry_list")]
	#[primitives(skip)]
	pub entry_list: String,
	/// CSS of one entry inside `entry_list`
	#[serde(default = "default_entry_item")]
	#[primitives(skip)]
	pub entry_item: String,
	#[serde(default = "default_lesson_content")]
	#[primitives(skip)]
	pub lesson_content: String,
	#[serde(default = "default_send_button")]
	#[primitives(skip)]
	pub send_button: String,
	/// Log every course in the listing before opening the target one
	#[serde(default)]
	pub list_courses: bool,
	/// Command to run on completion/error (receives message as argument)
	#[serde(default)]
	pub stop_hook: Option<String>,
}

fn default_base_url() -> String {
	"https://moodle.faat.edu.br/moodle".to_string()
}

fn default_whatsapp_url() -> String {
	"https://web.whatsapp.com".to_string()
}

fn default_wait_timeout_secs() -> u64 {
	10
}

fn default_long_wait_timeout_secs() -> u64 {
	20
}

fn default_poll_interval_ms() -> u64 {
	250
}

fn default_course_pattern() -> String {
	"DEVOPS".to_string()
}

fn default_username_field() -> String {
	"id:username".to_string()
}

fn default_password_field() -> String {
	"id:password".to_string()
}

fn default_login_button() -> String {
	"id:loginbtn".to_string()
}

fn default_course_list() -> String {
	"id:category-course-list".to_string()
}

fn default_course_title() -> String {
	"h4".to_string()
}

fn default_course_row() -> String {
	"li".to_string()
}

fn default_entry_list() -> String {
	"//ul[@data-for='cmlist']".to_string()
}

fn default_entry_item() -> String {
	"li".to_string()
}

fn default_lesson_content() -> String {
	"div.course-content".to_string()
}

fn default_send_button() -> String {
	"//button[@aria-label='Enviar']".to_string()
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			username: String::new(),
			password: String::new(),
			destination_id: String::new(),
			base_url: default_base_url(),
			whatsapp_url: default_whatsapp_url(),
			visible: false,
			profile_dir: None,
			browser_executable: None,
			wait_timeout_secs: default_wait_timeout_secs(),
			long_wait_timeout_secs: default_long_wait_timeout_secs(),
			poll_interval_ms: default_poll_interval_ms(),
			course_pattern: default_course_pattern(),
			username_field: default_username_field(),
			password_field: default_password_field(),
			login_button: default_login_button(),
			course_list: default_course_list(),
			course_title: default_course_title(),
			course_row: default_course_row(),
			entry_list: default_entry_list(),
			entry_item: default_entry_item(),
			lesson_content: default_lesson_content(),
			send_button: default_send_button(),
			list_courses: false,
			stop_hook: None,
		}
	}
}

impl AppConfig {
	pub fn waits(&self) -> Waits {
		Waits::new(
			Duration::from_secs(self.wait_timeout_secs),
			Duration::from_secs(self.long_wait_timeout_secs),
			Duration::from_millis(self.poll_interval_ms),
		)
	}

	pub fn login_url(&self) -> String {
		format!("{}/login/index.php", self.base_url.trim_end_matches('/'))
	}

	pub fn username_field(&self) -> Locator {
		self.username_field.as_str().into()
	}

	pub fn password_field(&self) -> Locator {
		self.password_field.as_str().into()
	}

	pub fn login_button(&self) -> Locator {
		self.login_button.as_str().into()
	}

	pub fn course_list(&self) -> Locator {
		self.course_list.as_str().into()
	}

	pub fn entry_list(&self) -> Locator {
		self.entry_list.as_str().into()
	}

	pub fn lesson_content(&self) -> Locator {
		self.lesson_content.as_str().into()
	}

	pub fn send_button(&self) -> Locator {
		self.send_button.as_str().into()
	}
}
