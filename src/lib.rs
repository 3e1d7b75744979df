//! Log into Moodle, read today's lesson from one course and relay it through WhatsApp Web.

pub mod config;
pub mod driver;
pub mod error;
pub mod extractor;
#[cfg(feature = "fixture")]
pub mod fixture;
pub mod lesson;
pub mod navigator;
pub mod notifier;
pub mod runner;
pub mod session;

pub use error::{Error, Result};
pub use lesson::{LessonRecord, RawExtraction};
