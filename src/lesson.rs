//! Turning scraped lesson text into the message that gets relayed.

use std::fmt;

/// Separator between subject and topic in the lesson text.
pub const DELIMITER: char = '—';
/// Subject reported when nothing was extracted at all.
pub const SUBJECT_NOT_FOUND: &str = "Não encontrada";
/// Topic reported when nothing was extracted at all.
pub const TOPIC_NOT_FOUND: &str = "N/A";
/// How an absent field is written into the message.
pub const ABSENT: &str = "None";

/// Plain text pulled from a DOM node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawExtraction(pub String);

impl RawExtraction {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<String> for RawExtraction {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl From<&str> for RawExtraction {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl fmt::Display for RawExtraction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LessonRecord {
	pub subject: Option<String>,
	/// `None` when the text carried no delimiter
	pub topic: Option<String>,
}

/// Split `subject — topic`. Never fails.
///
/// Empty input gives the not-found sentinels; whitespace-only input is kept as an
/// empty-but-present subject.
pub fn parse(raw: &RawExtraction) -> LessonRecord {
	if raw.is_empty() {
		return LessonRecord {
			subject: Some(SUBJECT_NOT_FOUND.to_string()),
			topic: Some(TOPIC_NOT_FOUND.to_string()),
		};
	}

	let mut parts = raw.as_str().split(DELIMITER).map(str::trim);
	LessonRecord {
		subject: parts.next().map(str::to_string),
		topic: parts.next().map(str::to_string),
	}
}

pub fn format(record: &LessonRecord) -> String {
	let subject = record.subject.as_deref().unwrap_or(ABSENT);
	let topic = record.topic.as_deref().unwrap_or(ABSENT);
	format!("Hoje temos aula de {subject} {DELIMITER} tema: {topic}")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(subject: Option<&str>, topic: Option<&str>) -> LessonRecord {
		LessonRecord {
			subject: subject.map(str::to_string),
			topic: topic.map(str::to_string),
		}
	}

	#[test]
	fn splits_subject_and_topic() {
		assert_eq!(parse(&"DevOps — CI/CD".into()), record(Some("DevOps"), Some("CI/CD")));
	}

	#[test]
	fn empty_input_yields_sentinels() {
		assert_eq!(parse(&"".into()), record(Some("Não encontrada"), Some("N/A")));
	}

	#[test]
	fn missing_delimiter_leaves_topic_absent() {
		assert_eq!(parse(&"OnlySubjectNoDelimiter".into()), record(Some("OnlySubjectNoDelimiter"), None));
	}

	#[test]
	fn whitespace_is_present_but_empty() {
		assert_eq!(parse(&"   ".into()), record(Some(""), None));
	}

	#[test]
	fn extra_delimiters_are_dropped() {
		assert_eq!(parse(&"Redes — TCP — parte 2".into()), record(Some("Redes"), Some("TCP")));
	}

	#[test]
	fn hyphen_is_not_the_delimiter() {
		assert_eq!(parse(&"DevOps - CI/CD".into()), record(Some("DevOps - CI/CD"), None));
	}

	#[test]
	fn formats_full_record() {
		assert_eq!(format(&record(Some("DevOps"), Some("CI/CD"))), "Hoje temos aula de DevOps — tema: CI/CD");
	}

	#[test]
	fn formats_absent_fields() {
		assert_eq!(format(&record(Some("DevOps"), None)), "Hoje temos aula de DevOps — tema: None");
		assert_eq!(format(&LessonRecord::default()), "Hoje temos aula de None — tema: None");
	}

	#[test]
	fn parse_then_format_is_repeatable() {
		let raw = RawExtraction::from("Banco de Dados — Normalização");
		let first = format(&parse(&raw));
		let second = format(&parse(&raw));
		assert_eq!(first, second);
		assert_eq!(first, "Hoje temos aula de Banco de Dados — tema: Normalização");
	}
}
