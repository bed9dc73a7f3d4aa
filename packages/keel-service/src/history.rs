use time::OffsetDateTime;

/// One prior exchange as seen by the chain: the collaborator-facing projection of a
/// persisted turn. Fetched fresh on every request, never cached across requests.
#[derive(Debug, Clone)]
pub struct TurnRecord {
	pub question: String,
	pub answer: String,
	pub sources: Vec<String>,
	pub succeeded: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTurn {
	pub question: String,
	pub answer: String,
	pub sources: Vec<String>,
	pub succeeded: bool,
}

pub const SUMMARY_HEADER: &str = "Earlier in this conversation:";
pub const RECENT_HEADER: &str = "Recent conversation:";

const SUMMARY_TOPIC_MAX_CHARS: usize = 80;

/// The fetch window is sized beyond the verbatim tail so summarization has material
/// and follow-up resolution is not starved.
pub fn fetch_limit(cfg: &keel_config::History) -> u32 {
	cfg.fetch_limit.unwrap_or_else(|| (cfg.verbatim_count * 3).max(cfg.summary_threshold + 1))
}

/// Renders the conversation window for prompt injection.
///
/// Small windows render fully verbatim. Past the summary threshold, older turns
/// collapse to one topic bullet each and only the newest `verbatim_count` turns keep
/// their full text.
pub fn format_history_context(window: &[TurnRecord], cfg: &keel_config::History) -> String {
	if window.is_empty() {
		return String::new();
	}
	if window.len() <= cfg.summary_threshold as usize {
		return verbatim_block(window);
	}

	let split = window.len().saturating_sub(cfg.verbatim_count as usize);
	let (older, recent) = window.split_at(split);
	let mut summary = String::from(SUMMARY_HEADER);

	for turn in older {
		summary.push('\n');
		summary.push_str("- ");
		summary.push_str(&truncate_topic(&turn.question));
	}

	format!("{summary}\n\n{RECENT_HEADER}\n{}", verbatim_block(recent))
}

fn verbatim_block(turns: &[TurnRecord]) -> String {
	turns
		.iter()
		.map(|turn| format!("User: {}\nAssistant: {}", turn.question.trim(), turn.answer.trim()))
		.collect::<Vec<_>>()
		.join("\n\n")
}

fn truncate_topic(question: &str) -> String {
	let trimmed = question.trim();

	if trimmed.chars().count() <= SUMMARY_TOPIC_MAX_CHARS {
		return trimmed.to_string();
	}

	let mut topic: String = trimmed.chars().take(SUMMARY_TOPIC_MAX_CHARS - 1).collect();

	topic.push('…');

	topic
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg() -> keel_config::History {
		keel_config::History { verbatim_count: 5, summary_threshold: 8, fetch_limit: None }
	}

	fn turns(count: usize) -> Vec<TurnRecord> {
		(1..=count)
			.map(|index| TurnRecord {
				question: format!("Question {index}?"),
				answer: format!("Answer {index}."),
				sources: Vec::new(),
				succeeded: true,
				created_at: OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(index as i64),
			})
			.collect()
	}

	#[test]
	fn empty_window_renders_empty_string() {
		assert_eq!(format_history_context(&[], &cfg()), "");
	}

	#[test]
	fn window_at_threshold_renders_fully_verbatim() {
		let rendered = format_history_context(&turns(8), &cfg());

		assert!(!rendered.contains(SUMMARY_HEADER));
		assert!(rendered.starts_with("User: Question 1?"));
		assert!(rendered.contains("Assistant: Answer 8."));
	}

	#[test]
	fn window_past_threshold_summarizes_the_oldest_turns() {
		let rendered = format_history_context(&turns(9), &cfg());

		assert!(rendered.starts_with(SUMMARY_HEADER));
		assert!(rendered.contains("- Question 4?"));
		assert!(!rendered.contains("- Question 5?"));
		assert!(rendered.contains(RECENT_HEADER));
		// The newest five turns stay verbatim; the oldest four do not.
		assert!(rendered.contains("User: Question 5?"));
		assert!(!rendered.contains("User: Question 4?"));
		assert!(rendered.contains("Assistant: Answer 9."));
	}

	#[test]
	fn summary_bullets_are_capped_at_eighty_chars() {
		let long = "x".repeat(200);

		let topic = truncate_topic(&long);

		assert_eq!(topic.chars().count(), 80);
		assert!(topic.ends_with('…'));

		let short = truncate_topic("short question");

		assert_eq!(short, "short question");
		assert!(!short.ends_with('…'));
	}

	#[test]
	fn fetch_limit_uses_the_configured_override() {
		let mut history = cfg();

		assert_eq!(fetch_limit(&history), 15);

		history.fetch_limit = Some(20);

		assert_eq!(fetch_limit(&history), 20);
	}

	#[test]
	fn fetch_limit_floor_keeps_summarization_reachable() {
		let history =
			keel_config::History { verbatim_count: 2, summary_threshold: 8, fetch_limit: None };

		assert_eq!(fetch_limit(&history), 9);
	}
}
