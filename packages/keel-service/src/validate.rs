use serde::{Deserialize, Serialize};

use keel_domain::{refusal, text};

pub use keel_domain::refusal::FALLBACK_ANSWER;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
	High,
	Medium,
	Low,
	None,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFlag {
	EmptyAnswer,
	LlmRefusal,
	LowGrounding,
	LowConfidence,
	Greeting,
	NoDocuments,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
	pub final_answer: String,
	pub is_valid: bool,
	pub is_grounded: bool,
	pub grounding_score: f32,
	pub confidence: Confidence,
	pub citations: Vec<String>,
	pub flags: Vec<ValidationFlag>,
}

/// The hallucination-control gate.
///
/// Validation annotates rather than censors: a low grounding score flags the answer
/// but leaves it intact, because the corpus includes conversation and user context
/// that legitimately dilutes lexical overlap — the generation prompt is what enforces
/// refusal. Detected refusals short-circuit as maximally grounded: a refusal cannot
/// hallucinate.
pub fn validate(
	cfg: &keel_config::Validation,
	answer: &str,
	corpus: &[String],
	sources: &[String],
) -> ValidationResult {
	let trimmed = answer.trim();

	if trimmed.chars().count() < cfg.min_answer_chars as usize {
		return ValidationResult {
			final_answer: FALLBACK_ANSWER.to_string(),
			is_valid: false,
			is_grounded: false,
			grounding_score: 0.0,
			confidence: Confidence::None,
			citations: dedup_citations(sources),
			flags: vec![ValidationFlag::EmptyAnswer],
		};
	}

	if refusal::is_refusal(trimmed) {
		return ValidationResult {
			final_answer: FALLBACK_ANSWER.to_string(),
			is_valid: true,
			is_grounded: true,
			grounding_score: 1.0,
			confidence: Confidence::High,
			citations: Vec::new(),
			flags: vec![ValidationFlag::LlmRefusal],
		};
	}

	let mut flags = Vec::new();
	let grounding_score = grounding_score(trimmed, corpus);
	let is_grounded = grounding_score >= cfg.min_grounding_ratio;

	if !is_grounded {
		flags.push(ValidationFlag::LowGrounding);

		tracing::warn!(score = grounding_score, "Low grounding score; flagging the answer.");
	}

	let confidence = if grounding_score >= cfg.high_confidence_ratio {
		Confidence::High
	} else if grounding_score >= cfg.medium_confidence_ratio {
		Confidence::Medium
	} else {
		flags.push(ValidationFlag::LowConfidence);

		Confidence::Low
	};

	let citations = dedup_citations(sources);
	let final_answer = append_citations(trimmed, &citations);

	ValidationResult {
		final_answer,
		is_valid: true,
		is_grounded,
		grounding_score,
		confidence,
		citations,
		flags,
	}
}

/// Fraction of the answer's content words that also occur anywhere in the corpus.
/// Zero answer words or an empty corpus both score zero.
fn grounding_score(answer: &str, corpus: &[String]) -> f32 {
	let answer_words = text::content_word_set(answer);

	if answer_words.is_empty() {
		return 0.0;
	}

	let mut corpus_words = std::collections::HashSet::new();

	for chunk in corpus {
		corpus_words.extend(text::content_words(chunk));
	}

	if corpus_words.is_empty() {
		return 0.0;
	}

	let overlap = answer_words.iter().filter(|word| corpus_words.contains(*word)).count();
	let score = overlap as f32 / answer_words.len() as f32;

	(score * 10_000.0).round() / 10_000.0
}

fn dedup_citations(sources: &[String]) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	let mut citations = Vec::new();

	for source in sources {
		if source.trim().is_empty() {
			continue;
		}
		if seen.insert(source.as_str()) {
			citations.push(source.clone());
		}
	}

	citations
}

fn append_citations(answer: &str, citations: &[String]) -> String {
	if citations.is_empty() {
		return answer.to_string();
	}

	format!("{answer}\n\nSources: {}", citations.join(", "))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg() -> keel_config::Validation {
		keel_config::Validation {
			min_grounding_ratio: 0.10,
			min_answer_chars: 10,
			high_confidence_ratio: 0.40,
			medium_confidence_ratio: 0.25,
		}
	}

	fn corpus(chunks: &[&str]) -> Vec<String> {
		chunks.iter().map(|chunk| chunk.to_string()).collect()
	}

	#[test]
	fn empty_answer_short_circuits_to_the_fallback() {
		let result = validate(&cfg(), "   ", &corpus(&["anything"]), &[]);

		assert_eq!(result.final_answer, FALLBACK_ANSWER);
		assert!(!result.is_valid);
		assert!(!result.is_grounded);
		assert_eq!(result.confidence, Confidence::None);
		assert_eq!(result.flags, vec![ValidationFlag::EmptyAnswer]);
	}

	#[test]
	fn refusal_is_always_grounded_regardless_of_corpus() {
		for corpus in [corpus(&[]), corpus(&["completely unrelated material"])] {
			let result = validate(
				&cfg(),
				"Sorry, this document does not contain enough information to answer that.",
				&corpus,
				&["a.pdf".to_string()],
			);

			assert!(result.is_valid);
			assert!(result.is_grounded);
			assert_eq!(result.grounding_score, 1.0);
			assert_eq!(result.confidence, Confidence::High);
			assert_eq!(result.flags, vec![ValidationFlag::LlmRefusal]);
		}
	}

	#[test]
	fn answer_built_from_corpus_words_scores_near_one() {
		let result = validate(
			&cfg(),
			"The solar subsidy is paid yearly to registered farmers",
			&corpus(&["The solar subsidy is paid yearly to registered farmers."]),
			&[],
		);

		assert!(result.grounding_score > 0.9);
		assert!(result.is_grounded);
		assert_eq!(result.confidence, Confidence::High);
		assert!(result.flags.is_empty());
	}

	#[test]
	fn disjoint_answer_scores_exactly_zero() {
		let result = validate(
			&cfg(),
			"Elephants migrate across savannah grasslands",
			&corpus(&["Quarterly tax filing deadlines and penalties."]),
			&[],
		);

		assert_eq!(result.grounding_score, 0.0);
		assert!(!result.is_grounded);
		assert!(result.flags.contains(&ValidationFlag::LowGrounding));
		assert!(result.flags.contains(&ValidationFlag::LowConfidence));
		// The answer itself is flagged, not replaced.
		assert!(result.final_answer.starts_with("Elephants migrate"));
	}

	#[test]
	fn grounding_score_stays_in_unit_range() {
		let samples = [
			("", &["a"][..]),
			("policy subsidy details", &[][..]),
			("policy subsidy details", &["policy subsidy details"][..]),
			("some mixed overlap answer", &["overlap answer material"][..]),
		];

		for (answer, chunks) in samples {
			let result = validate(&cfg(), answer, &corpus(chunks), &[]);

			assert!((0.0..=1.0).contains(&result.grounding_score));
		}
	}

	#[test]
	fn citations_are_deduplicated_in_first_seen_order() {
		let sources = vec![
			"b.pdf".to_string(),
			"a.pdf".to_string(),
			"b.pdf".to_string(),
			String::new(),
		];
		let result = validate(
			&cfg(),
			"Registered farmers receive the subsidy",
			&corpus(&["registered farmers receive the subsidy"]),
			&sources,
		);

		assert_eq!(result.citations, vec!["b.pdf", "a.pdf"]);
		assert!(result.final_answer.ends_with("Sources: b.pdf, a.pdf"));
	}

	#[test]
	fn confidence_tiers_follow_the_configured_boundaries() {
		// Five content words, two in corpus: score 0.4 lands in the high tier.
		let medium_high = validate(
			&cfg(),
			"subsidy deadline elephants giraffes zebras",
			&corpus(&["subsidy deadline"]),
			&[],
		);

		assert_eq!(medium_high.confidence, Confidence::High);

		// One of four content words: 0.25 is the medium boundary.
		let medium = validate(
			&cfg(),
			"subsidy elephants giraffes zebras",
			&corpus(&["subsidy"]),
			&[],
		);

		assert_eq!(medium.confidence, Confidence::Medium);
		assert!(medium.is_grounded);
	}
}
