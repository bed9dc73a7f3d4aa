use std::sync::LazyLock;

use regex::Regex;

/// Canonical refusal returned whenever an answer cannot be grounded. Every layer that
/// declines emits this exact sentence, so the refusal detector recognizes it too.
pub const FALLBACK_ANSWER: &str =
	"Sorry, this document does not contain enough information to answer that.";

/// Phrasings a generation model uses to decline for lack of context. Kept tolerant of
/// minor wording drift across model versions.
static REFUSAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	[
		r"(?i)sorry.*document.*does\s+not\s+contain",
		r"(?i)sorry.*doesn.t\s+contain\s+enough",
		r"(?i)i\s+don.t\s+have\s+enough\s+information",
		r"(?i)the\s+(provided\s+)?document.*does\s+not\s+(mention|contain|include)",
		r"(?i)no\s+relevant\s+(information|data|content)\s+found",
		r"(?i)cannot\s+answer.*based\s+on.*provided",
	]
	.iter()
	.map(|pattern| Regex::new(pattern).expect("Refusal pattern must compile."))
	.collect()
});

/// Whether the answer is an intentional "insufficient information" refusal. A refusal
/// cannot hallucinate, so callers treat it as grounded by definition.
pub fn is_refusal(answer: &str) -> bool {
	let trimmed = answer.trim();

	REFUSAL_PATTERNS.iter().any(|pattern| pattern.is_match(trimmed))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonical_fallback_is_a_refusal() {
		assert!(is_refusal(FALLBACK_ANSWER));
	}

	#[test]
	fn wording_variants_are_refusals() {
		assert!(is_refusal("Sorry, it doesn't contain enough detail."));
		assert!(is_refusal("I don't have enough information to say."));
		assert!(is_refusal("The provided document does not mention a refund window."));
		assert!(is_refusal("No relevant information found for this query."));
		assert!(is_refusal("I cannot answer that based on the provided context."));
	}

	#[test]
	fn matching_is_case_insensitive() {
		assert!(is_refusal("SORRY, THIS DOCUMENT DOES NOT CONTAIN THAT."));
	}

	#[test]
	fn substantive_answers_are_not_refusals() {
		assert!(!is_refusal("The refund window is thirty days from purchase."));
		assert!(!is_refusal("Scheme X offers a subsidy to registered farmers."));
		assert!(!is_refusal(""));
	}
}
