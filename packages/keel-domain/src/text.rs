use std::{
	collections::HashSet,
	sync::LazyLock,
};

/// Function words excluded from grounding comparisons. Shared vocabulary between an
/// answer and its corpus only counts when it carries content.
const STOP_WORDS: &[&str] = &[
	"a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
	"do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
	"could", "i", "me", "my", "we", "our", "you", "your", "he", "him", "his", "she", "her", "it",
	"its", "they", "them", "their", "what", "which", "who", "whom", "this", "that", "these",
	"those", "am", "at", "by", "for", "with", "about", "against", "between", "through", "during",
	"before", "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off",
	"over", "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
	"how", "all", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor",
	"not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "just", "don", "now",
	"also", "of", "and", "or", "but", "if",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
	LazyLock::new(|| STOP_WORDS.iter().copied().collect());

fn is_token_char(ch: char) -> bool {
	ch.is_alphanumeric() || ch == '_'
}

/// Lowercase word tokens, in order, duplicates preserved.
pub fn tokenize(text: &str) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if is_token_char(ch) {
			normalized.extend(ch.to_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	normalized.split_whitespace().map(str::to_string).collect()
}

pub fn is_stop_word(token: &str) -> bool {
	STOP_WORD_SET.contains(token)
}

/// Tokens that act as a proxy for semantic content: lowercased, stop-words removed,
/// longer than two characters.
pub fn content_words(text: &str) -> Vec<String> {
	tokenize(text)
		.into_iter()
		.filter(|token| token.chars().count() > 2 && !is_stop_word(token))
		.collect()
}

pub fn content_word_set(text: &str) -> HashSet<String> {
	content_words(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokenize_lowercases_and_splits_on_punctuation() {
		assert_eq!(
			tokenize("The Scheme-X offers, you know, 20% subsidy!"),
			vec!["the", "scheme", "x", "offers", "you", "know", "20", "subsidy"]
		);
	}

	#[test]
	fn tokenize_of_empty_input_is_empty() {
		assert!(tokenize("").is_empty());
		assert!(tokenize("  ...  ").is_empty());
	}

	#[test]
	fn content_words_drop_stop_words_and_short_tokens() {
		let words = content_words("The policy is about an income subsidy for you");

		assert_eq!(words, vec!["policy", "income", "subsidy"]);
	}

	#[test]
	fn content_word_set_deduplicates() {
		let set = content_word_set("subsidy subsidy policy");

		assert_eq!(set.len(), 2);
		assert!(set.contains("subsidy"));
		assert!(set.contains("policy"));
	}
}
