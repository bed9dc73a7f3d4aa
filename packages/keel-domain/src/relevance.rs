use std::collections::HashSet;

use crate::text;

const JACCARD_WEIGHT: f32 = 0.6;
const TERM_FREQUENCY_WEIGHT: f32 = 0.4;

/// Deterministic keyword relevance of one candidate against a pre-tokenized query.
///
/// Blends Jaccard similarity of the token sets with a term-frequency ratio (query-token
/// occurrences over candidate length), so a long candidate that merely mentions a query
/// word once does not outrank a short, dense one.
pub fn keyword_score(query_tokens: &HashSet<String>, candidate: &str) -> f32 {
	if query_tokens.is_empty() {
		return 0.0;
	}

	let candidate_tokens = text::tokenize(candidate);
	let candidate_set: HashSet<&str> =
		candidate_tokens.iter().map(String::as_str).collect();
	let intersection =
		query_tokens.iter().filter(|token| candidate_set.contains(token.as_str())).count();
	let union = query_tokens.len() + candidate_set.len() - intersection;
	let jaccard = if union == 0 { 0.0 } else { intersection as f32 / union as f32 };

	let occurrences = candidate_tokens
		.iter()
		.filter(|token| query_tokens.contains(token.as_str()))
		.count();
	let term_frequency = occurrences as f32 / candidate_tokens.len().max(1) as f32;

	JACCARD_WEIGHT * jaccard + TERM_FREQUENCY_WEIGHT * term_frequency
}

/// Scores every candidate independently against the query. Output is index-aligned
/// with the input.
pub fn keyword_scores<S>(query: &str, candidates: &[S]) -> Vec<f32>
where
	S: AsRef<str>,
{
	let query_tokens: HashSet<String> = text::tokenize(query).into_iter().collect();

	candidates
		.iter()
		.map(|candidate| keyword_score(&query_tokens, candidate.as_ref()))
		.collect()
}
