use std::cmp::Ordering;

use crate::RerankScorer;

/// Score assigned when the candidate set is too small to trim: no reordering work is
/// wasted on it, and downstream consumers still see a defined maximal score.
pub const NEUTRAL_RANK_SCORE: f32 = 1.0;

/// One retrieved document chunk. `rank_score` carries no meaning until the passage has
/// been through [`rerank`]; after it, passages are strictly ordered by descending score.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
	pub text: String,
	pub source_id: String,
	pub rank_score: f32,
}
impl Passage {
	pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
		Self { text: text.into(), source_id: source_id.into(), rank_score: 0.0 }
	}
}

/// Improves precision of an over-fetched candidate set before context assembly.
///
/// Sets at or below `keep` pass through untouched (neutral scores, original order).
/// Larger sets are scored, stably sorted descending, and truncated to `keep`. A
/// failing or misaligned scorer degrades to the deterministic keyword baseline; the
/// contract never turns into an error.
pub async fn rerank(
	scorer: &dyn RerankScorer,
	query: &str,
	mut candidates: Vec<Passage>,
	keep: usize,
) -> Vec<Passage> {
	if candidates.is_empty() {
		return candidates;
	}
	if candidates.len() <= keep {
		for passage in &mut candidates {
			passage.rank_score = NEUTRAL_RANK_SCORE;
		}

		return candidates;
	}

	let texts: Vec<String> = candidates.iter().map(|passage| passage.text.clone()).collect();
	let scores = match scorer.score(query, &texts).await {
		Ok(scores) if scores.len() == candidates.len() => scores,
		Ok(scores) => {
			tracing::warn!(
				expected = candidates.len(),
				returned = scores.len(),
				"Scorer returned a misaligned score set; using the keyword baseline."
			);

			keel_domain::relevance::keyword_scores(query, &texts)
		},
		Err(err) => {
			tracing::warn!(error = %err, "Scorer failed; using the keyword baseline.");

			keel_domain::relevance::keyword_scores(query, &texts)
		},
	};
	let mut order: Vec<usize> = (0..candidates.len()).collect();

	// Stable sort: equal scores keep original candidate order.
	order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

	order
		.into_iter()
		.take(keep)
		.map(|index| {
			let mut passage = candidates[index].clone();

			passage.rank_score = scores[index];

			passage
		})
		.collect()
}
