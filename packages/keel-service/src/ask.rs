use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
	ChatService, Error, Result,
	context::{ContextBuilder, HISTORY_LABEL, USER_CONTEXT_LABEL},
	history::{self, NewTurn, TurnRecord},
	rerank::{self, Passage},
	resolve::{self, Intent, Resolution},
	validate::{self, Confidence, FALLBACK_ANSWER, ValidationFlag},
};

const GREETING_FALLBACK: &str = "Hello! How can I help you?";
const EMPTY_CONTEXT_PLACEHOLDER: &str = "(No documents or history available yet.)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
	pub user_id: String,
	pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
	pub answer: String,
	pub sources: Vec<String>,
	pub success: bool,
	pub message: String,
	pub intent: Intent,
	pub confidence: Confidence,
	pub is_grounded: bool,
	pub flags: Vec<ValidationFlag>,
}

struct Generation {
	answer: String,
	success: bool,
	message: &'static str,
}

impl ChatService {
	/// Runs one question through the full chain. The orchestrator is the last line of
	/// defense: any unexpected failure inside the chain degrades to the canonical
	/// fallback instead of surfacing an error to the caller.
	pub async fn ask(&self, req: AskRequest) -> Result<AskResponse> {
		let user_id = req.user_id.trim();
		let query = req.query.trim();

		if user_id.is_empty() || query.is_empty() {
			return Err(Error::InvalidRequest {
				message: "user_id and query are required.".to_string(),
			});
		}

		info!(%user_id, "Answer chain started.");

		match self.run_chain(user_id, query).await {
			Ok(response) => {
				info!(success = response.success, "Answer chain completed.");

				Ok(response)
			},
			Err(err) => {
				error!(error = %err, "Answer chain failed; returning the fallback answer.");

				Ok(AskResponse {
					answer: FALLBACK_ANSWER.to_string(),
					sources: Vec::new(),
					success: false,
					message: "The request could not be completed.".to_string(),
					intent: Intent::Question,
					confidence: Confidence::None,
					is_grounded: false,
					flags: Vec::new(),
				})
			},
		}
	}

	async fn run_chain(&self, user_id: &str, query: &str) -> Result<AskResponse> {
		// Step 1: conversation history, fetched fresh. Read failures degrade to an
		// empty window; history is an enhancement, not a correctness requirement.
		let fetch_limit = history::fetch_limit(&self.cfg.history);
		let window = match self.collaborators.history.recent_window(user_id, fetch_limit).await {
			Ok(window) => window,
			Err(err) => {
				warn!(error = %err, "History read failed; continuing without history.");

				Vec::new()
			},
		};
		let last = match self.collaborators.history.last_turn(user_id).await {
			Ok(last) => last,
			Err(err) => {
				warn!(error = %err, "Last-turn read failed; continuing without it.");

				None
			},
		};
		let history_context = history::format_history_context(&window, &self.cfg.history);

		info!(turns = window.len(), has_last = last.is_some(), "History window loaded.");

		// Step 2: intent and search-query resolution, with the last exchange passed
		// explicitly so follow-ups resolve against it.
		let resolution = self.resolve_query(query, last.as_ref(), &history_context).await;

		info!(
			intent = ?resolution.intent,
			followup = resolution.is_followup,
			search_query = %resolution.search_query,
			"Query resolved."
		);

		// Step 3: merge extracted attributes immediately, before anything can fail,
		// so stated information is not lost.
		if !resolution.attributes.is_empty() {
			if let Err(err) =
				self.collaborators.profiles.merge(user_id, &resolution.attributes).await
			{
				warn!(error = %err, "Personal attribute merge failed.");
			}
		}

		// Step 4: user-attribute context.
		let user_context = match self.collaborators.profiles.render_context(user_id).await {
			Ok(context) => context,
			Err(err) => {
				warn!(error = %err, "User context render failed; continuing without it.");

				String::new()
			},
		};

		// Step 5: greetings skip retrieval entirely.
		if resolution.intent == Intent::Greeting {
			return self.answer_greeting(user_id, query, &history_context, &user_context).await;
		}

		// Step 6: retrieval runs on the rewritten query, scoped to this user.
		let candidates = match self
			.collaborators
			.index
			.retrieve(&resolution.search_query, user_id, self.cfg.retrieval.top_k)
			.await
		{
			Ok(candidates) => candidates,
			Err(err) => {
				warn!(error = %err, "Retrieval failed; treating as no relevant content.");

				Vec::new()
			},
		};

		info!(candidates = candidates.len(), "Passages retrieved.");

		// Step 7: with neither passages nor history there is nothing to ground an
		// answer in; refuse at the source instead of generating.
		if candidates.is_empty() && history_context.is_empty() {
			return self.answer_no_material(user_id, query, resolution.intent).await;
		}

		let sources = dedup_sources(&candidates);

		// Step 8: rerank.
		let ranked = if candidates.is_empty() {
			Vec::new()
		} else {
			rerank::rerank(
				&*self.collaborators.rerank,
				&resolution.search_query,
				candidates,
				self.cfg.retrieval.rerank_keep as usize,
			)
			.await
		};

		info!(kept = ranked.len(), "Passages reranked.");

		// Step 9: layered context, fixed order.
		let mut builder = ContextBuilder::new();

		builder.push_section(USER_CONTEXT_LABEL, &user_context);
		builder.push_section(HISTORY_LABEL, &history_context);
		builder.push_documents(&ranked);

		let context = builder.build();

		// Step 10: generation gets the user's literal question; the rewrite was for
		// retrieval only.
		let generation = self.generate(query, &context).await;

		// Step 11: grounding validation over the same three context sources.
		let mut corpus: Vec<String> =
			ranked.iter().map(|passage| passage.text.clone()).collect();

		if !history_context.is_empty() {
			corpus.push(history_context.clone());
		}
		if !user_context.is_empty() {
			corpus.push(user_context.clone());
		}

		let validation =
			validate::validate(&self.cfg.validation, &generation.answer, &corpus, &sources);

		info!(
			grounded = validation.is_grounded,
			score = validation.grounding_score,
			confidence = ?validation.confidence,
			"Answer validated."
		);

		// Step 12: persist; a write failure must never withhold a correct answer.
		self.persist_turn(user_id, query, &validation.final_answer, &sources, validation.is_valid)
			.await;

		// Step 13.
		Ok(AskResponse {
			answer: validation.final_answer.clone(),
			sources,
			success: generation.success,
			message: generation.message.to_string(),
			intent: resolution.intent,
			confidence: validation.confidence,
			is_grounded: validation.is_grounded,
			flags: validation.flags,
		})
	}

	async fn resolve_query(
		&self,
		query: &str,
		last: Option<&TurnRecord>,
		history_context: &str,
	) -> Resolution {
		let messages = resolve::build_messages(query, last, history_context);

		match self
			.collaborators
			.resolver
			.resolve(&self.cfg.providers.resolver, &messages)
			.await
		{
			Ok(value) => resolve::parse_resolution(&value, query, !history_context.is_empty()),
			Err(err) => {
				warn!(error = %err, "Query resolution failed; using the deterministic fallback.");

				resolve::fallback(query, !history_context.is_empty())
			},
		}
	}

	/// Early exit A: social openers answer from history and user context alone.
	/// Retrieval would waste a round trip and risk spurious low-grounding flags.
	async fn answer_greeting(
		&self,
		user_id: &str,
		query: &str,
		history_context: &str,
		user_context: &str,
	) -> Result<AskResponse> {
		let mut builder = ContextBuilder::new();

		builder.push_section(USER_CONTEXT_LABEL, user_context);
		builder.push_section(HISTORY_LABEL, history_context);

		let context = if builder.is_empty() {
			EMPTY_CONTEXT_PLACEHOLDER.to_string()
		} else {
			builder.build()
		};
		let answer = match self
			.collaborators
			.generation
			.generate(&self.cfg.providers.generation, query, &context)
			.await
		{
			Ok(answer) => answer,
			Err(err) => {
				warn!(error = %err, "Greeting generation failed; using the fixed greeting.");

				GREETING_FALLBACK.to_string()
			},
		};

		self.persist_turn(user_id, query, &answer, &[], true).await;

		Ok(AskResponse {
			answer,
			sources: Vec::new(),
			success: true,
			message: "Greeting handled.".to_string(),
			intent: Intent::Greeting,
			confidence: Confidence::High,
			is_grounded: true,
			flags: vec![ValidationFlag::Greeting],
		})
	}

	/// Early exit B: nothing retrieved and no history means nothing to ground an
	/// answer in. The generation service is never called.
	async fn answer_no_material(
		&self,
		user_id: &str,
		query: &str,
		intent: Intent,
	) -> Result<AskResponse> {
		info!("No passages and no history; returning the fallback without generation.");

		self.persist_turn(user_id, query, FALLBACK_ANSWER, &[], false).await;

		Ok(AskResponse {
			answer: FALLBACK_ANSWER.to_string(),
			sources: Vec::new(),
			success: true,
			message: "No relevant information found.".to_string(),
			intent,
			confidence: Confidence::High,
			is_grounded: true,
			flags: vec![ValidationFlag::NoDocuments],
		})
	}

	async fn generate(&self, query: &str, context: &str) -> Generation {
		match self
			.collaborators
			.generation
			.generate(&self.cfg.providers.generation, query, context)
			.await
		{
			Ok(answer) => Generation { answer, success: true, message: "Answer generated." },
			Err(err) => {
				warn!(error = %err, "Generation failed; falling back.");

				Generation {
					answer: FALLBACK_ANSWER.to_string(),
					success: false,
					message: "The answer service was unavailable.",
				}
			},
		}
	}

	async fn persist_turn(
		&self,
		user_id: &str,
		question: &str,
		answer: &str,
		sources: &[String],
		succeeded: bool,
	) {
		let turn = NewTurn {
			question: question.to_string(),
			answer: answer.to_string(),
			sources: sources.to_vec(),
			succeeded,
		};

		if let Err(err) = self.collaborators.history.append(user_id, &turn).await {
			error!(error = %err, "Failed to persist the conversation turn.");
		}
	}
}

fn dedup_sources(candidates: &[Passage]) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	let mut sources = Vec::new();

	for passage in candidates {
		if passage.source_id.trim().is_empty() {
			continue;
		}
		if seen.insert(passage.source_id.as_str()) {
			sources.push(passage.source_id.clone());
		}
	}

	sources
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sources_deduplicate_in_first_seen_order() {
		let candidates = vec![
			Passage::new("a", "b.pdf"),
			Passage::new("b", "a.pdf"),
			Passage::new("c", "b.pdf"),
			Passage::new("d", ""),
		];

		assert_eq!(dedup_sources(&candidates), vec!["b.pdf", "a.pdf"]);
	}
}
