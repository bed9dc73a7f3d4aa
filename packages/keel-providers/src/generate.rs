use color_eyre::{Result, eyre};

use keel_domain::refusal::FALLBACK_ANSWER;

use crate::chat;

/// The generation contract: answer from the labeled context sections, personalize from
/// user context, resolve follow-ups from history, and refuse with the canonical
/// sentence when neither documents nor history cover the question.
fn system_prompt() -> String {
	format!(
		"You are a document-grounded assistant. You answer questions using the provided \
		 [Retrieved Documents] and never fabricate details that are not in the context.\n\n\
		 PERSONALIZATION: If a [User Context] section is present, tailor your answer to the \
		 user's situation (location, occupation, income, category, age) and address the user \
		 by name when known.\n\n\
		 FOLLOW-UPS: If a [Conversation History] section is present, use it to resolve \
		 follow-up questions and pronouns like \"it\" or \"that\". You may reference your own \
		 prior answers for continuity.\n\n\
		 GREETINGS: For greetings, thanks, or conversational messages, respond naturally. No \
		 citations are needed for these.\n\n\
		 CITATIONS: Mention the source document name when quoting from documents.\n\n\
		 Only if the user asks a substantive question and neither the documents nor the \
		 conversation history contain the answer, respond exactly with: \"{FALLBACK_ANSWER}\""
	)
}

fn user_prompt(query: &str, context: &str) -> String {
	format!("Context:\n{}\n\nUser Question:\n{}\n\nAnswer:", context.trim(), query.trim())
}

pub async fn generate(
	cfg: &keel_config::LlmProviderConfig,
	query: &str,
	context: &str,
) -> Result<String> {
	let messages = [
		serde_json::json!({ "role": "system", "content": system_prompt() }),
		serde_json::json!({ "role": "user", "content": user_prompt(query, context) }),
	];
	let content = chat::chat_completion(cfg, &messages).await?;
	let answer = content.trim();

	if answer.is_empty() {
		return Err(eyre::eyre!("Generation response is empty."));
	}

	Ok(answer.to_string())
}
