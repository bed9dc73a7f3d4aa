use color_eyre::{Result, eyre};
use serde_json::Value;

use crate::chat;

/// Structured extraction over chat completions. The model is instructed to emit bare
/// JSON, but real responses arrive wrapped in markdown fences or prose often enough
/// that parsing retries the request a bounded number of times before giving up.
pub async fn resolve(cfg: &keel_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	for _ in 0..3 {
		let content = chat::chat_completion(cfg, messages).await?;

		if let Ok(parsed) = parse_structured_content(&content) {
			return Ok(parsed);
		}
	}

	Err(eyre::eyre!("Resolver response is not valid JSON."))
}

pub fn parse_structured_content(content: &str) -> Result<Value> {
	let stripped = strip_fences(content);

	if let Ok(parsed) = serde_json::from_str::<Value>(stripped)
		&& parsed.is_object()
	{
		return Ok(parsed);
	}

	// Last resort: carve the outermost object out of surrounding prose.
	if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}'))
		&& start < end
		&& let Ok(parsed) = serde_json::from_str::<Value>(&stripped[start..=end])
		&& parsed.is_object()
	{
		return Ok(parsed);
	}

	Err(eyre::eyre!("Resolver content is not a JSON object."))
}

fn strip_fences(raw: &str) -> &str {
	let trimmed = raw.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
	let body = body.trim_end();

	body.strip_suffix("```").unwrap_or(body).trim()
}
