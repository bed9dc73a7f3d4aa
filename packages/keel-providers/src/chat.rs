// std
use std::time::Duration as StdDuration;

// crates.io
use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// One OpenAI-compatible chat-completion round trip. The configured `timeout_ms` bounds
/// the whole call; a timeout surfaces as an error like any other transport failure.
pub async fn chat_completion(
	cfg: &keel_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<String> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	extract_content(&json)
}

fn extract_content(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Chat completion response is missing message content."))?;

	Ok(content.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_first_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "Scheme X offers Y." } },
				{ "message": { "content": "ignored" } }
			]
		});

		assert_eq!(extract_content(&json).expect("parse failed"), "Scheme X offers Y.");
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(extract_content(&json).is_err());
	}
}
