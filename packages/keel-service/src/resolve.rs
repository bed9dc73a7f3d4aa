use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::TurnRecord;

const LAST_ANSWER_MAX_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Question,
	Followup,
	Greeting,
	Clarification,
	PersonalUpdate,
}
impl Intent {
	fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"question" => Some(Self::Question),
			"followup" => Some(Self::Followup),
			"greeting" => Some(Self::Greeting),
			"clarification" => Some(Self::Clarification),
			"personal_update" => Some(Self::PersonalUpdate),
			_ => None,
		}
	}
}

/// Personal details explicitly stated in the current message. Only the recognized
/// fields survive extraction.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PersonalAttributes {
	pub name: Option<String>,
	pub location: Option<String>,
	pub occupation: Option<String>,
	pub income: Option<String>,
	pub age: Option<String>,
	pub category: Option<String>,
}
impl PersonalAttributes {
	pub fn is_empty(&self) -> bool {
		self.as_pairs().is_empty()
	}

	pub fn as_pairs(&self) -> Vec<(String, String)> {
		[
			("name", &self.name),
			("location", &self.location),
			("occupation", &self.occupation),
			("income", &self.income),
			("age", &self.age),
			("category", &self.category),
		]
		.into_iter()
		.filter_map(|(key, value)| {
			value
				.as_deref()
				.map(str::trim)
				.filter(|value| !value.is_empty())
				.map(|value| (key.to_string(), value.to_string()))
		})
		.collect()
	}

	fn from_value(value: &Value) -> Self {
		let Some(object) = value.as_object() else {
			return Self::default();
		};
		let field = |key: &str| -> Option<String> {
			let value = object.get(key)?;

			// Models occasionally emit numbers for age or income; coerce rather than drop.
			match value {
				Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
				Value::Number(number) => Some(number.to_string()),
				_ => None,
			}
		};

		Self {
			name: field("name"),
			location: field("location"),
			occupation: field("occupation"),
			income: field("income"),
			age: field("age"),
			category: field("category"),
		}
	}
}

/// The resolver's output: a canonical intent and a self-contained search query. On any
/// extraction failure the chain falls back to [`fallback`] instead of blocking.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
	pub intent: Intent,
	pub search_query: String,
	pub is_followup: bool,
	pub attributes: PersonalAttributes,
}

pub fn fallback(query: &str, has_history: bool) -> Resolution {
	Resolution {
		intent: Intent::Question,
		search_query: query.to_string(),
		is_followup: has_history,
		attributes: PersonalAttributes::default(),
	}
}

/// Chat messages for the extraction call. The last exchange is embedded explicitly so
/// vague follow-ups ("tell me more", "what about eligibility?") can be fused with the
/// prior topic rather than searched literally.
pub fn build_messages(query: &str, last: Option<&TurnRecord>, history_context: &str) -> Vec<Value> {
	let mut prompt = String::from(
		"Analyze the current user query and extract structured information. Your most \
		 important job is to produce a good \"search_query\": a fully self-contained search \
		 string for a document index.\n\n",
	);

	if let Some(last) = last {
		prompt.push_str("=== LAST Q&A EXCHANGE ===\n");
		prompt.push_str(&format!("User asked: {}\n", last.question.trim()));
		prompt.push_str(&format!(
			"Assistant answered: {}\n\n",
			truncate_answer(&last.answer)
		));
	} else if !history_context.is_empty() {
		prompt.push_str(&format!("Recent conversation:\n{history_context}\n\n"));
	}

	prompt.push_str(&format!(
		"Current query: \"{query}\"\n\n\
		 Return a JSON object with exactly these fields:\n\
		 {{\n\
		 \x20\x20\"intent\": \"question\" | \"followup\" | \"greeting\" | \"clarification\" | \"personal_update\",\n\
		 \x20\x20\"search_query\": \"<If the current query is vague or a follow-up (for example 'tell me more' or 'what about eligibility?'), rewrite it into a fully self-contained search query by combining it with the topic of the last exchange above. Never return a vague search_query.>\",\n\
		 \x20\x20\"is_followup\": true or false,\n\
		 \x20\x20\"personal_attributes\": {{}}\n\
		 }}\n\n\
		 For personal_attributes, extract any user details explicitly stated in the current \
		 query: name, location, occupation, income, age, category. Only include fields that \
		 are explicitly stated.\n\n\
		 Output ONLY the JSON object, nothing else."
	));

	vec![
		serde_json::json!({
			"role": "system",
			"content": "You are an intent and query extraction engine. You output ONLY valid \
			            JSON. No explanations, no markdown.",
		}),
		serde_json::json!({ "role": "user", "content": prompt }),
	]
}

/// Tolerant projection of the extractor's JSON into a [`Resolution`]. Missing or
/// malformed fields degrade field-by-field toward the fallback values.
pub fn parse_resolution(value: &Value, query: &str, has_history: bool) -> Resolution {
	let intent = value
		.get("intent")
		.and_then(|v| v.as_str())
		.and_then(Intent::parse)
		.unwrap_or(Intent::Question);
	let search_query = value
		.get("search_query")
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.unwrap_or(query)
		.to_string();
	let is_followup =
		value.get("is_followup").and_then(|v| v.as_bool()).unwrap_or(has_history);
	let attributes = value
		.get("personal_attributes")
		.map(PersonalAttributes::from_value)
		.unwrap_or_default();

	Resolution { intent, search_query, is_followup, attributes }
}

fn truncate_answer(answer: &str) -> String {
	let trimmed = answer.trim();

	if trimmed.chars().count() <= LAST_ANSWER_MAX_CHARS {
		return trimmed.to_string();
	}

	let mut truncated: String = trimmed.chars().take(LAST_ANSWER_MAX_CHARS).collect();

	truncated.push('…');

	truncated
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_reads_all_fields() {
		let value = serde_json::json!({
			"intent": "followup",
			"search_query": "Scheme X eligibility criteria",
			"is_followup": true,
			"personal_attributes": { "location": "Kerala", "age": 34 }
		});
		let resolution = parse_resolution(&value, "what about eligibility?", true);

		assert_eq!(resolution.intent, Intent::Followup);
		assert_eq!(resolution.search_query, "Scheme X eligibility criteria");
		assert!(resolution.is_followup);
		assert_eq!(resolution.attributes.location.as_deref(), Some("Kerala"));
		assert_eq!(resolution.attributes.age.as_deref(), Some("34"));
	}

	#[test]
	fn parse_degrades_missing_fields_to_fallback_values() {
		let value = serde_json::json!({ "intent": "mystery" });
		let resolution = parse_resolution(&value, "original query", true);

		assert_eq!(resolution.intent, Intent::Question);
		assert_eq!(resolution.search_query, "original query");
		assert!(resolution.is_followup);
		assert!(resolution.attributes.is_empty());
	}

	#[test]
	fn blank_search_query_falls_back_to_the_raw_query() {
		let value = serde_json::json!({ "intent": "question", "search_query": "   " });
		let resolution = parse_resolution(&value, "what is the refund policy?", false);

		assert_eq!(resolution.search_query, "what is the refund policy?");
	}

	#[test]
	fn fallback_marks_followup_only_with_history() {
		assert!(fallback("q", true).is_followup);
		assert!(!fallback("q", false).is_followup);
	}

	#[test]
	fn messages_embed_the_last_exchange() {
		let last = TurnRecord {
			question: "What is Scheme X?".to_string(),
			answer: "Scheme X offers Y.".to_string(),
			sources: Vec::new(),
			succeeded: true,
			created_at: time::OffsetDateTime::UNIX_EPOCH,
		};
		let messages = build_messages("tell me more about that", Some(&last), "irrelevant");
		let prompt = messages[1]["content"].as_str().expect("user prompt missing");

		assert!(prompt.contains("LAST Q&A EXCHANGE"));
		assert!(prompt.contains("What is Scheme X?"));
		assert!(prompt.contains("tell me more about that"));
		assert!(!prompt.contains("Recent conversation:"));
	}

	#[test]
	fn messages_fall_back_to_history_without_a_last_exchange() {
		let messages = build_messages("and the deadline?", None, "User: ...\nAssistant: ...");
		let prompt = messages[1]["content"].as_str().expect("user prompt missing");

		assert!(prompt.contains("Recent conversation:"));
	}

	#[test]
	fn long_prior_answers_are_truncated_in_the_prompt() {
		let truncated = truncate_answer(&"a".repeat(900));

		assert_eq!(truncated.chars().count(), LAST_ANSWER_MAX_CHARS + 1);
		assert!(truncated.ends_with('…'));
	}
}
