use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub history: History,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub validation: Validation,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub resolver: LlmProviderConfig,
	pub generation: LlmProviderConfig,
	pub embedding: EmbeddingProviderConfig,
	pub rerank: Option<RerankProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Conversation-history window policy. The fetch window is sized larger than the
/// verbatim tail so summarization has material to work with; `fetch_limit` pins it
/// explicitly when set.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct History {
	pub verbatim_count: u32,
	pub summary_threshold: u32,
	pub fetch_limit: Option<u32>,
}
impl Default for History {
	fn default() -> Self {
		Self { verbatim_count: 5, summary_threshold: 8, fetch_limit: None }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	pub rerank_keep: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 5, rerank_keep: 3 }
	}
}

/// Grounding-gate tunables. The ratios are inherited operating points, not validated
/// optima; treat them as configuration to tune, not constants.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Validation {
	pub min_grounding_ratio: f32,
	pub min_answer_chars: u32,
	pub high_confidence_ratio: f32,
	pub medium_confidence_ratio: f32,
}
impl Default for Validation {
	fn default() -> Self {
		Self {
			min_grounding_ratio: 0.10,
			min_answer_chars: 10,
			high_confidence_ratio: 0.40,
			medium_confidence_ratio: 0.25,
		}
	}
}
