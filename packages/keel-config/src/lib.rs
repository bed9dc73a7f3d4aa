mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, History, LlmProviderConfig, Postgres, Providers, Qdrant,
	RerankProviderConfig, Retrieval, Service, Storage, Validation,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() || cfg.storage.qdrant.collection.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "storage.qdrant.url and storage.qdrant.collection must be non-empty."
				.to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, cfg) in
		[("resolver", &cfg.providers.resolver), ("generation", &cfg.providers.generation)]
	{
		if cfg.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if cfg.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
		if cfg.max_tokens == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} max_tokens must be greater than zero."),
			});
		}
		if !cfg.temperature.is_finite() || !(0.0..=2.0).contains(&cfg.temperature) {
			return Err(Error::Validation {
				message: format!("Provider {label} temperature must be in the range 0.0-2.0."),
			});
		}
	}

	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "Provider embedding timeout_ms must be greater than zero.".to_string(),
		});
	}

	if let Some(rerank) = cfg.providers.rerank.as_ref() {
		if rerank.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "Provider rerank api_key must be non-empty.".to_string(),
			});
		}
		if rerank.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "Provider rerank timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	if cfg.history.verbatim_count == 0 {
		return Err(Error::Validation {
			message: "history.verbatim_count must be greater than zero.".to_string(),
		});
	}
	if cfg.history.summary_threshold < cfg.history.verbatim_count {
		return Err(Error::Validation {
			message: "history.summary_threshold must not be less than history.verbatim_count."
				.to_string(),
		});
	}
	if let Some(limit) = cfg.history.fetch_limit
		&& limit <= cfg.history.verbatim_count
	{
		return Err(Error::Validation {
			message: "history.fetch_limit must be greater than history.verbatim_count."
				.to_string(),
		});
	}

	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.rerank_keep == 0 {
		return Err(Error::Validation {
			message: "retrieval.rerank_keep must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.rerank_keep > cfg.retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.rerank_keep must not exceed retrieval.top_k.".to_string(),
		});
	}

	for (label, ratio) in [
		("validation.min_grounding_ratio", cfg.validation.min_grounding_ratio),
		("validation.high_confidence_ratio", cfg.validation.high_confidence_ratio),
		("validation.medium_confidence_ratio", cfg.validation.medium_confidence_ratio),
	] {
		if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}
	if cfg.validation.medium_confidence_ratio > cfg.validation.high_confidence_ratio {
		return Err(Error::Validation {
			message:
				"validation.medium_confidence_ratio must not exceed validation.high_confidence_ratio."
					.to_string(),
		});
	}
	if cfg.validation.min_answer_chars == 0 {
		return Err(Error::Validation {
			message: "validation.min_answer_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.history.fetch_limit == Some(0) {
		cfg.history.fetch_limit = None;
	}
	if cfg
		.providers
		.rerank
		.as_ref()
		.map(|rerank| rerank.api_base.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.rerank = None;
	}
}
