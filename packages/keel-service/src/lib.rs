pub mod ask;
pub mod context;
pub mod history;
pub mod profile;
pub mod rerank;
pub mod resolve;
pub mod validate;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use keel_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, RerankProviderConfig};
use keel_storage::{db::Db, qdrant::QdrantStore};

pub use ask::{AskRequest, AskResponse};
pub use context::{ContextBuilder, DOCUMENTS_LABEL, HISTORY_LABEL, USER_CONTEXT_LABEL};
pub use history::{NewTurn, TurnRecord};
pub use rerank::{NEUTRAL_RANK_SCORE, Passage};
pub use resolve::{Intent, PersonalAttributes, Resolution};
pub use validate::{Confidence, FALLBACK_ANSWER, ValidationFlag, ValidationResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence of conversation turns: append-only writes, bounded reads.
pub trait HistoryStore
where
	Self: Send + Sync,
{
	fn append<'a>(
		&'a self,
		user_id: &'a str,
		turn: &'a NewTurn,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
	fn recent_window<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<TurnRecord>>>;
	fn last_turn<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<TurnRecord>>>;
}

/// Per-user attribute store: merge extracted attributes, render the prompt block.
pub trait ProfileStore
where
	Self: Send + Sync,
{
	fn merge<'a>(
		&'a self,
		user_id: &'a str,
		attributes: &'a PersonalAttributes,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
	fn render_context<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Coarse retrieval over the user's document set. Zero results is a valid outcome.
pub trait DocumentIndex
where
	Self: Send + Sync,
{
	fn retrieve<'a>(
		&'a self,
		search_query: &'a str,
		user_id: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Passage>>>;
}

pub trait ResolverProvider
where
	Self: Send + Sync,
{
	fn resolve<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		query: &'a str,
		context: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Relevance scoring for the reranker, index-aligned with its input. Implementations
/// may be remote; the rerank contract falls back to the keyword baseline on failure.
pub trait RerankScorer
where
	Self: Send + Sync,
{
	fn score<'a>(
		&'a self,
		query: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

/// Shared collaborator instances, injected at construction so the orchestrator stays
/// unit-testable with fakes.
#[derive(Clone)]
pub struct Collaborators {
	pub history: Arc<dyn HistoryStore>,
	pub profiles: Arc<dyn ProfileStore>,
	pub index: Arc<dyn DocumentIndex>,
	pub resolver: Arc<dyn ResolverProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub rerank: Arc<dyn RerankScorer>,
}
impl Collaborators {
	/// Production wiring: Postgres history/profiles, Qdrant + embedding retrieval,
	/// chat-completion providers, and the configured rerank scorer.
	pub fn with_default_backends(cfg: &Config, db: Db) -> Result<Self> {
		let qdrant = QdrantStore::new(&cfg.storage.qdrant)?;
		let rerank: Arc<dyn RerankScorer> = match cfg.providers.rerank.as_ref() {
			Some(provider_cfg) => Arc::new(RemoteRerankScorer { cfg: provider_cfg.clone() }),
			None => Arc::new(KeywordScorer),
		};
		let provider = Arc::new(DefaultProviders);

		Ok(Self {
			history: Arc::new(PgHistoryStore { db: db.clone() }),
			profiles: Arc::new(PgProfileStore { db: db.clone() }),
			index: Arc::new(QdrantDocumentIndex {
				qdrant,
				embedding: cfg.providers.embedding.clone(),
			}),
			resolver: provider.clone(),
			generation: provider,
			rerank,
		})
	}
}

pub struct ChatService {
	pub cfg: Config,
	pub collaborators: Collaborators,
}
impl ChatService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let collaborators = Collaborators::with_default_backends(&cfg, db)?;

		Ok(Self { cfg, collaborators })
	}

	pub fn with_collaborators(cfg: Config, collaborators: Collaborators) -> Self {
		Self { cfg, collaborators }
	}
}

struct DefaultProviders;

impl ResolverProvider for DefaultProviders {
	fn resolve<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(keel_providers::resolver::resolve(cfg, messages))
	}
}

impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		query: &'a str,
		context: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(keel_providers::generate::generate(cfg, query, context))
	}
}

/// Deterministic baseline scorer: Jaccard blended with term frequency.
pub struct KeywordScorer;

impl RerankScorer for KeywordScorer {
	fn score<'a>(
		&'a self,
		query: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async move { Ok(keel_domain::relevance::keyword_scores(query, texts)) })
	}
}

/// Remote cross-encoder scorer; swaps in for the baseline without changing the rerank
/// contract.
pub struct RemoteRerankScorer {
	pub cfg: RerankProviderConfig,
}

impl RerankScorer for RemoteRerankScorer {
	fn score<'a>(
		&'a self,
		query: &'a str,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(keel_providers::rerank::score(&self.cfg, query, texts))
	}
}

pub struct PgHistoryStore {
	pub db: Db,
}

impl HistoryStore for PgHistoryStore {
	fn append<'a>(
		&'a self,
		user_id: &'a str,
		turn: &'a NewTurn,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			keel_storage::history::append(
				&self.db,
				keel_storage::history::NewTurn {
					user_id,
					question: &turn.question,
					answer: &turn.answer,
					sources: &turn.sources,
					succeeded: turn.succeeded,
				},
			)
			.await?;

			Ok(())
		})
	}

	fn recent_window<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<TurnRecord>>> {
		Box::pin(async move {
			let turns = keel_storage::history::recent_window(&self.db, user_id, limit).await?;

			Ok(turns.into_iter().map(turn_record).collect())
		})
	}

	fn last_turn<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<TurnRecord>>> {
		Box::pin(async move {
			let turn = keel_storage::history::last_turn(&self.db, user_id).await?;

			Ok(turn.map(turn_record))
		})
	}
}

pub struct PgProfileStore {
	pub db: Db,
}

impl ProfileStore for PgProfileStore {
	fn merge<'a>(
		&'a self,
		user_id: &'a str,
		attributes: &'a PersonalAttributes,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let pairs = attributes.as_pairs();

			keel_storage::profile::merge_attributes(&self.db, user_id, &pairs).await?;

			Ok(())
		})
	}

	fn render_context<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let user_profile = keel_storage::profile::fetch_profile(&self.db, user_id).await?;
			let memories = keel_storage::profile::memories(&self.db, user_id).await?;

			Ok(profile::format_user_context(user_profile.as_ref(), &memories))
		})
	}
}

pub struct QdrantDocumentIndex {
	pub qdrant: QdrantStore,
	pub embedding: EmbeddingProviderConfig,
}

impl DocumentIndex for QdrantDocumentIndex {
	fn retrieve<'a>(
		&'a self,
		search_query: &'a str,
		user_id: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Passage>>> {
		Box::pin(async move {
			let vector =
				keel_providers::embedding::embed_query(&self.embedding, search_query).await?;
			let chunks = self.qdrant.search_chunks(vector, user_id, top_k).await?;

			Ok(chunks
				.into_iter()
				.map(|chunk| Passage {
					text: chunk.text,
					source_id: chunk.source,
					rank_score: chunk.score,
				})
				.collect())
		})
	}
}

fn turn_record(turn: keel_storage::models::ChatTurn) -> TurnRecord {
	let sources = turn.source_ids();

	TurnRecord {
		question: turn.question,
		answer: turn.answer,
		sources,
		succeeded: turn.succeeded,
		created_at: turn.created_at,
	}
}
