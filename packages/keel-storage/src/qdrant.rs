use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, value::Kind,
};

use crate::Result;

/// One retrieved document chunk with its coarse retrieval score. Chunk text and the
/// originating document name live in the point payload.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
	pub text: String,
	pub source: String,
	pub score: f32,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &keel_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Dense nearest-neighbor search scoped to one user's documents. Zero results is a
	/// valid outcome, not an error.
	pub async fn search_chunks(
		&self,
		vector: Vec<f32>,
		user_id: &str,
		top_k: u32,
	) -> Result<Vec<ScoredChunk>> {
		let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.filter(filter)
			.with_payload(true)
			.limit(u64::from(top_k));
		let response = self.client.query(search).await?;
		let chunks = response
			.result
			.iter()
			.filter_map(|point| {
				let text = payload_str(point, "text")?;

				if text.trim().is_empty() {
					return None;
				}

				let source = payload_str(point, "source").unwrap_or_else(|| "unknown".to_string());

				Some(ScoredChunk { text, source, score: point.score })
			})
			.collect();

		Ok(chunks)
	}
}

fn payload_str(point: &ScoredPoint, key: &str) -> Option<String> {
	point.payload.get(key).and_then(|value| match value.kind.as_ref() {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	})
}
