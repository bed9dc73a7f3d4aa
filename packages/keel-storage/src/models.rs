use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One persisted question/answer exchange. Append-only; rows are never mutated and
/// only the bulk clear operation deletes them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatTurn {
	pub turn_id: Uuid,
	pub user_id: String,
	pub question: String,
	pub answer: String,
	pub sources: Value,
	pub succeeded: bool,
	pub created_at: OffsetDateTime,
}
impl ChatTurn {
	/// The jsonb column holds an array of source identifiers; anything else reads as
	/// empty rather than failing the turn.
	pub fn source_ids(&self) -> Vec<String> {
		self.sources
			.as_array()
			.map(|values| {
				values.iter().filter_map(|value| value.as_str().map(str::to_string)).collect()
			})
			.unwrap_or_default()
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfile {
	pub user_id: String,
	pub name: Option<String>,
	pub location: Option<String>,
	pub occupation: Option<String>,
	pub income: Option<String>,
	pub age: Option<i32>,
	pub category: Option<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserMemory {
	pub user_id: String,
	pub memory_key: String,
	pub memory_value: String,
	pub source: String,
	pub confidence: f32,
	pub updated_at: OffsetDateTime,
}
