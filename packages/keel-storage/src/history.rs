use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::ChatTurn};

const TURN_COLUMNS: &str = "turn_id, user_id, question, answer, sources, succeeded, created_at";

#[derive(Debug, Clone)]
pub struct NewTurn<'a> {
	pub user_id: &'a str,
	pub question: &'a str,
	pub answer: &'a str,
	pub sources: &'a [String],
	pub succeeded: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryStats {
	pub total: i64,
	pub succeeded: i64,
}
impl HistoryStats {
	pub fn success_rate(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}

		self.succeeded as f64 / self.total as f64 * 100.0
	}
}

/// Persists one turn. Unlike reads, write failures propagate so the caller can decide
/// whether the answer is still worth returning.
pub async fn append(db: &Db, turn: NewTurn<'_>) -> Result<Uuid> {
	let turn_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO chat_turns (turn_id, user_id, question, answer, sources, succeeded, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(turn_id)
	.bind(turn.user_id)
	.bind(turn.question)
	.bind(turn.answer)
	.bind(serde_json::json!(turn.sources))
	.bind(turn.succeeded)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(turn_id)
}

/// Up to `limit` most recent successful turns, returned oldest first.
pub async fn recent_window(db: &Db, user_id: &str, limit: u32) -> Result<Vec<ChatTurn>> {
	let mut turns: Vec<ChatTurn> = sqlx::query_as(&format!(
		"\
SELECT {TURN_COLUMNS}
FROM chat_turns
WHERE user_id = $1 AND succeeded
ORDER BY created_at DESC
LIMIT $2",
	))
	.bind(user_id)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	turns.reverse();

	Ok(turns)
}

/// The single most recent successful turn, used for follow-up resolution.
pub async fn last_turn(db: &Db, user_id: &str) -> Result<Option<ChatTurn>> {
	let turn = sqlx::query_as(&format!(
		"\
SELECT {TURN_COLUMNS}
FROM chat_turns
WHERE user_id = $1 AND succeeded
ORDER BY created_at DESC
LIMIT 1",
	))
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(turn)
}

pub async fn clear(db: &Db, user_id: &str) -> Result<u64> {
	let result = sqlx::query("DELETE FROM chat_turns WHERE user_id = $1")
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn stats(db: &Db, user_id: &str) -> Result<HistoryStats> {
	let (total, succeeded): (i64, i64) = sqlx::query_as(
		"\
SELECT count(*), count(*) FILTER (WHERE succeeded)
FROM chat_turns
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_one(&db.pool)
	.await?;

	Ok(HistoryStats { total, succeeded })
}
