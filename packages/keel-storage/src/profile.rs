use time::OffsetDateTime;

use crate::{
	Result,
	db::Db,
	models::{UserMemory, UserProfile},
};

/// Attribute keys with a dedicated profile column. Everything else lands only in the
/// key-value memory table.
pub const PROFILE_FIELDS: [&str; 6] =
	["name", "location", "occupation", "income", "age", "category"];

const MERGE_SOURCE: &str = "conversation";
const MERGE_CONFIDENCE: f32 = 0.8;

pub async fn fetch_profile(db: &Db, user_id: &str) -> Result<Option<UserProfile>> {
	let profile = sqlx::query_as(
		"\
SELECT user_id, name, location, occupation, income, age, category, updated_at
FROM user_profiles
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(profile)
}

pub async fn memories(db: &Db, user_id: &str) -> Result<Vec<UserMemory>> {
	let memories = sqlx::query_as(
		"\
SELECT user_id, memory_key, memory_value, source, confidence, updated_at
FROM user_memories
WHERE user_id = $1
ORDER BY updated_at DESC",
	)
	.bind(user_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(memories)
}

/// Merges extracted attribute pairs. Recognized fields update the profile row;
/// every pair is also upserted into key-value memory so nothing said is dropped.
pub async fn merge_attributes(db: &Db, user_id: &str, pairs: &[(String, String)]) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	for (key, value) in pairs {
		let value = value.trim();

		if value.is_empty() {
			continue;
		}

		if PROFILE_FIELDS.contains(&key.as_str()) {
			update_profile_field(db, user_id, key, value, now).await?;
		}

		sqlx::query(
			"\
INSERT INTO user_memories (user_id, memory_key, memory_value, source, confidence, updated_at)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (user_id, memory_key) DO UPDATE
SET
	memory_value = EXCLUDED.memory_value,
	source = EXCLUDED.source,
	confidence = EXCLUDED.confidence,
	updated_at = EXCLUDED.updated_at",
		)
		.bind(user_id)
		.bind(key)
		.bind(value)
		.bind(MERGE_SOURCE)
		.bind(MERGE_CONFIDENCE)
		.bind(now)
		.execute(&db.pool)
		.await?;
	}

	Ok(())
}

async fn update_profile_field(
	db: &Db,
	user_id: &str,
	field: &str,
	value: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	if field == "age" {
		// A non-numeric age is dropped from the profile; the raw text still lands in
		// key-value memory.
		let Ok(age) = value.parse::<i32>() else {
			return Ok(());
		};

		sqlx::query("UPDATE user_profiles SET age = $1, updated_at = $2 WHERE user_id = $3")
			.bind(age)
			.bind(now)
			.bind(user_id)
			.execute(&db.pool)
			.await?;

		return Ok(());
	}

	// `field` comes from the PROFILE_FIELDS whitelist, never from user input.
	sqlx::query(&format!("UPDATE user_profiles SET {field} = $1, updated_at = $2 WHERE user_id = $3"))
		.bind(value)
		.bind(now)
		.bind(user_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}
