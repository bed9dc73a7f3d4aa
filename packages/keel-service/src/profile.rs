use keel_storage::models::{UserMemory, UserProfile};

const HEADER: &str = "USER PROFILE (personalize the answer using this data):\n\
	Tailor the response to the details below: explain eligibility for the user's \
	specific situation, mention location-specific provisions when relevant, and address \
	the user by name if known.\n";

/// Renders the user-attribute prompt block: profile fields in a fixed order, then any
/// extra key-value memories. Nothing known renders as an empty string so the section
/// is dropped from the layered context entirely.
pub fn format_user_context(user_profile: Option<&UserProfile>, memories: &[UserMemory]) -> String {
	let mut lines = Vec::new();

	if let Some(user_profile) = user_profile {
		let fields = [
			("name", user_profile.name.as_deref().map(str::to_string)),
			("location", user_profile.location.as_deref().map(str::to_string)),
			("occupation", user_profile.occupation.as_deref().map(str::to_string)),
			("income", user_profile.income.as_deref().map(str::to_string)),
			("age", user_profile.age.map(|age| age.to_string())),
			("category", user_profile.category.as_deref().map(str::to_string)),
		];

		for (key, value) in fields {
			if let Some(value) = value.as_deref().map(str::trim).filter(|value| !value.is_empty())
			{
				lines.push(format!("  {key}: {value}"));
			}
		}
	}

	for memory in memories {
		if keel_storage::profile::PROFILE_FIELDS.contains(&memory.memory_key.as_str()) {
			continue;
		}

		let value = memory.memory_value.trim();

		if value.is_empty() {
			continue;
		}

		lines.push(format!("  {}: {value}", memory.memory_key));
	}

	if lines.is_empty() {
		return String::new();
	}

	format!("{HEADER}{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
	use time::OffsetDateTime;

	use super::*;

	fn user_profile() -> UserProfile {
		UserProfile {
			user_id: "u1".to_string(),
			name: Some("Asha".to_string()),
			location: Some("Kerala".to_string()),
			occupation: None,
			income: None,
			age: Some(34),
			category: None,
			updated_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	fn memory(key: &str, value: &str) -> UserMemory {
		UserMemory {
			user_id: "u1".to_string(),
			memory_key: key.to_string(),
			memory_value: value.to_string(),
			source: "conversation".to_string(),
			confidence: 0.8,
			updated_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	#[test]
	fn nothing_known_renders_empty() {
		assert_eq!(format_user_context(None, &[]), "");
	}

	#[test]
	fn profile_fields_come_before_extra_memories() {
		let rendered =
			format_user_context(Some(&user_profile()), &[memory("preferred_language", "ml")]);

		let name_at = rendered.find("name: Asha").expect("name line missing");
		let extra_at =
			rendered.find("preferred_language: ml").expect("memory line missing");

		assert!(name_at < extra_at);
		assert!(rendered.contains("age: 34"));
	}

	#[test]
	fn profile_keys_in_memory_are_not_duplicated() {
		let rendered =
			format_user_context(Some(&user_profile()), &[memory("location", "Kerala")]);

		assert_eq!(rendered.matches("location: Kerala").count(), 1);
	}

	#[test]
	fn blank_values_are_skipped() {
		let rendered = format_user_context(None, &[memory("notes", "   ")]);

		assert_eq!(rendered, "");
	}
}
