use crate::rerank::Passage;

pub const USER_CONTEXT_LABEL: &str = "[User Context]";
pub const HISTORY_LABEL: &str = "[Conversation History]";
pub const DOCUMENTS_LABEL: &str = "[Retrieved Documents]";

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Ordered, append-only assembly of the layered prompt context. Sections appear in
/// push order, empty sections never appear, and the join is deterministic — which is
/// what makes the "only non-empty sections appear" rule trivially testable.
#[derive(Debug, Default)]
pub struct ContextBuilder {
	sections: Vec<String>,
}
impl ContextBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_section(&mut self, label: &str, body: &str) {
		let body = body.trim();

		if body.is_empty() {
			return;
		}

		self.sections.push(format!("{label}\n{body}"));
	}

	/// Documents get individually numbered entries so the generation prompt can cite
	/// them positionally.
	pub fn push_documents(&mut self, passages: &[Passage]) {
		if passages.is_empty() {
			return;
		}

		let body = passages
			.iter()
			.enumerate()
			.map(|(index, passage)| format!("Document {}:\n{}", index + 1, passage.text.trim()))
			.collect::<Vec<_>>()
			.join("\n\n");

		self.sections.push(format!("{DOCUMENTS_LABEL}\n{body}"));
	}

	pub fn is_empty(&self) -> bool {
		self.sections.is_empty()
	}

	pub fn build(self) -> String {
		self.sections.join(SECTION_SEPARATOR)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sections_appear_in_push_order() {
		let mut builder = ContextBuilder::new();

		builder.push_section(USER_CONTEXT_LABEL, "name: Asha");
		builder.push_section(HISTORY_LABEL, "User: hi\nAssistant: hello");
		builder.push_documents(&[Passage::new("chunk one", "a.pdf")]);

		let context = builder.build();
		let user_at = context.find(USER_CONTEXT_LABEL).expect("user section missing");
		let history_at = context.find(HISTORY_LABEL).expect("history section missing");
		let documents_at = context.find(DOCUMENTS_LABEL).expect("documents section missing");

		assert!(user_at < history_at);
		assert!(history_at < documents_at);
	}

	#[test]
	fn empty_sections_are_skipped() {
		let mut builder = ContextBuilder::new();

		builder.push_section(USER_CONTEXT_LABEL, "   ");
		builder.push_section(HISTORY_LABEL, "User: hi\nAssistant: hello");
		builder.push_documents(&[]);

		let context = builder.build();

		assert!(!context.contains(USER_CONTEXT_LABEL));
		assert!(!context.contains(DOCUMENTS_LABEL));
		assert!(context.contains(HISTORY_LABEL));
	}

	#[test]
	fn documents_are_numbered_from_one() {
		let mut builder = ContextBuilder::new();

		builder.push_documents(&[
			Passage::new("first chunk", "a.pdf"),
			Passage::new("second chunk", "b.pdf"),
		]);

		let context = builder.build();

		assert!(context.contains("Document 1:\nfirst chunk"));
		assert!(context.contains("Document 2:\nsecond chunk"));
	}

	#[test]
	fn no_sections_build_an_empty_string() {
		assert_eq!(ContextBuilder::new().build(), "");
		assert!(ContextBuilder::new().is_empty());
	}

	#[test]
	fn sections_are_joined_by_a_visible_separator() {
		let mut builder = ContextBuilder::new();

		builder.push_section(USER_CONTEXT_LABEL, "a");
		builder.push_section(HISTORY_LABEL, "b");

		assert_eq!(builder.build(), "[User Context]\na\n\n---\n\n[Conversation History]\nb");
	}
}
