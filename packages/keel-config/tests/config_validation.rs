use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
};

use toml::Value;

use keel_config::Error;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn set(value: &mut Value, section: &[&str], key: &str, new: Value) {
	let mut table = value.as_table_mut().expect("Config root must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Config must include [{name}]."));
	}

	table.insert(key.to_string(), new);
}

fn write_temp_config(payload: &Value) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("keel_config_{pid}_{ordinal}.toml"));

	fs::write(&path, toml::to_string(payload).expect("Failed to render config."))
		.expect("Failed to write temp config.");

	path
}

fn load(payload: &Value) -> keel_config::Result<keel_config::Config> {
	let path = write_temp_config(payload);
	let result = keel_config::load(&path);

	let _ = fs::remove_file(&path);

	result
}

fn expect_validation_error(payload: &Value, needle: &str) {
	match load(payload) {
		Err(Error::Validation { message }) => {
			assert!(message.contains(needle), "unexpected message: {message}")
		},
		other => panic!("expected validation error containing {needle:?}, got {other:?}"),
	}
}

#[test]
fn sample_config_loads_with_defaults() {
	let cfg = load(&sample_value()).expect("Sample config must load.");

	assert_eq!(cfg.history.verbatim_count, 5);
	assert_eq!(cfg.history.summary_threshold, 8);
	assert_eq!(cfg.history.fetch_limit, None);
	assert_eq!(cfg.retrieval.top_k, 5);
	assert_eq!(cfg.retrieval.rerank_keep, 3);
	assert!(cfg.providers.rerank.is_none());
	assert!((cfg.validation.min_grounding_ratio - 0.10).abs() < f32::EPSILON);
}

#[test]
fn omitted_tunable_sections_fall_back_to_defaults() {
	let mut value = sample_value();
	let root = value.as_table_mut().expect("Config root must be a table.");

	root.remove("history");
	root.remove("retrieval");
	root.remove("validation");

	let cfg = load(&value).expect("Config without tunable sections must load.");

	assert_eq!(cfg.history.verbatim_count, 5);
	assert_eq!(cfg.history.summary_threshold, 8);
	assert_eq!(cfg.retrieval.rerank_keep, 3);
	assert_eq!(cfg.validation.min_answer_chars, 10);
}

#[test]
fn rejects_empty_provider_api_key() {
	let mut value = sample_value();

	set(&mut value, &["providers", "resolver"], "api_key", Value::String(" ".to_string()));

	expect_validation_error(&value, "resolver api_key");
}

#[test]
fn rejects_summary_threshold_below_verbatim_count() {
	let mut value = sample_value();

	set(&mut value, &["history"], "summary_threshold", Value::Integer(3));

	expect_validation_error(&value, "history.summary_threshold");
}

#[test]
fn rejects_fetch_limit_not_above_verbatim_count() {
	let mut value = sample_value();

	set(&mut value, &["history"], "fetch_limit", Value::Integer(5));

	expect_validation_error(&value, "history.fetch_limit");
}

#[test]
fn normalizes_zero_fetch_limit_to_default_sizing() {
	let mut value = sample_value();

	set(&mut value, &["history"], "fetch_limit", Value::Integer(0));

	let cfg = load(&value).expect("Zero fetch_limit must normalize away.");

	assert_eq!(cfg.history.fetch_limit, None);
}

#[test]
fn rejects_rerank_keep_above_top_k() {
	let mut value = sample_value();

	set(&mut value, &["retrieval"], "rerank_keep", Value::Integer(9));

	expect_validation_error(&value, "retrieval.rerank_keep");
}

#[test]
fn rejects_out_of_range_grounding_ratio() {
	let mut value = sample_value();

	set(&mut value, &["validation"], "min_grounding_ratio", Value::Float(1.5));

	expect_validation_error(&value, "validation.min_grounding_ratio");
}

#[test]
fn rejects_confidence_tier_inversion() {
	let mut value = sample_value();

	set(&mut value, &["validation"], "medium_confidence_ratio", Value::Float(0.6));

	expect_validation_error(&value, "validation.medium_confidence_ratio");
}

#[test]
fn rejects_embedding_dimension_mismatch() {
	let mut value = sample_value();

	set(&mut value, &["providers", "embedding"], "dimensions", Value::Integer(768));

	expect_validation_error(&value, "providers.embedding.dimensions");
}
