//! Configuration loading and precedence tests

use cwalk_config::{ConfigError, ConfigLoader, Strategy, CONFIG_FILE_NAME};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let config_path = dir.join(CONFIG_FILE_NAME);
    fs::write(&config_path, content).unwrap();
    config_path
}

fn clear_env() {
    env::remove_var("CWALK_STRATEGY");
    env::remove_var("CWALK_MAX_CALL_DEPTH");
    env::remove_var("CWALK_MAX_STEPS");
}

// ============================================================================
// Loading
// ============================================================================

#[test]
#[serial]
fn test_load_evaluator_section() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[evaluator]
strategy = "lazy"
max_call_depth = 32
max_steps = 5000
entry_point = "start"
"#,
    );

    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.is_project());
    assert_eq!(config.evaluator.strategy, Strategy::Lazy);
    assert_eq!(config.evaluator.max_call_depth, 32);
    assert_eq!(config.evaluator.max_steps, Some(5000));
    assert_eq!(config.evaluator.entry_point.as_deref(), Some("start"));
}

#[test]
#[serial]
fn test_load_when_no_config_exists() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!config.is_project());
    assert_eq!(config.evaluator.strategy, Strategy::Strict);
    assert_eq!(config.evaluator.entry_point.as_deref(), Some("main"));
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[evaluator]\nmax_call_depth = 8\n");

    let nested = temp_dir.path().join("src").join("lessons");
    fs::create_dir_all(&nested).unwrap();

    let config = ConfigLoader::new().load_from_directory(&nested).unwrap();
    assert_eq!(config.project_root(), Some(temp_dir.path()));
    assert_eq!(config.evaluator.max_call_depth, 8);
}

#[test]
fn test_unknown_field_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[evaluator]\ngc = true\n");

    let result = ConfigLoader::without_env().load_from_file(&path);
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
fn test_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::without_env().load_from_file(&temp_dir.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_empty_entry_point_disables_main() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[evaluator]\nentry_point = \"\"\n");

    let config = ConfigLoader::without_env().load_from_file(&path).unwrap();
    assert_eq!(config.evaluator.entry_point, None);
}

#[test]
fn test_zero_max_steps_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[evaluator]\nmax_steps = 0\n");

    let result = ConfigLoader::without_env().load_from_file(&path);
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

// ============================================================================
// Environment overrides
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[evaluator]\nstrategy = \"strict\"\n");

    env::set_var("CWALK_STRATEGY", "lazy");
    env::set_var("CWALK_MAX_STEPS", "42");
    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();
    clear_env();

    assert_eq!(config.evaluator.strategy, Strategy::Lazy);
    assert_eq!(config.evaluator.max_steps, Some(42));
}

#[test]
#[serial]
fn test_without_env_ignores_overrides() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var("CWALK_MAX_CALL_DEPTH", "3");
    let config = ConfigLoader::without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();
    clear_env();

    assert_eq!(config.evaluator.max_call_depth, 256);
}

#[rstest]
#[case("CWALK_STRATEGY", "eager")]
#[case("CWALK_MAX_CALL_DEPTH", "deep")]
#[case("CWALK_MAX_STEPS", "-1")]
#[serial]
fn test_invalid_env_values(#[case] var: &str, #[case] value: &str) {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var(var, value);
    let result = ConfigLoader::new().load_from_directory(temp_dir.path());
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
