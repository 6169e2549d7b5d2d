use docsync::load_config::{load_config, Credentials};
use docsync_core::stages::{FailurePolicy, FAST_MODEL, LARGE_MODEL};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    config_file
}

#[test]
fn test_load_config_minimal_uses_defaults() {
    let config_file = config_file(
        r#"
mapping_table: sync/mapping-table.json
classification_cache: sync/classification-cache.json
public_repo_path: ./public
docs_repo_path: ./docs
"#,
    );

    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.mapping_table, PathBuf::from("sync/mapping-table.json"));
    assert_eq!(config.docs_repo_path, PathBuf::from("./docs"));
    assert!(config.synced_files_path.is_none());
    assert_eq!(config.docs_path_prefix(), "sdk-docs/");

    let stages = config.to_stages();
    assert_eq!(stages.classifier.settings.model, FAST_MODEL);
    assert_eq!(stages.classifier.settings.max_tokens, 256);
    assert_eq!(stages.comparator.settings.max_tokens, 512);
    assert_eq!(stages.converter.settings.model, LARGE_MODEL);
    assert_eq!(stages.converter.settings.max_tokens, 8192);
    assert_eq!(stages.validator.settings.max_tokens, 4096);
    assert_eq!(stages.classifier.on_failure, FailurePolicy::Open);
    assert_eq!(stages.comparator.on_failure, FailurePolicy::Open);
    assert_eq!(stages.validator.on_failure, FailurePolicy::Closed);
    assert_eq!(stages.conversion_attempts, 2);
}

#[test]
fn test_load_config_stage_overrides() {
    let config_file = config_file(
        r#"
mapping_table: mapping.json
classification_cache: cache.json
public_repo_path: public
docs_repo_path: docs
synced_files_path: synced_files.txt
docs_path_prefix: "handbook/"
conversion_attempts: 3
stages:
  classifier:
    on_failure: closed
  converter:
    model: my-large-model
    max_tokens: 16000
  validator:
    on_failure: open
"#,
    );

    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.synced_files_path, Some(PathBuf::from("synced_files.txt")));
    assert_eq!(config.docs_path_prefix(), "handbook/");

    let stages = config.to_stages();
    assert_eq!(stages.classifier.on_failure, FailurePolicy::Closed);
    assert_eq!(stages.classifier.settings.model, FAST_MODEL);
    assert_eq!(stages.converter.settings.model, "my-large-model");
    assert_eq!(stages.converter.settings.max_tokens, 16000);
    assert_eq!(stages.validator.on_failure, FailurePolicy::Open);
    assert_eq!(stages.conversion_attempts, 3);
}

#[test]
fn test_load_config_rejects_unknown_failure_policy() {
    let config_file = config_file(
        r#"
mapping_table: mapping.json
classification_cache: cache.json
public_repo_path: public
docs_repo_path: docs
stages:
  validator:
    on_failure: sometimes
"#,
    );
    let err = load_config(config_file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));
}

#[test]
fn test_load_config_rejects_zero_attempts() {
    let config_file = config_file(
        r#"
mapping_table: mapping.json
classification_cache: cache.json
public_repo_path: public
docs_repo_path: docs
conversion_attempts: 0
"#,
    );
    assert!(load_config(config_file.path()).is_err());
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_credentials_require_anthropic_key() {
    env::remove_var("ANTHROPIC_API_KEY");
    env::set_var("GITHUB_TOKEN", "gh-token");

    let err = Credentials::from_env(false).unwrap_err();
    assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

    env::remove_var("GITHUB_TOKEN");
}

#[test]
#[serial]
fn test_credentials_github_token_only_required_for_backward() {
    env::set_var("ANTHROPIC_API_KEY", "sk-test");
    env::remove_var("GITHUB_TOKEN");

    let forward = Credentials::from_env(false).expect("forward needs no GitHub token");
    assert!(forward.github_token.is_none());

    let err = Credentials::from_env(true).unwrap_err();
    assert!(err.to_string().contains("GITHUB_TOKEN"));

    env::set_var("GITHUB_TOKEN", "  ");
    assert!(Credentials::from_env(true).is_err());

    env::set_var("GITHUB_TOKEN", "gh-token");
    let backward = Credentials::from_env(true).unwrap();
    assert_eq!(backward.github_token.as_deref(), Some("gh-token"));
    assert!(!format!("{backward:?}").contains("sk-test"));

    env::remove_var("ANTHROPIC_API_KEY");
    env::remove_var("GITHUB_TOKEN");
}
