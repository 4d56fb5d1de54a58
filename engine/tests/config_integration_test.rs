//! Integration tests for configuration loading

use std::fs;
use tempfile::TempDir;

use kiln_engine::config::Config;
use sdk::errors::EngineError;

fn toml_for(workspace: &std::path::Path, extra: &str) -> String {
    format!(
        r#"
[core]
workspace = "{}"
log_level = "debug"

{}
"#,
        workspace.display(),
        extra
    )
}

#[test]
fn test_load_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let contents = toml_for(
        temp_dir.path(),
        r#"
[llm]
default_provider = "ollama"

[llm.gemini]
model = "gemini-1.5-pro"

[llm.ollama]
base_url = "http://127.0.0.1:11434"
model = "qwen2.5-coder"

[projects]
dir = "out"

[memory]
file = "state/history.json"

[terminal]
timeout_secs = 30

[github]
username = "octo"
private = true
"#,
    );
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();

    let config = Config::load_from_path(&path).unwrap();
    let workspace = temp_dir.path().canonicalize().unwrap();

    assert_eq!(config.core.workspace, workspace);
    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.gemini.model, "gemini-1.5-pro");
    assert_eq!(
        config.llm.gemini.base_url,
        "https://generativelanguage.googleapis.com/v1beta"
    );
    assert_eq!(config.llm.ollama.model, "qwen2.5-coder");
    assert_eq!(config.projects_dir(), workspace.join("out"));
    assert_eq!(config.memory_file(), workspace.join("state/history.json"));
    assert_eq!(config.terminal.timeout_secs, 30);
    assert_eq!(config.github.username.as_deref(), Some("octo"));
    assert!(config.github.private);
    assert_eq!(config.github.api_base, "https://api.github.com");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::from_toml_str(&toml_for(
        temp_dir.path(),
        "[llm]\ndefault_provider = \"gemini\"\n",
    ))
    .unwrap();

    let workspace = temp_dir.path().canonicalize().unwrap();
    assert_eq!(config.projects_dir(), workspace.join("generated_projects"));
    assert_eq!(
        config.memory_file(),
        workspace.join("memory/agent_memory.json")
    );
    assert_eq!(config.terminal.timeout_secs, 120);
    assert!(!config.github.private);
}

#[test]
fn test_missing_workspace_is_created() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("not/yet/here");

    let config = Config::for_workspace(&workspace).unwrap();
    assert!(workspace.is_dir());
    assert_eq!(config.core.workspace, workspace.canonicalize().unwrap());
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let bad_level = toml_for(temp_dir.path(), "[llm]\ndefault_provider = \"gemini\"\n")
        .replace("\"debug\"", "\"loud\"");
    let err = Config::from_toml_str(&bad_level).unwrap_err();
    assert!(matches!(err, EngineError::Config(ref m) if m.contains("Invalid log level")));

    let bad_timeout = toml_for(
        temp_dir.path(),
        "[llm]\ndefault_provider = \"gemini\"\n\n[terminal]\ntimeout_secs = 0\n",
    );
    assert!(matches!(
        Config::from_toml_str(&bad_timeout),
        Err(EngineError::Config(_))
    ));

    assert!(Config::from_toml_str("this is not toml = = =").is_err());
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::for_workspace(temp_dir.path()).unwrap();
    config.llm.default_provider = "ollama".to_string();
    config.github.username = Some("octo".to_string());

    let path = temp_dir.path().join("nested/config.toml");
    config.save_to_path(&path).unwrap();

    let reloaded = Config::load_from_path(&path).unwrap();
    assert_eq!(reloaded.llm.default_provider, "ollama");
    assert_eq!(reloaded.github.username.as_deref(), Some("octo"));
    assert_eq!(reloaded.core.workspace, config.core.workspace);
}
