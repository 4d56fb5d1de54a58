//! Configuration management
//!
//! This module handles loading, validation, and management of the Kiln configuration.
//! Configuration is stored in TOML format at ~/.kiln/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path, log level
//! - **llm**: Generation provider selection and per-provider settings
//! - **projects**: Where generated projects are materialized
//! - **memory**: Where the conversation record is persisted
//! - **terminal**: Shell command limits
//! - **github**: Remote hosting account used by the push action
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the workspace, creating it if needed
//! - Resolves the projects directory and memory file against the workspace
//!
//! # Examples
//!
//! ```no_run
//! use kiln_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Projects: {:?}", config.projects_dir());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Providers accepted in `llm.default_provider`
pub const PROVIDERS: &[&str] = &["gemini", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Generated project store
    #[serde(default)]
    pub projects: ProjectsConfig,

    /// Conversation memory
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Shell command execution
    #[serde(default)]
    pub terminal: TerminalConfig,

    /// Remote hosting
    #[serde(default)]
    pub github: GithubConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Workspace directory path (supports ~ expansion)
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider used for every completion (gemini, ollama)
    pub default_provider: String,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key stored in OS keychain or environment, not in config
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Generated project store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Directory holding `project_<n>` folders (relative paths resolve against the workspace)
    #[serde(default = "default_projects_dir")]
    pub dir: PathBuf,
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Persisted conversation record (relative paths resolve against the workspace)
    #[serde(default = "default_memory_file")]
    pub file: PathBuf,
}

/// Shell command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Upper bound for a single command, in seconds
    #[serde(default = "default_terminal_timeout")]
    pub timeout_secs: u64,
}

/// Remote hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Account that owns created repositories
    #[serde(default)]
    pub username: Option<String>,

    /// REST API root
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Web root used to build download and codespaces links
    #[serde(default = "default_github_web_base")]
    pub web_base: String,

    /// Create repositories as private
    #[serde(default)]
    pub private: bool,
    // Note: token stored in OS keychain or GITHUB_TOKEN, not in config
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("generated_projects")
}

fn default_memory_file() -> PathBuf {
    PathBuf::from("memory/agent_memory.json")
}

fn default_terminal_timeout() -> u64 {
    120
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_web_base() -> String {
    "https://github.com".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            dir: default_projects_dir(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            file: default_memory_file(),
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_terminal_timeout(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            username: None,
            api_base: default_github_api_base(),
            web_base: default_github_web_base(),
            private: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.kiln/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (invalid log level, unknown provider)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse, validate and process configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Configuration rooted at `workspace` with every other value defaulted.
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let mut config = Self::default_config();
        config.core.workspace = workspace.into();
        config.validate_and_process()?;
        Ok(config)
    }

    /// Save configuration to a path, creating the parent directory
    pub fn save_to_path(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        let mut config = Self::default_config();
        config.validate_and_process()?;
        config.save_to_path(path)?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.kiln/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".kiln").join("config.toml"))
    }

    /// Create a default configuration
    pub(crate) fn default_config() -> Self {
        Self {
            core: CoreConfig {
                workspace: PathBuf::from("."),
                log_level: default_log_level(),
            },
            llm: LLMConfig {
                default_provider: "gemini".to_string(),
                gemini: GeminiConfig::default(),
                ollama: OllamaConfig::default(),
            },
            projects: ProjectsConfig::default(),
            memory: MemoryConfig::default(),
            terminal: TerminalConfig::default(),
            github: GithubConfig::default(),
        }
    }

    /// Absolute directory of the generated project store
    pub fn projects_dir(&self) -> PathBuf {
        resolve_against(&self.core.workspace, &self.projects.dir)
    }

    /// Absolute path of the persisted conversation record
    pub fn memory_file(&self) -> PathBuf {
        resolve_against(&self.core.workspace, &self.memory.file)
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates log level and provider names
    /// - Expands ~ in paths
    /// - Canonicalizes the workspace (creating it if needed)
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                PROVIDERS.join(", ")
            )));
        }

        if self.terminal.timeout_secs == 0 {
            return Err(EngineError::Config(
                "terminal.timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        self.projects.dir = expand_path(&self.projects.dir)?;
        self.memory.file = expand_path(&self.memory.file)?;

        Ok(())
    }
}

/// Join `path` onto `base` unless it is already absolute
fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::Config(format!("Failed to resolve {:?}: {}", path, e)))
}
