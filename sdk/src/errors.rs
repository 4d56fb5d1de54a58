//! Error types and handling
//!
//! This module provides the error types used throughout the Kiln engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry secrets. API keys and tokens are held in
//! `SecretString` wrappers inside the engine and are not formatted into
//! any variant below.

use thiserror::Error;

/// Trait for Kiln error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around within the same
    /// session. Non-recoverable errors need a configuration change first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **LLM Provider**: API failures, unusable replies
/// - **Artifacts**: Generated project layout and file access
/// - **Publishing**: git and remote hosting failures
/// - **Secrets**: Keychain and credential lookup
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
/// use std::path::PathBuf;
///
/// let error = EngineError::FileNotFound(PathBuf::from("app.py"));
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad provider".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    // Artifact errors
    #[error("File not found: {0:?}")]
    FileNotFound(std::path::PathBuf),

    #[error("Path outside workspace: {0:?}")]
    PathOutsideWorkspace(std::path::PathBuf),

    #[error("No generated projects found in {0:?}")]
    NoProjects(std::path::PathBuf),

    // Publishing errors
    #[error("Git command failed: {0}")]
    Git(String),

    #[error("Remote host error: {0}")]
    RemoteHost(String),

    // Secret errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("Missing secret: {0}")]
    MissingSecret(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Tool errors
    #[error("Tool error: {0}")]
    ToolError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",
            Self::GenerationFailed(_) => "The model reply was not usable. Try rephrasing the request",

            Self::FileNotFound(_) => "Provide a full path or list the generated projects first",
            Self::PathOutsideWorkspace(_) => "Generated files must stay inside the project directory",
            Self::NoProjects(_) => "Generate a project before publishing",

            Self::Git(_) => "git failed. Check that git is installed and the remote is reachable",
            Self::RemoteHost(_) => "Remote hosting request failed. Check your token and username",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::MissingSecret(_) => "Run 'kiln setup' or set the matching environment variable",

            Self::Network(_) => "Network operation failed. Check your connection",

            Self::ToolError(_) => "Tool operation failed",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::MissingSecret(_) | Self::KeyringError(_) => false,
            _ => true,
        }
    }
}
