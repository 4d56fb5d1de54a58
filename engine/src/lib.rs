//! Kiln Engine Library
//!
//! Core of the kiln code-generation assistant. It is used by both the main
//! binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Agent mode: classification, resolution, dispatch and memory
pub mod agent;

/// Generated project store
pub mod projects;

/// Action handlers
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// HTTP front end
pub mod server;
