//! Agent mode
//!
//! A free-form request is classified into one of four actions, its file
//! reference (if any) is resolved against the generated projects, the action
//! runs, and both sides of the exchange are recorded in a persisted
//! conversation that feeds the next classification.

pub mod classifier;
pub mod core;
pub mod memory;
pub mod resolver;

pub use classifier::{ActionClassifier, ActionDecision, ActionKind};
pub use core::{Orchestrator, RequestOutcome, SharedOrchestrator};
pub use memory::{ConversationStore, ConversationTurn, Role};
pub use resolver::{Confidence, ReferenceResolver, ResolvedTarget};
