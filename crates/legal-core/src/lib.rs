// Core orchestration abstractions for the legal document analysis runtime.
//
// Key design decisions:
// - Storage and model access are pluggable via traits (Store, BlobStore,
//   ModelClient) so the orchestrator is storage- and provider-agnostic.
// - Tools are defined via a Tool trait and dispatched through one registry
//   that validates arguments and hides internal errors from the model.
// - The six agent identities are an immutable catalog assembled once at
//   startup (AgentCatalog), not configured per-request.
// - Error handling distinguishes user-visible failures from internal ones;
//   OrchestratorError::user_message never leaks internal detail.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod context;
pub mod entities;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod logging;
pub mod orchestrator;
pub mod tool_types;
pub mod tools;
pub mod traits;

pub mod memory;

pub use catalog::{AgentCatalog, AgentDefinition, AgentName};
pub use entities::{
    Citation, Clause, ComplianceRule, ComplianceStatus, Contract, ContractStatus, GeneratedDocument,
    GeneratedDocumentKind, Message, MessageRole, Party, RuleSeverity, Session, ThinkingLog, ThinkingStage,
    ToolCallSummary,
};
pub use classifier::{Classification, ClassifierSnapshot, QueryClassifier};
pub use config::RuntimeConfig;
pub use context::ContextBuilder;
pub use error::{OrchestratorError, Result};
pub use executor::{AgentRunner, AgentTurnOutcome};
pub use handlers::register_builtins;
pub use logging::ThinkingLogger;
pub use orchestrator::{ChatRequest, ChatResponse, SessionOrchestrator};
pub use tool_types::{ToolCall, ToolDeclaration, ToolResult};
pub use tools::{DispatchOutcome, Tool, ToolContext, ToolOutcome, ToolRegistry};
pub use traits::{BlobStore, GenerateOptions, ModelClient, ModelMessage, ModelResponse, ModelTurnState, ModelUsage, Store};
