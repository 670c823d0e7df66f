// Error taxonomy for the orchestration runtime.
//
// The orchestrator never raises these to its callers: every public entry
// point catches them and turns them into a structured chat response or a
// startup failure. See `OrchestratorError::user_message` for the table of
// user-visible strings, keyed by error kind.

use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors surfaced by the orchestration runtime.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("tool arguments failed validation: {0}")]
    ToolBadArguments(String),

    #[error("tool handler error: {0}")]
    ToolHandlerError(String),

    #[error("tool handler timed out after {0}s")]
    ToolHandlerTimeout(u64),

    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("agent exceeded {0} tool-calling iterations")]
    ToolLoopExceeded(usize),

    #[error("agent turn timed out after {0}s")]
    AgentTimeout(u64),

    #[error("request exceeded the {0}s whole-request ceiling")]
    RequestTimeout(u64),

    #[error("pipeline aborted: {0}")]
    PipelineAborted(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn tool_bad_arguments(msg: impl Into<String>) -> Self {
        Self::ToolBadArguments(msg.into())
    }

    pub fn tool_handler_error(msg: impl Into<String>) -> Self {
        Self::ToolHandlerError(msg.into())
    }

    pub fn upstream_unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    /// The `kind` string carried on the wire and in ThinkingLog payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration_error",
            Self::ToolBadArguments(_) => "tool_bad_arguments",
            Self::ToolHandlerError(_) => "tool_handler_error",
            Self::ToolHandlerTimeout(_) => "tool_handler_timeout",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::ToolLoopExceeded(_) => "tool_loop_exceeded",
            Self::AgentTimeout(_) => "agent_timeout",
            Self::RequestTimeout(_) => "request_timeout",
            Self::PipelineAborted(_) => "pipeline_aborted",
            Self::Internal(_) => "internal",
        }
    }

    /// Friendly message shown to the end user; never contains internal
    /// detail such as stack traces, SQL, or provider error bodies.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::Configuration(_) => {
                "This assistant is not configured correctly. Please contact support.".to_string()
            }
            Self::ToolLoopExceeded(_) => {
                "I wasn't able to finish this task within my step budget, but here's what I found so far.".to_string()
            }
            Self::AgentTimeout(_) => {
                "This is taking longer than expected. Please try again.".to_string()
            }
            Self::RequestTimeout(_) => {
                "This is taking longer than expected. Please try again.".to_string()
            }
            Self::PipelineAborted(msg) => msg.clone(),
            Self::ToolBadArguments(_)
            | Self::ToolHandlerError(_)
            | Self::ToolHandlerTimeout(_)
            | Self::UpstreamUnavailable(_)
            | Self::Internal(_) => {
                "Something went wrong while processing your request.".to_string()
            }
        }
    }
}
