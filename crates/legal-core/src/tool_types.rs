// Tool call/result wire types and declarations.
//
// Design decision: tools are identified by name (string) for extensibility.
// There is a single tool kind — server-side handlers registered with the
// ToolRegistry — so, unlike an earlier generation of this code, there is no
// separate webhook variant to dispatch through.

use serde::{Deserialize, Serialize};

/// A tool declaration as handed to the ModelClient — the menu of callable
/// functions for one agent's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameter_schema: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of dispatching one tool call, in the shape fed back to the
/// model as a tool-result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: Some(value),
            error: None,
            kind: None,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result: None,
            error: Some(message.into()),
            kind: Some(kind.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_round_trips_through_json() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "get_contract_by_id".into(),
            arguments: serde_json::json!({"contract_id": "c1"}),
        };
        let json = serde_json::to_string(&call).unwrap();
        let parsed: ToolCall = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, call.id);
        assert_eq!(parsed.name, call.name);
    }

    #[test]
    fn failure_result_carries_kind_for_the_model_to_recover() {
        let result = ToolResult::failure("call_1", "bad_arguments", "missing field: contract_id");
        assert_eq!(result.kind.as_deref(), Some("bad_arguments"));
        assert!(result.result.is_none());
    }
}
