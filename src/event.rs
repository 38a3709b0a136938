//! The wire contract between the core and any adapter (§6). These shapes
//! are stable; an adapter's job is only to translate a foreign event shape
//! into these and display the gate's [`Decision`] back out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the agent is about to invoke, before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: BTreeMap<String, Value>,
}

impl ToolCall {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(field.into(), value.into());
        self
    }
}

/// The outcome of a tool the agent already invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: BTreeMap<String, Value>,
    pub is_error: bool,
}

/// What a gate (or gate manager) decided about a [`ToolCall`].
/// `None` means "no objection" — either the call is allowed outright or
/// every consulted net abstained; the two are indistinguishable to a
/// caller by design (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block { reason: String },
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Block { .. })
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Decision::Block {
            reason: reason.into(),
        }
    }
}

/// Per-call context supplied by the caller: whether a human is available to
/// confirm a manual transition, and the confirmation callback itself.
pub struct Context<'a> {
    pub has_ui: bool,
    pub confirm: Box<dyn FnMut(&str, &str) -> bool + 'a>,
}

impl<'a> Context<'a> {
    pub fn no_ui() -> Self {
        Context {
            has_ui: false,
            confirm: Box::new(|_, _| false),
        }
    }

    pub fn with_confirm(confirm: impl FnMut(&str, &str) -> bool + 'a) -> Self {
        Context {
            has_ui: true,
            confirm: Box::new(confirm),
        }
    }
}
