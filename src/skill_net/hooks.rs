//! Per-net hook traits (§3, §9 "Event handlers as data"). The source
//! models `toolMapper`, `validateToolCall`, and `onDeferredResult` as
//! first-class functions on a skill net; here each is a method on a small
//! trait with a default no-op implementation, so a plain [`NoopHooks`]
//! suffices for nets that don't need the escape valve.

use crate::error::HookError;
use crate::event::{ToolCall, ToolResult};
use crate::petri_net::{Marking, TransitionId};
use crate::skill_net::meta::Meta;

pub type HookResult<T> = Result<T, HookError>;

/// Arguments available to `validate_tool_call`.
pub struct ValidateCtx<'a> {
    pub event: &'a ToolCall,
    pub resolved_tool: &'a str,
    pub transition: TransitionId,
    pub marking: &'a Marking,
    pub meta: &'a mut Meta,
}

/// Arguments available to `on_deferred_result`.
pub struct DeferredCtx<'a> {
    pub event: &'a ToolResult,
    pub resolved_tool: &'a str,
    pub transition: TransitionId,
    pub marking: &'a Marking,
    pub meta: &'a mut Meta,
}

/// Domain-specific policy attached to one skill net. All methods default to
/// no-ops so a net that needs none of them can use [`NoopHooks`].
pub trait SkillNetHooks: Send + Sync {
    /// Resolves a raw tool-call event to the "virtual" tool name used for
    /// gating. Returning `None` falls back to `event.tool_name` unchanged.
    fn tool_mapper(&self, event: &ToolCall) -> Option<String> {
        let _ = event;
        None
    }

    /// Domain-specific validation beyond pure token topology. A `Blocked`
    /// return short-circuits the call (§4.4 step 8); an `Err` is folded
    /// into a block with the hook's message as the reason (§7 `HookError`).
    fn validate_tool_call(&self, ctx: ValidateCtx<'_>) -> HookResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Invoked after a deferred transition fires on a successful result
    /// (never on error, and never if the transition was dropped because it
    /// was no longer enabled — §4.4 step 4 of `handle_tool_result`).
    fn on_deferred_result(&self, ctx: DeferredCtx<'_>) {
        let _ = ctx;
    }
}

/// The default hook set: no tool mapping, no extra validation, no
/// deferred-result bookkeeping.
pub struct NoopHooks;

impl SkillNetHooks for NoopHooks {}
