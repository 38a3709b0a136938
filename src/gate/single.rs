//! The single-net gate (§4.4): the online engine that decides block/allow
//! for one [`SkillNet`] in one session, tracking deferred firings until
//! their tool-call result arrives.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::{Context, Decision, ToolCall, ToolResult};
use crate::gate::auto_advance::auto_advance;
use crate::petri_net::{Marking, TransitionId};
use crate::skill_net::{DeferredCtx, Meta, SkillNet, TransitionKind, ValidateCtx};

/// An allowed-but-not-yet-fired deferred transition, keyed by the
/// originating tool-call ID (§3 "pending").
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub transition: TransitionId,
    pub resolved_tool: String,
}

/// The per-session state for one [`SkillNet`]: its current marking, the
/// deferred firings awaiting a result, and the hook bookkeeping map.
pub struct SkillNetState {
    pub skill: Arc<SkillNet>,
    pub marking: Marking,
    pub pending: HashMap<String, PendingEntry>,
    pub meta: Meta,
}

fn marking_summary(skill: &SkillNet, marking: &Marking) -> String {
    let mut parts: Vec<String> = skill
        .net
        .places
        .iter()
        .map(|p| format!("{}={}", p.name, marking.get(p.id).0))
        .collect();
    parts.sort();
    format!("{{{}}}", parts.join(", "))
}

impl SkillNetState {
    /// Creates a gate state from a skill net: marking is the auto-advanced
    /// initial marking, pending and meta start empty (§3 "Lifecycle").
    pub fn new(skill: Arc<SkillNet>) -> Self {
        let marking = auto_advance(&skill, &skill.net.initial_marking);
        Self {
            skill,
            marking,
            pending: HashMap::new(),
            meta: Meta::new(),
        }
    }

    /// §4.4 `handle_tool_call`.
    pub fn handle_tool_call(&mut self, event: &ToolCall, ctx: &mut Context<'_>) -> Decision {
        let resolved_tool = self
            .skill
            .hooks
            .tool_mapper(event)
            .unwrap_or_else(|| event.tool_name.clone());

        if self.skill.is_free_tool(&resolved_tool) {
            debug!(net = %self.skill.name, tool = %resolved_tool, "free tool, bypassing gate");
            return Decision::Allow;
        }

        let candidates = self.skill.candidates_for(&resolved_tool);
        if candidates.is_empty() {
            // No jurisdiction over this tool; let composition decide.
            return Decision::Allow;
        }

        let enabled: Vec<TransitionId> = candidates
            .into_iter()
            .filter(|&id| self.skill.net.can_fire(&self.marking, id))
            .collect();
        if enabled.is_empty() {
            let reason = format!(
                "no enabled transition licenses {} in net {}; current marking {}",
                resolved_tool,
                self.skill.name,
                marking_summary(&self.skill, &self.marking)
            );
            warn!(net = %self.skill.name, tool = %resolved_tool, "blocked: no enabled transition");
            return Decision::block(reason);
        }

        let chosen = match self.select_transition(&resolved_tool, &enabled, ctx) {
            Ok(t) => t,
            Err(decision) => return decision,
        };

        if let Err(hook_err) = self.validate(event, &resolved_tool, chosen) {
            warn!(net = %self.skill.name, tool = %resolved_tool, error = %hook_err.0, "blocked by validate_tool_call hook");
            return Decision::block(hook_err.0);
        }

        if self.skill.meta(chosen).deferred {
            self.pending.insert(
                event.tool_call_id.clone(),
                PendingEntry {
                    transition: chosen,
                    resolved_tool,
                },
            );
            debug!(net = %self.skill.name, transition = %self.skill.net.transition(chosen).name, "deferred, awaiting result");
            return Decision::Allow;
        }

        self.marking = self
            .skill
            .net
            .fire(&self.marking, chosen)
            .expect("chosen transition was confirmed enabled");
        self.marking = auto_advance(&self.skill, &self.marking);
        debug!(net = %self.skill.name, transition = %self.skill.net.transition(chosen).name, "fired");
        Decision::Allow
    }

    /// §4.4 step 7: prefer an enabled gated-auto transition; otherwise an
    /// enabled gated-manual transition confirmed through `ctx`.
    fn select_transition(
        &self,
        resolved_tool: &str,
        enabled: &[TransitionId],
        ctx: &mut Context<'_>,
    ) -> Result<TransitionId, Decision> {
        if let Some(&auto) = enabled
            .iter()
            .find(|&&id| self.skill.meta(id).kind() == TransitionKind::GatedAuto)
        {
            return Ok(auto);
        }
        let manual = enabled
            .iter()
            .find(|&&id| self.skill.meta(id).kind() == TransitionKind::GatedManual);
        match manual {
            None => unreachable!("enabled candidates must be gated-auto or gated-manual"),
            Some(&t) => {
                if !ctx.has_ui {
                    return Err(Decision::block(format!(
                        "{} requires UI confirmation",
                        resolved_tool
                    )));
                }
                let title = format!("Confirm {}", resolved_tool);
                let message = format!(
                    "Allow transition `{}` to license `{}`?",
                    self.skill.net.transition(t).name,
                    resolved_tool
                );
                if (ctx.confirm)(&title, &message) {
                    Ok(t)
                } else {
                    Err(Decision::block(format!(
                        "{} confirmation declined",
                        resolved_tool
                    )))
                }
            }
        }
    }

    fn validate(
        &mut self,
        event: &ToolCall,
        resolved_tool: &str,
        transition: TransitionId,
    ) -> Result<(), crate::error::HookError> {
        let marking = self.marking.clone();
        self.skill.hooks.validate_tool_call(ValidateCtx {
            event,
            resolved_tool,
            transition,
            marking: &marking,
            meta: &mut self.meta,
        })
    }

    /// §4.4 `handle_tool_result`.
    pub fn handle_tool_result(&mut self, event: &ToolResult) {
        let Some(entry) = self.pending.remove(&event.tool_call_id) else {
            return;
        };
        if event.is_error {
            debug!(net = %self.skill.name, tool_call_id = %event.tool_call_id, "deferred call failed, discarding without firing");
            return;
        }
        if !self.skill.net.can_fire(&self.marking, entry.transition) {
            warn!(
                net = %self.skill.name,
                transition = %self.skill.net.transition(entry.transition).name,
                "deferred transition no longer enabled, dropping silently"
            );
            return;
        }
        self.marking = self
            .skill
            .net
            .fire(&self.marking, entry.transition)
            .expect("checked can_fire above");
        let marking = self.marking.clone();
        self.skill.hooks.on_deferred_result(DeferredCtx {
            event,
            resolved_tool: &entry.resolved_tool,
            transition: entry.transition,
            marking: &marking,
            meta: &mut self.meta,
        });
        self.marking = auto_advance(&self.skill, &self.marking);
    }
}
