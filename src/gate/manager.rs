//! The gate manager (§4.5): composes multiple skill nets with AND
//! semantics (any block wins), supports moving nets between an active set
//! and an inactive registry, and an optional shadow mode that logs what
//! would have been blocked without actually blocking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::event::{Context, Decision, ToolCall, ToolResult};
use crate::gate::single::SkillNetState;
use crate::skill_net::SkillNet;

/// Observer invoked with the decision a net *would* have made, used by
/// shadow mode (§9 "Shadow mode") to let callers log what enforcement
/// would have done without enforcing it.
pub trait DecisionObserver: Send + Sync {
    fn on_decision(&self, event: &ToolCall, decision: &Decision);
}

/// Composes any number of skill nets. Active nets are consulted on every
/// call; inactive ones are held in a registry so they can be reactivated
/// without losing state.
pub struct GateManager {
    active: Vec<(String, SkillNetState)>,
    inactive: HashMap<String, SkillNetState>,
    shadow: bool,
    observer: Option<Box<dyn DecisionObserver>>,
}

impl GateManager {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            inactive: HashMap::new(),
            shadow: false,
            observer: None,
        }
    }

    pub fn with_shadow_mode(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn DecisionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Registers a net and activates it immediately.
    pub fn register_active(&mut self, skill: Arc<SkillNet>) {
        let name = skill.name.clone();
        self.active.push((name, SkillNetState::new(skill)));
    }

    /// Registers a net in the inactive registry without activating it.
    pub fn register_inactive(&mut self, skill: Arc<SkillNet>) {
        let name = skill.name.clone();
        self.inactive.insert(name, SkillNetState::new(skill));
    }

    /// Moves a net from the inactive registry into the active set,
    /// resuming its preserved state (§4.5 `add_net`).
    pub fn add_net(&mut self, name: &str) -> bool {
        if self.active.iter().any(|(n, _)| n == name) {
            return true;
        }
        if let Some(state) = self.inactive.remove(name) {
            info!(net = name, "activating");
            self.active.push((name.to_string(), state));
            true
        } else {
            false
        }
    }

    /// Moves a net from the active set into the inactive registry,
    /// preserving its marking, pending entries, and meta (§4.5
    /// `remove_net`). Pending entries outlive removal: a later
    /// `handle_tool_result` for an id recorded before removal still fires.
    pub fn remove_net(&mut self, name: &str) -> bool {
        if let Some(pos) = self.active.iter().position(|(n, _)| n == name) {
            let (_, state) = self.active.remove(pos);
            info!(net = name, "deactivating");
            self.inactive.insert(name.to_string(), state);
            true
        } else {
            false
        }
    }

    pub fn active_names(&self) -> Vec<&str> {
        self.active.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn inactive_names(&self) -> Vec<&str> {
        self.inactive.keys().map(|s| s.as_str()).collect()
    }

    /// §4.5 `handle_tool_call`: fan out to every active net in declaration
    /// order; any block wins, prefixed with the blocking net's name. In
    /// shadow mode the real decision is still computed (and all state
    /// mutations still happen) but the returned decision is forced to
    /// `Allow`; the would-be decision is reported via the observer.
    pub fn handle_tool_call(&mut self, event: &ToolCall, ctx: &mut Context<'_>) -> Decision {
        let mut result = Decision::Allow;
        for (name, state) in self.active.iter_mut() {
            let decision = state.handle_tool_call(event, ctx);
            if let Decision::Block { reason } = decision {
                if !result.is_blocked() {
                    result = Decision::block(format!("{}: {}", name, reason));
                }
            }
        }
        if self.shadow {
            if let Some(observer) = &self.observer {
                observer.on_decision(event, &result);
            }
            if result.is_blocked() {
                warn!(tool = %event.tool_name, "shadow mode: would have blocked");
            }
            return Decision::Allow;
        }
        result
    }

    /// §4.5 `handle_tool_result`: fan out to every net holding a pending
    /// entry for this tool-call id, including nets removed from the
    /// active set after the call was recorded.
    pub fn handle_tool_result(&mut self, event: &ToolResult) {
        for (_, state) in self.active.iter_mut() {
            if state.pending.contains_key(&event.tool_call_id) {
                state.handle_tool_result(event);
            }
        }
        for state in self.inactive.values_mut() {
            if state.pending.contains_key(&event.tool_call_id) {
                state.handle_tool_result(event);
            }
        }
    }

    /// A human-readable digest of every active net's state. Layout is not
    /// a contract (§4.5).
    pub fn format_status(&self) -> String {
        let mut out = String::new();
        for (name, state) in &self.active {
            out.push_str(&format!("## {}\n", name));
            for place in &state.skill.net.places {
                let tokens = state.marking.get(place.id).0;
                if tokens > 0 {
                    out.push_str(&format!("  {}: {}\n", place.name, tokens));
                }
            }
            if !state.pending.is_empty() {
                out.push_str(&format!("  pending: {}\n", state.pending.len()));
            }
        }
        out
    }

    /// A digest meant for inclusion in an agent's system prompt: which
    /// tools are currently licensed by at least one active net.
    pub fn format_system_prompt(&self) -> String {
        let mut out = String::from("Tool-use policy is structurally enforced. Currently licensed tools:\n");
        let mut tools: Vec<String> = Vec::new();
        for (_, state) in &self.active {
            for t in &state.skill.net.transitions {
                let meta = state.skill.meta(t.id);
                if meta.tools.is_empty() {
                    continue;
                }
                if state.skill.net.can_fire(&state.marking, t.id) {
                    tools.extend(meta.tools.iter().cloned());
                }
            }
        }
        tools.sort();
        tools.dedup();
        if tools.is_empty() {
            out.push_str("  (none)\n");
        } else {
            for t in tools {
                out.push_str(&format!("  - {}\n", t));
            }
        }
        out
    }
}

impl Default for GateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri_net::PetriNet;
    use crate::skill_net::{NoopHooks, SkillNet, TransitionMeta};
    use std::collections::HashSet;

    fn block_rule(tool: &str) -> Arc<SkillNet> {
        let net = PetriNet::build(
            vec!["idle".into(), "ready".into(), "locked".into()],
            vec![("idle".into(), 1)],
            vec![
                ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                ("do-a".into(), vec!["locked".into()], vec!["locked".into()]),
            ],
        )
        .unwrap();
        let meta = vec![
            TransitionMeta::structural(),
            TransitionMeta::automatic([tool.to_string()]),
        ];
        Arc::new(
            SkillNet::new(
                format!("block-{tool}"),
                net,
                &["ready".to_string()],
                HashSet::new(),
                meta,
                Arc::new(NoopHooks),
            )
            .unwrap(),
        )
    }

    fn require_before(a: &str, b: &str) -> Arc<SkillNet> {
        let net = PetriNet::build(
            vec!["idle".into(), "ready".into(), "gate".into()],
            vec![("idle".into(), 1)],
            vec![
                ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                ("do-a".into(), vec!["ready".into()], vec!["gate".into()]),
                ("do-b".into(), vec!["gate".into()], vec!["ready".into()]),
            ],
        )
        .unwrap();
        let meta = vec![
            TransitionMeta::structural(),
            TransitionMeta::automatic([a.to_string()]).deferred(),
            TransitionMeta::automatic([b.to_string()]),
        ];
        Arc::new(
            SkillNet::new(
                format!("require-{a}-before-{b}"),
                net,
                &["ready".to_string()],
                HashSet::new(),
                meta,
                Arc::new(NoopHooks),
            )
            .unwrap(),
        )
    }

    #[test]
    fn and_composition_any_block_wins() {
        let mut manager = GateManager::new();
        manager.register_active(block_rule("rm"));
        manager.register_active(require_before("backup", "delete"));

        let mut ctx = Context::no_ui();
        let rm_call = ToolCall::new("c1", "rm");
        let decision = manager.handle_tool_call(&rm_call, &mut ctx);
        assert!(decision.is_blocked());

        let backup_call = ToolCall::new("c2", "backup");
        assert_eq!(manager.handle_tool_call(&backup_call, &mut ctx), Decision::Allow);
        manager.handle_tool_result(&ToolResult {
            tool_call_id: "c2".into(),
            tool_name: "backup".into(),
            input: Default::default(),
            is_error: false,
        });
        let delete_call = ToolCall::new("c3", "delete");
        assert_eq!(manager.handle_tool_call(&delete_call, &mut ctx), Decision::Allow);
    }

    #[test]
    fn remove_then_pending_result_still_fires() {
        let mut manager = GateManager::new();
        manager.register_active(require_before("backup", "delete"));
        let mut ctx = Context::no_ui();
        let backup_call = ToolCall::new("c1", "backup");
        manager.handle_tool_call(&backup_call, &mut ctx);

        assert!(manager.remove_net(&format!("require-backup-before-delete")));
        manager.handle_tool_result(&ToolResult {
            tool_call_id: "c1".into(),
            tool_name: "backup".into(),
            input: Default::default(),
            is_error: false,
        });

        assert!(manager.add_net("require-backup-before-delete"));
        let delete_call = ToolCall::new("c2", "delete");
        assert_eq!(manager.handle_tool_call(&delete_call, &mut ctx), Decision::Allow);
    }

    struct RecordingObserver {
        seen: std::sync::Mutex<Vec<bool>>,
    }
    impl DecisionObserver for RecordingObserver {
        fn on_decision(&self, _event: &ToolCall, decision: &Decision) {
            self.seen.lock().unwrap().push(decision.is_blocked());
        }
    }

    #[test]
    fn shadow_mode_reports_but_does_not_enforce() {
        let observer = Box::new(RecordingObserver {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let mut manager = GateManager::new().with_shadow_mode(true).with_observer(observer);
        manager.register_active(block_rule("rm"));
        let mut ctx = Context::no_ui();
        let rm_call = ToolCall::new("c1", "rm");
        let decision = manager.handle_tool_call(&rm_call, &mut ctx);
        assert_eq!(decision, Decision::Allow);
    }
}
