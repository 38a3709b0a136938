//! The skill-net schema (§4.2): a [`PetriNet`] plus the per-transition
//! gating metadata and per-net hooks that let the gate reason about tools
//! instead of bare topology.

mod hooks;
pub mod literal;
mod meta;

pub use hooks::{DeferredCtx, HookResult, NoopHooks, SkillNetHooks, ValidateCtx};
pub use literal::{SkillNetLiteral, TransitionLiteral, TransitionTypeLiteral};
pub use meta::Meta;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::petri_net::{PetriNet, PlaceId, TransitionId};

/// Whether a transition fires silently (`Automatic`) or needs an
/// affirmative human confirmation (`Manual`). Orthogonal to whether it
/// licenses any tools — see [`TransitionKind`] for the derived,
/// gating-relevant classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionType {
    Automatic,
    Manual,
}

/// The three disjoint kinds §4.2 classifies every transition into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// `type = automatic`, no licensed tools: fired silently by the
    /// auto-advancer.
    Structural,
    /// `type = automatic`, licenses one or more tools: a candidate for
    /// licensing a tool call without confirmation.
    GatedAuto,
    /// `type = manual`: a candidate for licensing a tool call, but
    /// requires an affirmative human confirmation.
    GatedManual,
}

/// Per-transition gating metadata layered on top of the bare kernel
/// transition of the same ID.
#[derive(Debug, Clone)]
pub struct TransitionMeta {
    pub transition_type: TransitionType,
    pub tools: HashSet<String>,
    pub deferred: bool,
}

impl TransitionMeta {
    pub fn automatic(tools: impl IntoIterator<Item = String>) -> Self {
        Self {
            transition_type: TransitionType::Automatic,
            tools: tools.into_iter().collect(),
            deferred: false,
        }
    }

    pub fn structural() -> Self {
        Self::automatic(std::iter::empty())
    }

    pub fn manual(tools: impl IntoIterator<Item = String>) -> Self {
        Self {
            transition_type: TransitionType::Manual,
            tools: tools.into_iter().collect(),
            deferred: false,
        }
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    pub fn kind(&self) -> TransitionKind {
        match (self.transition_type, self.tools.is_empty()) {
            (TransitionType::Automatic, true) => TransitionKind::Structural,
            (TransitionType::Automatic, false) => TransitionKind::GatedAuto,
            (TransitionType::Manual, _) => TransitionKind::GatedManual,
        }
    }

    pub fn licenses(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }
}

/// A [`PetriNet`] plus the gating vocabulary the gate needs: `places` and
/// `terminal_places` for validation and classification, `free_tools` that
/// bypass gating entirely, per-transition metadata, and optional hooks.
pub struct SkillNet {
    pub name: String,
    pub net: PetriNet,
    pub terminal_places: HashSet<PlaceId>,
    pub free_tools: HashSet<String>,
    pub transition_meta: Vec<TransitionMeta>,
    pub hooks: Arc<dyn SkillNetHooks>,
}

impl std::fmt::Debug for SkillNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillNet")
            .field("name", &self.name)
            .field("net", &self.net)
            .field("terminal_places", &self.terminal_places)
            .field("free_tools", &self.free_tools)
            .field("transition_meta", &self.transition_meta)
            .field("hooks", &"<dyn SkillNetHooks>")
            .finish()
    }
}

impl SkillNet {
    /// Validates the construction-time invariants from §4.2: terminal
    /// places must be declared places, and `transition_meta` must have
    /// exactly one entry per transition.
    pub fn new(
        name: impl Into<String>,
        net: PetriNet,
        terminal_place_names: &[String],
        free_tools: HashSet<String>,
        transition_meta: Vec<TransitionMeta>,
        hooks: Arc<dyn SkillNetHooks>,
    ) -> Result<Self, ConfigError> {
        if transition_meta.len() != net.transitions.len() {
            return Err(ConfigError::UnknownPlace(format!(
                "transition_meta has {} entries but net has {} transitions",
                transition_meta.len(),
                net.transitions.len()
            )));
        }
        let mut terminal_places = HashSet::new();
        for name in terminal_place_names {
            let id = net
                .place_named(name)
                .ok_or_else(|| ConfigError::UnknownTerminalPlace(name.clone()))?;
            terminal_places.insert(id);
        }
        Ok(SkillNet {
            name: name.into(),
            net,
            terminal_places,
            free_tools,
            transition_meta,
            hooks,
        })
    }

    pub fn meta(&self, id: TransitionId) -> &TransitionMeta {
        &self.transition_meta[id.0]
    }

    /// Structural transitions: automatic, no licensed tools. Used by the
    /// auto-advancer (§4.3).
    pub fn structural_transitions(&self) -> Vec<TransitionId> {
        self.net
            .transitions
            .iter()
            .map(|t| t.id)
            .filter(|&id| self.meta(id).kind() == TransitionKind::Structural)
            .collect()
    }

    /// Gated transitions (auto or manual) whose `tools` contains
    /// `resolved_tool`, in declaration order — §4.4 step 3's "candidate
    /// transitions".
    pub fn candidates_for(&self, resolved_tool: &str) -> Vec<TransitionId> {
        self.net
            .transitions
            .iter()
            .map(|t| t.id)
            .filter(|&id| {
                let kind = self.meta(id).kind();
                kind != TransitionKind::Structural && self.meta(id).licenses(resolved_tool)
            })
            .collect()
    }

    pub fn is_free_tool(&self, tool: &str) -> bool {
        self.free_tools.contains(tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_net() -> PetriNet {
        PetriNet::build(
            vec!["idle".into(), "ready".into()],
            vec![("idle".into(), 1)],
            vec![
                ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                ("search".into(), vec!["ready".into()], vec!["ready".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn classifies_structural_and_gated_auto() {
        let net = sample_net();
        let meta = vec![
            TransitionMeta::structural(),
            TransitionMeta::automatic(["search".to_string()]),
        ];
        let skill = SkillNet::new(
            "demo",
            net,
            &["ready".to_string()],
            HashSet::new(),
            meta,
            Arc::new(NoopHooks),
        )
        .unwrap();
        assert_eq!(
            skill.meta(skill.net.transition_named("start").unwrap()).kind(),
            TransitionKind::Structural
        );
        assert_eq!(
            skill.meta(skill.net.transition_named("search").unwrap()).kind(),
            TransitionKind::GatedAuto
        );
    }

    #[test]
    fn unknown_terminal_place_is_configuration_error() {
        let net = sample_net();
        let meta = vec![TransitionMeta::structural(), TransitionMeta::structural()];
        let err = SkillNet::new(
            "demo",
            net,
            &["nope".to_string()],
            HashSet::new(),
            meta,
            Arc::new(NoopHooks),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTerminalPlace(_)));
    }
}
