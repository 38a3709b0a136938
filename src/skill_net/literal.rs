//! The skill-net literal form (§6): the serializable data shape adapters
//! ship nets as, and the two conversions between it and a live
//! [`SkillNet`] — `to_literal` / `from_literal`. Round-tripping through
//! this shape is the other §8 testable property: "DSL parse → lower →
//! render-to-literal → re-parse yields equivalent nets."

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::petri_net::PetriNet;
use crate::skill_net::{SkillNet, SkillNetHooks, TransitionMeta, TransitionType};

/// The wire form of [`TransitionType`]: `"automatic"` or `"manual"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionTypeLiteral {
    Automatic,
    Manual,
}

impl From<TransitionType> for TransitionTypeLiteral {
    fn from(t: TransitionType) -> Self {
        match t {
            TransitionType::Automatic => TransitionTypeLiteral::Automatic,
            TransitionType::Manual => TransitionTypeLiteral::Manual,
        }
    }
}

impl From<TransitionTypeLiteral> for TransitionType {
    fn from(t: TransitionTypeLiteral) -> Self {
        match t {
            TransitionTypeLiteral::Automatic => TransitionType::Automatic,
            TransitionTypeLiteral::Manual => TransitionType::Manual,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One transition in literal form, per §6's
/// `{ name, type, inputs, outputs, tools?, deferred? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLiteral {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransitionTypeLiteral,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deferred: bool,
}

/// A whole skill net in literal form, per §6's
/// `{ name, places[], terminal_places[], free_tools[], initial_marking, transitions[] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillNetLiteral {
    pub name: String,
    pub places: Vec<String>,
    pub terminal_places: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_tools: Vec<String>,
    pub initial_marking: BTreeMap<String, usize>,
    pub transitions: Vec<TransitionLiteral>,
}

impl SkillNet {
    /// Renders this net as its §6 literal form.
    pub fn to_literal(&self) -> SkillNetLiteral {
        let places: Vec<String> = self.net.places.iter().map(|p| p.name.clone()).collect();
        let terminal_places: Vec<String> = self
            .net
            .places
            .iter()
            .filter(|p| self.terminal_places.contains(&p.id))
            .map(|p| p.name.clone())
            .collect();
        let mut free_tools: Vec<String> = self.free_tools.iter().cloned().collect();
        free_tools.sort();
        let initial_marking = self
            .net
            .initial_marking
            .iter()
            .map(|(id, tokens)| (self.net.place(id).name.clone(), tokens.0))
            .collect();
        let transitions = self
            .net
            .transitions
            .iter()
            .map(|t| {
                let meta = self.meta(t.id);
                let mut tools: Vec<String> = meta.tools.iter().cloned().collect();
                tools.sort();
                TransitionLiteral {
                    name: t.name.clone(),
                    kind: meta.transition_type.into(),
                    inputs: t
                        .inputs
                        .iter()
                        .map(|&p| self.net.place(p).name.clone())
                        .collect(),
                    outputs: t
                        .outputs
                        .iter()
                        .map(|&p| self.net.place(p).name.clone())
                        .collect(),
                    tools,
                    deferred: meta.deferred,
                }
            })
            .collect();
        SkillNetLiteral {
            name: self.name.clone(),
            places,
            terminal_places,
            free_tools,
            initial_marking,
            transitions,
        }
    }

    /// Builds a live net from its §6 literal form, validating exactly as
    /// [`PetriNet::build`] and [`SkillNet::new`] do. `hooks` is supplied
    /// separately: the literal form carries no executable behavior.
    pub fn from_literal(
        literal: &SkillNetLiteral,
        hooks: Arc<dyn SkillNetHooks>,
    ) -> Result<SkillNet, ConfigError> {
        let initial_marking: Vec<(String, usize)> = literal
            .initial_marking
            .iter()
            .map(|(name, tokens)| (name.clone(), *tokens))
            .collect();
        let transitions: Vec<(String, Vec<String>, Vec<String>)> = literal
            .transitions
            .iter()
            .map(|t| (t.name.clone(), t.inputs.clone(), t.outputs.clone()))
            .collect();
        let net = PetriNet::build(literal.places.clone(), initial_marking, transitions)?;

        let transition_meta = literal
            .transitions
            .iter()
            .map(|t| {
                let mut meta = match TransitionType::from(t.kind) {
                    TransitionType::Automatic => TransitionMeta::automatic(t.tools.clone()),
                    TransitionType::Manual => TransitionMeta::manual(t.tools.clone()),
                };
                if t.deferred {
                    meta = meta.deferred();
                }
                meta
            })
            .collect();

        let free_tools: HashSet<String> = literal.free_tools.iter().cloned().collect();
        SkillNet::new(
            literal.name.clone(),
            net,
            &literal.terminal_places,
            free_tools,
            transition_meta,
            hooks,
        )
    }
}
