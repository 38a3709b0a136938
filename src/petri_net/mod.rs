//! The Petri net kernel: places, transitions, markings, firing, and the
//! structural analyses (reachability, terminal detection, invariants,
//! DOT rendering) built on top of them.
//!
//! This module knows nothing about tools, gating, or sessions — that
//! vocabulary lives one layer up in [`crate::skill_net`]. A [`PetriNet`]
//! here is the bare mathematical object from §3 of the design: a list of
//! places, a list of transitions each with multiset inputs/outputs, and
//! an initial marking.

pub mod reachability;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError};

/// Identifies a place by its position in a net's `places` vector.
///
/// Displayed as "P" followed by the index, e.g. P0, P1, P2, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, DeriveDisplay, Serialize, Deserialize)]
#[display(fmt = "P{}", _0)]
pub struct PlaceId(pub usize);

/// Identifies a transition by its position in a net's `transitions` vector.
///
/// Displayed as "T" followed by the index, e.g. T0, T1, T2, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, DeriveDisplay, Serialize, Deserialize)]
#[display(fmt = "T{}", _0)]
pub struct TransitionId(pub usize);

/// A number of tokens on a place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, DeriveDisplay, Serialize, Deserialize)]
pub struct Tokens(pub usize);

/// A named location holding a non-negative count of indistinguishable
/// tokens. Identity is the name; `id` is only a fast lookup key within one
/// net's arrays.
#[derive(Debug, Clone)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
}

/// A named input/output multiset pair. A place may appear more than once
/// in `inputs` or `outputs`; repetition is the arc weight.
#[derive(Debug, Clone)]
pub struct Transition {
    pub id: TransitionId,
    pub name: String,
    pub inputs: Vec<PlaceId>,
    pub outputs: Vec<PlaceId>,
}

/// A total mapping from a net's declared places to non-negative token
/// counts. Implemented sparsely (only non-zero places are stored); `get`
/// returns `Tokens(0)` for any place not present, which is how the
/// "always includes every declared place" invariant from §3 holds without
/// having to eagerly populate zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marking(BTreeMap<PlaceId, Tokens>);

impl Marking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PlaceId) -> Tokens {
        self.0.get(&id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, id: PlaceId, tokens: Tokens) {
        if tokens.0 == 0 {
            self.0.remove(&id);
        } else {
            self.0.insert(id, tokens);
        }
    }

    /// Adds `delta` tokens to a place (may be used for explicit token
    /// injection by adapters).
    pub fn add(&mut self, id: PlaceId, delta: usize) {
        let cur = self.get(id);
        self.set(id, Tokens(cur.0 + delta));
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Tokens)> + '_ {
        self.0.iter().map(|(&id, &tokens)| (id, tokens))
    }
}

impl<P: Into<PlaceId>, T: Into<Tokens>> FromIterator<(P, T)> for Marking {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        let mut marking = Marking::default();
        for (id, tokens) in iter {
            marking.set(id.into(), tokens.into());
        }
        marking
    }
}

impl From<usize> for Tokens {
    fn from(value: usize) -> Self {
        Tokens(value)
    }
}

/// The bare Petri net: places, transitions, and an initial marking.
/// Immutable once built — see `PetriNet::build` for the validation §4.2
/// requires at construction.
#[derive(Debug, Clone)]
pub struct PetriNet {
    pub places: Vec<Place>,
    pub transitions: Vec<Transition>,
    pub initial_marking: Marking,
}

impl PetriNet {
    /// Builds a net from names, validating that every transition arc and
    /// every initial-marking entry refers to a declared place. This is the
    /// `ConfigurationError` surface named in §7.
    pub fn build(
        place_names: Vec<String>,
        initial_marking: Vec<(String, usize)>,
        transitions: Vec<(String, Vec<String>, Vec<String>)>,
    ) -> Result<Self, ConfigError> {
        let places: Vec<Place> = place_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Place {
                id: PlaceId(i),
                name,
            })
            .collect();
        let by_name = |name: &str| {
            places
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.id)
                .ok_or_else(|| ConfigError::UnknownPlace(name.to_string()))
        };

        let mut marking = Marking::new();
        for (name, count) in initial_marking {
            let id = by_name(&name)?;
            marking.add(id, count);
        }

        let mut built_transitions = Vec::with_capacity(transitions.len());
        for (i, (name, inputs, outputs)) in transitions.into_iter().enumerate() {
            let inputs = inputs
                .iter()
                .map(|n| by_name(n))
                .collect::<Result<Vec<_>, _>>()?;
            let outputs = outputs
                .iter()
                .map(|n| by_name(n))
                .collect::<Result<Vec<_>, _>>()?;
            built_transitions.push(Transition {
                id: TransitionId(i),
                name,
                inputs,
                outputs,
            });
        }

        Ok(PetriNet {
            places,
            transitions: built_transitions,
            initial_marking: marking,
        })
    }

    pub fn place(&self, id: PlaceId) -> &Place {
        &self.places[id.0]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0]
    }

    pub fn place_named(&self, name: &str) -> Option<PlaceId> {
        self.places.iter().find(|p| p.name == name).map(|p| p.id)
    }

    pub fn transition_named(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    /// Counts occurrences of each place in a multiset arc list.
    pub(crate) fn multiplicities(places: &[PlaceId]) -> BTreeMap<PlaceId, usize> {
        let mut counts = BTreeMap::new();
        for &p in places {
            *counts.entry(p).or_insert(0) += 1;
        }
        counts
    }

    /// §4.1 `can_fire`.
    pub fn can_fire(&self, marking: &Marking, id: TransitionId) -> bool {
        let t = self.transition(id);
        Self::multiplicities(&t.inputs)
            .into_iter()
            .all(|(p, need)| marking.get(p).0 >= need)
    }

    /// §4.1 `enabled` — transitions structurally enabled at `marking`, in
    /// declaration order. The kernel never picks among them; that is a
    /// caller policy (auto-advancer, gate).
    pub fn enabled(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .iter()
            .map(|t| t.id)
            .filter(|&id| self.can_fire(marking, id))
            .collect()
    }

    /// §4.1 `fire` — deterministic multiset arithmetic: `M' = M - inputs + outputs`.
    pub fn fire(&self, marking: &Marking, id: TransitionId) -> Result<Marking, CoreError> {
        if !self.can_fire(marking, id) {
            return Err(CoreError::NotEnabled(self.transition(id).name.clone()));
        }
        let t = self.transition(id);
        let mut next = marking.clone();
        for &p in &t.inputs {
            let cur = next.get(p);
            next.set(p, Tokens(cur.0 - 1));
        }
        for &p in &t.outputs {
            let cur = next.get(p);
            next.set(p, Tokens(cur.0 + 1));
        }
        Ok(next)
    }

    /// §4.1 `check_invariant` — true iff the weighted token sum is
    /// constant across every reachable marking. Requires a bound when the
    /// net's boundedness is not already known, per §9.
    pub fn check_invariant(
        &self,
        weights: &BTreeMap<PlaceId, i64>,
        bound: Option<usize>,
    ) -> Result<bool, CoreError> {
        let reached = reachability::reachable(self, bound)?;
        let value = |m: &Marking| -> i64 {
            weights
                .iter()
                .map(|(&p, &w)| w * m.get(p).0 as i64)
                .sum()
        };
        let mut values = reached.iter().map(value);
        let Some(first) = values.next() else {
            return Ok(true);
        };
        Ok(values.all(|v| v == first))
    }

    /// §4.1 `dot` — Graphviz rendering of the net, optionally annotated
    /// with token counts from `marking`.
    pub fn dot(&self, marking: Option<&Marking>) -> String {
        let mut out = String::from("digraph petri_net {\n  rankdir=LR;\n");
        for place in &self.places {
            let tokens = marking.map(|m| m.get(place.id).0).unwrap_or(0);
            let label = if marking.is_some() {
                format!("{} ({})", place.name, tokens)
            } else {
                place.name.clone()
            };
            out.push_str(&format!(
                "  \"{}\" [shape=circle, label=\"{}\"];\n",
                place.name, label
            ));
        }
        for t in &self.transitions {
            out.push_str(&format!(
                "  \"t:{}\" [shape=box, label=\"{}\"];\n",
                t.name, t.name
            ));
            for &p in &t.inputs {
                out.push_str(&format!(
                    "  \"{}\" -> \"t:{}\";\n",
                    self.place(p).name,
                    t.name
                ));
            }
            for &p in &t.outputs {
                out.push_str(&format!(
                    "  \"t:{}\" -> \"{}\";\n",
                    t.name,
                    self.place(p).name
                ));
            }
        }
        out.push_str("}\n");
        out
    }
}

impl Display for PetriNet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "places: {}", self.places.len())?;
        for t in &self.transitions {
            writeln!(
                f,
                "{} {} : {:?} -> {:?}",
                t.id,
                t.name,
                t.inputs.iter().map(|p| self.place(*p).name.as_str()).collect::<Vec<_>>(),
                t.outputs.iter().map(|p| self.place(*p).name.as_str()).collect::<Vec<_>>(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> PetriNet {
        // idle -> ready -> gate -> ready (via do-A), licensing nothing yet
        PetriNet::build(
            vec!["idle".into(), "ready".into(), "gate".into()],
            vec![("idle".into(), 1)],
            vec![
                ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                ("do-a".into(), vec!["ready".into()], vec!["gate".into()]),
                ("do-b".into(), vec!["gate".into()], vec!["ready".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn unknown_place_is_configuration_error() {
        let err = PetriNet::build(
            vec!["idle".into()],
            vec![("nope".into(), 1)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlace(_)));
    }

    #[test]
    fn enabled_respects_declaration_order() {
        let net = net();
        let enabled = net.enabled(&net.initial_marking);
        assert_eq!(enabled, vec![net.transition_named("start").unwrap()]);
    }

    #[test]
    fn firing_consumes_and_produces() {
        let net = net();
        let start = net.transition_named("start").unwrap();
        let m1 = net.fire(&net.initial_marking, start).unwrap();
        assert_eq!(m1.get(net.place_named("idle").unwrap()).0, 0);
        assert_eq!(m1.get(net.place_named("ready").unwrap()).0, 1);
    }

    #[test]
    fn firing_unenabled_transition_errors() {
        let net = net();
        let do_b = net.transition_named("do-b").unwrap();
        assert!(!net.can_fire(&net.initial_marking, do_b));
        let err = net.fire(&net.initial_marking, do_b).unwrap_err();
        assert!(matches!(err, CoreError::NotEnabled(_)));
    }

    #[test]
    fn multiplicity_via_repeated_places() {
        // a transition requiring 2 tokens from "ready" to fire
        let net = PetriNet::build(
            vec!["ready".into(), "done".into()],
            vec![("ready".into(), 1)],
            vec![(
                "double".into(),
                vec!["ready".into(), "ready".into()],
                vec!["done".into()],
            )],
        )
        .unwrap();
        let double = net.transition_named("double").unwrap();
        assert!(!net.can_fire(&net.initial_marking, double));
        let mut m = net.initial_marking.clone();
        m.add(net.place_named("ready").unwrap(), 1);
        assert!(net.can_fire(&m, double));
    }
}
