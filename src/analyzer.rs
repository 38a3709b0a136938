//! The analyzer (§4.7): wraps the kernel's reachability enumeration to
//! classify terminal markings against a skill net's `terminal_places`, and
//! to check weighted-sum invariants across every reachable marking.
//!
//! This is an offline tool — unlike the gate, it is not consulted during a
//! live session; it is meant for CI checks, a standalone analyzer CLI, or
//! ad-hoc inspection of a rule net before it is deployed.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::petri_net::reachability;
use crate::petri_net::{Marking, PlaceId};
use crate::skill_net::SkillNet;

/// One named weighted-sum invariant: the claim that `sum(weights[p] *
/// marking[p])` is constant across every reachable marking.
pub struct Invariant {
    pub name: String,
    pub weights: BTreeMap<PlaceId, i64>,
}

/// The result of checking one [`Invariant`].
pub struct InvariantResult {
    pub name: String,
    pub holds: bool,
}

/// Full analysis of one skill net: reachable-state count, terminal-state
/// classification, and invariant checks.
pub struct Analysis {
    pub reachable_state_count: usize,
    pub terminal_states: Vec<Marking>,
    pub valid_terminal_states: Vec<Marking>,
    pub unexpected_terminal_states: Vec<Marking>,
    pub invariants: Vec<InvariantResult>,
}

/// Runs the analyzer over `skill` with an explicit state-space `bound`,
/// checking each of `invariants` against the reachable set.
///
/// A deadlock is a terminal marking with zero tokens in every one of the
/// net's `terminal_places` — the canonical safety violation per §4.7.
pub fn analyze(
    skill: &SkillNet,
    bound: Option<usize>,
    invariants: &[Invariant],
) -> Result<Analysis, CoreError> {
    let graph = reachability::reachable_graph(&skill.net, bound)?;
    let reachable_state_count = graph.len();

    let terminal_states: Vec<Marking> = graph
        .terminal_ids()
        .into_iter()
        .map(|id| graph.marking(id).clone())
        .collect();

    let is_valid = |marking: &Marking| {
        skill
            .terminal_places
            .iter()
            .any(|&p| marking.get(p).0 > 0)
    };
    let valid_terminal_states: Vec<Marking> = terminal_states
        .iter()
        .filter(|m| is_valid(m))
        .cloned()
        .collect();
    let unexpected_terminal_states: Vec<Marking> = terminal_states
        .iter()
        .filter(|m| !is_valid(m))
        .cloned()
        .collect();

    let invariant_results = invariants
        .iter()
        .map(|inv| InvariantResult {
            name: inv.name.clone(),
            holds: skill
                .net
                .check_invariant(&inv.weights, bound)
                .unwrap_or(false),
        })
        .collect();

    Ok(Analysis {
        reachable_state_count,
        terminal_states,
        valid_terminal_states,
        unexpected_terminal_states,
        invariants: invariant_results,
    })
}

/// Convenience wrapper for the "analyzer CLI" surface named in §6: renders
/// the net's DOT graph annotated with its initial marking.
pub fn dot(skill: &SkillNet) -> String {
    skill.net.dot(Some(&skill.net.initial_marking))
}
