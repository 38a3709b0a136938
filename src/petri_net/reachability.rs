//! Reachable-state enumeration over a [`PetriNet`], by breadth-first search
//! from the initial marking. Grounded in the teacher crate's
//! `reachability_analysis`: a visited-markings map keyed with `ahash` for
//! speed, a `VecDeque` work queue, and per-marking IDs for cheap display —
//! but trimmed to what the design's Component table asks of the kernel
//! (reachability, terminal detection, invariant check) and dropped the
//! teacher's boundedness/liveness classification, which spec.md does not
//! call for.

use std::collections::{HashSet, VecDeque};
use std::fmt::{self, Display, Formatter};

use ahash::RandomState as AHashState;
use derive_more::Display as DeriveDisplay;

use super::{Marking, PetriNet, TransitionId};
use crate::error::CoreError;

/// A unique ID for a marking discovered during BFS, in discovery order.
/// Displayed as "M" followed by the ID padded by 3 leading 0s, e.g. M000,
/// M001, M002, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeriveDisplay)]
#[display(fmt = "M{:03}", _0)]
pub struct MarkingId(pub usize);

/// An outgoing edge from one marking: firing `transition` leads to `to`.
#[derive(Debug, Clone, Copy, DeriveDisplay)]
#[display(fmt = "{}->{}", transition, to)]
pub struct Continuation {
    pub transition: TransitionId,
    pub to: MarkingId,
}

/// Tracks markings seen during BFS and assigns them stable, discovery-order
/// IDs, exactly as the teacher's `Markings` helper does.
#[derive(Debug, Default)]
struct Markings {
    by_marking: std::collections::HashMap<Marking, MarkingId, AHashState>,
    by_id: Vec<Marking>,
}

impl Markings {
    fn remember(&mut self, marking: Marking) -> MarkingId {
        let id = MarkingId(self.by_id.len());
        self.by_marking.insert(marking.clone(), id);
        self.by_id.push(marking);
        id
    }

    fn look_up(&self, marking: &Marking) -> Option<MarkingId> {
        self.by_marking.get(marking).copied()
    }
}

/// The full reachability graph: every marking discovered from the initial
/// marking, each with the IDs of the markings its enabled transitions lead
/// to.
#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    pub markings: Vec<Marking>,
    pub edges: Vec<Vec<Continuation>>,
}

impl ReachabilityGraph {
    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    pub fn marking(&self, id: MarkingId) -> &Marking {
        &self.markings[id.0]
    }

    /// Markings with no outgoing transition at all — §4.1's `terminal`.
    pub fn terminal_ids(&self) -> Vec<MarkingId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_empty())
            .map(|(i, _)| MarkingId(i))
            .collect()
    }
}

/// §4.1 `reachable` — BFS from the initial marking. When `bound` is given,
/// enumeration stops and raises [`CoreError::StateSpaceExceeded`] once the
/// discovered set exceeds it; unbounded enumeration is expected to
/// terminate on bounded nets (callers of potentially-unbounded nets must
/// supply a bound, per §9).
pub fn reachable_graph(net: &PetriNet, bound: Option<usize>) -> Result<ReachabilityGraph, CoreError> {
    let mut markings = Markings::default();
    let initial_id = markings.remember(net.initial_marking.clone());

    let mut queue = VecDeque::new();
    queue.push_back(initial_id);

    let mut edges: Vec<Vec<Continuation>> = vec![Vec::new()];

    while let Some(id) = queue.pop_front() {
        if let Some(b) = bound {
            if markings.by_id.len() > b {
                return Err(CoreError::StateSpaceExceeded { bound: b });
            }
        }
        let marking = markings.by_id[id.0].clone();
        let mut outgoing = Vec::new();
        for transition_id in net.enabled(&marking) {
            let next = net
                .fire(&marking, transition_id)
                .expect("enabled transition must fire");
            let to = match markings.look_up(&next) {
                Some(existing) => existing,
                None => {
                    let new_id = markings.remember(next);
                    edges.push(Vec::new());
                    queue.push_back(new_id);
                    new_id
                }
            };
            outgoing.push(Continuation {
                transition: transition_id,
                to,
            });
        }
        edges[id.0] = outgoing;
    }

    Ok(ReachabilityGraph {
        markings: markings.by_id,
        edges,
    })
}

/// Convenience wrapper over [`reachable_graph`] returning just the set of
/// reachable markings, deduplicated.
pub fn reachable(net: &PetriNet, bound: Option<usize>) -> Result<HashSet<Marking>, CoreError> {
    Ok(reachable_graph(net, bound)?.markings.into_iter().collect())
}

/// §4.1 `terminal` — reachable markings where no transition is enabled.
pub fn terminal(net: &PetriNet, bound: Option<usize>) -> Result<Vec<Marking>, CoreError> {
    let graph = reachable_graph(net, bound)?;
    Ok(graph
        .terminal_ids()
        .into_iter()
        .map(|id| graph.marking(id).clone())
        .collect())
}

/// Renders the reachability graph as a table, in the spirit of the
/// teacher's `ReachabilityAnalysis` `Display` impl: one row per marking,
/// one column per place, a trailing list of outgoing continuations.
impl Display for ReachabilityGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} reachable marking(s)", self.markings.len())?;
        for (i, marking) in self.markings.iter().enumerate() {
            write!(f, "{:<7}", MarkingId(i).to_string())?;
            for (place, tokens) in marking.iter() {
                write!(f, "{}={} ", place, tokens)?;
            }
            let outs: Vec<String> = self.edges[i].iter().map(|c| c.to_string()).collect();
            writeln!(f, "  [{}]", outs.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri_net::PetriNet;

    fn loop_net() -> PetriNet {
        PetriNet::build(
            vec!["a".into(), "b".into()],
            vec![("a".into(), 1)],
            vec![
                ("a_to_b".into(), vec!["a".into()], vec!["b".into()]),
                ("b_to_a".into(), vec!["b".into()], vec!["a".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reachable_finds_both_states_of_a_toggle() {
        let net = loop_net();
        let reached = reachable(&net, Some(100)).unwrap();
        assert_eq!(reached.len(), 2);
    }

    #[test]
    fn toggle_net_has_no_terminal_states() {
        let net = loop_net();
        let term = terminal(&net, Some(100)).unwrap();
        assert!(term.is_empty());
    }

    #[test]
    fn dead_end_net_has_one_terminal_state() {
        let net = PetriNet::build(
            vec!["a".into(), "b".into()],
            vec![("a".into(), 1)],
            vec![("a_to_b".into(), vec!["a".into()], vec!["b".into()])],
        )
        .unwrap();
        let term = terminal(&net, Some(100)).unwrap();
        assert_eq!(term.len(), 1);
        assert_eq!(term[0].get(net.place_named("b").unwrap()).0, 1);
    }

    #[test]
    fn bound_exceeded_raises_state_space_exceeded() {
        // unbounded producer: fires forever, accumulating tokens
        let net = PetriNet::build(
            vec!["a".into()],
            vec![("a".into(), 1)],
            vec![("grow".into(), vec!["a".into()], vec!["a".into(), "a".into()])],
        )
        .unwrap();
        let err = reachable(&net, Some(10)).unwrap_err();
        assert!(matches!(err, CoreError::StateSpaceExceeded { bound: 10 }));
    }

    #[test]
    fn invariant_holds_for_conserved_toggle() {
        let net = loop_net();
        let mut weights = std::collections::BTreeMap::new();
        weights.insert(net.place_named("a").unwrap(), 1);
        weights.insert(net.place_named("b").unwrap(), 1);
        assert!(net.check_invariant(&weights, Some(100)).unwrap());
    }
}
