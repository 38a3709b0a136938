//! Lowers each DSL rule to a minimal skill net, per §4.6's "Lowering to
//! nets". Each rule produces an independently verifiable net; combining
//! the tool mapper across rules happens one layer up in
//! [`crate::compiler`].

use crate::compiler::ast::{Rule, Scope};
use crate::error::ConfigError;
use crate::petri_net::PetriNet;
use crate::skill_net::TransitionMeta;

/// A lowered rule, before hooks are attached: a unique name, the bare net,
/// its terminal place names, and per-transition gating metadata aligned
/// with the net's transition order.
pub struct LoweredNet {
    pub name: String,
    pub net: PetriNet,
    pub terminal_places: Vec<String>,
    pub transition_meta: Vec<TransitionMeta>,
}

pub fn lower_rule(rule: &Rule) -> Result<LoweredNet, ConfigError> {
    match rule {
        Rule::Sequence { before, after } => lower_sequence(before, after),
        Rule::HumanApproval { before } => lower_human_approval(before),
        Rule::Block { tool } => lower_block(tool),
        Rule::Limit { tool, n, scope } => lower_limit(tool, *n, scope),
    }
}

fn lower_sequence(before: &str, after: &str) -> Result<LoweredNet, ConfigError> {
    let net = PetriNet::build(
        vec!["idle".into(), "ready".into(), "gate".into()],
        vec![("idle".into(), 1)],
        vec![
            ("start".into(), vec!["idle".into()], vec!["ready".into()]),
            (
                format!("do-{before}"),
                vec!["ready".into()],
                vec!["gate".into()],
            ),
            (
                format!("do-{after}"),
                vec!["gate".into()],
                vec!["ready".into()],
            ),
        ],
    )?;
    Ok(LoweredNet {
        name: format!("require-{before}-before-{after}"),
        net,
        terminal_places: vec!["ready".into()],
        transition_meta: vec![
            TransitionMeta::structural(),
            TransitionMeta::automatic([before.to_string()]).deferred(),
            TransitionMeta::automatic([after.to_string()]),
        ],
    })
}

fn lower_human_approval(before: &str) -> Result<LoweredNet, ConfigError> {
    let net = PetriNet::build(
        vec!["idle".into(), "ready".into()],
        vec![("idle".into(), 1)],
        vec![
            ("start".into(), vec!["idle".into()], vec!["ready".into()]),
            (
                "approve".into(),
                vec!["ready".into()],
                vec!["ready".into()],
            ),
        ],
    )?;
    Ok(LoweredNet {
        name: format!("require-human-approval-before-{before}"),
        net,
        terminal_places: vec!["ready".into()],
        transition_meta: vec![
            TransitionMeta::structural(),
            TransitionMeta::manual([before.to_string()]),
        ],
    })
}

fn lower_block(tool: &str) -> Result<LoweredNet, ConfigError> {
    let net = PetriNet::build(
        vec!["idle".into(), "ready".into(), "locked".into()],
        vec![("idle".into(), 1)],
        vec![
            ("start".into(), vec!["idle".into()], vec!["ready".into()]),
            (
                format!("do-{tool}"),
                vec!["locked".into()],
                vec!["locked".into()],
            ),
        ],
    )?;
    Ok(LoweredNet {
        name: format!("block-{tool}"),
        net,
        terminal_places: vec!["ready".into()],
        transition_meta: vec![
            TransitionMeta::structural(),
            TransitionMeta::automatic([tool.to_string()]),
        ],
    })
}

fn lower_limit(tool: &str, n: u32, scope: &Scope) -> Result<LoweredNet, ConfigError> {
    match scope {
        Scope::Session => {
            let net = PetriNet::build(
                vec!["idle".into(), "ready".into(), "budget".into()],
                vec![("idle".into(), 1), ("budget".into(), n as usize)],
                vec![
                    ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                    (
                        format!("do-{tool}"),
                        vec!["ready".into(), "budget".into()],
                        vec!["ready".into()],
                    ),
                ],
            )?;
            Ok(LoweredNet {
                name: format!("limit-{tool}-{n}-per-session"),
                net,
                terminal_places: vec!["ready".into()],
                transition_meta: vec![
                    TransitionMeta::structural(),
                    TransitionMeta::automatic([tool.to_string()]),
                ],
            })
        }
        Scope::Tool(refill_tool) => {
            let net = PetriNet::build(
                vec![
                    "idle".into(),
                    "ready".into(),
                    "budget".into(),
                    "spent".into(),
                ],
                vec![
                    ("idle".into(), 1),
                    ("budget".into(), n as usize),
                    ("spent".into(), 0),
                ],
                vec![
                    ("start".into(), vec!["idle".into()], vec!["ready".into()]),
                    (
                        format!("do-{tool}"),
                        vec!["ready".into(), "budget".into()],
                        vec!["ready".into(), "spent".into()],
                    ),
                    (
                        format!("refill-{refill_tool}"),
                        vec!["ready".into(), "spent".into()],
                        vec!["ready".into(), "budget".into()],
                    ),
                ],
            )?;
            Ok(LoweredNet {
                name: format!("limit-{tool}-{n}-per-{refill_tool}"),
                net,
                terminal_places: vec!["ready".into()],
                transition_meta: vec![
                    TransitionMeta::structural(),
                    TransitionMeta::automatic([tool.to_string()]),
                    TransitionMeta::automatic([refill_tool.to_string()]),
                ],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri_net::reachability;

    #[test]
    fn sequence_net_name_and_shape() {
        let lowered = lower_rule(&Rule::Sequence {
            before: "backup".into(),
            after: "delete".into(),
        })
        .unwrap();
        assert_eq!(lowered.name, "require-backup-before-delete");
        assert_eq!(lowered.net.places.len(), 3);
        assert_eq!(lowered.net.transitions.len(), 3);
    }

    #[test]
    fn block_net_locked_place_never_reachable_with_tokens() {
        let lowered = lower_rule(&Rule::Block { tool: "rm".into() }).unwrap();
        let reached = reachability::reachable(&lowered.net, Some(100)).unwrap();
        let locked = lowered.net.place_named("locked").unwrap();
        assert!(reached.iter().all(|m| m.get(locked).0 == 0));
    }

    #[test]
    fn limit_session_net_is_finite_and_bounded_by_budget() {
        let lowered = lower_rule(&Rule::Limit {
            tool: "search".into(),
            n: 3,
            scope: Scope::Session,
        })
        .unwrap();
        let reached = reachability::reachable(&lowered.net, Some(100)).unwrap();
        let budget = lowered.net.place_named("budget").unwrap();
        assert!(reached.iter().all(|m| m.get(budget).0 <= 3));
        assert_eq!(reached.len(), 5); // idle(budget=3) + ready@budget=3,2,1,0
    }
}
