//! The auto-advancer (§4.3): fires all structurally enabled, silent
//! transitions to quiescence, abstaining from any round with an
//! unresolved conflict rather than guessing.

use std::collections::BTreeMap;

use crate::petri_net::{Marking, PetriNet, PlaceId, TransitionId};
use crate::skill_net::SkillNet;

/// Fires structural transitions to quiescence. Invoked on skill-net
/// instantiation, after every gated firing, and after every deferred
/// resolution (§4.3).
pub fn auto_advance(skill: &SkillNet, marking: &Marking) -> Marking {
    let mut current = marking.clone();
    let structural = skill.structural_transitions();
    loop {
        let enabled: Vec<TransitionId> = structural
            .iter()
            .copied()
            .filter(|&id| skill.net.can_fire(&current, id))
            .collect();
        if enabled.is_empty() {
            break;
        }
        let unambiguous = unambiguous_subset(&skill.net, &current, &enabled);
        if unambiguous.is_empty() {
            // An unresolved conflict exists among enabled structural
            // transitions; a later gated firing may break it, but the
            // auto-advancer itself never guesses (§4.3 step 3).
            break;
        }
        let mut fired_any = false;
        for id in unambiguous {
            // Re-check: upstream consumption earlier this round may have
            // disabled a transition that was enabled when the round began.
            if skill.net.can_fire(&current, id) {
                current = skill
                    .net
                    .fire(&current, id)
                    .expect("just checked can_fire");
                fired_any = true;
            }
        }
        if !fired_any {
            break;
        }
    }
    current
}

/// A transition `t` is unambiguous among `enabled` iff for every other
/// enabled transition `u`, every place shared between `t`'s and `u`'s
/// inputs has enough tokens to satisfy both simultaneously.
fn unambiguous_subset(
    net: &PetriNet,
    marking: &Marking,
    enabled: &[TransitionId],
) -> Vec<TransitionId> {
    let requirements: Vec<(TransitionId, BTreeMap<PlaceId, usize>)> = enabled
        .iter()
        .map(|&id| (id, PetriNet::multiplicities(&net.transition(id).inputs)))
        .collect();

    requirements
        .iter()
        .filter(|(t, t_inputs)| {
            requirements.iter().all(|(u, u_inputs)| {
                if u == t {
                    return true;
                }
                t_inputs.iter().all(|(place, &need_t)| {
                    match u_inputs.get(place) {
                        Some(&need_u) => marking.get(*place).0 >= need_t + need_u,
                        None => true,
                    }
                })
            })
        })
        .map(|(t, _)| *t)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::petri_net::PetriNet;
    use crate::skill_net::{NoopHooks, SkillNet, TransitionMeta};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn advances_through_a_chain_of_structural_transitions() {
        let net = PetriNet::build(
            vec!["idle".into(), "mid".into(), "ready".into()],
            vec![("idle".into(), 1)],
            vec![
                ("a".into(), vec!["idle".into()], vec!["mid".into()]),
                ("b".into(), vec!["mid".into()], vec!["ready".into()]),
            ],
        )
        .unwrap();
        let meta = vec![TransitionMeta::structural(), TransitionMeta::structural()];
        let skill = SkillNet::new(
            "chain",
            net,
            &["ready".to_string()],
            HashSet::new(),
            meta,
            Arc::new(NoopHooks),
        )
        .unwrap();
        let advanced = auto_advance(&skill, &skill.net.initial_marking);
        assert_eq!(advanced.get(skill.net.place_named("ready").unwrap()).0, 1);
        assert_eq!(advanced.get(skill.net.place_named("idle").unwrap()).0, 0);
    }

    #[test]
    fn abstains_on_a_genuine_conflict() {
        // Two structural transitions both need the single "ready" token;
        // neither can be fired without starving the other. Conflict is
        // preserved (auto-advancer does nothing), matching §4.3 step 3.
        let net = PetriNet::build(
            vec!["ready".into(), "a_done".into(), "b_done".into()],
            vec![("ready".into(), 1)],
            vec![
                ("a".into(), vec!["ready".into()], vec!["a_done".into()]),
                ("b".into(), vec!["ready".into()], vec!["b_done".into()]),
            ],
        )
        .unwrap();
        let meta = vec![TransitionMeta::structural(), TransitionMeta::structural()];
        let skill = SkillNet::new(
            "conflict",
            net,
            &["a_done".to_string(), "b_done".to_string()],
            HashSet::new(),
            meta,
            Arc::new(NoopHooks),
        )
        .unwrap();
        let advanced = auto_advance(&skill, &skill.net.initial_marking);
        assert_eq!(advanced, skill.net.initial_marking);
    }

    #[test]
    fn fires_non_conflicting_transitions_that_share_no_place() {
        let net = PetriNet::build(
            vec!["a_ready".into(), "b_ready".into(), "a_done".into(), "b_done".into()],
            vec![("a_ready".into(), 1), ("b_ready".into(), 1)],
            vec![
                ("a".into(), vec!["a_ready".into()], vec!["a_done".into()]),
                ("b".into(), vec!["b_ready".into()], vec!["b_done".into()]),
            ],
        )
        .unwrap();
        let meta = vec![TransitionMeta::structural(), TransitionMeta::structural()];
        let skill = SkillNet::new(
            "parallel",
            net,
            &["a_done".to_string(), "b_done".to_string()],
            HashSet::new(),
            meta,
            Arc::new(NoopHooks),
        )
        .unwrap();
        let advanced = auto_advance(&skill, &skill.net.initial_marking);
        assert_eq!(advanced.get(skill.net.place_named("a_done").unwrap()).0, 1);
        assert_eq!(advanced.get(skill.net.place_named("b_done").unwrap()).0, 1);
    }
}
