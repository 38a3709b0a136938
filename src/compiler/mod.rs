//! The rule compiler (§4.6): a small DSL — `require A before B`,
//! `require human-approval before B`, `block A`, `limit A to N per S`, and
//! `map tool.field pattern as name` — compiled to a batch of verified
//! [`SkillNet`]s sharing one synthesized tool mapper.

pub mod ast;
mod hooks;
mod lexer;
mod lower;
mod parser;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::compiler::ast::Line;
use crate::compiler::hooks::CompiledHooks;
use crate::error::ConfigError;
use crate::petri_net::reachability;
use crate::skill_net::SkillNet;

pub use ast::{MapRule, PatternSpec, Rule, Scope};
pub use lower::LoweredNet;

/// Options governing compilation, independent of the DSL source itself.
#[derive(Debug, Clone, Copy)]
pub struct CompilerOptions {
    /// Upper bound on reachable states explored while verifying each
    /// lowered net, per §9's "bounded verification" resolution. Exceeding
    /// it is a [`ConfigError::UnboundedRuleNet`], not a panic.
    pub verification_bound: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            verification_bound: 10_000,
        }
    }
}

/// One net produced by compilation, annotated with the reachable-state
/// count its verification pass found — useful for diagnostics and tests,
/// per §4.7's analyzer surface.
#[derive(Debug)]
pub struct CompiledNet {
    pub skill: SkillNet,
    pub reachable_state_count: usize,
}

/// The result of compiling a full batch of DSL sources: one verified net
/// per rule line, all sharing the same synthesized tool mapper.
#[derive(Debug)]
pub struct CompileResult {
    pub nets: Vec<CompiledNet>,
}

/// Parses, lowers, verifies, and assembles every rule line across
/// `sources` into a batch of gate-ready nets.
///
/// Parsing and lowering happen per-source; the tool mapper is synthesized
/// once over every `map` line in the whole batch, then attached identically
/// to every net, matching the source's single closed-over `toolMapper`
/// function (§4.6).
pub fn compile(sources: &[&str], options: CompilerOptions) -> Result<CompileResult, ConfigError> {
    let mut map_lines = Vec::new();
    let mut rules = Vec::new();
    for source in sources {
        for line in parser::parse_source(source)? {
            match line {
                Line::Map(m) => map_lines.push(m),
                Line::Rule(r) => rules.push(r),
            }
        }
    }

    let mut lowered = Vec::with_capacity(rules.len());
    let mut seen_names: HashSet<String> = HashSet::new();
    for rule in &rules {
        let net = lower::lower_rule(rule)?;
        if !seen_names.insert(net.name.clone()) {
            return Err(ConfigError::DuplicateNetName(net.name));
        }
        lowered.push(net);
    }

    let dotted_bases = dotted_bases(&lowered);
    debug!(rule_count = lowered.len(), map_count = map_lines.len(), "compiling rule batch");
    let hooks: Arc<dyn crate::skill_net::SkillNetHooks> =
        Arc::new(CompiledHooks::compile(&map_lines, dotted_bases)?);

    let mut nets = Vec::with_capacity(lowered.len());
    for LoweredNet {
        name,
        net,
        terminal_places,
        transition_meta,
    } in lowered
    {
        let graph = reachability::reachable_graph(&net, Some(options.verification_bound))
            .map_err(|_| ConfigError::UnboundedRuleNet {
                name: name.clone(),
                bound: options.verification_bound,
            })?;
        let reachable_state_count = graph.len();
        let skill = SkillNet::new(
            name,
            net,
            &terminal_places,
            HashSet::new(),
            transition_meta,
            Arc::clone(&hooks),
        )?;
        info!(net = %skill.name, states = reachable_state_count, "rule net verified");
        nets.push(CompiledNet {
            skill,
            reachable_state_count,
        });
    }

    Ok(CompileResult { nets })
}

/// Scans every lowered net's transitions for tool names containing a `.`
/// and collects the distinct substrings before the first `.`, the
/// "dotted-base" set the synthesized tool mapper dispatches on when no
/// explicit `map` line resolves a call.
fn dotted_bases(lowered: &[LoweredNet]) -> Vec<String> {
    let mut bases: HashMap<String, ()> = HashMap::new();
    for net in lowered {
        for meta in &net.transition_meta {
            for tool in &meta.tools {
                if let Some((base, _)) = tool.split_once('.') {
                    bases.insert(base.to_string(), ());
                }
            }
        }
    }
    bases.into_keys().collect()
}
