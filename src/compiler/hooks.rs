//! Synthesizes one shared [`SkillNetHooks`] implementation from an entire
//! DSL compilation batch's `map` lines, per §4.6 "tool mapper synthesis".
//!
//! The source models `toolMapper` as a single function closed over every
//! `map` line in the batch — not one function per rule — because a later
//! `map` line can resolve a tool name a rule lowered from an earlier line
//! still references. `CompiledHooks` is built once per [`compile`] call and
//! shared via `Arc` across every net the batch emits.
//!
//! [`compile`]: crate::compiler::compile

use regex::Regex;

use crate::compiler::ast::MapRule;
use crate::error::ConfigError;
use crate::event::ToolCall;
use crate::skill_net::{SkillNetHooks, ValidateCtx};

/// One compiled `map tool.field pattern as name` line.
#[derive(Debug)]
struct CompiledMapRule {
    tool: String,
    field: String,
    regex: Regex,
    name: String,
}

/// The tool mapper synthesized from a compilation batch: explicit `map`
/// rules first, falling back to dot-notation dispatch (`tool.action`) for
/// any tool name a lowered rule references that looks like `base.action`.
#[derive(Debug)]
pub struct CompiledHooks {
    map_rules: Vec<CompiledMapRule>,
    dotted_bases: Vec<String>,
}

impl CompiledHooks {
    pub fn compile(map_lines: &[MapRule], dotted_bases: Vec<String>) -> Result<Self, ConfigError> {
        let mut map_rules = Vec::with_capacity(map_lines.len());
        for rule in map_lines {
            let source = rule.pattern.as_regex_source();
            let regex = Regex::new(&source).map_err(|e| ConfigError::InvalidRegex {
                pattern: source.clone(),
                message: e.to_string(),
            })?;
            map_rules.push(CompiledMapRule {
                tool: rule.tool.clone(),
                field: rule.field.clone(),
                regex,
                name: rule.name.clone(),
            });
        }
        Ok(CompiledHooks {
            map_rules,
            dotted_bases,
        })
    }
}

impl SkillNetHooks for CompiledHooks {
    /// §4.6: first, every `map` rule whose `tool.field` matches the event
    /// and whose pattern matches that field's string value, in source
    /// order. Failing that, if a lowered rule named `base.action`, dispatch
    /// on `event.input["action"]` to synthesize the same name.
    fn tool_mapper(&self, event: &ToolCall) -> Option<String> {
        for rule in &self.map_rules {
            if rule.tool != event.tool_name {
                continue;
            }
            let Some(value) = event.input.get(&rule.field) else {
                continue;
            };
            let Some(text) = value.as_str() else { continue };
            if rule.regex.is_match(text) {
                return Some(rule.name.clone());
            }
        }
        if self.dotted_bases.iter().any(|b| b == &event.tool_name) {
            if let Some(action) = event.input.get("action").and_then(|v| v.as_str()) {
                return Some(format!("{}.{}", event.tool_name, action));
            }
        }
        None
    }

    fn validate_tool_call(&self, ctx: ValidateCtx<'_>) -> crate::skill_net::HookResult<()> {
        let _ = ctx;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::PatternSpec;
    use serde_json::json;

    #[test]
    fn map_rule_resolves_matching_field() {
        let hooks = CompiledHooks::compile(
            &[MapRule {
                tool: "bash".into(),
                field: "command".into(),
                pattern: PatternSpec::Bareword("rm".into()),
                name: "delete".into(),
            }],
            Vec::new(),
        )
        .unwrap();
        let event = ToolCall::new("id-1", "bash").with_input("command", json!("rm -rf /tmp/x"));
        assert_eq!(hooks.tool_mapper(&event), Some("delete".into()));
    }

    #[test]
    fn non_matching_field_falls_through_to_none() {
        let hooks = CompiledHooks::compile(
            &[MapRule {
                tool: "bash".into(),
                field: "command".into(),
                pattern: PatternSpec::Bareword("rm".into()),
                name: "delete".into(),
            }],
            Vec::new(),
        )
        .unwrap();
        let event = ToolCall::new("id-1", "bash").with_input("command", json!("ls -la"));
        assert_eq!(hooks.tool_mapper(&event), None);
    }

    #[test]
    fn dotted_base_dispatches_on_action_field() {
        let hooks = CompiledHooks::compile(&[], vec!["fs".into()]).unwrap();
        let event = ToolCall::new("id-1", "fs").with_input("action", json!("delete"));
        assert_eq!(hooks.tool_mapper(&event), Some("fs.delete".into()));
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let err = CompiledHooks::compile(
            &[MapRule {
                tool: "bash".into(),
                field: "command".into(),
                pattern: PatternSpec::Regex("(unclosed".into()),
                name: "x".into(),
            }],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegex { .. }));
    }
}
