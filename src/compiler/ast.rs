//! Abstract syntax for the rule DSL (§4.6 grammar).

/// The `per` scope of a `limit` rule: either the fixed `session` keyword,
/// or another tool name whose calls refill the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Session,
    Tool(String),
}

/// One `/regex/` or bareword pattern from a `map` line. A bareword lowers
/// to `\bword\b` per §4.6's grammar note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSpec {
    Regex(String),
    Bareword(String),
}

impl PatternSpec {
    pub fn as_regex_source(&self) -> String {
        match self {
            PatternSpec::Regex(r) => r.clone(),
            PatternSpec::Bareword(w) => format!(r"\b{}\b", regex::escape(w)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRule {
    pub tool: String,
    pub field: String,
    pub pattern: PatternSpec,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// `require A before B`
    Sequence { before: String, after: String },
    /// `require human-approval before B`
    HumanApproval { before: String },
    /// `block A`
    Block { tool: String },
    /// `limit A to N per S`
    Limit { tool: String, n: u32, scope: Scope },
}

/// One parsed line: either a tool-mapper line or a gating rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Map(MapRule),
    Rule(Rule),
}
