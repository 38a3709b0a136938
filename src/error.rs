//! Error family for the crate, per §7 of the design: configuration errors
//! are raised at construction time and never during operation; `NotEnabled`
//! is an internal invariant the gate must prevent by construction;
//! `Blocked` is data, not an error, and is not modeled here.

use thiserror::Error;

/// Raised from net/skill-net construction or DSL compilation. Never raised
/// once a net or gate is live.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown place `{0}`")]
    UnknownPlace(String),

    #[error("terminal place `{0}` is not a declared place")]
    UnknownTerminalPlace(String),

    #[error("duplicate net name `{0}` in compilation batch")]
    DuplicateNetName(String),

    #[error(transparent)]
    Dsl(#[from] ParseError),

    #[error("rule net `{name}` exceeds the configured state-space bound ({bound}) during verification")]
    UnboundedRuleNet { name: String, bound: usize },

    #[error("invalid regex pattern `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// One DSL parse failure, citing a 1-based line number and the offending
/// token, per §6.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message} (near `{token}`)")]
pub struct ParseError {
    pub line: usize,
    pub token: String,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, token: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            token: token.into(),
            message: message.into(),
        }
    }
}

/// Errors from the kernel's operational surface (firing, reachability).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("transition `{0}` is not enabled")]
    NotEnabled(String),

    #[error("reachable-state enumeration exceeded bound of {bound} markings")]
    StateSpaceExceeded { bound: usize },
}

/// A user hook (`tool_mapper`, `validate_tool_call`, `on_deferred_result`)
/// failed. Per §7 this is always folded into a `Blocked` decision at the
/// gate boundary with this message as the reason; it is never otherwise
/// propagated, and the underlying marking is left unmutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
