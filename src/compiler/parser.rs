//! Recursive-descent-by-keyword parser for the rule DSL (§4.6). Each
//! non-empty, non-comment line is parsed independently; any failure
//! produces a [`ParseError`] citing the 1-based line number and the
//! offending token, per §6.

use crate::compiler::ast::{Line, MapRule, PatternSpec, Rule, Scope};
use crate::compiler::lexer::tokenize;
use crate::error::ParseError;

/// Parses every rule line in `source`, skipping blank lines and `#`
/// comments.
pub fn parse_source(source: &str) -> Result<Vec<Line>, ParseError> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens = tokenize(trimmed);
        lines.push(parse_line(line_no, &tokens)?);
    }
    Ok(lines)
}

fn parse_line(line_no: usize, tokens: &[String]) -> Result<Line, ParseError> {
    let Some(keyword) = tokens.first() else {
        return Err(ParseError::new(line_no, "", "empty rule line"));
    };
    match keyword.as_str() {
        "map" => parse_map(line_no, tokens).map(Line::Map),
        "require" => parse_require(line_no, tokens).map(Line::Rule),
        "block" => parse_block(line_no, tokens).map(Line::Rule),
        "limit" => parse_limit(line_no, tokens).map(Line::Rule),
        other => Err(ParseError::new(line_no, other, "unknown keyword")),
    }
}

fn expect_len(line_no: usize, tokens: &[String], n: usize, shape: &str) -> Result<(), ParseError> {
    if tokens.len() != n {
        let near = tokens.last().cloned().unwrap_or_default();
        return Err(ParseError::new(
            line_no,
            near,
            format!("expected `{}`, wrong arity", shape),
        ));
    }
    Ok(())
}

fn expect_keyword(line_no: usize, tokens: &[String], idx: usize, word: &str) -> Result<(), ParseError> {
    if tokens.get(idx).map(String::as_str) != Some(word) {
        let near = tokens.get(idx).cloned().unwrap_or_default();
        return Err(ParseError::new(
            line_no,
            near,
            format!("missing `{}` keyword", word),
        ));
    }
    Ok(())
}

fn parse_pattern(line_no: usize, token: &str) -> Result<PatternSpec, ParseError> {
    if let Some(inner) = token.strip_prefix('/').and_then(|s| s.strip_suffix('/')) {
        if inner.is_empty() {
            return Err(ParseError::new(line_no, token, "empty regex body"));
        }
        Ok(PatternSpec::Regex(inner.to_string()))
    } else if token.starts_with('/') {
        Err(ParseError::new(line_no, token, "unterminated regex pattern"))
    } else {
        Ok(PatternSpec::Bareword(token.to_string()))
    }
}

fn parse_map(line_no: usize, tokens: &[String]) -> Result<MapRule, ParseError> {
    // map tool.field pattern as name
    expect_len(line_no, tokens, 5, "map tool.field pattern as name")?;
    let tool_field = &tokens[1];
    let Some((tool, field)) = tool_field.split_once('.') else {
        return Err(ParseError::new(
            line_no,
            tool_field,
            "expected `tool.field`",
        ));
    };
    if tool.is_empty() || field.is_empty() {
        return Err(ParseError::new(line_no, tool_field, "expected `tool.field`"));
    }
    let pattern = parse_pattern(line_no, &tokens[2])?;
    expect_keyword(line_no, tokens, 3, "as")?;
    let name = tokens[4].clone();
    Ok(MapRule {
        tool: tool.to_string(),
        field: field.to_string(),
        pattern,
        name,
    })
}

fn parse_require(line_no: usize, tokens: &[String]) -> Result<Rule, ParseError> {
    expect_len(line_no, tokens, 4, "require A before B")?;
    expect_keyword(line_no, tokens, 2, "before")?;
    if tokens[1] == "human-approval" {
        Ok(Rule::HumanApproval {
            before: tokens[3].clone(),
        })
    } else {
        Ok(Rule::Sequence {
            before: tokens[1].clone(),
            after: tokens[3].clone(),
        })
    }
}

fn parse_block(line_no: usize, tokens: &[String]) -> Result<Rule, ParseError> {
    expect_len(line_no, tokens, 2, "block A")?;
    Ok(Rule::Block {
        tool: tokens[1].clone(),
    })
}

fn parse_limit(line_no: usize, tokens: &[String]) -> Result<Rule, ParseError> {
    expect_len(line_no, tokens, 6, "limit A to N per S")?;
    expect_keyword(line_no, tokens, 2, "to")?;
    expect_keyword(line_no, tokens, 4, "per")?;
    let n: u32 = tokens[3]
        .parse()
        .map_err(|_| ParseError::new(line_no, &tokens[3], "expected a positive integer"))?;
    if n == 0 {
        return Err(ParseError::new(line_no, &tokens[3], "limit count must be positive"));
    }
    let scope = if tokens[5] == "session" {
        Scope::Session
    } else {
        Scope::Tool(tokens[5].clone())
    };
    Ok(Rule::Limit {
        tool: tokens[1].clone(),
        n,
        scope,
    })
}
