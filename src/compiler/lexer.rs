//! Line tokenizer for the rule DSL (§4.6). Tokens are whitespace-separated,
//! except that a `/regex/` pattern is kept as one token even if the regex
//! body itself contains spaces.

/// Splits one line into whitespace-separated tokens, treating a
/// `/`-delimited span as a single token regardless of internal whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '/' {
            let mut tok = String::new();
            tok.push(chars.next().unwrap());
            while let Some(c2) = chars.next() {
                tok.push(c2);
                if c2 == '/' {
                    break;
                }
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&c2) = chars.peek() {
                if c2.is_whitespace() {
                    break;
                }
                tok.push(c2);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    tokens
}
