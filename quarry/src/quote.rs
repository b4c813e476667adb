//! SQL literal formatting
//!
//! A defensive formatter for interpolating values into query text. Booleans
//! become `1`/`0`, numeric literals pass through bare, and everything else
//! is backslash-escaped and wrapped in single quotes. Callers remain
//! responsible for not treating escaping as full injection-proofing.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn numeric_literal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(?:\d+\.)?\d+$").expect("static pattern"))
}

/// Format a value as a SQL literal
pub fn quote(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "''".to_string(),
        Value::String(s) if numeric_literal().is_match(s) => s.clone(),
        Value::String(s) => quote_str(s),
        other => quote_str(&other.to_string()),
    }
}

fn quote_str(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
