//! Display formatting of raw SQL text.
//!
//! This is not a SQL beautifier: it only breaks lines before a handful of
//! clause keywords, bolds a few more, and indents by parenthesis depth.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Keywords that start a new line, in the order they are substituted.
const LINE_KEYWORDS: [&str; 8] = [
    "SELECT", "FROM", "WHERE", "JOIN", "GROUP BY", "ORDER BY", "LIMIT", "HAVING",
];

/// Keywords that are emphasized in place.
const INLINE_KEYWORDS: [&str; 3] = ["ON", "AS", "DISTINCT"];

static RE_INDENTED_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]+").unwrap());

/// Format a SQL query for display inside a `<pre>` block.
///
/// The output contains literal `<b>` markers around keywords and tab
/// characters for indentation.
pub fn format_query(query: &str) -> String {
    let mut formatted = query.to_string();

    // Each pass sees the output of the previous one.
    for keyword in LINE_KEYWORDS {
        formatted = replace_word(&formatted, keyword, |kw| format!("\n<b>{kw}</b>"));
    }
    for keyword in INLINE_KEYWORDS {
        formatted = replace_word(&formatted, keyword, |kw| format!("<b>{kw}</b>"));
    }

    let formatted = indent_by_depth(&formatted);
    let formatted = RE_INDENTED_BREAK.replace_all(&formatted, "\n\t");

    formatted.replace("\t\n", "")
}

/// Format a dynamically typed query value, `None` meaning absent.
///
/// Anything other than a string is reported as `Unexpected type: <type>`
/// instead of being formatted.
pub fn format_query_value(query: Option<&Value>) -> String {
    match query {
        Some(Value::String(query)) => format_query(query),
        other => format!("Unexpected type: {}", type_name(other)),
    }
}

/// The `typeof` name of a JSON value, as a browser would report it.
fn type_name(value: Option<&Value>) -> &'static str {
    let Some(value) = value else {
        return "undefined";
    };
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

fn indent_by_depth(text: &str) -> String {
    let mut depth: i64 = 0;

    text.split('\n')
        .map(|line| {
            let opening = line.matches('(').count() as i64;
            let closing = line.matches(')').count() as i64;

            depth -= closing;
            let indented = format!("{}{line}", "\t".repeat(depth.max(0) as usize));
            depth += opening;

            indented
        })
        .join("\n")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Replace every whole-word occurrence of `word` in `haystack`.
///
/// A word boundary is the edge of the string or a neighbour outside
/// `[A-Za-z0-9_]`.
fn replace_word(haystack: &str, word: &str, replacement: impl Fn(&str) -> String) -> String {
    let bytes = haystack.as_bytes();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;

    for (start, matched) in haystack.match_indices(word) {
        let end = start + matched.len();
        let bounded_left = start == 0 || !is_word_byte(bytes[start - 1]);
        let bounded_right = end == bytes.len() || !is_word_byte(bytes[end]);
        if !(bounded_left && bounded_right) {
            continue;
        }

        out.push_str(&haystack[last..start]);
        out.push_str(&replacement(matched));
        last = end;
    }
    out.push_str(&haystack[last..]);

    out
}
