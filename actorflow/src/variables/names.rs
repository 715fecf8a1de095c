//! Variable name and placeholder helpers.

use regex::Regex;
use std::sync::LazyLock;

/// Start of a variable placeholder.
pub const START: &str = "@{";

/// End of a variable placeholder.
pub const END: &str = "}";

/// Prefix of read-only variables backed by the process environment.
pub const ENV_PREFIX: &str = "env.";

/// Characters allowed in variable names, besides ASCII letters and digits.
pub const EXTRA_CHARS: &str = "_-:.";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\{([A-Za-z0-9_\-:.]+)\}").expect("valid placeholder regex"));

/// Returns true if `c` may appear in a variable name.
#[must_use]
pub fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || EXTRA_CHARS.contains(c)
}

/// Returns true if `name` is a non-empty, valid variable name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_valid_char)
}

/// Returns true if `s` is exactly one placeholder, e.g. `@{exp}`.
#[must_use]
pub fn is_placeholder(s: &str) -> bool {
    s.strip_prefix(START)
        .and_then(|rest| rest.strip_suffix(END))
        .is_some_and(is_valid_name)
}

/// Strips the placeholder delimiters, if present.
#[must_use]
pub fn extract_name(s: &str) -> &str {
    if is_placeholder(s) {
        &s[START.len()..s.len() - END.len()]
    } else {
        s
    }
}

/// Wraps a name in placeholder delimiters, unless already wrapped.
#[must_use]
pub fn pad_name(name: &str) -> String {
    if is_placeholder(name) {
        name.to_string()
    } else {
        format!("{START}{name}{END}")
    }
}

/// Returns the names referenced by placeholders in `template`, in order of
/// first appearance, without duplicates.
#[must_use]
pub fn extract_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Turns an arbitrary string into a valid name by replacing invalid
/// characters with underscores.
#[must_use]
pub fn to_valid_name(s: &str) -> String {
    let name: String = s
        .chars()
        .map(|c| if is_valid_char(c) { c } else { '_' })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}
