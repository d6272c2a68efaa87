//! Rule parsing
//!
//! Turns `key=value` properties entries into [`Rule`] values.
//!
//! Keys are dot-separated: `root.layer.mode` for workspace rules and
//! `root.mode` for global layer group rules. A backslash before a dot
//! (`\.`) makes the dot part of the segment and `\\` is a literal
//! backslash. Segments are trimmed.
//! Values are comma-separated role names, `*` meaning everybody and an
//! empty value meaning nobody.

use crate::access_control::rule::{ANY, RoleSet, Rule};
use crate::access_control::types::AccessMode;
use crate::error::{RuleError, RuleResult};

/// Parse a single rule entry
pub fn parse_rule(key: &str, value: &str) -> RuleResult<Rule> {
    let segments = split_key(key);

    let (mode_letter, path) = match segments.split_last() {
        Some((last, path)) => (last.as_str(), path),
        None => return Err(RuleError::malformed(key, "empty key")),
    };

    let mode = AccessMode::from_letter(mode_letter).ok_or_else(|| {
        RuleError::malformed(
            key,
            format!("unknown access mode '{}', expected 'r' or 'w'", mode_letter),
        )
    })?;

    if path.iter().any(|s| s.is_empty()) {
        return Err(RuleError::malformed(key, "empty key segment"));
    }

    let roles = parse_roles(value);
    match path {
        [root, layer] if root == ANY && layer != ANY => {
            Err(RuleError::UnsupportedWildcard { key: key.to_string() })
        }
        [root, layer] => Ok(Rule::new(root.as_str(), layer.as_str(), mode, roles)),
        [root] => Ok(Rule::global_group(root.as_str(), mode, roles)),
        _ => Err(RuleError::malformed(
            key,
            format!("expected 2 or 3 segments, found {}", segments.len()),
        )),
    }
}

/// Parse a comma-separated role list
pub fn parse_roles(value: &str) -> RoleSet {
    RoleSet::from_roles(value.split(','))
}

/// Split a key on unescaped dots, unescape `\.` and `\\`, and trim every segment
pub fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('.' | '\\')) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => {
                segments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    segments.push(current.trim().to_string());

    segments
}

/// Escape backslashes and literal dots in a key segment
pub fn escape_segment(segment: &str) -> String {
    segment.replace('\\', "\\\\").replace('.', "\\.")
}

/// Read line-oriented properties text into ordered `(key, value)` pairs
///
/// Blank lines and lines starting with `#` or `!` are skipped. The key ends
/// at the first unescaped `=` or `:`. `\=`, `\:`, `\#`, `\!` and `\ ` are
/// unescaped; `\\` and `\.` are kept verbatim for [`split_key`].
pub fn read_properties(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut key = String::new();
        let mut value = None;
        let mut chars = line.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.peek().map(|&(_, next)| next) {
                    Some(next @ ('=' | ':' | ' ' | '#' | '!')) => {
                        key.push(next);
                        chars.next();
                    }
                    Some('\\') => {
                        key.push_str("\\\\");
                        chars.next();
                    }
                    _ => key.push(c),
                },
                '=' | ':' => {
                    value = Some(line[i + 1..].trim().to_string());
                    break;
                }
                _ => key.push(c),
            }
        }

        entries.push((key.trim_end().to_string(), value.unwrap_or_default()));
    }

    entries
}

/// Write ordered `(key, value)` pairs as properties text
///
/// Separators in keys are escaped, as are leading characters that would
/// otherwise read back as a comment or be trimmed.
pub fn write_properties<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (key, value) in entries {
        for (i, c) in key.chars().enumerate() {
            match c {
                '=' | ':' => out.push('\\'),
                '#' | '!' if i == 0 => out.push('\\'),
                ' ' if i == 0 => out.push('\\'),
                _ => {}
            }
            out.push(c);
        }
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
