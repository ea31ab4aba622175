use regex::Regex;
use std::sync::LazyLock;

use crate::error::EmitError;

static PLAIN_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w/@%=:.,+-]*$").expect("plain-value pattern is valid"));

/// Escapes one interpolation value as a single shell word: values made of
/// word-safe characters pass through verbatim, everything else is wrapped
/// in single quotes with embedded quotes spliced out as `'"'"'`.
pub fn escape_shell_value(value: &str) -> String {
    if PLAIN_VALUE.is_match(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

/// Variables whose values are SQL text; backticks are expected there and
/// are defused by single-quoting rather than withheld.
const SQL_TEXT_VARIABLES: [&str; 2] = ["DDL", "CLAUSES"];

/// Substitutes `{VAR}` tokens in a wrapper command template. Variable names
/// are matched case-insensitively against `variables`. An unknown name is a
/// per-statement error, and an identifier-like value containing a backtick
/// is withheld outright: command substitution must never ride along into
/// the shellout.
pub fn interpolate(
    template: &str,
    variables: &[(&str, String)],
) -> Result<String, EmitError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after_open[..close];
        if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            out.push('{');
            rest = after_open;
            continue;
        }

        let value = variables
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
            .ok_or_else(|| EmitError::UnknownVariable(name.to_string()))?;
        let sql_text = SQL_TEXT_VARIABLES
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(name));
        if !sql_text && value.contains('`') {
            return Err(EmitError::ForbiddenValue {
                variable: name.to_string(),
            });
        }

        out.push_str(&escape_shell_value(value));
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
