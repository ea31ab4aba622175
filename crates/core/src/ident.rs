//! Identifier quoting and literal escaping, matching the byte-level output
//! of `SHOW CREATE TABLE`.

/// Wraps an identifier in backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Renders `schema`.`name`, omitting the schema part when empty.
pub fn quote_qualified(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        quote_ident(name)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(name))
    }
}

/// Escapes a string literal the way the server does when printing CREATE
/// statements: backslash and NUL are backslash-escaped, single quotes are
/// doubled, and bare newlines become escape sequences.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\'' => out.push_str("''"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Escapes and single-quotes a literal for inclusion in generated DDL.
pub fn quote_value(value: &str) -> String {
    format!("'{}'", escape_value(value))
}
