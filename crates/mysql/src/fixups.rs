use driftql_core::{Flavor, Table, ident::quote_ident};
use tracing::debug;

/// Post-introspection fixups. information_schema reports some facts in a
/// different order or spelling than `SHOW CREATE TABLE`; each fixup
/// rewrites one field of the model until the regenerated statement matches
/// the server's. Whatever still diverges afterwards marks the table
/// unsupported.
///
/// Public so that the fixup pass can also run over models built from
/// captured metadata rather than a live connection.
pub fn apply(table: &mut Table, flavor: &Flavor) {
    fix_index_order(table);
    fix_fulltext_parsers(table);
    fix_foreign_key_order(table, flavor);
    fix_create_options_order(table);
    fix_generation_expr(table);
    finalize_support(table, flavor);
}

/// information_schema lists indexes alphabetically; SHOW CREATE lists them
/// in creation order. Reorder to match the statement text.
fn fix_index_order(table: &mut Table) {
    let create_statement = table.create_statement.clone();
    table.secondary_indexes.sort_by_key(|index| {
        create_statement
            .find(&format!("KEY {} ", quote_ident(&index.name)))
            .or_else(|| create_statement.find(&format!("KEY {}(", quote_ident(&index.name))))
            .unwrap_or(usize::MAX)
    });
}

/// FULLTEXT parser names are only visible in the statement text.
fn fix_fulltext_parsers(table: &mut Table) {
    let create_statement = table.create_statement.clone();
    for index in &mut table.secondary_indexes {
        let needle = format!("KEY {} ", quote_ident(&index.name));
        let Some(start) = create_statement.find(&needle) else {
            continue;
        };
        let line_end = create_statement[start..]
            .find('\n')
            .map_or(create_statement.len(), |idx| start + idx);
        let line = &create_statement[start..line_end];
        if let Some(parser_start) = line.find("WITH PARSER ") {
            let raw = line[parser_start + "WITH PARSER ".len()..]
                .split_whitespace()
                .next()
                .unwrap_or_default();
            let parser = raw.trim_matches('`').to_string();
            if !parser.is_empty() {
                index.fulltext_parser = Some(parser);
            }
        }
    }
}

/// Flavors that sort foreign keys list them lexicographically; the rest
/// keep creation order, which only the statement text preserves.
fn fix_foreign_key_order(table: &mut Table, flavor: &Flavor) {
    if flavor.sorts_foreign_keys() {
        table.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
        return;
    }
    let create_statement = table.create_statement.clone();
    table.foreign_keys.sort_by_key(|foreign_key| {
        create_statement
            .find(&format!("CONSTRAINT {} ", quote_ident(&foreign_key.name)))
            .unwrap_or(usize::MAX)
    });
}

/// Option keys whose position in the option list the server fixes itself;
/// anything unrecognized keeps its observed relative order after these.
const ORDERED_OPTION_KEYS: [&str; 11] = [
    "ROW_FORMAT",
    "STATS_PERSISTENT",
    "STATS_AUTO_RECALC",
    "STATS_SAMPLE_PAGES",
    "PACK_KEYS",
    "MAX_ROWS",
    "AVG_ROW_LENGTH",
    "CHECKSUM",
    "DELAY_KEY_WRITE",
    "KEY_BLOCK_SIZE",
    "COMPRESSION",
];

/// Rewrites create_options with the spelling and ordering found in the
/// statement's own option segment.
fn fix_create_options_order(table: &mut Table) {
    if table.create_options.is_empty() {
        return;
    }

    let segment = options_segment(&table.create_statement);
    let mut remaining: Vec<String> = table
        .create_options
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let mut reordered = Vec::with_capacity(remaining.len());

    for token in segment.split_whitespace() {
        let Some((key, _)) = token.split_once('=') else {
            continue;
        };
        if !ORDERED_OPTION_KEYS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(key))
        {
            continue;
        }
        if let Some(position) = remaining.iter().position(|candidate| {
            candidate
                .split_once('=')
                .is_some_and(|(candidate_key, _)| candidate_key.eq_ignore_ascii_case(key))
        }) {
            remaining.remove(position);
            // adopt the statement's own spelling
            reordered.push(token.to_string());
        }
    }

    reordered.extend(remaining);
    table.create_options = reordered.join(" ");
}

/// The option list follows the closing paren of the column block; the
/// table comment (which may contain `=` tokens) is cut off first.
fn options_segment(create_statement: &str) -> &str {
    let start = create_statement
        .rfind("\n)")
        .map_or(0, |idx| idx + 2);
    let segment = &create_statement[start..];
    let end = segment.find(" COMMENT='").unwrap_or_else(|| {
        segment.find('\n').unwrap_or(segment.len())
    });
    &segment[..end]
}

/// information_schema escapes generation expressions differently than the
/// statement text (`\'` vs `''` among others); adopt the statement's form.
fn fix_generation_expr(table: &mut Table) {
    let create_statement = table.create_statement.clone();
    for column in &mut table.columns {
        let Some(generation) = &mut column.generation else {
            continue;
        };
        let needle = format!("{} ", quote_ident(&column.name));
        let Some(column_start) = create_statement.find(&needle) else {
            continue;
        };
        let rest = &create_statement[column_start..];
        let Some(expr_start) = rest.find("GENERATED ALWAYS AS (") else {
            continue;
        };
        let body = &rest[expr_start + "GENERATED ALWAYS AS (".len()..];
        if let Some(expr) = balanced_paren_content(body) {
            generation.expr = expr;
        }
    }
}

/// Reads up to the paren matching an already-consumed `(`, honoring
/// quoting.
fn balanced_paren_content(body: &str) -> Option<String> {
    let mut depth = 1usize;
    let mut in_quote: Option<char> = None;
    for (idx, ch) in body.char_indices() {
        match in_quote {
            Some(quote) => {
                if ch == quote {
                    in_quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => in_quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(body[..idx].to_string());
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// After all fixups, regenerated-vs-actual divergence means the table uses
/// DDL this tool cannot reproduce; it is then excluded from alters.
fn finalize_support(table: &mut Table, flavor: &Flavor) {
    let generated = table.generated_create_statement(flavor);
    if generated != table.create_statement {
        debug!(table = table.name.as_str(), "table uses unsupported DDL");
        table.unsupported_ddl = true;
        table.unsupported_diff = Some(format!(
            "--- generated\n{generated}\n--- actual\n{}",
            table.create_statement
        ));
    }
}
