use std::collections::BTreeSet;

use crate::error::DiffError;
use crate::model::{Column, Index, NameCaseMode, Table};

use super::{ColumnPosition, DiffConfig, Partitioning, TableAlterClause};

/// Diffs the live table `from` against the desired definition `to`,
/// producing the ordered clause list that transforms one into the other.
///
/// Clause order is fixed: foreign key drops first (referenced tables may
/// change shape later in the same diff), then column drops in
/// reverse-definition order, column modifications in definition order,
/// column additions with explicit positions, index drops then adds, table
/// options, and foreign key additions last.
pub fn diff_tables(
    from: &Table,
    to: &Table,
    config: &DiffConfig,
) -> Result<Vec<TableAlterClause>, DiffError> {
    if !from.supported() || !to.supported() {
        return Err(DiffError::UnsupportedAlter(to.name.clone()));
    }

    let mut clauses = Vec::new();
    let mut fk_adds = Vec::new();

    diff_foreign_keys(from, to, config, &mut clauses, &mut fk_adds);
    diff_columns(from, to, config.case_mode, &mut clauses);
    diff_indexes(from, to, config.case_mode, &mut clauses);
    diff_table_options(from, to, config, &mut clauses);
    clauses.extend(fk_adds);

    Ok(clauses)
}

fn diff_foreign_keys(
    from: &Table,
    to: &Table,
    config: &DiffConfig,
    clauses: &mut Vec<TableAlterClause>,
    fk_adds: &mut Vec<TableAlterClause>,
) {
    let mode = config.case_mode;
    let mut matched_from = BTreeSet::new();
    let mut matched_to = BTreeSet::new();

    // pass 1: pair by constraint name
    for (from_idx, from_fk) in from.foreign_keys.iter().enumerate() {
        if let Some(to_idx) = to
            .foreign_keys
            .iter()
            .position(|to_fk| mode.eq(&to_fk.name, &from_fk.name))
        {
            matched_from.insert(from_idx);
            matched_to.insert(to_idx);
            let to_fk = &to.foreign_keys[to_idx];
            if !from_fk.equivalent_modulo_name(to_fk) {
                clauses.push(TableAlterClause::DropForeignKey {
                    foreign_key: from_fk.clone(),
                    referenced_table_survives: true,
                });
                fk_adds.push(TableAlterClause::AddForeignKey {
                    foreign_key: to_fk.clone(),
                });
            }
        }
    }

    // pass 2: pair renames (same definition, different name); cosmetic
    // unless exact-match is requested
    for (from_idx, from_fk) in from.foreign_keys.iter().enumerate() {
        if matched_from.contains(&from_idx) {
            continue;
        }
        let rename = to.foreign_keys.iter().enumerate().find(|(to_idx, to_fk)| {
            !matched_to.contains(to_idx) && to_fk.equivalent_modulo_name(from_fk)
        });
        if let Some((to_idx, to_fk)) = rename {
            matched_from.insert(from_idx);
            matched_to.insert(to_idx);
            if config.exact_match {
                clauses.push(TableAlterClause::DropForeignKey {
                    foreign_key: from_fk.clone(),
                    referenced_table_survives: true,
                });
                fk_adds.push(TableAlterClause::AddForeignKey {
                    foreign_key: to_fk.clone(),
                });
            }
        }
    }

    for (from_idx, from_fk) in from.foreign_keys.iter().enumerate() {
        if !matched_from.contains(&from_idx) {
            clauses.push(TableAlterClause::DropForeignKey {
                foreign_key: from_fk.clone(),
                referenced_table_survives: true,
            });
        }
    }
    for (to_idx, to_fk) in to.foreign_keys.iter().enumerate() {
        if !matched_to.contains(&to_idx) {
            fk_adds.push(TableAlterClause::AddForeignKey {
                foreign_key: to_fk.clone(),
            });
        }
    }
}

fn diff_columns(from: &Table, to: &Table, mode: NameCaseMode, clauses: &mut Vec<TableAlterClause>) {
    let in_to = |name: &str| to.columns.iter().any(|column| mode.eq(&column.name, name));
    let from_position =
        |name: &str| from.columns.iter().position(|column| mode.eq(&column.name, name));

    for from_column in from.columns.iter().rev() {
        if !in_to(&from_column.name) {
            clauses.push(TableAlterClause::DropColumn {
                column: from_column.clone(),
            });
        }
    }

    // shared columns in desired order, with their positions on the live side
    let shared: Vec<(usize, &Column, usize)> = to
        .columns
        .iter()
        .enumerate()
        .filter_map(|(to_idx, column)| {
            from_position(&column.name).map(|from_idx| (to_idx, column, from_idx))
        })
        .collect();

    // a shared column whose live position precedes the furthest one already
    // seen has moved and needs an explicit reposition
    let mut moved = BTreeSet::new();
    let mut max_from_idx_seen: Option<usize> = None;
    for (_, column, from_idx) in &shared {
        match max_from_idx_seen {
            Some(max) if *from_idx < max => {
                moved.insert(mode.fold(&column.name));
            }
            _ => max_from_idx_seen = Some(max_from_idx_seen.unwrap_or(0).max(*from_idx)),
        }
    }

    for (to_idx, to_column, from_idx) in &shared {
        let from_column = &from.columns[*from_idx];
        let was_moved = moved.contains(&mode.fold(&to_column.name));
        if was_moved || columns_differ(from_column, to_column, mode) {
            clauses.push(TableAlterClause::ModifyColumn {
                old: from_column.clone(),
                new: (**to_column).clone(),
                position: was_moved.then(|| position_in(to, *to_idx)),
            });
        }
    }

    // additions past this index are a trailing append and need no position
    let trailing_start = to
        .columns
        .iter()
        .rposition(|column| from_position(&column.name).is_some())
        .map_or(0, |idx| idx + 1);

    for (to_idx, to_column) in to.columns.iter().enumerate() {
        if from_position(&to_column.name).is_some() {
            continue;
        }
        let position = (to_idx < trailing_start).then(|| position_in(to, to_idx));
        clauses.push(TableAlterClause::AddColumn {
            column: to_column.clone(),
            position,
        });
    }
}

fn position_in(table: &Table, index: usize) -> ColumnPosition {
    if index == 0 {
        ColumnPosition::First
    } else {
        ColumnPosition::After(table.columns[index - 1].name.clone())
    }
}

fn columns_differ(from: &Column, to: &Column, mode: NameCaseMode) -> bool {
    let mut from_normalized = from.clone();
    from_normalized.name = mode.fold(&from.name);
    let mut to_normalized = to.clone();
    to_normalized.name = mode.fold(&to.name);
    from_normalized != to_normalized
}

fn diff_indexes(from: &Table, to: &Table, mode: NameCaseMode, clauses: &mut Vec<TableAlterClause>) {
    let mut drops = Vec::new();
    let mut adds = Vec::new();

    match (&from.primary_key, &to.primary_key) {
        (Some(from_pk), Some(to_pk)) => {
            if indexes_differ(from_pk, to_pk, mode) {
                drops.push(TableAlterClause::DropIndex {
                    index: from_pk.clone(),
                    reorder_only: false,
                });
                adds.push(TableAlterClause::AddIndex {
                    index: to_pk.clone(),
                    reorder_only: false,
                });
            }
        }
        (Some(from_pk), None) => drops.push(TableAlterClause::DropIndex {
            index: from_pk.clone(),
            reorder_only: false,
        }),
        (None, Some(to_pk)) => adds.push(TableAlterClause::AddIndex {
            index: to_pk.clone(),
            reorder_only: false,
        }),
        (None, None) => {}
    }

    let mut matched_to = BTreeSet::new();
    let mut shared_unchanged = Vec::new();

    for from_index in &from.secondary_indexes {
        let to_match = to
            .secondary_indexes
            .iter()
            .enumerate()
            .find(|(_, candidate)| mode.eq(&candidate.name, &from_index.name));
        match to_match {
            Some((to_idx, to_index)) => {
                matched_to.insert(to_idx);
                if indexes_differ(from_index, to_index, mode)
                    || index_invalidated_by_column_change(to_index, to)
                {
                    drops.push(TableAlterClause::DropIndex {
                        index: from_index.clone(),
                        reorder_only: false,
                    });
                    adds.push(TableAlterClause::AddIndex {
                        index: to_index.clone(),
                        reorder_only: false,
                    });
                } else {
                    shared_unchanged.push((from_index, to_idx));
                }
            }
            None => drops.push(TableAlterClause::DropIndex {
                index: from_index.clone(),
                reorder_only: false,
            }),
        }
    }

    for (to_idx, to_index) in to.secondary_indexes.iter().enumerate() {
        if !matched_to.contains(&to_idx) {
            adds.push(TableAlterClause::AddIndex {
                index: to_index.clone(),
                reorder_only: false,
            });
        }
    }

    // relative-order drift among unchanged indexes: emitted as re-adds that
    // only take effect under the strict-index-order modifier
    let mut max_to_idx_seen: Option<usize> = None;
    for (index, to_idx) in &shared_unchanged {
        match max_to_idx_seen {
            Some(max) if *to_idx < max => {
                drops.push(TableAlterClause::DropIndex {
                    index: (*index).clone(),
                    reorder_only: true,
                });
                adds.push(TableAlterClause::AddIndex {
                    index: (*index).clone(),
                    reorder_only: true,
                });
            }
            _ => max_to_idx_seen = Some(max_to_idx_seen.unwrap_or(0).max(*to_idx)),
        }
    }

    clauses.extend(drops);
    clauses.extend(adds);
}

fn indexes_differ(from: &Index, to: &Index, mode: NameCaseMode) -> bool {
    let mut from_normalized = from.clone();
    from_normalized.name = mode.fold(&from.name);
    let mut to_normalized = to.clone();
    to_normalized.name = mode.fold(&to.name);
    from_normalized != to_normalized
}

/// An index whose prefix length no longer fits the (changed) column type
/// must be dropped and re-added alongside the column modification.
fn index_invalidated_by_column_change(index: &Index, to: &Table) -> bool {
    index.parts.iter().any(|part| {
        let Some(sub_part) = part.sub_part else {
            return false;
        };
        let crate::model::IndexPartBase::Column(column_name) = &part.base else {
            return false;
        };
        to.column(column_name)
            .and_then(|column| parsed_char_length(&column.type_in_db))
            .is_some_and(|length| u64::from(sub_part) > length)
    })
}

fn parsed_char_length(type_in_db: &str) -> Option<u64> {
    let rest = type_in_db
        .strip_prefix("varchar(")
        .or_else(|| type_in_db.strip_prefix("char("))
        .or_else(|| type_in_db.strip_prefix("varbinary("))
        .or_else(|| type_in_db.strip_prefix("binary("))?;
    rest.split(')').next()?.parse().ok()
}

fn diff_table_options(
    from: &Table,
    to: &Table,
    config: &DiffConfig,
    clauses: &mut Vec<TableAlterClause>,
) {
    if from.next_auto_increment != to.next_auto_increment && to.has_auto_increment() {
        clauses.push(TableAlterClause::ChangeAutoIncrement {
            old: from.next_auto_increment,
            new: to.next_auto_increment,
        });
    }

    if from.char_set != to.char_set {
        clauses.push(TableAlterClause::ChangeCharSet {
            char_set: to.char_set.clone(),
            collation: to.collation.clone(),
        });
    } else if from.collation != to.collation {
        clauses.push(TableAlterClause::ChangeCollation {
            collation: to.collation.clone(),
        });
    }

    if from.engine != to.engine || from.create_options != to.create_options {
        let options = changed_option_tokens(from, to);
        if !options.is_empty() {
            clauses.push(TableAlterClause::ChangeCreateOptions { options });
        }
    }

    if from.comment != to.comment {
        clauses.push(TableAlterClause::ChangeComment {
            comment: to.comment.clone(),
        });
    }

    match config.partitioning {
        Partitioning::Keep => {}
        Partitioning::Modify => {
            if from.partitioning != to.partitioning {
                clauses.push(TableAlterClause::ChangePartitioning {
                    old: from.partitioning.clone(),
                    new: to.partitioning.clone(),
                });
            }
        }
        Partitioning::Remove => {
            if from.partitioning.is_some() {
                clauses.push(TableAlterClause::ChangePartitioning {
                    old: from.partitioning.clone(),
                    new: None,
                });
            }
        }
    }
}

/// Option tokens to apply: every desired token whose value differs from the
/// live side, plus an engine change, plus a ROW_FORMAT reset when the
/// desired side dropped it.
fn changed_option_tokens(from: &Table, to: &Table) -> String {
    let from_options = parse_option_tokens(&from.create_options);
    let to_options = parse_option_tokens(&to.create_options);

    let mut tokens = Vec::new();
    if from.engine != to.engine {
        tokens.push(format!("ENGINE={}", to.engine));
    }
    for (key, value) in &to_options {
        let unchanged = from_options
            .iter()
            .any(|(from_key, from_value)| from_key == key && from_value == value);
        if !unchanged {
            tokens.push(format!("{key}={value}"));
        }
    }
    if from_options.iter().any(|(key, _)| key == "ROW_FORMAT")
        && !to_options.iter().any(|(key, _)| key == "ROW_FORMAT")
    {
        tokens.push("ROW_FORMAT=DEFAULT".to_string());
    }
    tokens.join(" ")
}

fn parse_option_tokens(options: &str) -> Vec<(String, String)> {
    options
        .split_whitespace()
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_ascii_uppercase(), value.to_string()),
            None => (token.to_ascii_uppercase(), String::new()),
        })
        .collect()
}
