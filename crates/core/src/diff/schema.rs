use std::collections::{BTreeMap, BTreeSet};

use crate::error::DiffError;
use crate::model::{NameCaseMode, ObjectKey, Schema, Table};

use super::{DiffConfig, ObjectDiff, TableAlterClause, diff_tables};

/// Ordered result of diffing two schemas. `object_diffs` is safe to replay
/// top-to-bottom: creates first, then alters with foreign-key targets ahead
/// of their referrers, then drops, then the second-pass foreign key
/// additions split out of any dependency cycle.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    pub object_diffs: Vec<ObjectDiff>,
    /// Tables whose definitions use DDL this tool cannot regenerate; their
    /// alters were skipped but they remain eligible for create/drop.
    pub unsupported: Vec<ObjectKey>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.object_diffs.is_empty()
    }
}

/// Diffs the live schema `from` against the desired schema `to`.
pub fn diff_schemas(from: &Schema, to: &Schema, config: &DiffConfig) -> SchemaDiff {
    let mode = config.case_mode;

    let mut creates = Vec::new();
    let mut alters = Vec::new();
    let mut drops = Vec::new();
    let mut unsupported = Vec::new();

    let mut matched_from = BTreeSet::new();
    for to_table in &to.tables {
        if config.table_ignored(&to_table.name) {
            continue;
        }
        match from.table(&to_table.name, mode) {
            Some(from_table) => {
                matched_from.insert(mode.fold(&from_table.name));
                match diff_tables(from_table, to_table, config) {
                    Ok(clauses) if clauses.is_empty() => {}
                    Ok(clauses) => alters.push(ObjectDiff::AlterTable {
                        from: from_table.clone(),
                        to: to_table.clone(),
                        clauses,
                    }),
                    Err(DiffError::UnsupportedAlter(_)) => {
                        if from_table.create_statement != to_table.create_statement {
                            unsupported.push(to_table.key());
                        }
                    }
                }
            }
            None => creates.push(ObjectDiff::CreateTable {
                table: to_table.clone(),
            }),
        }
    }

    for from_table in &from.tables {
        if config.table_ignored(&from_table.name) {
            continue;
        }
        if !matched_from.contains(&mode.fold(&from_table.name)) {
            drops.push(ObjectDiff::DropTable {
                table: from_table.clone(),
            });
        }
    }

    diff_routines(from, to, mode, &mut creates, &mut alters, &mut drops);

    mark_surviving_fk_targets(&mut alters, to, mode);
    alters.extend(fk_drops_for_dropped_cycles(&drops, mode));
    sort_alters_by_fk_dependency(&mut alters, mode);
    let second_pass = split_cyclic_fk_adds(&mut alters, &creates, mode);

    let mut object_diffs = creates;
    object_diffs.extend(alters);
    object_diffs.extend(drops);
    object_diffs.extend(second_pass);

    SchemaDiff {
        object_diffs,
        unsupported,
    }
}

fn diff_routines(
    from: &Schema,
    to: &Schema,
    mode: NameCaseMode,
    creates: &mut Vec<ObjectDiff>,
    alters: &mut Vec<ObjectDiff>,
    drops: &mut Vec<ObjectDiff>,
) {
    let mut matched_from = BTreeSet::new();
    for to_routine in &to.routines {
        let key = to_routine.key();
        match from.routine(&key, mode) {
            Some(from_routine) => {
                matched_from.insert(from_routine.key().normalized(mode));
                if from_routine != to_routine {
                    // no server-side ALTER can change a body, so a changed
                    // routine is replaced in place: drop then create
                    alters.push(ObjectDiff::DropRoutine {
                        routine: from_routine.clone(),
                    });
                    alters.push(ObjectDiff::CreateRoutine {
                        routine: to_routine.clone(),
                    });
                }
            }
            None => creates.push(ObjectDiff::CreateRoutine {
                routine: to_routine.clone(),
            }),
        }
    }
    for from_routine in &from.routines {
        if !matched_from.contains(&from_routine.key().normalized(mode)) {
            drops.push(ObjectDiff::DropRoutine {
                routine: from_routine.clone(),
            });
        }
    }
}

/// Rewrites `referenced_table_survives` on every DropForeignKey clause:
/// a constraint pointing at a table absent from the desired schema is not
/// protecting anything once the diff completes.
fn mark_surviving_fk_targets(alters: &mut [ObjectDiff], to: &Schema, mode: NameCaseMode) {
    for alter in alters.iter_mut() {
        let ObjectDiff::AlterTable { clauses, .. } = alter else {
            continue;
        };
        for clause in clauses.iter_mut() {
            if let TableAlterClause::DropForeignKey {
                foreign_key,
                referenced_table_survives,
            } = clause
            {
                // cross-schema references are assumed to survive
                if foreign_key.referenced_schema.is_empty() {
                    *referenced_table_survives =
                        to.table(&foreign_key.referenced_table, mode).is_some();
                }
            }
        }
    }
}

/// Dropped tables that reference each other cannot be dropped in any plain
/// order; their cyclic constraints are dropped first via dedicated alters.
fn fk_drops_for_dropped_cycles(drops: &[ObjectDiff], mode: NameCaseMode) -> Vec<ObjectDiff> {
    let dropped_tables: Vec<&Table> = drops
        .iter()
        .filter_map(|diff| match diff {
            ObjectDiff::DropTable { table } => Some(table),
            _ => None,
        })
        .collect();
    if dropped_tables.len() < 2 {
        return Vec::new();
    }

    let index_by_name: BTreeMap<String, usize> = dropped_tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (mode.fold(&table.name), idx))
        .collect();
    let dependencies = fk_dependencies(&dropped_tables, &index_by_name, mode);
    let cyclic = cyclic_edges(&dependencies);

    let mut fk_drop_alters = Vec::new();
    for (source_idx, table) in dropped_tables.iter().enumerate() {
        let clauses: Vec<TableAlterClause> = table
            .foreign_keys
            .iter()
            .filter(|foreign_key| {
                index_by_name
                    .get(&mode.fold(&foreign_key.referenced_table))
                    .is_some_and(|target_idx| cyclic.contains(&(source_idx, *target_idx)))
            })
            .map(|foreign_key| TableAlterClause::DropForeignKey {
                foreign_key: foreign_key.clone(),
                referenced_table_survives: false,
            })
            .collect();
        if !clauses.is_empty() {
            fk_drop_alters.push(ObjectDiff::AlterTable {
                from: (*table).clone(),
                to: (*table).clone(),
                clauses,
            });
        }
    }
    fk_drop_alters
}

/// Stable topological order: an altered table that is the foreign-key
/// target of another altered table's AddForeignKey comes first.
fn sort_alters_by_fk_dependency(alters: &mut Vec<ObjectDiff>, mode: NameCaseMode) {
    let names: Vec<Option<String>> = alters
        .iter()
        .map(|diff| match diff {
            ObjectDiff::AlterTable { to, .. } => Some(mode.fold(&to.name)),
            _ => None,
        })
        .collect();

    let index_of = |name: &str| names.iter().position(|n| n.as_deref() == Some(name));

    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); alters.len()];
    for (idx, diff) in alters.iter().enumerate() {
        let ObjectDiff::AlterTable { clauses, .. } = diff else {
            continue;
        };
        for clause in clauses {
            if let TableAlterClause::AddForeignKey { foreign_key } = clause
                && foreign_key.referenced_schema.is_empty()
                && let Some(target_idx) = index_of(&mode.fold(&foreign_key.referenced_table))
                && target_idx != idx
            {
                dependencies[idx].insert(target_idx);
            }
        }
    }

    // Kahn's algorithm, preserving original order among ready nodes; nodes
    // stuck in a cycle keep their original order at the end and are later
    // handled by the second-pass split
    let mut emitted = vec![false; alters.len()];
    let mut order = Vec::with_capacity(alters.len());
    loop {
        let mut progressed = false;
        for idx in 0..alters.len() {
            if emitted[idx] {
                continue;
            }
            if dependencies[idx].iter().all(|dep| emitted[*dep]) {
                emitted[idx] = true;
                order.push(idx);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    for idx in 0..alters.len() {
        if !emitted[idx] {
            order.push(idx);
        }
    }

    let mut reordered = Vec::with_capacity(alters.len());
    for idx in order {
        reordered.push(alters[idx].clone());
    }
    *alters = reordered;
}

/// Foreign key additions that participate in a dependency cycle (including
/// self-references) are stripped out of their alters and returned as
/// standalone single-clause alters to run after everything else.
fn split_cyclic_fk_adds(
    alters: &mut [ObjectDiff],
    creates: &[ObjectDiff],
    mode: NameCaseMode,
) -> Vec<ObjectDiff> {
    let mut node_names = Vec::new();
    let mut gains_fk_on: Vec<Vec<String>> = Vec::new();

    for diff in creates.iter().chain(alters.iter()) {
        match diff {
            ObjectDiff::CreateTable { table } => {
                node_names.push(mode.fold(&table.name));
                gains_fk_on.push(
                    table
                        .foreign_keys
                        .iter()
                        .filter(|fk| fk.referenced_schema.is_empty())
                        .map(|fk| mode.fold(&fk.referenced_table))
                        .collect(),
                );
            }
            ObjectDiff::AlterTable { to, clauses, .. } => {
                node_names.push(mode.fold(&to.name));
                gains_fk_on.push(
                    clauses
                        .iter()
                        .filter_map(|clause| match clause {
                            TableAlterClause::AddForeignKey { foreign_key }
                                if foreign_key.referenced_schema.is_empty() =>
                            {
                                Some(mode.fold(&foreign_key.referenced_table))
                            }
                            _ => None,
                        })
                        .collect(),
                );
            }
            _ => {
                node_names.push(String::new());
                gains_fk_on.push(Vec::new());
            }
        }
    }

    let index_by_name: BTreeMap<String, usize> = node_names
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(idx, name)| (name.clone(), idx))
        .collect();

    let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); node_names.len()];
    for (idx, targets) in gains_fk_on.iter().enumerate() {
        for target in targets {
            if let Some(target_idx) = index_by_name.get(target) {
                dependencies[idx].insert(*target_idx);
            }
        }
    }
    let cyclic = cyclic_edges(&dependencies);
    if cyclic.is_empty() {
        return Vec::new();
    }

    let mut second_pass = Vec::new();
    let create_count = creates.len();
    for (alter_offset, alter) in alters.iter_mut().enumerate() {
        let node_idx = create_count + alter_offset;
        let ObjectDiff::AlterTable { from, to, clauses } = alter else {
            continue;
        };
        let mut retained = Vec::with_capacity(clauses.len());
        for clause in clauses.drain(..) {
            let split = match &clause {
                TableAlterClause::AddForeignKey { foreign_key }
                    if foreign_key.referenced_schema.is_empty() =>
                {
                    index_by_name
                        .get(&mode.fold(&foreign_key.referenced_table))
                        .is_some_and(|target_idx| cyclic.contains(&(node_idx, *target_idx)))
                }
                _ => false,
            };
            if split {
                second_pass.push(ObjectDiff::AlterTable {
                    from: from.clone(),
                    to: to.clone(),
                    clauses: vec![clause],
                });
            } else {
                retained.push(clause);
            }
        }
        *clauses = retained;
    }

    second_pass
}

fn fk_dependencies(
    tables: &[&Table],
    index_by_name: &BTreeMap<String, usize>,
    mode: NameCaseMode,
) -> Vec<BTreeSet<usize>> {
    let mut dependencies = vec![BTreeSet::new(); tables.len()];
    for (idx, table) in tables.iter().enumerate() {
        for foreign_key in &table.foreign_keys {
            if let Some(target_idx) = index_by_name.get(&mode.fold(&foreign_key.referenced_table))
                && *target_idx != idx
            {
                dependencies[idx].insert(*target_idx);
            }
        }
    }
    dependencies
}

/// Edges that lie on a cycle, including self-edges.
fn cyclic_edges(dependencies: &[BTreeSet<usize>]) -> BTreeSet<(usize, usize)> {
    let mut cyclic = BTreeSet::new();
    for (source_idx, targets) in dependencies.iter().enumerate() {
        for target_idx in targets {
            if *target_idx == source_idx || can_reach(*target_idx, source_idx, dependencies) {
                cyclic.insert((source_idx, *target_idx));
            }
        }
    }
    cyclic
}

fn can_reach(start: usize, target: usize, dependencies: &[BTreeSet<usize>]) -> bool {
    let mut stack = vec![start];
    let mut visited = BTreeSet::new();

    while let Some(node_idx) = stack.pop() {
        if node_idx == target {
            return true;
        }
        if !visited.insert(node_idx) {
            continue;
        }
        for next_idx in &dependencies[node_idx] {
            if !visited.contains(next_idx) {
                stack.push(*next_idx);
            }
        }
    }
    false
}
