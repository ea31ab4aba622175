use std::path::Path;

use crate::diff::{Danger, ObjectDiff, TableAlterClause};
use crate::error::EmitError;
use crate::ident::{quote_ident, quote_value};
use crate::model::{ObjectKey, Table};

use super::interpolate::interpolate;
use super::modifiers::{NextAutoIncMode, StatementModifiers};

/// Where and how one DDL statement should run: directly against a schema,
/// or through a user-configured wrapper command via `/bin/sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlPlan {
    Execute { schema: String, sql: String },
    Shell { command: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlStatement {
    pub key: ObjectKey,
    pub danger: Danger,
    pub plan: DdlPlan,
    /// Set when the statement was refused under the unsafe-statement
    /// policy. `diff` prints such statements commented out; `push` treats
    /// them as errors.
    pub refused_unsafe: Option<String>,
}

impl DdlStatement {
    pub fn sql(&self) -> Option<&str> {
        match &self.plan {
            DdlPlan::Execute { sql, .. } => Some(sql),
            DdlPlan::Shell { .. } => None,
        }
    }
}

/// Connection and filesystem facts needed to render plans for one object.
#[derive(Debug, Clone)]
pub struct EmitTarget<'a> {
    pub schema: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub socket: Option<&'a str>,
    /// Current size of the affected table in bytes; 0 for new objects and
    /// routines.
    pub table_size: u64,
    /// Schema-level directory, for the directory-scoped wrapper variables.
    pub schema_dir: Option<&'a Path>,
}

/// Renders one object diff to zero or more DDL statements under the given
/// modifiers. An alter whose clauses are all suppressed produces an empty
/// vec. Errors are per-statement: the caller reports them and moves on.
pub fn emit_object_diff(
    diff: &ObjectDiff,
    target: &EmitTarget<'_>,
    modifiers: &StatementModifiers,
) -> Result<Vec<DdlStatement>, EmitError> {
    match diff {
        ObjectDiff::CreateTable { table } => {
            let sql = create_table_sql(table, modifiers);
            Ok(vec![build_statement(
                diff.key(),
                Danger::Safe,
                "CREATE",
                sql,
                String::new(),
                target,
                modifiers,
            )?])
        }
        ObjectDiff::DropTable { table } => {
            let statement = build_statement(
                diff.key(),
                Danger::Unsafe,
                "DROP",
                table.drop_statement(),
                String::new(),
                target,
                modifiers,
            )?;
            Ok(vec![apply_unsafe_policy(statement, target, modifiers)])
        }
        ObjectDiff::AlterTable { to, clauses, .. } => {
            emit_alter(diff.key(), to, clauses, target, modifiers)
        }
        ObjectDiff::CreateRoutine { routine } => Ok(vec![build_statement(
            diff.key(),
            Danger::Safe,
            "CREATE",
            routine.definition(),
            String::new(),
            target,
            modifiers,
        )?]),
        ObjectDiff::DropRoutine { routine } => Ok(vec![build_statement(
            diff.key(),
            Danger::Safe,
            "DROP",
            routine.drop_statement(),
            String::new(),
            target,
            modifiers,
        )?]),
    }
}

fn create_table_sql(table: &Table, modifiers: &StatementModifiers) -> String {
    if table.partitioning.is_some()
        && modifiers.partitioning == crate::diff::Partitioning::Remove
    {
        let mut unpartitioned = table.clone();
        unpartitioned.partitioning = None;
        return unpartitioned.generated_create_statement(&modifiers.flavor);
    }
    if !table.create_statement.is_empty() {
        table.create_statement.clone()
    } else {
        table.generated_create_statement(&modifiers.flavor)
    }
}

fn emit_alter(
    key: ObjectKey,
    to: &Table,
    clauses: &[TableAlterClause],
    target: &EmitTarget<'_>,
    modifiers: &StatementModifiers,
) -> Result<Vec<DdlStatement>, EmitError> {
    let included: Vec<&TableAlterClause> = clauses
        .iter()
        .filter(|clause| !clause_suppressed(clause, modifiers))
        .collect();
    if included.is_empty() {
        return Ok(Vec::new());
    }

    // the server cannot atomically drop and re-add a constraint, so an
    // alter carrying both runs as two statements with the drops first
    let has_fk_drop = included
        .iter()
        .any(|clause| matches!(clause, TableAlterClause::DropForeignKey { .. }));
    let has_fk_add = included
        .iter()
        .any(|clause| matches!(clause, TableAlterClause::AddForeignKey { .. }));

    let groups: Vec<Vec<&TableAlterClause>> = if has_fk_drop && has_fk_add {
        let (fk_adds, rest): (Vec<&TableAlterClause>, Vec<&TableAlterClause>) = included
            .into_iter()
            .partition(|clause| matches!(clause, TableAlterClause::AddForeignKey { .. }));
        vec![rest, fk_adds]
    } else {
        vec![included]
    };

    let mut statements = Vec::with_capacity(groups.len());
    for group in groups {
        if group.is_empty() {
            continue;
        }
        let rendered = group
            .iter()
            .map(|clause| render_clause(clause, to, modifiers))
            .collect::<Vec<_>>()
            .join(", ");
        let danger = group
            .iter()
            .map(|clause| clause.danger())
            .max()
            .unwrap_or(Danger::Safe);
        let sql = format!("ALTER TABLE {} {}", quote_ident(&to.name), rendered);

        let statement = build_statement(
            key.clone(),
            danger,
            "ALTER",
            sql,
            rendered,
            target,
            modifiers,
        )?;
        statements.push(apply_unsafe_policy(statement, target, modifiers));
    }
    Ok(statements)
}

fn clause_suppressed(clause: &TableAlterClause, modifiers: &StatementModifiers) -> bool {
    match clause {
        TableAlterClause::ChangeAutoIncrement { old, new } => match modifiers.next_auto_inc_mode {
            NextAutoIncMode::Never => true,
            NextAutoIncMode::IncreaseOnly => new <= old,
            NextAutoIncMode::Always => false,
        },
        TableAlterClause::AddIndex { reorder_only, .. }
        | TableAlterClause::DropIndex { reorder_only, .. } => {
            *reorder_only && !modifiers.strict_index_order
        }
        _ => false,
    }
}

fn render_clause(clause: &TableAlterClause, to: &Table, modifiers: &StatementModifiers) -> String {
    let flavor = &modifiers.flavor;
    match clause {
        TableAlterClause::AddColumn { column, position } => {
            let mut sql = format!("ADD COLUMN {}", column.definition(flavor, to));
            if let Some(position) = position {
                sql.push(' ');
                sql.push_str(&position.clause());
            }
            sql
        }
        TableAlterClause::DropColumn { column } => {
            format!("DROP COLUMN {}", quote_ident(&column.name))
        }
        TableAlterClause::ModifyColumn { new, position, .. } => {
            let mut sql = format!("MODIFY COLUMN {}", new.definition(flavor, to));
            if let Some(position) = position {
                sql.push(' ');
                sql.push_str(&position.clause());
            }
            sql
        }
        TableAlterClause::AddIndex { index, .. } => format!("ADD {}", index.definition(flavor)),
        TableAlterClause::DropIndex { index, .. } => {
            if index.primary_key {
                "DROP PRIMARY KEY".to_string()
            } else {
                format!("DROP KEY {}", quote_ident(&index.name))
            }
        }
        TableAlterClause::AddForeignKey { foreign_key } => {
            format!("ADD {}", foreign_key.definition())
        }
        TableAlterClause::DropForeignKey { foreign_key, .. } => {
            format!("DROP FOREIGN KEY {}", quote_ident(&foreign_key.name))
        }
        TableAlterClause::ChangeAutoIncrement { new, .. } => format!("AUTO_INCREMENT = {new}"),
        TableAlterClause::ChangeCharSet {
            char_set,
            collation,
        } => format!("DEFAULT CHARACTER SET = {char_set} COLLATE = {collation}"),
        TableAlterClause::ChangeCollation { collation } => {
            format!("DEFAULT COLLATE = {collation}")
        }
        TableAlterClause::ChangeCreateOptions { options } => options.clone(),
        TableAlterClause::ChangeComment { comment } => {
            format!("COMMENT = {}", quote_value(comment))
        }
        TableAlterClause::ChangePartitioning { new, .. } => match new {
            Some(partitioning) => strip_version_comment(partitioning),
            None => "REMOVE PARTITIONING".to_string(),
        },
    }
}

/// Partitioning clauses are stored verbatim, wrapped in the server's
/// `/*!50100 ... */` version comment; inside an ALTER they appear bare.
fn strip_version_comment(clause: &str) -> String {
    let trimmed = clause.trim();
    if let Some(inner) = trimmed.strip_suffix("*/")
        && trimmed.starts_with("/*!")
    {
        let inner = inner
            .trim_start_matches("/*!")
            .trim_start_matches(|ch: char| ch.is_ascii_digit());
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

fn apply_unsafe_policy(
    mut statement: DdlStatement,
    target: &EmitTarget<'_>,
    modifiers: &StatementModifiers,
) -> DdlStatement {
    if statement.danger == Danger::Unsafe
        && !modifiers.allow_unsafe
        && target.table_size >= modifiers.safe_below_size
    {
        statement.refused_unsafe = Some(format!(
            "destructive statement on {} requires allow-unsafe or a table smaller than {} bytes",
            statement.key, modifiers.safe_below_size
        ));
    }
    statement
}

fn build_statement(
    key: ObjectKey,
    danger: Danger,
    ddl_type: &str,
    mut sql: String,
    clauses: String,
    target: &EmitTarget<'_>,
    modifiers: &StatementModifiers,
) -> Result<DdlStatement, EmitError> {
    let wrapper = select_wrapper(ddl_type, target, modifiers);

    if wrapper.is_none()
        && ddl_type == "ALTER"
        && let Some(suffix) = algorithm_lock_suffix(modifiers)
    {
        sql.push_str(&suffix);
    }

    let plan = match wrapper {
        Some(template) => {
            let command = interpolate(template, &wrapper_variables(&key, ddl_type, &sql, &clauses, target))?;
            DdlPlan::Shell { command }
        }
        None => DdlPlan::Execute {
            schema: target.schema.to_string(),
            sql,
        },
    };

    Ok(DdlStatement {
        key,
        danger,
        plan,
        refused_unsafe: None,
    })
}

fn select_wrapper<'m>(
    ddl_type: &str,
    target: &EmitTarget<'_>,
    modifiers: &'m StatementModifiers,
) -> Option<&'m str> {
    if ddl_type == "ALTER"
        && let Some(wrapper) = &modifiers.alter_wrapper
        && target.table_size >= modifiers.alter_wrapper_min_size
    {
        return Some(wrapper);
    }
    modifiers.ddl_wrapper.as_deref()
}

/// ALGORITHM/LOCK assertions only make sense on a direct single-table
/// alter; a wrapper tool owns its own locking strategy.
fn algorithm_lock_suffix(modifiers: &StatementModifiers) -> Option<String> {
    let mut suffix = String::new();
    if let Some(algorithm) = &modifiers.algorithm_clause {
        suffix.push_str(&format!(", ALGORITHM={}", algorithm.to_ascii_uppercase()));
    }
    if let Some(lock) = &modifiers.lock_clause {
        suffix.push_str(&format!(", LOCK={}", lock.to_ascii_uppercase()));
    }
    (!suffix.is_empty()).then_some(suffix)
}

fn wrapper_variables(
    key: &ObjectKey,
    ddl_type: &str,
    sql: &str,
    clauses: &str,
    target: &EmitTarget<'_>,
) -> Vec<(&'static str, String)> {
    let mut variables = vec![
        ("TABLE", key.name.clone()),
        ("SCHEMA", target.schema.to_string()),
        ("HOST", target.host.to_string()),
        ("PORT", target.port.to_string()),
        ("DDL", sql.to_string()),
        ("CLAUSES", clauses.to_string()),
        ("TYPE", ddl_type.to_string()),
        ("SIZE", target.table_size.to_string()),
    ];
    if let Some(socket) = target.socket {
        variables.push(("SOCKET", socket.to_string()));
    }
    if let Some(schema_dir) = target.schema_dir {
        let base_name = |path: &Path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let parent = schema_dir.parent();
        variables.push(("SCHEMADIR", base_name(schema_dir)));
        variables.push(("DIRNAME", base_name(schema_dir)));
        variables.push(("DIRPATH", schema_dir.to_string_lossy().into_owned()));
        if let Some(parent) = parent {
            variables.push(("HOSTDIR", base_name(parent)));
            variables.push(("DIRPARENT", base_name(parent)));
        }
    }
    variables
}
