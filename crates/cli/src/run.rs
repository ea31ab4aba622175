use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::warn;

use driftql_core::{
    DdlPlan, DdlStatement, EmitTarget, ObjectKey, ObjectType, Schema, emit_object_diff,
    diff_schemas, ident::quote_ident,
};
use driftql_fs::{HostDir, OptionKey, SchemaDir, Statement, TokenizedFile};
use driftql_mysql::{Instance, Workspace};

use crate::config;

pub const EXIT_OK: u8 = 0;
pub const EXIT_DIFFS: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

/// Set by the signal handler. Checked between DDL statements: an in-flight
/// ALTER is never interrupted, but no new one starts once this is set.
pub static CANCELLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Diff,
    Push,
    Pull,
    Lint { rewrite: bool },
}

pub fn run_action(
    action: Action,
    dir: &Path,
    environment: &str,
    overrides: &[(OptionKey, String)],
) -> anyhow::Result<u8> {
    let host_dir = HostDir::discover(dir, environment)?;
    let mut schema_dirs = host_dir.schema_dirs;
    for schema_dir in &mut schema_dirs {
        for (key, value) in overrides {
            schema_dir.options.apply_cli(*key, value.clone());
        }
    }
    if schema_dirs.is_empty() {
        anyhow::bail!(
            "no schema directories found under {}; each needs a .skeema file with schema=<name>",
            dir.display()
        );
    }

    let mut host_options = host_dir.options;
    for (key, value) in overrides {
        host_options.apply_cli(*key, value.clone());
    }
    let pool_size = config::concurrent_instances(&host_options)?;

    // group schema dirs by target instance; DDL is serialized within one
    // instance, parallel across instances up to the pool size
    let mut groups: BTreeMap<String, Vec<SchemaDir>> = BTreeMap::new();
    for schema_dir in schema_dirs {
        let params = config::connection_params(&schema_dir.options)?;
        groups.entry(params.identity()).or_default().push(schema_dir);
    }
    let groups: Vec<Vec<SchemaDir>> = groups.into_values().collect();

    if groups.len() == 1 || pool_size <= 1 {
        let mut exit = EXIT_OK;
        for group in &groups {
            exit = exit.max(run_instance_group(action, group));
        }
        return Ok(exit);
    }

    let next = AtomicUsize::new(0);
    let exits = Mutex::new(vec![EXIT_OK; groups.len()]);
    std::thread::scope(|scope| {
        for _ in 0..pool_size.min(groups.len()) {
            scope.spawn(|| {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    if idx >= groups.len() {
                        break;
                    }
                    let exit = run_instance_group(action, &groups[idx]);
                    exits.lock().expect("exit status lock")[idx] = exit;
                }
            });
        }
    });
    let exits = exits.into_inner().expect("exit status lock");
    Ok(exits.into_iter().max().unwrap_or(EXIT_OK))
}

/// A connectivity failure fails this instance only; other instances keep
/// running.
fn run_instance_group(action: Action, schema_dirs: &[SchemaDir]) -> u8 {
    let params = match config::connection_params(&schema_dirs[0].options) {
        Ok(params) => params,
        Err(error) => {
            eprintln!("driftql: {error:#}");
            return EXIT_ERROR;
        }
    };
    let instance = match Instance::connect(params) {
        Ok(instance) => instance,
        Err(error) => {
            eprintln!("driftql: {error}");
            return EXIT_ERROR;
        }
    };

    let mut exit = EXIT_OK;
    for schema_dir in schema_dirs {
        let expanded = match expand_schema_dirs(&instance, schema_dir) {
            Ok(expanded) => expanded,
            Err(error) => {
                eprintln!("driftql: {}: {error:#}", schema_dir.path.display());
                exit = exit.max(EXIT_ERROR);
                continue;
            }
        };
        for schema_dir in &expanded {
            if CANCELLED.load(Ordering::SeqCst) {
                return exit.max(EXIT_ERROR);
            }
            let dir_exit = match run_schema_dir(action, &instance, schema_dir) {
                Ok(dir_exit) => dir_exit,
                Err(error) => {
                    eprintln!("driftql: {}: {error:#}", schema_dir.path.display());
                    EXIT_ERROR
                }
            };
            exit = exit.max(dir_exit);
        }
    }
    exit
}

/// `schema=*` maps one directory onto every user schema on the instance,
/// minus the ignore pattern and the server's own schemas.
fn expand_schema_dirs(
    instance: &Instance,
    schema_dir: &SchemaDir,
) -> anyhow::Result<Vec<SchemaDir>> {
    if schema_dir.schema_name != "*" {
        return Ok(vec![schema_dir.clone()]);
    }

    let diff_config = config::diff_config(&schema_dir.options, instance.case_mode)?;
    let names = instance.schema_names(diff_config.ignore_schema.as_ref())?;
    Ok(names
        .into_iter()
        .map(|name| {
            let mut expanded = schema_dir.clone();
            expanded.schema_name = name;
            expanded
        })
        .collect())
}

fn run_schema_dir(
    action: Action,
    instance: &Instance,
    schema_dir: &SchemaDir,
) -> anyhow::Result<u8> {
    let diff_config = config::diff_config(&schema_dir.options, instance.case_mode)?;
    if diff_config.schema_ignored(&schema_dir.schema_name) {
        return Ok(EXIT_OK);
    }

    match action {
        Action::Pull => pull_schema_dir(instance, schema_dir),
        Action::Lint { rewrite } => lint_schema_dir(instance, schema_dir, rewrite),
        Action::Diff | Action::Push => {
            diff_or_push_schema_dir(action, instance, schema_dir, diff_config)
        }
    }
}

/// Tokenizes every .sql file in the directory. A file that fails to parse
/// is reported and excluded; its absence is reflected in the exit code.
fn load_statements(schema_dir: &SchemaDir) -> (Vec<Statement>, u8) {
    let mut statements = Vec::new();
    let mut exit = EXIT_OK;
    for sql_file in &schema_dir.sql_files {
        match TokenizedFile::read(sql_file) {
            Ok(file) => statements.extend(file.statements),
            Err(error) => {
                eprintln!("driftql: {error}");
                exit = EXIT_ERROR;
            }
        }
    }
    (statements, exit)
}

fn materialize_fs_schema(
    instance: &Instance,
    schema_dir: &SchemaDir,
    statements: &[Statement],
) -> anyhow::Result<(Schema, u8)> {
    let mut workspace_options = config::workspace_options(&schema_dir.options)?;
    workspace_options.sql_mode = config::connection_params(&schema_dir.options)?
        .connect_options
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("sql_mode"))
        .map(|(_, value)| value.clone());

    let workspace = Workspace::acquire(instance, workspace_options)?;
    let applied = workspace.apply(&schema_dir.schema_name, statements)?;
    workspace.release()?;

    let mut exit = EXIT_OK;
    for failure in &applied.failures {
        eprintln!(
            "driftql: {}:{}:{}: statement failed in workspace: {}",
            failure.statement.file.display(),
            failure.statement.line_no,
            failure.statement.char_no,
            failure.error
        );
        exit = EXIT_ERROR;
    }
    Ok((applied.schema, exit))
}

fn diff_or_push_schema_dir(
    action: Action,
    instance: &Instance,
    schema_dir: &SchemaDir,
    diff_config: driftql_core::DiffConfig,
) -> anyhow::Result<u8> {
    let (statements, mut exit) = load_statements(schema_dir);
    let (fs_schema, workspace_exit) = materialize_fs_schema(instance, schema_dir, &statements)?;
    exit = exit.max(workspace_exit);

    let schema_name = &schema_dir.schema_name;
    let schema_missing = !instance.schema_exists(schema_name)?;
    let db_schema = if schema_missing {
        Schema::named(schema_name.clone())
    } else {
        instance.introspect_schema(schema_name)?
    };

    let diff = diff_schemas(&db_schema, &fs_schema, &diff_config);
    for key in &diff.unsupported {
        warn!(%key, schema = schema_name.as_str(), "skipping alter of unsupported object");
        exit = exit.max(EXIT_ERROR);
    }

    let sizes = if schema_missing {
        BTreeMap::new()
    } else {
        instance.table_sizes(schema_name)?
    };
    let modifiers = config::statement_modifiers(&schema_dir.options, instance.flavor)?;
    let params = instance.params();

    let mut planned: Vec<DdlStatement> = Vec::new();
    if schema_missing {
        planned.push(DdlStatement {
            key: ObjectKey::new(ObjectType::Table, schema_name.clone()),
            danger: driftql_core::Danger::Safe,
            plan: DdlPlan::Execute {
                schema: String::new(),
                sql: format!("CREATE DATABASE {}", quote_ident(schema_name)),
            },
            refused_unsafe: None,
        });
    }

    for object_diff in &diff.object_diffs {
        let key = object_diff.key();
        let target = EmitTarget {
            schema: schema_name,
            host: params.host.as_deref().unwrap_or(driftql_mysql::DEFAULT_HOST),
            port: params.port.unwrap_or(driftql_mysql::DEFAULT_PORT),
            socket: params.socket.as_deref(),
            table_size: sizes.get(&key.name).copied().unwrap_or(0),
            schema_dir: Some(&schema_dir.path),
        };
        match emit_object_diff(object_diff, &target, &modifiers) {
            Ok(ddl_statements) => planned.extend(ddl_statements),
            Err(error) => {
                eprintln!("driftql: {key}: {error}");
                exit = exit.max(EXIT_ERROR);
            }
        }
    }

    if planned.is_empty() {
        return Ok(exit);
    }

    match action {
        Action::Diff => {
            println!("-- instance: {}", instance.identity());
            println!("-- schema: {schema_name}");
            for statement in &planned {
                print_statement(statement);
                if statement.refused_unsafe.is_some() {
                    exit = exit.max(EXIT_ERROR);
                } else {
                    exit = exit.max(EXIT_DIFFS);
                }
            }
            Ok(exit)
        }
        Action::Push => Ok(exit.max(execute_statements(instance, &planned))),
        Action::Pull | Action::Lint { .. } => unreachable!("handled by run_schema_dir"),
    }
}

fn print_statement(statement: &DdlStatement) {
    match (&statement.plan, &statement.refused_unsafe) {
        (DdlPlan::Execute { sql, .. }, None) => println!("{sql};"),
        (DdlPlan::Execute { sql, .. }, Some(reason)) => {
            println!("-- {reason}");
            for line in sql.lines() {
                println!("-- {line}");
            }
        }
        (DdlPlan::Shell { command }, None) => println!("\\! {command}"),
        (DdlPlan::Shell { command }, Some(reason)) => {
            println!("-- {reason}");
            println!("-- \\! {command}");
        }
    }
}

/// Executes planned statements in emitted order. A failure stops further
/// statements for the same object, but independent objects continue.
fn execute_statements(instance: &Instance, planned: &[DdlStatement]) -> u8 {
    let mut exit = EXIT_OK;
    let mut failed_objects: Vec<ObjectKey> = Vec::new();

    for statement in planned {
        if CANCELLED.load(Ordering::SeqCst) {
            eprintln!("driftql: cancelled; not starting further DDL");
            return exit.max(EXIT_ERROR);
        }
        if failed_objects.contains(&statement.key) {
            continue;
        }
        if let Some(reason) = &statement.refused_unsafe {
            eprintln!("driftql: refusing unsafe statement: {reason}");
            failed_objects.push(statement.key.clone());
            exit = exit.max(EXIT_ERROR);
            continue;
        }

        let result = match &statement.plan {
            DdlPlan::Execute { schema, sql } => instance
                .execute_ddl(schema, sql)
                .map_err(|error| error.to_string()),
            DdlPlan::Shell { command } => run_shell(command),
        };
        if let Err(error) = result {
            eprintln!("driftql: {}: {error}", statement.key);
            failed_objects.push(statement.key.clone());
            exit = exit.max(EXIT_ERROR);
        }
    }
    exit
}

/// Wrapper subprocess contract: `/bin/sh -c`, inherited stdio, non-zero
/// exit reported per statement without stopping the batch.
fn run_shell(command: &str) -> Result<(), String> {
    let status = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|error| error.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("wrapper command exited with {status}"))
    }
}

/// Rewrites each CREATE in the directory to the server's canonical form.
/// With `rewrite` unset this only reports; either way the exit code is 1
/// when anything differs from canonical.
fn lint_schema_dir(
    instance: &Instance,
    schema_dir: &SchemaDir,
    rewrite: bool,
) -> anyhow::Result<u8> {
    let mut exit = EXIT_OK;
    let mut files = Vec::new();
    for sql_file in &schema_dir.sql_files {
        match TokenizedFile::read(sql_file) {
            Ok(file) => files.push(file),
            Err(error) => {
                eprintln!("driftql: {error}");
                exit = EXIT_ERROR;
            }
        }
    }

    let all_statements: Vec<Statement> = files
        .iter()
        .flat_map(|file| file.statements.iter().cloned())
        .collect();
    let (fs_schema, workspace_exit) =
        materialize_fs_schema(instance, schema_dir, &all_statements)?;
    exit = exit.max(workspace_exit);

    for file in &mut files {
        let mut changed = false;
        for statement in &mut file.statements {
            let Some(canonical) = canonical_text(&fs_schema, statement, instance) else {
                continue;
            };
            if statement.text != canonical {
                statement.text = canonical;
                changed = true;
            }
        }
        if changed {
            exit = exit.max(EXIT_DIFFS);
            if rewrite {
                file.rewrite()?;
            } else {
                eprintln!(
                    "driftql: {}: not in canonical format (run `driftql format`)",
                    file.path.display()
                );
            }
        }
    }
    Ok(exit)
}

fn canonical_text(
    fs_schema: &Schema,
    statement: &Statement,
    instance: &Instance,
) -> Option<String> {
    let key = statement.object_key()?;
    match key.object_type {
        ObjectType::Table => {
            let table = fs_schema.table(&key.name, instance.case_mode)?;
            Some(format!("{};\n", table.create_statement))
        }
        ObjectType::Procedure | ObjectType::Function => {
            let routine = fs_schema.routine(&key, instance.case_mode)?;
            Some(routine_file_text(&routine.definition()))
        }
    }
}

/// Writes the live schema's objects out as canonical .sql files, removing
/// files for objects that no longer exist.
fn pull_schema_dir(instance: &Instance, schema_dir: &SchemaDir) -> anyhow::Result<u8> {
    let db_schema = instance.introspect_schema(&schema_dir.schema_name)?;

    let mut live_files = Vec::new();
    for table in &db_schema.tables {
        let path = schema_dir.path.join(format!("{}.sql", table.name));
        std::fs::write(&path, format!("{};\n", table.create_statement))?;
        live_files.push(path);
    }
    for routine in &db_schema.routines {
        let path = schema_dir.path.join(format!("{}.sql", routine.name));
        std::fs::write(&path, routine_file_text(&routine.definition()))?;
        live_files.push(path);
    }

    for sql_file in &schema_dir.sql_files {
        if !live_files.contains(sql_file) {
            std::fs::remove_file(sql_file)?;
        }
    }
    Ok(EXIT_OK)
}

/// Routine bodies contain semicolons, so their files switch the delimiter
/// around the CREATE.
fn routine_file_text(definition: &str) -> String {
    if definition.contains(';') {
        format!("DELIMITER //\n{definition}//\nDELIMITER ;\n")
    } else {
        format!("{definition};\n")
    }
}
