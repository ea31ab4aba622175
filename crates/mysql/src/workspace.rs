use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, LazyLock, Mutex};

use mysql::prelude::Queryable;
use tracing::{debug, warn};

use driftql_core::{ObjectKey, Schema, ident::quote_ident};
use driftql_fs::{Statement, StatementType};

use crate::connect::ConnectionParams;
use crate::error::{InstanceError, WorkspaceError};
use crate::instance::Instance;

pub const DEFAULT_TEMP_SCHEMA: &str = "_skeema_tmp";

#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub temp_schema: String,
    /// Keep the schema itself between runs and only drop its tables on
    /// release.
    pub reuse_temp_schema: bool,
    /// Session sql_mode to apply before running the user's statements.
    pub sql_mode: Option<String>,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            temp_schema: DEFAULT_TEMP_SCHEMA.to_string(),
            reuse_temp_schema: false,
            sql_mode: None,
        }
    }
}

/// A statement the sandbox could not execute; its object is excluded from
/// the filesystem-side schema but the rest of the batch continues.
#[derive(Debug, Clone)]
pub struct FailedStatement {
    pub statement: Statement,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct WorkspaceSchema {
    pub schema: Schema,
    pub failures: Vec<FailedStatement>,
    pub failed_keys: Vec<ObjectKey>,
}

type WorkspaceKey = (String, String);

/// Exclusive-holder registry for (instance identity, temp schema) pairs:
/// acquisition blocks while another holder is active.
static ACTIVE: LazyLock<(Mutex<HashSet<WorkspaceKey>>, Condvar)> =
    LazyLock::new(|| (Mutex::new(HashSet::new()), Condvar::new()));

/// Cleanup facts for workspaces still alive, consulted by [`shutdown`].
static LIVE_SANDBOXES: LazyLock<Mutex<HashMap<WorkspaceKey, SandboxCleanup>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone)]
struct SandboxCleanup {
    params: ConnectionParams,
    temp_schema: String,
    reuse: bool,
}

/// Scoped sandbox schema on a target instance. Filesystem CREATE
/// statements are applied here so their server-normalized form can be read
/// back; the sandbox is torn down on every exit path, panic included, via
/// `Drop`.
pub struct Workspace<'a> {
    instance: &'a Instance,
    options: WorkspaceOptions,
    key: WorkspaceKey,
    /// Only a sandbox this workspace verified (or created) as empty may be
    /// torn down; a refused pre-existing schema must never be dropped.
    sandbox_ready: bool,
    released: bool,
}

impl<'a> Workspace<'a> {
    /// Blocks until this process holds the (instance, temp-schema) pair
    /// exclusively, then ensures the sandbox schema exists and is empty.
    pub fn acquire(
        instance: &'a Instance,
        options: WorkspaceOptions,
    ) -> Result<Self, WorkspaceError> {
        let key = (instance.identity(), options.temp_schema.clone());
        acquire_key(&key);

        let mut workspace = Self {
            instance,
            options,
            key: key.clone(),
            sandbox_ready: false,
            released: false,
        };

        // on error the workspace drops here: the key is released, and the
        // unready sandbox is left untouched
        workspace.prepare_sandbox()?;
        workspace.sandbox_ready = true;
        LIVE_SANDBOXES
            .lock()
            .expect("live sandbox registry lock")
            .insert(
                key,
                SandboxCleanup {
                    params: instance.params().clone(),
                    temp_schema: workspace.options.temp_schema.clone(),
                    reuse: workspace.options.reuse_temp_schema,
                },
            );
        Ok(workspace)
    }

    fn prepare_sandbox(&self) -> Result<(), WorkspaceError> {
        if self.instance.schema_exists(&self.options.temp_schema)? {
            if self.instance.schema_has_tables(&self.options.temp_schema)? {
                return Err(WorkspaceError::SandboxNotEmpty {
                    schema: self.options.temp_schema.clone(),
                });
            }
        } else {
            self.instance.create_schema(&self.options.temp_schema)?;
        }
        Ok(())
    }

    /// Applies the logical schema's statements, introspects the result,
    /// and reports it under `logical_schema_name`. Per-statement failures
    /// never abort the batch.
    pub fn apply(
        &self,
        logical_schema_name: &str,
        statements: &[Statement],
    ) -> Result<WorkspaceSchema, WorkspaceError> {
        let mut conn = self.instance.conn().map_err(WorkspaceError::Instance)?;
        let use_sql = format!("USE {}", quote_ident(&self.options.temp_schema));
        conn.query_drop(use_sql.as_str())
            .map_err(|source| InstanceError::query(&use_sql, source))?;
        if let Some(sql_mode) = &self.options.sql_mode {
            let sql = format!("SET SESSION sql_mode = '{}'", sql_mode.replace('\'', "''"));
            conn.query_drop(sql.as_str())
                .map_err(|source| InstanceError::query(&sql, source))?;
        }

        let mut failures = Vec::new();
        let mut failed_keys = Vec::new();
        for statement in statements {
            if statement.statement_type != StatementType::Create {
                continue;
            }
            let sql = executable_text(statement);
            if let Err(source) = conn.query_drop(sql) {
                debug!(
                    file = %statement.file.display(),
                    line = statement.line_no,
                    "statement failed in workspace"
                );
                if let Some(key) = statement.object_key() {
                    failed_keys.push(key);
                }
                failures.push(FailedStatement {
                    statement: statement.clone(),
                    error: source.to_string(),
                });
            }
        }

        let mut schema = self.instance.introspect_schema(&self.options.temp_schema)?;
        schema.name = logical_schema_name.to_string();

        Ok(WorkspaceSchema {
            schema,
            failures,
            failed_keys,
        })
    }

    /// Explicit release path, surfacing teardown errors. `Drop` covers all
    /// other exits.
    pub fn release(mut self) -> Result<(), WorkspaceError> {
        self.released = true;
        let result = teardown_sandbox(
            self.instance,
            &self.options.temp_schema,
            self.options.reuse_temp_schema,
        );
        finish_release(&self.key);
        result.map_err(WorkspaceError::Instance)
    }
}

impl Drop for Workspace<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.sandbox_ready
            && let Err(error) = teardown_sandbox(
                self.instance,
                &self.options.temp_schema,
                self.options.reuse_temp_schema,
            )
        {
            warn!(%error, schema = self.options.temp_schema.as_str(), "workspace teardown failed");
        }
        finish_release(&self.key);
    }
}

fn acquire_key(key: &WorkspaceKey) {
    let (lock, condvar) = &*ACTIVE;
    let mut held = lock.lock().expect("workspace registry lock");
    while held.contains(key) {
        held = condvar.wait(held).expect("workspace registry lock");
    }
    held.insert(key.clone());
}

fn finish_release(key: &WorkspaceKey) {
    LIVE_SANDBOXES
        .lock()
        .expect("live sandbox registry lock")
        .remove(key);
    let (lock, condvar) = &*ACTIVE;
    lock.lock().expect("workspace registry lock").remove(key);
    condvar.notify_all();
}

fn teardown_sandbox(
    instance: &Instance,
    temp_schema: &str,
    reuse: bool,
) -> Result<(), InstanceError> {
    if !reuse {
        return instance.drop_schema(temp_schema);
    }

    let sql = format!(
        "SELECT TABLE_NAME FROM information_schema.TABLES WHERE TABLE_SCHEMA = '{}'",
        temp_schema.replace('\'', "''")
    );
    let mut conn = instance.conn()?;
    let tables = conn
        .query::<String, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;
    for table in tables {
        let drop_sql = format!(
            "DROP TABLE {}",
            driftql_core::ident::quote_qualified(temp_schema, &table)
        );
        conn.query_drop(drop_sql.as_str())
            .map_err(|source| InstanceError::query(&drop_sql, source))?;
    }
    Ok(())
}

/// Process-exit hook: tears down any sandbox still registered, connecting
/// fresh since the owning [`Instance`] may already be gone.
pub fn shutdown() {
    let leaked: Vec<SandboxCleanup> = {
        let mut live = LIVE_SANDBOXES.lock().expect("live sandbox registry lock");
        live.drain().map(|(_, cleanup)| cleanup).collect()
    };
    for cleanup in leaked {
        warn!(
            schema = cleanup.temp_schema.as_str(),
            "cleaning up leaked workspace at shutdown"
        );
        match Instance::connect(cleanup.params.clone()) {
            Ok(instance) => {
                if let Err(error) =
                    teardown_sandbox(&instance, &cleanup.temp_schema, cleanup.reuse)
                {
                    warn!(%error, "shutdown teardown failed");
                }
            }
            Err(error) => warn!(%error, "shutdown could not reconnect for teardown"),
        }
    }
}

/// Statement text ready for the driver: trailing whitespace and the
/// statement's own delimiter removed.
fn executable_text(statement: &Statement) -> &str {
    let text = statement.text.trim_end();
    text.strip_suffix(statement.delimiter.as_str())
        .map_or(text, str::trim_end)
}
