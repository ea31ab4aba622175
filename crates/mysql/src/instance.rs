use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mysql::{Pool, PooledConn, prelude::Queryable};
use regex::Regex;
use tracing::debug;

use driftql_core::{Flavor, NameCaseMode, Schema};

use crate::connect::ConnectionParams;
use crate::error::InstanceError;
use crate::introspect;

/// Schemas that belong to the server, never to the user.
pub const SYSTEM_SCHEMAS: [&str; 4] = ["mysql", "information_schema", "performance_schema", "sys"];

/// Bound on parallel per-schema introspection within one instance.
const MAX_SCHEMA_INTROSPECTION_THREADS: usize = 10;

/// One live server: a connection pool plus the per-instance facts (flavor,
/// identifier case mode) that every other component keys off.
pub struct Instance {
    pool: Pool,
    params: ConnectionParams,
    pub flavor: Flavor,
    pub lower_case_table_names: u8,
    pub case_mode: NameCaseMode,
}

impl Instance {
    pub fn connect(params: ConnectionParams) -> Result<Self, InstanceError> {
        let pool = Pool::new(params.build_opts(None)).map_err(|source| InstanceError::Connect {
            target: params.identity(),
            source,
        })?;
        let mut conn = pool.get_conn().map_err(|source| InstanceError::Connect {
            target: params.identity(),
            source,
        })?;

        let sql = "SELECT @@version, @@version_comment";
        let (version, version_comment) = conn
            .query_first::<(String, String), _>(sql)
            .map_err(|source| InstanceError::query(sql, source))?
            .ok_or_else(|| InstanceError::unexpected(sql, "no row returned"))?;
        let flavor = Flavor::parse(&version, &version_comment);

        let sql = "SELECT @@lower_case_table_names";
        let lower_case_table_names = conn
            .query_first::<u8, _>(sql)
            .map_err(|source| InstanceError::query(sql, source))?
            .ok_or_else(|| InstanceError::unexpected(sql, "no row returned"))?;

        debug!(instance = %params.identity(), %flavor, lower_case_table_names, "connected");

        Ok(Self {
            pool,
            params,
            flavor,
            lower_case_table_names,
            case_mode: NameCaseMode::from_lower_case_table_names(lower_case_table_names),
        })
    }

    pub fn identity(&self) -> String {
        self.params.identity()
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn conn(&self) -> Result<PooledConn, InstanceError> {
        self.pool.get_conn().map_err(|source| InstanceError::Connect {
            target: self.identity(),
            source,
        })
    }

    /// User schemas on the instance, minus system schemas and anything the
    /// ignore pattern matches.
    pub fn schema_names(&self, ignore_schema: Option<&Regex>) -> Result<Vec<String>, InstanceError> {
        let sql = "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME";
        let mut conn = self.conn()?;
        let rows = conn
            .query::<String, _>(sql)
            .map_err(|source| InstanceError::query(sql, source))?;
        Ok(rows
            .into_iter()
            .filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str()))
            .filter(|name| !ignore_schema.is_some_and(|pattern| pattern.is_match(name)))
            .collect())
    }

    pub fn schema_exists(&self, name: &str) -> Result<bool, InstanceError> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = {}",
            sql_string(name)
        );
        let mut conn = self.conn()?;
        let count = conn
            .query_first::<u64, _>(sql.as_str())
            .map_err(|source| InstanceError::query(&sql, source))?
            .unwrap_or(0);
        Ok(count > 0)
    }

    pub fn schema_has_tables(&self, name: &str) -> Result<bool, InstanceError> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.TABLES WHERE TABLE_SCHEMA = {}",
            sql_string(name)
        );
        let mut conn = self.conn()?;
        let count = conn
            .query_first::<u64, _>(sql.as_str())
            .map_err(|source| InstanceError::query(&sql, source))?
            .unwrap_or(0);
        Ok(count > 0)
    }

    pub fn introspect_schema(&self, name: &str) -> Result<Schema, InstanceError> {
        // one connection per schema keeps session settings stable across
        // the queries
        let mut conn = self.conn()?;
        introspect::introspect_schema(&mut conn, &self.flavor, name)
    }

    /// Introspects many schemas with a bounded worker fan-out; result order
    /// matches `names`.
    pub fn introspect_schemas(&self, names: &[String]) -> Vec<Result<Schema, InstanceError>> {
        let worker_count = names.len().min(MAX_SCHEMA_INTROSPECTION_THREADS);
        if worker_count <= 1 {
            return names.iter().map(|name| self.introspect_schema(name)).collect();
        }

        let next = AtomicUsize::new(0);
        let slots: Vec<Mutex<Option<Result<Schema, InstanceError>>>> =
            names.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| {
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        if idx >= names.len() {
                            break;
                        }
                        let result = self.introspect_schema(&names[idx]);
                        *slots[idx].lock().expect("introspection slot lock") = Some(result);
                    }
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.into_inner()
                    .expect("introspection slot lock")
                    .expect("worker filled every slot")
            })
            .collect()
    }

    /// Current data+index size per table, for the unsafe-statement and
    /// wrapper size thresholds.
    pub fn table_sizes(&self, schema: &str) -> Result<BTreeMap<String, u64>, InstanceError> {
        let sql = format!(
            "SELECT TABLE_NAME, COALESCE(DATA_LENGTH, 0) + COALESCE(INDEX_LENGTH, 0) \
             FROM information_schema.TABLES WHERE TABLE_SCHEMA = {}",
            sql_string(schema)
        );
        let mut conn = self.conn()?;
        let rows = conn
            .query::<(String, u64), _>(sql.as_str())
            .map_err(|source| InstanceError::query(&sql, source))?;
        Ok(rows.into_iter().collect())
    }

    /// Runs one DDL statement against a schema (or server-wide when
    /// `schema` is empty). DDL within an instance is always serialized by
    /// the caller; this call itself is blocking.
    pub fn execute_ddl(&self, schema: &str, sql: &str) -> Result<(), InstanceError> {
        let mut conn = self.conn()?;
        if !schema.is_empty() {
            let use_sql = format!("USE {}", driftql_core::ident::quote_ident(schema));
            conn.query_drop(use_sql.as_str())
                .map_err(|source| InstanceError::query(&use_sql, source))?;
        }
        conn.query_drop(sql)
            .map_err(|source| InstanceError::query(sql, source))
    }

    pub(crate) fn create_schema(&self, name: &str) -> Result<(), InstanceError> {
        let sql = format!(
            "CREATE DATABASE IF NOT EXISTS {}",
            driftql_core::ident::quote_ident(name)
        );
        let mut conn = self.conn()?;
        conn.query_drop(sql.as_str())
            .map_err(|source| InstanceError::query(&sql, source))
    }

    pub(crate) fn drop_schema(&self, name: &str) -> Result<(), InstanceError> {
        let sql = format!(
            "DROP DATABASE IF EXISTS {}",
            driftql_core::ident::quote_ident(name)
        );
        let mut conn = self.conn()?;
        conn.query_drop(sql.as_str())
            .map_err(|source| InstanceError::query(&sql, source))
    }
}

fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
