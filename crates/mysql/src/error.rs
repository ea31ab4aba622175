use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("cannot connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: mysql::Error,
    },
    #[error("query failed: {sql}: {source}")]
    Query {
        sql: String,
        #[source]
        source: mysql::Error,
    },
    #[error("query `{sql}` returned an unexpected shape: {detail}")]
    UnexpectedRow { sql: String, detail: String },
}

impl InstanceError {
    pub(crate) fn query(sql: impl Into<String>, source: mysql::Error) -> Self {
        Self::Query {
            sql: sql.into(),
            source,
        }
    }

    pub(crate) fn unexpected(sql: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedRow {
            sql: sql.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("temp schema `{schema}` already contains tables; refusing to use it as a workspace")]
    SandboxNotEmpty { schema: String },
    #[error(transparent)]
    Instance(#[from] InstanceError),
}
