use mysql::{Opts, OptsBuilder};

/// Strict sql_mode applied to every connection unless the caller overrides
/// it through connect-options.
pub const DEFAULT_SQL_MODE: &str = "ONLY_FULL_GROUP_BY,STRICT_TRANS_TABLES,NO_ZERO_IN_DATE,\
NO_ZERO_DATE,ERROR_FOR_DIVISION_BY_ZERO,NO_ENGINE_SUBSTITUTION";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;

/// Everything needed to reach one instance. `connect_options` holds
/// already-validated session variables from the `connect-options` option;
/// the deny-list in driftql-fs keeps the safety-critical ones out.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub socket: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_options: Vec<(String, String)>,
}

impl ConnectionParams {
    /// Display identity used for workspace locking and error reporting.
    pub fn identity(&self) -> String {
        match &self.socket {
            Some(socket) => socket.clone(),
            None => format!(
                "{}:{}",
                self.host.as_deref().unwrap_or(DEFAULT_HOST),
                self.port.unwrap_or(DEFAULT_PORT)
            ),
        }
    }

    /// Builds driver options with the session defaults this tool depends
    /// on. foreign_key_checks=0 in particular is load-bearing: the diff
    /// engine emits creates with inline foreign keys in dependency cycles
    /// on the assumption that the session never enforces them mid-batch.
    pub fn build_opts(&self, default_schema: Option<&str>) -> Opts {
        let mut init = vec![
            "SET SESSION foreign_key_checks=0".to_string(),
            format!("SET SESSION sql_mode='{DEFAULT_SQL_MODE}'"),
            "SET SESSION innodb_strict_mode=1".to_string(),
        ];
        for (key, value) in &self.connect_options {
            init.push(format!("SET SESSION {key}={}", quote_session_value(value)));
        }

        let mut builder = OptsBuilder::new()
            .ip_or_hostname(Some(
                self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
            ))
            .tcp_port(self.port.unwrap_or(DEFAULT_PORT))
            .user(self.user.clone())
            .pass(self.password.clone())
            .db_name(default_schema.map(str::to_string))
            .init(init);
        if let Some(socket) = &self.socket {
            builder = builder.socket(Some(socket.clone()));
        }
        builder.into()
    }
}

fn quote_session_value(value: &str) -> String {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
