use anyhow::{Context, bail};
use regex::Regex;

use driftql_core::{DiffConfig, Flavor, NameCaseMode, Partitioning, StatementModifiers};
use driftql_fs::{OptionKey, ResolvedOptions, parse_connect_options};
use driftql_mysql::{ConnectionParams, WorkspaceOptions};

/// Default threshold under which files and statements count as "small".
pub const DEFAULT_SAFE_BELOW_SIZE: u64 = 0;

pub fn connection_params(options: &ResolvedOptions) -> anyhow::Result<ConnectionParams> {
    let host = options.get(OptionKey::Host).map(str::to_string);
    let socket = options.get(OptionKey::Socket).map(str::to_string);
    if host.is_some() && socket.is_some() {
        bail!(
            "options `host` ({}) and `socket` ({}) conflict; specify one",
            options.origin(OptionKey::Host).unwrap_or("unknown"),
            options.origin(OptionKey::Socket).unwrap_or("unknown"),
        );
    }

    let port = options
        .get(OptionKey::Port)
        .map(|raw| {
            raw.parse::<u16>()
                .with_context(|| format!("invalid port `{raw}`"))
        })
        .transpose()?;

    let connect_options = match options.get(OptionKey::ConnectOptions) {
        Some(raw) => parse_connect_options(
            options.origin(OptionKey::ConnectOptions).unwrap_or("unknown"),
            raw,
        )?,
        None => Vec::new(),
    };

    Ok(ConnectionParams {
        host,
        port,
        socket,
        user: options.get(OptionKey::User).map(str::to_string),
        password: options.get(OptionKey::Password).map(str::to_string),
        connect_options,
    })
}

pub fn diff_config(
    options: &ResolvedOptions,
    case_mode: NameCaseMode,
) -> anyhow::Result<DiffConfig> {
    Ok(DiffConfig {
        case_mode,
        ignore_table: compile_pattern(options, OptionKey::IgnoreTable)?,
        ignore_schema: compile_pattern(options, OptionKey::IgnoreSchema)?,
        partitioning: parse_enum_option(options, OptionKey::Partitioning)?.unwrap_or_default(),
        exact_match: options.get_bool(OptionKey::ExactMatch),
    })
}

pub fn statement_modifiers(
    options: &ResolvedOptions,
    flavor: Flavor,
) -> anyhow::Result<StatementModifiers> {
    let mut modifiers = StatementModifiers::new(flavor);
    modifiers.algorithm_clause = options.get(OptionKey::AlterAlgorithm).map(str::to_string);
    modifiers.lock_clause = options.get(OptionKey::AlterLock).map(str::to_string);
    modifiers.allow_unsafe = options.get_bool(OptionKey::AllowUnsafe);
    modifiers.safe_below_size = options
        .get_u64(OptionKey::SafeBelowSize)?
        .unwrap_or(DEFAULT_SAFE_BELOW_SIZE);
    modifiers.strict_index_order = options.get_bool(OptionKey::StrictIndexOrder);
    modifiers.next_auto_inc_mode =
        parse_enum_option(options, OptionKey::AlterAutoInc)?.unwrap_or_default();
    modifiers.partitioning =
        parse_enum_option::<Partitioning>(options, OptionKey::Partitioning)?.unwrap_or_default();
    modifiers.alter_wrapper = options.get(OptionKey::AlterWrapper).map(str::to_string);
    modifiers.alter_wrapper_min_size = options
        .get_u64(OptionKey::AlterWrapperMinSize)?
        .unwrap_or(0);
    modifiers.ddl_wrapper = options.get(OptionKey::DdlWrapper).map(str::to_string);
    Ok(modifiers)
}

pub fn workspace_options(options: &ResolvedOptions) -> anyhow::Result<WorkspaceOptions> {
    if let Some(kind) = options.get(OptionKey::Workspace)
        && kind != "temp-schema"
    {
        bail!(
            "unknown workspace type `{kind}` ({})",
            options.origin(OptionKey::Workspace).unwrap_or("unknown")
        );
    }

    let mut workspace = WorkspaceOptions::default();
    if let Some(temp_schema) = options.get(OptionKey::TempSchema) {
        workspace.temp_schema = temp_schema.to_string();
    }
    workspace.reuse_temp_schema = options.get_bool(OptionKey::ReuseTempSchema);
    Ok(workspace)
}

pub fn concurrent_instances(options: &ResolvedOptions) -> anyhow::Result<usize> {
    match options.get(OptionKey::ConcurrentInstances) {
        None => Ok(1),
        Some(raw) => {
            let parsed = raw
                .parse::<usize>()
                .with_context(|| format!("invalid concurrent-instances `{raw}`"))?;
            Ok(parsed.max(1))
        }
    }
}

fn compile_pattern(
    options: &ResolvedOptions,
    key: OptionKey,
) -> anyhow::Result<Option<Regex>> {
    options
        .get(key)
        .map(|raw| {
            Regex::new(raw).with_context(|| {
                format!(
                    "invalid regex for `{key}` ({})",
                    options.origin(key).unwrap_or("unknown")
                )
            })
        })
        .transpose()
}

fn parse_enum_option<T>(options: &ResolvedOptions, key: OptionKey) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    options
        .get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|message| {
                anyhow::anyhow!(
                    "{message} ({})",
                    options.origin(key).unwrap_or("unknown")
                )
            })
        })
        .transpose()
}
