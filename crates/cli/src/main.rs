mod config;
mod run;

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use driftql_fs::OptionKey;

use run::{Action, CANCELLED, EXIT_ERROR};

#[derive(Debug, Parser)]
#[command(name = "driftql", version, about = "Declarative schema management for MySQL and MariaDB")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare the filesystem schema definitions against live instances
    Diff(CommonArgs),
    /// Apply the filesystem schema definitions to live instances
    Push(CommonArgs),
    /// Update the filesystem to match live instances
    Pull(CommonArgs),
    /// Check that schema files are in canonical form
    Lint(CommonArgs),
    /// Rewrite schema files into canonical form
    Format(CommonArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Directory containing the host-level .skeema file
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Environment section of option files to apply
    #[arg(long, default_value = "production")]
    environment: String,

    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    socket: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    connect_options: Option<String>,

    /// Permit destructive statements regardless of table size
    #[arg(long)]
    allow_unsafe: bool,
    /// Permit destructive statements on tables smaller than this many bytes
    #[arg(long)]
    safe_below_size: Option<String>,
    /// ALGORITHM= clause for ALTERs (inplace, copy, instant)
    #[arg(long)]
    alter_algorithm: Option<String>,
    /// LOCK= clause for ALTERs (none, shared, exclusive)
    #[arg(long)]
    alter_lock: Option<String>,
    /// AUTO_INCREMENT clause policy (never, increase-only, always)
    #[arg(long)]
    alter_auto_inc: Option<String>,
    /// Partitioning policy (keep, modify, remove)
    #[arg(long)]
    partitioning: Option<String>,
    /// Include cosmetic differences such as renamed foreign keys
    #[arg(long)]
    exact_match: bool,
    /// Re-order indexes to match the filesystem definitions exactly
    #[arg(long)]
    strict_index_order: bool,
    #[arg(long)]
    ignore_schema: Option<String>,
    #[arg(long)]
    ignore_table: Option<String>,
    /// How many instances may run DDL concurrently
    #[arg(long)]
    concurrent_instances: Option<usize>,
    /// Shell command template for large ALTERs
    #[arg(long)]
    alter_wrapper: Option<String>,
    #[arg(long)]
    alter_wrapper_min_size: Option<String>,
    /// Shell command template for every DDL statement
    #[arg(long)]
    ddl_wrapper: Option<String>,
    /// Workspace backend (temp-schema)
    #[arg(long)]
    workspace: Option<String>,
    /// Name of the sandbox schema
    #[arg(long)]
    temp_schema: Option<String>,
    /// Keep the sandbox schema between runs, dropping only its tables
    #[arg(long)]
    reuse_temp_schema: bool,
}

impl CommonArgs {
    /// CLI flags become the highest-precedence option layer.
    fn overrides(&self) -> Vec<(OptionKey, String)> {
        let mut overrides = Vec::new();
        let mut push = |key: OptionKey, value: Option<String>| {
            if let Some(value) = value {
                overrides.push((key, value));
            }
        };

        push(OptionKey::Host, self.host.clone());
        push(OptionKey::Port, self.port.map(|port| port.to_string()));
        push(OptionKey::Socket, self.socket.clone());
        push(OptionKey::User, self.user.clone());
        push(OptionKey::Password, self.password.clone());
        push(OptionKey::ConnectOptions, self.connect_options.clone());
        push(
            OptionKey::AllowUnsafe,
            self.allow_unsafe.then(|| "1".to_string()),
        );
        push(OptionKey::SafeBelowSize, self.safe_below_size.clone());
        push(OptionKey::AlterAlgorithm, self.alter_algorithm.clone());
        push(OptionKey::AlterLock, self.alter_lock.clone());
        push(OptionKey::AlterAutoInc, self.alter_auto_inc.clone());
        push(OptionKey::Partitioning, self.partitioning.clone());
        push(
            OptionKey::ExactMatch,
            self.exact_match.then(|| "1".to_string()),
        );
        push(
            OptionKey::StrictIndexOrder,
            self.strict_index_order.then(|| "1".to_string()),
        );
        push(OptionKey::IgnoreSchema, self.ignore_schema.clone());
        push(OptionKey::IgnoreTable, self.ignore_table.clone());
        push(
            OptionKey::ConcurrentInstances,
            self.concurrent_instances.map(|count| count.to_string()),
        );
        push(OptionKey::AlterWrapper, self.alter_wrapper.clone());
        push(
            OptionKey::AlterWrapperMinSize,
            self.alter_wrapper_min_size.clone(),
        );
        push(OptionKey::DdlWrapper, self.ddl_wrapper.clone());
        push(OptionKey::Workspace, self.workspace.clone());
        push(OptionKey::TempSchema, self.temp_schema.clone());
        push(
            OptionKey::ReuseTempSchema,
            self.reuse_temp_schema.then(|| "1".to_string()),
        );
        overrides
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = ctrlc::set_handler(|| {
        CANCELLED.store(true, Ordering::SeqCst);
        eprintln!("driftql: interrupt received; finishing in-flight DDL before stopping");
    }) {
        eprintln!("driftql: could not install signal handler: {error}");
    }

    let cli = Cli::parse();
    let (action, args) = match &cli.command {
        Command::Diff(args) => (Action::Diff, args),
        Command::Push(args) => (Action::Push, args),
        Command::Pull(args) => (Action::Pull, args),
        Command::Lint(args) => (Action::Lint { rewrite: false }, args),
        Command::Format(args) => (Action::Lint { rewrite: true }, args),
    };

    let exit = match run::run_action(action, &args.dir, &args.environment, &args.overrides()) {
        Ok(exit) => exit,
        Err(error) => {
            eprintln!("driftql: {error:#}");
            EXIT_ERROR
        }
    };

    driftql_mysql::shutdown();
    std::process::exit(i32::from(exit));
}
