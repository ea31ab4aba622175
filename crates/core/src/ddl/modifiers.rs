use crate::Flavor;
use crate::diff::Partitioning;

/// Policy for AUTO_INCREMENT counter clauses. Filesystem definitions
/// normally carry a counter of 1, so anything but `Never` is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NextAutoIncMode {
    #[default]
    Never,
    IncreaseOnly,
    Always,
}

impl std::str::FromStr for NextAutoIncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" => Ok(NextAutoIncMode::Never),
            "increase-only" | "increase" => Ok(NextAutoIncMode::IncreaseOnly),
            "always" => Ok(NextAutoIncMode::Always),
            _ => Err(format!("invalid next-auto-inc mode `{s}`")),
        }
    }
}

/// Rendering-time knobs for the DDL emitter. Diff-time policy lives in
/// [`crate::diff::DiffConfig`].
#[derive(Debug, Clone)]
pub struct StatementModifiers {
    pub flavor: Flavor,
    /// `ALGORITHM=` clause value (`INPLACE`, `COPY`, `INSTANT`), appended
    /// only to direct single-table alters.
    pub algorithm_clause: Option<String>,
    /// `LOCK=` clause value (`NONE`, `SHARED`, `EXCLUSIVE`).
    pub lock_clause: Option<String>,
    pub allow_unsafe: bool,
    /// Unsafe statements are allowed anyway on tables smaller than this
    /// many bytes.
    pub safe_below_size: u64,
    /// Include index re-adds whose only purpose is matching index order.
    pub strict_index_order: bool,
    pub next_auto_inc_mode: NextAutoIncMode,
    /// Mirrors the diff-time policy so that creates of partitioned tables
    /// can be rendered unpartitioned under `remove`.
    pub partitioning: Partitioning,
    /// Shell template applied to ALTERs on tables at least
    /// `alter_wrapper_min_size` bytes.
    pub alter_wrapper: Option<String>,
    pub alter_wrapper_min_size: u64,
    /// Shell template applied to every emitted statement.
    pub ddl_wrapper: Option<String>,
}

impl StatementModifiers {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            algorithm_clause: None,
            lock_clause: None,
            allow_unsafe: false,
            safe_below_size: 0,
            strict_index_order: false,
            next_auto_inc_mode: NextAutoIncMode::default(),
            partitioning: Partitioning::default(),
            alter_wrapper: None,
            alter_wrapper_min_size: 0,
            ddl_wrapper: None,
        }
    }
}
