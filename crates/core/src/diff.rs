mod narrow;
mod schema;
mod table;
mod types;

pub use narrow::type_narrows;
pub use schema::{SchemaDiff, diff_schemas};
pub use table::diff_tables;
pub use types::{
    ColumnPosition, Danger, DiffType, ObjectDiff, TableAlterClause,
};

use regex::Regex;

use crate::model::NameCaseMode;

/// Partitioning handling policy for diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// Partitioning differences are erased from the diff entirely.
    #[default]
    Keep,
    /// Partitioning is diffed like any other table attribute.
    Modify,
    /// The target is always unpartitioned, regardless of the desired state.
    Remove,
}

impl std::str::FromStr for Partitioning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Partitioning::Keep),
            "modify" => Ok(Partitioning::Modify),
            "remove" => Ok(Partitioning::Remove),
            _ => Err(format!("invalid partitioning policy `{s}`")),
        }
    }
}

/// Knobs consumed by the diff engine itself. Rendering-time decisions live
/// in [`crate::ddl::StatementModifiers`] instead.
#[derive(Debug, Clone, Default)]
pub struct DiffConfig {
    pub case_mode: NameCaseMode,
    pub ignore_table: Option<Regex>,
    pub ignore_schema: Option<Regex>,
    pub partitioning: Partitioning,
    /// When set, cosmetic differences such as a foreign key that only
    /// changed names are included in the diff instead of suppressed.
    pub exact_match: bool,
}

impl DiffConfig {
    pub fn table_ignored(&self, name: &str) -> bool {
        self.ignore_table
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name))
    }

    pub fn schema_ignored(&self, name: &str) -> bool {
        self.ignore_schema
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name))
    }
}
