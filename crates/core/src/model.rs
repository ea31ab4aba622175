mod column;
mod foreign_key;
mod index;
mod routine;
mod schema;
mod table;

pub use column::{Column, ColumnDefault, Generation};
pub use foreign_key::ForeignKey;
pub use index::{Index, IndexPart, IndexPartBase, IndexType};
pub use routine::{Routine, RoutineType};
pub use schema::Schema;
pub use table::Table;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Table,
    Procedure,
    Function,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Table => "table",
            ObjectType::Procedure => "procedure",
            ObjectType::Function => "function",
        };
        f.write_str(name)
    }
}

/// Map key identifying one named object within a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub object_type: ObjectType,
    pub name: String,
}

impl ObjectKey {
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            object_type,
            name: name.into(),
        }
    }

    /// Key with its name folded per the instance's identifier case rules.
    pub fn normalized(&self, mode: NameCaseMode) -> Self {
        Self {
            object_type: self.object_type,
            name: mode.fold(&self.name),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type, crate::ident::quote_ident(&self.name))
    }
}

/// Identifier comparison mode, derived from the server's
/// `lower_case_table_names` setting: 0 compares case-sensitively, 1 and 2
/// compare case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCaseMode {
    #[default]
    Sensitive,
    Insensitive,
}

impl NameCaseMode {
    pub fn from_lower_case_table_names(lctn: u8) -> Self {
        if lctn >= 1 {
            NameCaseMode::Insensitive
        } else {
            NameCaseMode::Sensitive
        }
    }

    pub fn fold(self, name: &str) -> String {
        match self {
            NameCaseMode::Sensitive => name.to_string(),
            NameCaseMode::Insensitive => name.to_lowercase(),
        }
    }

    pub fn eq(self, a: &str, b: &str) -> bool {
        match self {
            NameCaseMode::Sensitive => a == b,
            NameCaseMode::Insensitive => a.to_lowercase() == b.to_lowercase(),
        }
    }
}
