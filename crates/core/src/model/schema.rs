use super::{NameCaseMode, ObjectKey, Routine, Table};

/// Named container of tables and routines, produced by introspection or by
/// workspace application of filesystem statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub char_set: String,
    pub collation: String,
    pub tables: Vec<Table>,
    pub routines: Vec<Routine>,
}

impl Schema {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            char_set: "utf8mb4".to_string(),
            collation: "utf8mb4_general_ci".to_string(),
            tables: Vec::new(),
            routines: Vec::new(),
        }
    }

    pub fn table(&self, name: &str, mode: NameCaseMode) -> Option<&Table> {
        self.tables.iter().find(|table| mode.eq(&table.name, name))
    }

    pub fn routine(&self, key: &ObjectKey, mode: NameCaseMode) -> Option<&Routine> {
        self.routines.iter().find(|routine| {
            routine.routine_type.object_type() == key.object_type
                && mode.eq(&routine.name, &key.name)
        })
    }

    pub fn object_keys(&self) -> Vec<ObjectKey> {
        let mut keys = Vec::with_capacity(self.tables.len() + self.routines.len());
        keys.extend(self.tables.iter().map(Table::key));
        keys.extend(self.routines.iter().map(Routine::key));
        keys
    }

    /// CREATE statements for every object, tables first, suitable for
    /// replaying into an empty workspace.
    pub fn to_statements(&self) -> Vec<String> {
        let mut statements = Vec::with_capacity(self.tables.len() + self.routines.len());
        statements.extend(self.tables.iter().map(|table| table.create_statement.clone()));
        statements.extend(self.routines.iter().map(Routine::definition));
        statements
    }
}
