use crate::Flavor;
use crate::ident::{quote_ident, quote_value};

use super::{Column, ForeignKey, Index, ObjectKey, ObjectType};

/// One table, as introspected. Immutable after construction: diffs and
/// fixups build new values instead of mutating in place.
///
/// The load-bearing invariant: for a supported table,
/// `generated_create_statement(flavor)` is byte-equal to `create_statement`
/// as returned by the server. When the two diverge after all introspection
/// fixups, `unsupported_ddl` is set and the diff engine refuses to ALTER
/// the table (creating or dropping it whole stays allowed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<Index>,
    pub secondary_indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub engine: String,
    pub char_set: String,
    pub collation: String,
    /// Whether `collation` is the default collation of `char_set`.
    pub collation_is_default: bool,
    /// Free-form option tokens (`ROW_FORMAT=DYNAMIC STATS_PERSISTENT=1`),
    /// preserving the server's own ordering.
    pub create_options: String,
    pub comment: String,
    /// Verbatim partitioning clause, opaque to the model.
    pub partitioning: Option<String>,
    pub next_auto_increment: u64,
    pub unsupported_ddl: bool,
    /// Generated-vs-actual divergence kept for diagnostics when
    /// `unsupported_ddl` is set.
    pub unsupported_diff: Option<String>,
    /// `SHOW CREATE TABLE` output exactly as the server returned it.
    pub create_statement: String,
}

impl Table {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            secondary_indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: "InnoDB".to_string(),
            char_set: "utf8mb4".to_string(),
            collation: "utf8mb4_general_ci".to_string(),
            collation_is_default: true,
            create_options: String::new(),
            comment: String::new(),
            partitioning: None,
            next_auto_increment: 0,
            unsupported_ddl: false,
            unsupported_diff: None,
            create_statement: String::new(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(ObjectType::Table, self.name.clone())
    }

    pub fn supported(&self) -> bool {
        !self.unsupported_ddl
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn secondary_index(&self, name: &str) -> Option<&Index> {
        self.secondary_indexes.iter().find(|index| index.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    pub fn has_auto_increment(&self) -> bool {
        self.columns.iter().any(|column| column.auto_increment)
    }

    /// Regenerates the canonical CREATE TABLE for `flavor`. Byte-equality
    /// with [`Table::create_statement`] is what qualifies the table as
    /// supported.
    pub fn generated_create_statement(&self, flavor: &Flavor) -> String {
        let mut lines = Vec::with_capacity(
            self.columns.len() + self.secondary_indexes.len() + self.foreign_keys.len() + 1,
        );

        for column in &self.columns {
            lines.push(column.definition(flavor, self));
        }
        if let Some(primary_key) = &self.primary_key {
            lines.push(primary_key.definition(flavor));
        }
        for index in &self.secondary_indexes {
            lines.push(index.definition(flavor));
        }

        let mut foreign_keys: Vec<&ForeignKey> = self.foreign_keys.iter().collect();
        if flavor.sorts_foreign_keys() {
            foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
        }
        for foreign_key in foreign_keys {
            lines.push(foreign_key.definition());
        }

        let mut create = format!(
            "CREATE TABLE {} (\n  {}\n)",
            quote_ident(&self.name),
            lines.join(",\n  ")
        );

        for option in self.table_options(flavor) {
            create.push(' ');
            create.push_str(&option);
        }

        if let Some(partitioning) = &self.partitioning {
            create.push('\n');
            create.push_str(partitioning);
        }

        create
    }

    /// Post-body options in the server's fixed order: engine, auto-inc
    /// counter, charset, collation, free-form options, comment.
    fn table_options(&self, flavor: &Flavor) -> Vec<String> {
        let mut options = Vec::new();
        if !self.engine.is_empty() {
            options.push(format!("ENGINE={}", self.engine));
        }
        if self.has_auto_increment() && self.next_auto_increment > 1 {
            options.push(format!("AUTO_INCREMENT={}", self.next_auto_increment));
        }
        options.push(format!("DEFAULT CHARSET={}", self.char_set));
        if self.emit_collation(flavor) {
            options.push(format!("COLLATE={}", self.collation));
        }
        if !self.create_options.is_empty() {
            options.push(self.create_options.clone());
        }
        if !self.comment.is_empty() {
            options.push(format!("COMMENT={}", quote_value(&self.comment)));
        }
        options
    }

    /// The COLLATE clause appears when the collation is not the charset
    /// default, and additionally whenever the flavor's default utf8mb4
    /// collation differs from utf8mb4_general_ci, even if the table matches
    /// the server default.
    fn emit_collation(&self, flavor: &Flavor) -> bool {
        if !self.collation_is_default {
            return true;
        }
        self.char_set == "utf8mb4" && flavor.default_utf8mb4_collation() != "utf8mb4_general_ci"
    }

    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE {}", quote_ident(&self.name))
    }
}
