use crate::model::{Column, ForeignKey, Index, ObjectKey, ObjectType, Routine, Table};

/// Safety classification of a single clause. `Maybe` marks operations whose
/// safety depends on data the engine cannot see (a type change that might
/// truncate in edge cases); `Unsafe` marks operations that discard data or
/// constraints outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Danger {
    Safe,
    Maybe,
    Unsafe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    Create,
    Drop,
    Alter,
}

/// Column placement inside an ALTER clause. `None` at the call sites means
/// "append at the end of the table", which needs no clause at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
}

impl ColumnPosition {
    pub fn clause(&self) -> String {
        match self {
            ColumnPosition::First => "FIRST".to_string(),
            ColumnPosition::After(name) => format!("AFTER {}", crate::ident::quote_ident(name)),
        }
    }
}

/// Smallest unit of table change. The diff engine emits these in a fixed
/// order (FK drops, column changes, index changes, table options, FK adds)
/// so that replaying them one-per-statement also works.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAlterClause {
    AddColumn {
        column: Column,
        position: Option<ColumnPosition>,
    },
    DropColumn {
        column: Column,
    },
    ModifyColumn {
        old: Column,
        new: Column,
        position: Option<ColumnPosition>,
    },
    AddIndex {
        index: Index,
        /// Set when the only reason for re-adding is index ordering; such
        /// clauses are emitted only under the strict-index-order modifier.
        reorder_only: bool,
    },
    DropIndex {
        index: Index,
        reorder_only: bool,
    },
    AddForeignKey {
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        foreign_key: ForeignKey,
        /// Dropping a constraint whose referenced table remains in place
        /// removes real integrity enforcement, which is classified unsafe.
        referenced_table_survives: bool,
    },
    ChangeAutoIncrement {
        old: u64,
        new: u64,
    },
    ChangeCharSet {
        char_set: String,
        collation: String,
    },
    ChangeCollation {
        collation: String,
    },
    ChangeCreateOptions {
        options: String,
    },
    ChangeComment {
        comment: String,
    },
    ChangePartitioning {
        old: Option<String>,
        new: Option<String>,
    },
}

impl TableAlterClause {
    pub fn danger(&self) -> Danger {
        match self {
            TableAlterClause::DropColumn { .. } => Danger::Unsafe,
            TableAlterClause::ModifyColumn { old, new, .. } => {
                if old.type_in_db == new.type_in_db {
                    Danger::Safe
                } else if old.type_narrows_to(new) {
                    Danger::Unsafe
                } else {
                    Danger::Maybe
                }
            }
            TableAlterClause::DropForeignKey {
                referenced_table_survives,
                ..
            } => {
                if *referenced_table_survives {
                    Danger::Unsafe
                } else {
                    Danger::Safe
                }
            }
            TableAlterClause::ChangePartitioning { new: None, old, .. } if old.is_some() => {
                Danger::Maybe
            }
            _ => Danger::Safe,
        }
    }
}

/// One object-level difference between two schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDiff {
    CreateTable {
        table: Table,
    },
    DropTable {
        table: Table,
    },
    AlterTable {
        from: Table,
        to: Table,
        clauses: Vec<TableAlterClause>,
    },
    CreateRoutine {
        routine: Routine,
    },
    DropRoutine {
        routine: Routine,
    },
}

impl ObjectDiff {
    pub fn key(&self) -> ObjectKey {
        match self {
            ObjectDiff::CreateTable { table }
            | ObjectDiff::DropTable { table }
            | ObjectDiff::AlterTable { to: table, .. } => {
                ObjectKey::new(ObjectType::Table, table.name.clone())
            }
            ObjectDiff::CreateRoutine { routine } | ObjectDiff::DropRoutine { routine } => {
                routine.key()
            }
        }
    }

    pub fn diff_type(&self) -> DiffType {
        match self {
            ObjectDiff::CreateTable { .. } | ObjectDiff::CreateRoutine { .. } => DiffType::Create,
            ObjectDiff::DropTable { .. } | ObjectDiff::DropRoutine { .. } => DiffType::Drop,
            ObjectDiff::AlterTable { .. } => DiffType::Alter,
        }
    }

    pub fn danger(&self) -> Danger {
        match self {
            ObjectDiff::DropTable { .. } => Danger::Unsafe,
            ObjectDiff::DropRoutine { .. } => Danger::Safe,
            ObjectDiff::CreateTable { .. } | ObjectDiff::CreateRoutine { .. } => Danger::Safe,
            ObjectDiff::AlterTable { clauses, .. } => clauses
                .iter()
                .map(TableAlterClause::danger)
                .max()
                .unwrap_or(Danger::Safe),
        }
    }
}
