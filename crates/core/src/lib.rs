mod ddl;
mod diff;
mod error;
mod flavor;
pub mod ident;
mod model;

pub use ddl::{
    DdlPlan, DdlStatement, EmitTarget, NextAutoIncMode, StatementModifiers, emit_object_diff,
    escape_shell_value, interpolate,
};
pub use diff::{
    ColumnPosition, Danger, DiffConfig, DiffType, ObjectDiff, Partitioning, SchemaDiff,
    TableAlterClause, diff_schemas, diff_tables, type_narrows,
};
pub use error::{DiffError, EmitError};
pub use flavor::{Flavor, RowFormatReqs, Vendor};
pub use model::{
    Column, ColumnDefault, ForeignKey, Generation, Index, IndexPart, IndexPartBase, IndexType,
    NameCaseMode, ObjectKey, ObjectType, Routine, RoutineType, Schema, Table,
};
