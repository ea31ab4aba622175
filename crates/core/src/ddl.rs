mod emitter;
mod interpolate;
mod modifiers;

pub use emitter::{DdlPlan, DdlStatement, EmitTarget, emit_object_diff};
pub use interpolate::{escape_shell_value, interpolate};
pub use modifiers::{NextAutoIncMode, StatementModifiers};
