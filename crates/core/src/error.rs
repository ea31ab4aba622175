use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("table `{0}` uses DDL features this tool cannot regenerate; refusing to alter it")]
    UnsupportedAlter(String),
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("unknown interpolation variable {{{0}}}")]
    UnknownVariable(String),
    #[error("value for {{{variable}}} contains a backtick and cannot be shell-interpolated")]
    ForbiddenValue { variable: String },
}
