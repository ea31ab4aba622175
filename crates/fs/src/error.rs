use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{}:{line}:{column}: unterminated quote", .file.display())]
    UnterminatedQuote {
        file: PathBuf,
        line: usize,
        column: usize,
    },
    #[error("{}:{line}:{column}: unterminated block comment", .file.display())]
    UnterminatedComment {
        file: PathBuf,
        line: usize,
        column: usize,
    },
    #[error("{}:{line}:{column}: DELIMITER command requires an argument", .file.display())]
    MalformedDelimiter {
        file: PathBuf,
        line: usize,
        column: usize,
    },
    #[error("{}: file is {size} bytes, over the {limit}-byte limit", .file.display())]
    FileTooLarge {
        file: PathBuf,
        size: u64,
        limit: u64,
    },
    #[error("{}:{line}: CREATE TABLE ... {form} is not permitted in schema files", .file.display())]
    ForbiddenCreateForm {
        file: PathBuf,
        line: usize,
        form: String,
    },
    #[error("{}: no CREATE statement found", .file.display())]
    NoCreateStatement { file: PathBuf },
    #[error("{}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum OptionError {
    #[error("{origin}: unknown option `{option}`")]
    UnknownOption { origin: String, option: String },
    #[error("{origin}: invalid value `{value}` for option `{option}`")]
    InvalidValue {
        origin: String,
        option: String,
        value: String,
    },
    #[error("{origin}: malformed connect-options near `{fragment}`")]
    MalformedConnectOptions { origin: String, fragment: String },
    #[error("{origin}: connect-options may not override `{option}`")]
    DeniedConnectOption { origin: String, option: String },
    #[error("{child}: option `schema` conflicts with the value set in {ancestor}")]
    SchemaRedefined { child: String, ancestor: String },
    #[error("{origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: io::Error,
    },
    #[error("{origin}: {message}")]
    Ini { origin: String, message: String },
}
