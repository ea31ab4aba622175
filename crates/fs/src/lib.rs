mod dir;
mod error;
mod options;
mod sqlfile;
mod tokenizer;

pub use dir::{HostDir, OPTION_FILE_NAME, SchemaDir};
pub use error::{OptionError, ParseError};
pub use options::{OptionFile, OptionKey, ResolvedOptions, parse_connect_options};
pub use sqlfile::{MAX_SQL_FILE_SIZE, TokenizedFile};
pub use tokenizer::{Statement, StatementType, tokenize};
