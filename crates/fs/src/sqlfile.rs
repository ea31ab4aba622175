use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ParseError;
use crate::tokenizer::{Statement, StatementType, tokenize};

/// Default cap on individual .sql file size.
pub const MAX_SQL_FILE_SIZE: u64 = 16 * 1024;

/// A parsed .sql file: its statements in order, rewritable in place.
#[derive(Debug, Clone)]
pub struct TokenizedFile {
    pub path: PathBuf,
    pub statements: Vec<Statement>,
}

impl TokenizedFile {
    /// Reads and tokenizes one schema file, enforcing the size cap and the
    /// forbidden CREATE forms (`... SELECT` and `... LIKE` can copy data or
    /// definitions from arbitrary tables, so they are rejected outright).
    pub fn read(path: &Path) -> Result<Self, ParseError> {
        let metadata = fs::metadata(path).map_err(|source| ParseError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > MAX_SQL_FILE_SIZE {
            return Err(ParseError::FileTooLarge {
                file: path.to_path_buf(),
                size: metadata.len(),
                limit: MAX_SQL_FILE_SIZE,
            });
        }

        let contents = fs::read_to_string(path).map_err(|source| ParseError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        let statements = tokenize(path, &contents)?;

        let mut has_create = false;
        for statement in &statements {
            if statement.statement_type == StatementType::Create {
                check_forbidden_form(statement)?;
                has_create = true;
            }
        }
        if !has_create {
            return Err(ParseError::NoCreateStatement {
                file: path.to_path_buf(),
            });
        }

        let file = Self {
            path: path.to_path_buf(),
            statements,
        };
        file.warn_on_name_mismatch();
        Ok(file)
    }

    pub fn creates(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|statement| statement.statement_type == StatementType::Create)
    }

    /// Whether any statement carries real content worth keeping on disk.
    fn has_remaining_content(&self) -> bool {
        self.statements.iter().any(|statement| {
            !statement.is_removed()
                && !matches!(
                    statement.statement_type,
                    StatementType::Noop | StatementType::Command
                )
        })
    }

    /// Writes the remaining statements back verbatim, or deletes the file
    /// when nothing but whitespace and session commands would remain.
    pub fn rewrite(&self) -> Result<(), ParseError> {
        if !self.has_remaining_content() {
            return fs::remove_file(&self.path).map_err(|source| ParseError::Io {
                file: self.path.clone(),
                source,
            });
        }

        let mut contents = String::new();
        for statement in &self.statements {
            if !statement.is_removed() {
                contents.push_str(&statement.text);
            }
        }
        fs::write(&self.path, contents).map_err(|source| ParseError::Io {
            file: self.path.clone(),
            source,
        })
    }

    /// A file whose name differs from the object it defines still works,
    /// but it defeats the one-object-per-file convention, so it is worth a
    /// warning.
    fn warn_on_name_mismatch(&self) {
        let Some(stem) = self.path.file_stem().and_then(|stem| stem.to_str()) else {
            return;
        };
        for statement in self.creates() {
            if statement.object_name != stem {
                warn!(
                    file = %self.path.display(),
                    object = %statement.object_name,
                    "filename does not match the object it defines"
                );
            }
        }
    }
}

fn check_forbidden_form(statement: &Statement) -> Result<(), ParseError> {
    let upper = statement.text.to_ascii_uppercase();
    let Some(open) = upper.find('(') else {
        // no column list: `CREATE TABLE x LIKE y` or `... SELECT` without
        // parens; scan the whole text
        return check_tokens(statement, &upper);
    };
    check_tokens(statement, &upper[..open])?;

    // `CREATE TABLE x (...) SELECT ...` keeps the SELECT after the
    // balanced column list
    if let Some(body_len) = balanced_paren_len(&upper[open..]) {
        let tail = &upper[open + body_len..];
        if tail.split_whitespace().next() == Some("SELECT") {
            return Err(ParseError::ForbiddenCreateForm {
                file: statement.file.clone(),
                line: statement.line_no,
                form: "SELECT".to_string(),
            });
        }
    }
    Ok(())
}

/// Byte length of a balanced parenthesized block starting at `(`,
/// honoring quotes.
fn balanced_paren_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    for (idx, ch) in text.char_indices() {
        match in_quote {
            Some(quote) => {
                if ch == quote {
                    in_quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => in_quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx + 1);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn check_tokens(statement: &Statement, fragment: &str) -> Result<(), ParseError> {
    for forbidden in ["SELECT", "LIKE"] {
        if fragment
            .split_whitespace()
            .any(|token| token == forbidden)
        {
            return Err(ParseError::ForbiddenCreateForm {
                file: statement.file.clone(),
                line: statement.line_no,
                form: forbidden.to_string(),
            });
        }
    }
    Ok(())
}
