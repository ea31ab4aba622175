use std::path::{Path, PathBuf};

use driftql_core::ObjectType;

use crate::error::ParseError;

/// Classification of one tokenized statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// Whitespace and comments only.
    Noop,
    /// Session commands the tokenizer itself understands: `USE` and
    /// `DELIMITER`.
    Command,
    /// Syntactically a statement, but not one of the recognized CREATE
    /// grammars.
    Unknown,
    Create,
}

/// One statement scanned out of a .sql file. `text` is verbatim, including
/// leading comments, the delimiter, and trailing whitespace through the
/// next newline; concatenating every statement of a file reproduces the
/// file byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub file: PathBuf,
    /// 1-based line of the statement's first byte.
    pub line_no: usize,
    /// 1-based character column of the statement's first byte.
    pub char_no: usize,
    /// Default database in effect at this point in the stream, as set by
    /// any preceding `USE`.
    pub default_database: String,
    pub text: String,
    pub statement_type: StatementType,
    pub object_type: Option<ObjectType>,
    /// Schema qualifier, empty when the statement does not qualify its
    /// object name.
    pub object_qualifier: String,
    pub object_name: String,
    /// Statement delimiter in effect when this statement was scanned.
    pub delimiter: String,
    removed: bool,
}

impl Statement {
    /// Marks the statement for deletion by [`crate::TokenizedFile::rewrite`].
    pub fn remove(&mut self) {
        self.removed = true;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Schema-qualified object key, when this is a CREATE.
    pub fn object_key(&self) -> Option<driftql_core::ObjectKey> {
        self.object_type
            .map(|object_type| driftql_core::ObjectKey::new(object_type, self.object_name.clone()))
    }
}

const DEFAULT_DELIMITER: &str = ";";

/// Scans `contents` into a statement list. The scanner is a
/// character-driven state machine over default text, line comments
/// (`-- ` and `#`), block comments (including `/*!` version comments,
/// which do not change scanning), and the three quoting styles.
pub fn tokenize(path: &Path, contents: &str) -> Result<Vec<Statement>, ParseError> {
    Scanner::new(path, contents).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    LineComment,
    BlockComment,
    SingleQuote,
    DoubleQuote,
    Backtick,
}

struct Scanner<'a> {
    path: &'a Path,
    contents: &'a str,
    /// Byte offset of the scan cursor.
    pos: usize,
    line: usize,
    col: usize,
    delimiter: String,
    default_database: String,
    statements: Vec<Statement>,
    /// Start of the statement currently being accumulated.
    start: usize,
    start_line: usize,
    start_col: usize,
    /// Whether the current statement has any non-whitespace, non-comment
    /// content so far.
    has_content: bool,
}

impl<'a> Scanner<'a> {
    fn new(path: &'a Path, contents: &'a str) -> Self {
        Self {
            path,
            contents,
            pos: 0,
            line: 1,
            col: 1,
            delimiter: DEFAULT_DELIMITER.to_string(),
            default_database: String::new(),
            statements: Vec::new(),
            start: 0,
            start_line: 1,
            start_col: 1,
            has_content: false,
        }
    }

    fn run(mut self) -> Result<Vec<Statement>, ParseError> {
        let mut state = State::Default;

        while self.pos < self.contents.len() {
            match state {
                State::Default => {
                    if !self.has_content && self.at_keyword("DELIMITER") {
                        self.consume_delimiter_command()?;
                        continue;
                    }
                    if self.has_content && self.rest().starts_with(self.delimiter.as_str()) {
                        self.advance_str_len(self.delimiter.len());
                        self.consume_trailing_whitespace();
                        self.finish_statement();
                        continue;
                    }

                    let ch = self.peek();
                    if ch == '\'' {
                        state = State::SingleQuote;
                        self.note_content();
                    } else if ch == '"' {
                        state = State::DoubleQuote;
                        self.note_content();
                    } else if ch == '`' {
                        state = State::Backtick;
                        self.note_content();
                    } else if ch == '#' {
                        state = State::LineComment;
                    } else if self.rest().starts_with("/*") {
                        state = State::BlockComment;
                        self.advance();
                    } else if self.at_line_comment_dashes() {
                        state = State::LineComment;
                        self.advance();
                    } else if !ch.is_whitespace() {
                        self.note_content();
                    }
                    self.advance();
                }
                State::LineComment => {
                    if self.peek() == '\n' {
                        state = State::Default;
                    }
                    self.advance();
                }
                State::BlockComment => {
                    if self.rest().starts_with("*/") {
                        self.advance();
                        state = State::Default;
                    }
                    self.advance();
                }
                State::SingleQuote | State::DoubleQuote | State::Backtick => {
                    let quote = match state {
                        State::SingleQuote => '\'',
                        State::DoubleQuote => '"',
                        _ => '`',
                    };
                    let ch = self.peek();
                    if ch == '\\' && quote != '`' && self.rest().len() > 1 {
                        self.advance();
                    } else if ch == quote {
                        if self.rest()[ch.len_utf8()..].starts_with(quote) {
                            // doubled quote stays inside the literal
                            self.advance();
                        } else {
                            state = State::Default;
                        }
                    }
                    self.advance();
                }
            }
        }

        match state {
            State::Default | State::LineComment => {}
            State::BlockComment => {
                return Err(ParseError::UnterminatedComment {
                    file: self.path.to_path_buf(),
                    line: self.start_line,
                    column: self.start_col,
                });
            }
            State::SingleQuote | State::DoubleQuote | State::Backtick => {
                return Err(ParseError::UnterminatedQuote {
                    file: self.path.to_path_buf(),
                    line: self.start_line,
                    column: self.start_col,
                });
            }
        }

        if self.start < self.contents.len() {
            self.finish_statement();
        }
        Ok(self.statements)
    }

    fn rest(&self) -> &str {
        &self.contents[self.pos..]
    }

    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or('\0')
    }

    fn advance(&mut self) {
        let Some(ch) = self.rest().chars().next() else {
            return;
        };
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn advance_str_len(&mut self, bytes: usize) {
        let end = self.pos + bytes;
        while self.pos < end {
            self.advance();
        }
    }

    fn note_content(&mut self) {
        self.has_content = true;
    }

    /// `--` starts a comment only when followed by whitespace or EOF.
    fn at_line_comment_dashes(&self) -> bool {
        let rest = self.rest();
        rest.starts_with("--")
            && rest[2..]
                .chars()
                .next()
                .is_none_or(|ch| ch.is_whitespace())
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        head.eq_ignore_ascii_case(keyword)
            && rest[keyword.len()..]
                .chars()
                .next()
                .is_none_or(|ch| ch.is_whitespace())
    }

    /// `DELIMITER` is a client command, not SQL: it is terminated by the
    /// end of its line and its argument may be a bareword or quoted string
    /// of any length.
    fn consume_delimiter_command(&mut self) -> Result<(), ParseError> {
        let line_end = self.rest().find('\n').map(|idx| self.pos + idx + 1);
        let command_end = line_end.unwrap_or(self.contents.len());
        let command_text = &self.contents[self.pos..command_end];

        let arg = command_text["DELIMITER".len()..].trim();
        let new_delimiter = parse_delimiter_argument(arg).ok_or_else(|| {
            ParseError::MalformedDelimiter {
                file: self.path.to_path_buf(),
                line: self.line,
                column: self.col,
            }
        })?;

        self.advance_str_len(command_end - self.pos);
        self.delimiter = new_delimiter;
        self.note_content();
        self.push_statement(StatementType::Command, None, String::new(), String::new());
        Ok(())
    }

    fn consume_trailing_whitespace(&mut self) {
        // spaces and tabs after the delimiter, plus one newline, belong to
        // the statement that just ended
        while matches!(self.peek(), ' ' | '\t' | '\r') && self.pos < self.contents.len() {
            self.advance();
        }
        if self.peek() == '\n' {
            self.advance();
        }
    }

    fn finish_statement(&mut self) {
        let text = &self.contents[self.start..self.pos];
        if text.is_empty() {
            return;
        }

        let (statement_type, object_type, object_qualifier, object_name) = classify(text);
        if statement_type == StatementType::Command
            && let Some(database) = parse_use_database(text)
        {
            self.push_statement(statement_type, object_type, object_qualifier, object_name);
            self.default_database = database;
            return;
        }
        self.push_statement(statement_type, object_type, object_qualifier, object_name);
    }

    fn push_statement(
        &mut self,
        statement_type: StatementType,
        object_type: Option<ObjectType>,
        object_qualifier: String,
        object_name: String,
    ) {
        let text = self.contents[self.start..self.pos].to_string();
        self.statements.push(Statement {
            file: self.path.to_path_buf(),
            line_no: self.start_line,
            char_no: self.start_col,
            default_database: self.default_database.clone(),
            text,
            statement_type,
            object_type,
            object_qualifier,
            object_name,
            delimiter: self.delimiter.clone(),
            removed: false,
        });
        self.start = self.pos;
        self.start_line = self.line;
        self.start_col = self.col;
        self.has_content = false;
    }
}

fn parse_delimiter_argument(arg: &str) -> Option<String> {
    if arg.is_empty() {
        return None;
    }
    let first = arg.chars().next()?;
    if first == '\'' || first == '"' {
        let inner = &arg[first.len_utf8()..];
        let close = inner.find(first)?;
        let value = &inner[..close];
        return (!value.is_empty()).then(|| value.to_string());
    }
    Some(arg.split_whitespace().next()?.to_string())
}

/// Determines a statement's type and CREATE target from its leading
/// tokens, skipping comments.
fn classify(text: &str) -> (StatementType, Option<ObjectType>, String, String) {
    let mut tokens = TokenIter::new(text);
    let Some(first) = tokens.next() else {
        return (StatementType::Noop, None, String::new(), String::new());
    };

    if first.eq_ignore_ascii_case("USE") {
        return (StatementType::Command, None, String::new(), String::new());
    }
    if first.eq_ignore_ascii_case("DELIMITER") {
        return (StatementType::Command, None, String::new(), String::new());
    }
    if !first.eq_ignore_ascii_case("CREATE") {
        return (StatementType::Unknown, None, String::new(), String::new());
    }

    let mut token = tokens.next();
    // skip DEFINER=... between CREATE and the object keyword
    loop {
        let skip = token.as_deref().is_some_and(|current| {
            current.eq_ignore_ascii_case("DEFINER")
                || current.starts_with('=')
                || current.contains('@')
                || current.to_ascii_uppercase().starts_with("DEFINER=")
        });
        if skip {
            token = tokens.next();
        } else {
            break;
        }
    }

    let object_type = match token.as_deref() {
        Some(keyword) if keyword.eq_ignore_ascii_case("TABLE") => ObjectType::Table,
        Some(keyword) if keyword.eq_ignore_ascii_case("PROCEDURE") => ObjectType::Procedure,
        Some(keyword) if keyword.eq_ignore_ascii_case("FUNCTION") => ObjectType::Function,
        _ => return (StatementType::Unknown, None, String::new(), String::new()),
    };

    // optional IF NOT EXISTS
    let mut name_token = tokens.next();
    if name_token
        .as_deref()
        .is_some_and(|token| token.eq_ignore_ascii_case("IF"))
    {
        tokens.next(); // NOT
        tokens.next(); // EXISTS
        name_token = tokens.next();
    }

    let Some(name_token) = name_token else {
        return (StatementType::Unknown, None, String::new(), String::new());
    };
    let (qualifier, name) = split_object_name(&name_token);
    if name.is_empty() {
        return (StatementType::Unknown, None, String::new(), String::new());
    }

    (StatementType::Create, Some(object_type), qualifier, name)
}

fn parse_use_database(text: &str) -> Option<String> {
    let mut tokens = TokenIter::new(text);
    let first = tokens.next()?;
    if !first.eq_ignore_ascii_case("USE") {
        return None;
    }
    let database = tokens.next()?;
    Some(unquote_ident(database.trim_end_matches(';')))
}

fn split_object_name(token: &str) -> (String, String) {
    // `db`.`tbl`, db.tbl, or bare name; a dot inside backticks is part of
    // the identifier
    let mut in_backtick = false;
    for (idx, ch) in token.char_indices() {
        match ch {
            '`' => in_backtick = !in_backtick,
            '.' if !in_backtick => {
                let qualifier = unquote_ident(&token[..idx]);
                let name = unquote_ident(&token[idx + 1..]);
                return (qualifier, name);
            }
            _ => {}
        }
    }
    (String::new(), unquote_ident(token))
}

fn unquote_ident(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('`') && trimmed.ends_with('`') {
        trimmed[1..trimmed.len() - 1].replace("``", "`")
    } else {
        trimmed.to_string()
    }
}

/// Iterator over significant tokens (words, quoted identifiers) at the
/// head of a statement, skipping whitespace and comments. Quoted
/// identifiers are returned with their backticks intact; a trailing
/// delimiter character is left attached for the caller to strip.
struct TokenIter<'a> {
    rest: &'a str,
}

impl<'a> TokenIter<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl Iterator for TokenIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            self.rest = self.rest.trim_start();
            if self.rest.starts_with("/*") {
                let close = self.rest.find("*/")?;
                self.rest = &self.rest[close + 2..];
            } else if self.rest.starts_with('#')
                || (self.rest.starts_with("--")
                    && self.rest[2..].chars().next().is_none_or(|ch| ch.is_whitespace()))
            {
                let newline = self.rest.find('\n')?;
                self.rest = &self.rest[newline + 1..];
            } else {
                break;
            }
        }
        if self.rest.is_empty() {
            return None;
        }

        let mut end = 0;
        let mut in_backtick = false;
        for (idx, ch) in self.rest.char_indices() {
            if ch == '`' {
                in_backtick = !in_backtick;
                end = idx + ch.len_utf8();
            } else if !in_backtick && (ch.is_whitespace() || ch == '(') {
                break;
            } else {
                end = idx + ch.len_utf8();
            }
        }
        if end == 0 {
            return None;
        }
        let token = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(token)
    }
}
