use std::path::Path;

use pretty_assertions::assert_eq;

use driftql_core::ObjectType;
use driftql_fs::{ParseError, StatementType, tokenize};

fn scan(contents: &str) -> Vec<driftql_fs::Statement> {
    tokenize(Path::new("test.sql"), contents).expect("tokenize succeeds")
}

#[test]
fn a_single_create_is_one_statement_with_object_info() {
    let contents = "CREATE TABLE users (\n  id int\n);\n";
    let statements = scan(contents);
    assert_eq!(statements.len(), 1);

    let statement = &statements[0];
    assert_eq!(statement.statement_type, StatementType::Create);
    assert_eq!(statement.object_type, Some(ObjectType::Table));
    assert_eq!(statement.object_name, "users");
    assert_eq!(statement.object_qualifier, "");
    assert_eq!(statement.text, contents);
    assert_eq!((statement.line_no, statement.char_no), (1, 1));
}

#[test]
fn tokenizing_preserves_every_byte() {
    let contents = "-- preamble\nUSE app;\nCREATE TABLE a (x int); \t\nCREATE TABLE b (y int);";
    let statements = scan(contents);
    let rebuilt: String = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, contents);
}

#[test]
fn use_commands_update_the_running_default_database() {
    let statements = scan("CREATE TABLE a (x int);\nUSE `app`;\nCREATE TABLE b (y int);\n");
    assert_eq!(statements[0].default_database, "");
    assert_eq!(statements[1].statement_type, StatementType::Command);
    assert_eq!(statements[2].default_database, "app");
}

#[test]
fn statement_positions_are_one_based_lines_and_columns() {
    let statements = scan("CREATE TABLE a (x int); CREATE TABLE b (y int);\nCREATE TABLE c (z int);\n");
    assert_eq!((statements[0].line_no, statements[0].char_no), (1, 1));
    assert_eq!((statements[1].line_no, statements[1].char_no), (1, 25));
    assert_eq!((statements[2].line_no, statements[2].char_no), (2, 1));
}

#[test]
fn delimiter_commands_gate_statement_boundaries() {
    let contents = "DELIMITER //\nCREATE PROCEDURE p()\nBEGIN\n  SELECT 1;\nEND//\nDELIMITER ;\nCREATE TABLE t (id int);\n";
    let statements = scan(contents);

    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0].statement_type, StatementType::Command);
    assert_eq!(statements[1].statement_type, StatementType::Create);
    assert_eq!(statements[1].object_type, Some(ObjectType::Procedure));
    assert_eq!(statements[1].object_name, "p");
    assert_eq!(statements[1].delimiter, "//");
    assert!(statements[1].text.contains("SELECT 1;"));
    assert_eq!(statements[3].delimiter, ";");

    let rebuilt: String = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, contents);
}

#[test]
fn delimiter_arguments_may_be_quoted_or_multichar() {
    let statements = scan("DELIMITER '$$'\nSELECT 1$$\n");
    assert_eq!(statements[1].delimiter, "$$");
    assert_eq!(statements[1].statement_type, StatementType::Unknown);
}

#[test]
fn quotes_and_comments_hide_delimiters() {
    let contents = "CREATE TABLE t (\n  a varchar(10) DEFAULT ';',\n  b varchar(10) DEFAULT 'it''s',\n  c varchar(10) DEFAULT 'a\\;b' -- trailing; comment\n);\n";
    let statements = scan(contents);
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].statement_type, StatementType::Create);
}

#[test]
fn block_comments_and_version_comments_do_not_split_statements() {
    let contents = "/* leading ; comment */ CREATE TABLE t (\n  id int /*!80023 INVISIBLE */\n);\n";
    let statements = scan(contents);
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].statement_type, StatementType::Create);
    assert_eq!(statements[0].object_name, "t");
}

#[test]
fn qualified_and_if_not_exists_names_parse() {
    let statements = scan("CREATE TABLE IF NOT EXISTS `app`.`users` (id int);\n");
    assert_eq!(statements[0].object_qualifier, "app");
    assert_eq!(statements[0].object_name, "users");

    let statements = scan("CREATE DEFINER=`root`@`localhost` FUNCTION f() RETURNS int RETURN 1;\n");
    assert_eq!(statements[0].object_type, Some(ObjectType::Function));
    assert_eq!(statements[0].object_name, "f");
}

#[test]
fn unrecognized_statements_are_unknown_not_errors() {
    let statements = scan("INSERT INTO t VALUES (1);\nCREATE VIEW v AS SELECT 1;\n");
    assert_eq!(statements[0].statement_type, StatementType::Unknown);
    assert_eq!(statements[1].statement_type, StatementType::Unknown);
}

#[test]
fn trailing_whitespace_and_comments_become_a_noop_statement() {
    let statements = scan("CREATE TABLE t (id int);\n\n-- the end\n");
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[1].statement_type, StatementType::Noop);
}

#[test]
fn unterminated_quote_is_a_parse_error_with_position() {
    let error = tokenize(Path::new("bad.sql"), "CREATE TABLE t (s varchar(10) DEFAULT 'oops;\n")
        .expect_err("unterminated quote");
    assert!(matches!(error, ParseError::UnterminatedQuote { line: 1, .. }));

    let error = tokenize(Path::new("bad.sql"), "CREATE TABLE t (id int); /* never closed")
        .expect_err("unterminated comment");
    assert!(matches!(error, ParseError::UnterminatedComment { .. }));
}

#[test]
fn removed_statements_are_flagged_for_rewrite() {
    let mut statements = scan("CREATE TABLE a (x int);\nCREATE TABLE b (y int);\n");
    statements[0].remove();
    assert!(statements[0].is_removed());
    assert!(!statements[1].is_removed());
}
