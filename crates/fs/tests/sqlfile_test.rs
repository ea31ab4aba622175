use std::fs;

use tempfile::tempdir;

use driftql_fs::{MAX_SQL_FILE_SIZE, ParseError, TokenizedFile};

#[test]
fn oversized_files_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("big.sql");
    let padding = "-- x\n".repeat((MAX_SQL_FILE_SIZE as usize / 5) + 1);
    fs::write(&path, format!("{padding}CREATE TABLE t (id int);\n")).expect("write");

    let error = TokenizedFile::read(&path).expect_err("file is over the cap");
    assert!(matches!(error, ParseError::FileTooLarge { .. }));
}

#[test]
fn create_select_and_create_like_are_rejected() {
    let dir = tempdir().expect("tempdir");

    let path = dir.path().join("copy.sql");
    fs::write(&path, "CREATE TABLE copy LIKE source;\n").expect("write");
    let error = TokenizedFile::read(&path).expect_err("LIKE form");
    assert!(matches!(error, ParseError::ForbiddenCreateForm { form, .. } if form == "LIKE"));

    let path = dir.path().join("snap.sql");
    fs::write(&path, "CREATE TABLE snap (id int) SELECT id FROM source;\n").expect("write");
    let error = TokenizedFile::read(&path).expect_err("SELECT form");
    assert!(matches!(error, ParseError::ForbiddenCreateForm { form, .. } if form == "SELECT"));

    let path = dir.path().join("plain.sql");
    fs::write(&path, "CREATE TABLE plain (liked int, selected int);\n").expect("write");
    TokenizedFile::read(&path).expect("ordinary column names are fine");
}

#[test]
fn files_without_a_create_statement_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.sql");
    fs::write(&path, "-- nothing here\nUSE app;\n").expect("write");
    let error = TokenizedFile::read(&path).expect_err("no create");
    assert!(matches!(error, ParseError::NoCreateStatement { .. }));
}

#[test]
fn rewrite_emits_remaining_statements_verbatim() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("pair.sql");
    let contents = "-- keep me\nCREATE TABLE a (x int);\nCREATE TABLE b (y int);\n";
    fs::write(&path, contents).expect("write");

    let mut file = TokenizedFile::read(&path).expect("parse");
    file.statements
        .iter_mut()
        .find(|statement| statement.object_name == "b")
        .expect("statement for b")
        .remove();
    file.rewrite().expect("rewrite");

    let rewritten = fs::read_to_string(&path).expect("read back");
    assert_eq!(rewritten, "-- keep me\nCREATE TABLE a (x int);\n");
}

#[test]
fn removing_every_create_deletes_the_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("gone.sql");
    fs::write(&path, "CREATE TABLE a (x int);\n-- trailing\n").expect("write");

    let mut file = TokenizedFile::read(&path).expect("parse");
    for statement in &mut file.statements {
        statement.remove();
    }
    file.rewrite().expect("rewrite deletes");
    assert!(!path.exists());
}

#[test]
fn tokenize_rewrite_round_trip_is_byte_identical() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("round.sql");
    let contents =
        "USE app;\nDELIMITER //\nCREATE PROCEDURE p()\nBEGIN\n  SELECT 1;\nEND//\nDELIMITER ;\n";
    fs::write(&path, contents).expect("write");

    let file = TokenizedFile::read(&path).expect("parse");
    file.rewrite().expect("rewrite");
    assert_eq!(fs::read_to_string(&path).expect("read back"), contents);
}
