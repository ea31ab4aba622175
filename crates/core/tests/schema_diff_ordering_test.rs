use driftql_core::{
    Column, DiffConfig, DiffType, ForeignKey, ObjectDiff, Schema, Table, TableAlterClause,
    diff_schemas,
};

fn simple_table(name: &str) -> Table {
    let mut table = Table::named(name);
    table.columns = vec![Column::new("id", "bigint")];
    table
}

fn fk_to(name: &str, target: &str) -> ForeignKey {
    ForeignKey {
        name: name.to_string(),
        columns: vec!["id".to_string()],
        referenced_schema: String::new(),
        referenced_table: target.to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: String::new(),
        delete_rule: String::new(),
    }
}

fn schema_of(tables: Vec<Table>) -> Schema {
    let mut schema = Schema::named("app");
    schema.tables = tables;
    schema
}

#[test]
fn creates_precede_alters_which_precede_drops() {
    let mut altered_from = simple_table("kept");
    altered_from.comment = "old".to_string();
    let mut altered_to = simple_table("kept");
    altered_to.comment = "new".to_string();

    let from = schema_of(vec![simple_table("doomed"), altered_from]);
    let to = schema_of(vec![altered_to, simple_table("fresh")]);

    let diff = diff_schemas(&from, &to, &DiffConfig::default());
    let kinds: Vec<DiffType> = diff.object_diffs.iter().map(ObjectDiff::diff_type).collect();
    assert_eq!(kinds, vec![DiffType::Create, DiffType::Alter, DiffType::Drop]);
}

#[test]
fn diff_of_a_schema_with_itself_is_empty() {
    let schema = schema_of(vec![simple_table("a"), simple_table("b")]);
    assert!(diff_schemas(&schema, &schema, &DiffConfig::default()).is_empty());
}

#[test]
fn fk_target_alters_run_before_their_referrers() {
    // `child` gains an FK onto `parent`; both receive unrelated alters
    let mut parent_from = simple_table("parent");
    parent_from.comment = "old".to_string();
    let mut parent_to = simple_table("parent");
    parent_to.comment = "new".to_string();

    let child_from = simple_table("child");
    let mut child_to = simple_table("child");
    child_to.foreign_keys = vec![fk_to("child_parent_fk", "parent")];

    let from = schema_of(vec![child_from, parent_from]);
    let to = schema_of(vec![child_to, parent_to]);

    let diff = diff_schemas(&from, &to, &DiffConfig::default());
    let names: Vec<String> = diff
        .object_diffs
        .iter()
        .map(|object_diff| object_diff.key().name)
        .collect();
    assert_eq!(names, vec!["parent".to_string(), "child".to_string()]);
}

#[test]
fn mutually_referential_fk_adds_split_into_a_second_pass() {
    let a_from = simple_table("a");
    let b_from = simple_table("b");
    let mut a_to = simple_table("a");
    a_to.comment = "changed".to_string();
    a_to.foreign_keys = vec![fk_to("a_b_fk", "b")];
    let mut b_to = simple_table("b");
    b_to.foreign_keys = vec![fk_to("b_a_fk", "a")];

    let from = schema_of(vec![a_from, b_from]);
    let to = schema_of(vec![a_to, b_to]);

    let diff = diff_schemas(&from, &to, &DiffConfig::default());
    let fk_add_only: Vec<&ObjectDiff> = diff
        .object_diffs
        .iter()
        .filter(|object_diff| match object_diff {
            ObjectDiff::AlterTable { clauses, .. } => {
                clauses.len() == 1
                    && matches!(clauses[0], TableAlterClause::AddForeignKey { .. })
            }
            _ => false,
        })
        .collect();
    assert_eq!(fk_add_only.len(), 2, "both cyclic adds run standalone: {diff:?}");

    // the second pass comes after every other object diff
    let first_standalone = diff
        .object_diffs
        .iter()
        .position(|object_diff| match object_diff {
            ObjectDiff::AlterTable { clauses, .. } => {
                clauses.len() == 1
                    && matches!(clauses[0], TableAlterClause::AddForeignKey { .. })
            }
            _ => false,
        })
        .expect("standalone fk add present");
    assert_eq!(first_standalone, diff.object_diffs.len() - 2);

    // the comment change on `a` survives in its original alter
    let comment_alter = diff.object_diffs[..first_standalone]
        .iter()
        .any(|object_diff| match object_diff {
            ObjectDiff::AlterTable { clauses, .. } => clauses
                .iter()
                .any(|clause| matches!(clause, TableAlterClause::ChangeComment { .. })),
            _ => false,
        });
    assert!(comment_alter);
}

#[test]
fn dropped_tables_with_cyclic_fks_get_fk_drop_alters_first() {
    let mut x = simple_table("x");
    x.foreign_keys = vec![fk_to("x_y_fk", "y")];
    let mut y = simple_table("y");
    y.foreign_keys = vec![fk_to("y_x_fk", "x")];

    let from = schema_of(vec![x, y]);
    let to = schema_of(Vec::new());

    let diff = diff_schemas(&from, &to, &DiffConfig::default());
    let fk_drop_positions: Vec<usize> = diff
        .object_diffs
        .iter()
        .enumerate()
        .filter_map(|(idx, object_diff)| match object_diff {
            ObjectDiff::AlterTable { clauses, .. }
                if clauses
                    .iter()
                    .all(|clause| matches!(clause, TableAlterClause::DropForeignKey { .. })) =>
            {
                Some(idx)
            }
            _ => None,
        })
        .collect();
    let drop_positions: Vec<usize> = diff
        .object_diffs
        .iter()
        .enumerate()
        .filter_map(|(idx, object_diff)| {
            matches!(object_diff, ObjectDiff::DropTable { .. }).then_some(idx)
        })
        .collect();

    assert_eq!(drop_positions.len(), 2);
    assert!(!fk_drop_positions.is_empty());
    assert!(fk_drop_positions.iter().max() < drop_positions.iter().min());
}

#[test]
fn unsupported_tables_are_reported_but_not_altered() {
    let mut from_table = simple_table("odd");
    from_table.unsupported_ddl = true;
    from_table.create_statement = "CREATE TABLE `odd` (weird)".to_string();
    let mut to_table = simple_table("odd");
    to_table.create_statement = "CREATE TABLE `odd` (normal)".to_string();

    let diff = diff_schemas(
        &schema_of(vec![from_table]),
        &schema_of(vec![to_table]),
        &DiffConfig::default(),
    );
    assert!(diff.object_diffs.is_empty());
    assert_eq!(diff.unsupported.len(), 1);
    assert_eq!(diff.unsupported[0].name, "odd");
}

#[test]
fn ignored_tables_never_appear_in_the_diff() {
    let config = DiffConfig {
        ignore_table: Some(regex::Regex::new("^_tmp").expect("valid pattern")),
        ..DiffConfig::default()
    };

    let from = schema_of(vec![simple_table("_tmp_scratch")]);
    let to = schema_of(vec![simple_table("_tmp_other"), simple_table("real")]);

    let diff = diff_schemas(&from, &to, &config);
    let names: Vec<String> = diff
        .object_diffs
        .iter()
        .map(|object_diff| object_diff.key().name)
        .collect();
    assert_eq!(names, vec!["real".to_string()]);
}
