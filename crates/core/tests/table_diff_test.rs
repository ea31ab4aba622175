use driftql_core::{
    Column, ColumnPosition, Danger, DiffConfig, ForeignKey, Index, IndexPart, Table,
    TableAlterClause, diff_tables,
};

fn table_with_columns(names_and_types: &[(&str, &str)]) -> Table {
    let mut table = Table::named("widgets");
    table.columns = names_and_types
        .iter()
        .map(|(name, type_in_db)| Column::new(*name, *type_in_db))
        .collect();
    table
}

fn clauses(from: &Table, to: &Table, config: &DiffConfig) -> Vec<TableAlterClause> {
    diff_tables(from, to, config).expect("both tables are supported")
}

#[test]
fn identical_tables_diff_to_nothing() {
    let table = table_with_columns(&[("a", "int"), ("b", "varchar(10)")]);
    assert!(clauses(&table, &table, &DiffConfig::default()).is_empty());
}

#[test]
fn column_drops_come_out_in_reverse_definition_order() {
    let from = table_with_columns(&[("a", "int"), ("b", "int"), ("c", "int"), ("d", "int")]);
    let to = table_with_columns(&[("a", "int"), ("d", "int")]);

    let dropped: Vec<String> = clauses(&from, &to, &DiffConfig::default())
        .into_iter()
        .filter_map(|clause| match clause {
            TableAlterClause::DropColumn { column } => Some(column.name),
            _ => None,
        })
        .collect();
    assert_eq!(dropped, vec!["c".to_string(), "b".to_string()]);
}

#[test]
fn added_columns_carry_positions_matching_the_target() {
    let from = table_with_columns(&[("a", "int"), ("z", "int")]);
    let to = table_with_columns(&[
        ("first", "int"),
        ("a", "int"),
        ("mid", "int"),
        ("z", "int"),
        ("tail", "int"),
    ]);

    let adds: Vec<(String, Option<ColumnPosition>)> = clauses(&from, &to, &DiffConfig::default())
        .into_iter()
        .filter_map(|clause| match clause {
            TableAlterClause::AddColumn { column, position } => Some((column.name, position)),
            _ => None,
        })
        .collect();

    assert_eq!(adds.len(), 3);
    assert_eq!(adds[0], ("first".to_string(), Some(ColumnPosition::First)));
    assert_eq!(
        adds[1],
        (
            "mid".to_string(),
            Some(ColumnPosition::After("a".to_string()))
        )
    );
    // trailing additions need no position clause
    assert_eq!(adds[2], ("tail".to_string(), None));
}

#[test]
fn type_changes_become_modify_clauses_with_danger_grading() {
    let from = table_with_columns(&[("a", "varchar(30)"), ("b", "varchar(30)"), ("c", "int")]);
    let to = table_with_columns(&[("a", "varchar(45)"), ("b", "varchar(20)"), ("c", "int")]);

    let modifies: Vec<TableAlterClause> = clauses(&from, &to, &DiffConfig::default())
        .into_iter()
        .filter(|clause| matches!(clause, TableAlterClause::ModifyColumn { .. }))
        .collect();
    assert_eq!(modifies.len(), 2);
    assert_eq!(modifies[0].danger(), Danger::Maybe, "widening varchar");
    assert_eq!(modifies[1].danger(), Danger::Unsafe, "narrowing varchar");
}

#[test]
fn moved_columns_are_modified_with_explicit_positions() {
    let from = table_with_columns(&[("a", "int"), ("b", "int"), ("c", "int")]);
    let to = table_with_columns(&[("b", "int"), ("a", "int"), ("c", "int")]);

    let all = clauses(&from, &to, &DiffConfig::default());
    assert_eq!(all.len(), 1, "only the out-of-order column moves: {all:?}");
    match &all[0] {
        TableAlterClause::ModifyColumn { new, position, .. } => {
            assert_eq!(new.name, "a");
            assert_eq!(position, &Some(ColumnPosition::After("b".to_string())));
        }
        other => panic!("expected a ModifyColumn, got {other:?}"),
    }
}

fn sample_fk(name: &str) -> ForeignKey {
    ForeignKey {
        name: name.to_string(),
        columns: vec!["owner_id".to_string()],
        referenced_schema: String::new(),
        referenced_table: "owners".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: String::new(),
        delete_rule: String::new(),
    }
}

#[test]
fn foreign_key_rename_is_cosmetic_unless_exact_match() {
    let mut from = table_with_columns(&[("owner_id", "bigint")]);
    from.foreign_keys = vec![sample_fk("fk_old")];
    let mut to = table_with_columns(&[("owner_id", "bigint")]);
    to.foreign_keys = vec![sample_fk("fk_new")];

    assert!(clauses(&from, &to, &DiffConfig::default()).is_empty());

    let exact = DiffConfig {
        exact_match: true,
        ..DiffConfig::default()
    };
    let all = clauses(&from, &to, &exact);
    assert!(matches!(
        all.first(),
        Some(TableAlterClause::DropForeignKey { foreign_key, .. }) if foreign_key.name == "fk_old"
    ));
    assert!(matches!(
        all.last(),
        Some(TableAlterClause::AddForeignKey { foreign_key }) if foreign_key.name == "fk_new"
    ));
}

#[test]
fn changed_foreign_key_is_dropped_first_and_added_last() {
    let mut from = table_with_columns(&[("owner_id", "bigint"), ("extra", "int")]);
    from.foreign_keys = vec![sample_fk("owner_fk")];
    let mut to = table_with_columns(&[("owner_id", "bigint")]);
    let mut changed = sample_fk("owner_fk");
    changed.delete_rule = "CASCADE".to_string();
    to.foreign_keys = vec![changed];

    let all = clauses(&from, &to, &DiffConfig::default());
    assert!(matches!(
        all.first(),
        Some(TableAlterClause::DropForeignKey { .. })
    ));
    assert!(matches!(
        all.last(),
        Some(TableAlterClause::AddForeignKey { .. })
    ));
    assert!(
        all.iter()
            .any(|clause| matches!(clause, TableAlterClause::DropColumn { .. })),
        "the column drop sits between the FK drop and add"
    );
}

#[test]
fn changed_index_is_replaced_not_silently_kept() {
    let mut from = table_with_columns(&[("a", "int"), ("b", "int")]);
    from.secondary_indexes = vec![Index::new(
        "idx",
        vec![IndexPart::column("a")],
        false,
        false,
    )];
    let mut to = from.clone();
    to.secondary_indexes = vec![Index::new(
        "idx",
        vec![IndexPart::column("a"), IndexPart::column("b")],
        false,
        false,
    )];

    let all = clauses(&from, &to, &DiffConfig::default());
    assert_eq!(all.len(), 2);
    assert!(matches!(
        &all[0],
        TableAlterClause::DropIndex { index, reorder_only: false } if index.name == "idx"
    ));
    assert!(matches!(
        &all[1],
        TableAlterClause::AddIndex { index, reorder_only: false } if index.parts.len() == 2
    ));
}

#[test]
fn index_order_drift_yields_reorder_only_clauses() {
    let idx_a = Index::new("idx_a", vec![IndexPart::column("a")], false, false);
    let idx_b = Index::new("idx_b", vec![IndexPart::column("b")], false, false);

    let mut from = table_with_columns(&[("a", "int"), ("b", "int")]);
    from.secondary_indexes = vec![idx_a.clone(), idx_b.clone()];
    let mut to = from.clone();
    to.secondary_indexes = vec![idx_b, idx_a];

    let all = clauses(&from, &to, &DiffConfig::default());
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|clause| matches!(
        clause,
        TableAlterClause::DropIndex { reorder_only: true, .. }
            | TableAlterClause::AddIndex { reorder_only: true, .. }
    )));
}

#[test]
fn unsupported_tables_refuse_to_alter() {
    let mut from = table_with_columns(&[("a", "int")]);
    from.unsupported_ddl = true;
    let to = table_with_columns(&[("a", "bigint")]);
    assert!(diff_tables(&from, &to, &DiffConfig::default()).is_err());
}

#[test]
fn partitioning_policy_controls_the_partition_clause() {
    use driftql_core::Partitioning;

    let mut from = table_with_columns(&[("a", "int")]);
    from.partitioning = Some("/*!50100 PARTITION BY KEY (`a`)\nPARTITIONS 2 */".to_string());
    let to = table_with_columns(&[("a", "int")]);

    assert!(clauses(&from, &to, &DiffConfig::default()).is_empty(), "keep erases the difference");

    let modify = DiffConfig {
        partitioning: Partitioning::Modify,
        ..DiffConfig::default()
    };
    let all = clauses(&from, &to, &modify);
    assert!(matches!(
        all.as_slice(),
        [TableAlterClause::ChangePartitioning { new: None, .. }]
    ));

    let remove = DiffConfig {
        partitioning: Partitioning::Remove,
        ..DiffConfig::default()
    };
    let mut to_partitioned = to.clone();
    to_partitioned.partitioning = from.partitioning.clone();
    let all = clauses(&from, &to_partitioned, &remove);
    assert!(matches!(
        all.as_slice(),
        [TableAlterClause::ChangePartitioning { new: None, .. }]
    ));
}
