use driftql_core::{
    Column, ColumnDefault, Flavor, ForeignKey, Generation, Index, IndexPart, Table, Vendor,
};
use driftql_mysql::apply_introspection_fixups;

fn mysql55() -> Flavor {
    Flavor::new(Vendor::MySql, 5, 5, 60)
}

fn base_table() -> Table {
    let mut id = Column::new("id", "int(11)");
    id.nullable = false;
    id.default = ColumnDefault::None;
    let mut a = Column::new("a", "int(11)");
    a.nullable = false;
    a.default = ColumnDefault::None;
    let mut b = Column::new("b", "int(11)");
    b.nullable = false;
    b.default = ColumnDefault::None;

    let mut table = Table::named("fixture");
    table.columns = vec![id, a, b];
    table.primary_key = Some(Index::primary(vec![IndexPart::column("id")]));
    table
}

#[test]
fn alphabetized_indexes_are_reordered_to_match_the_statement() {
    // the server created zz_idx before aa_idx; information_schema reports
    // them alphabetically
    let mut table = base_table();
    table.secondary_indexes = vec![
        Index::new("aa_idx", vec![IndexPart::column("b")], false, false),
        Index::new("zz_idx", vec![IndexPart::column("a")], false, false),
    ];

    let mut reference = table.clone();
    reference.secondary_indexes.reverse();
    let create_statement = reference.generated_create_statement(&mysql55());
    table.create_statement = create_statement.clone();

    apply_introspection_fixups(&mut table, &mysql55());

    assert!(table.supported(), "diff: {:?}", table.unsupported_diff);
    assert_eq!(table.secondary_indexes[0].name, "zz_idx");
    assert_eq!(table.generated_create_statement(&mysql55()), create_statement);
}

#[test]
fn foreign_key_creation_order_is_recovered_on_non_sorting_flavors() {
    let fk = |name: &str, column: &str| ForeignKey {
        name: name.to_string(),
        columns: vec![column.to_string()],
        referenced_schema: String::new(),
        referenced_table: "parent".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: String::new(),
        delete_rule: String::new(),
    };

    // mysql 5.5 does not sort foreign keys
    let flavor = Flavor::new(Vendor::MySql, 5, 5, 62);
    let mut table = base_table();
    table.foreign_keys = vec![fk("aa_fk", "a"), fk("zz_fk", "b")];

    let mut reference = table.clone();
    reference.foreign_keys.reverse();
    let create_statement = reference.generated_create_statement(&flavor);
    table.create_statement = create_statement.clone();

    apply_introspection_fixups(&mut table, &flavor);

    assert!(table.supported(), "diff: {:?}", table.unsupported_diff);
    assert_eq!(table.foreign_keys[0].name, "zz_fk");
}

#[test]
fn create_options_adopt_the_statement_spelling_and_order() {
    let mut table = base_table();
    // information_schema spelling: lowercase values, arbitrary order
    table.create_options = "STATS_PERSISTENT=1 ROW_FORMAT=DYNAMIC".to_string();

    let mut reference = table.clone();
    reference.create_options = "ROW_FORMAT=DYNAMIC STATS_PERSISTENT=1".to_string();
    let create_statement = reference.generated_create_statement(&mysql55());
    table.create_statement = create_statement.clone();

    apply_introspection_fixups(&mut table, &mysql55());

    assert!(table.supported(), "diff: {:?}", table.unsupported_diff);
    assert_eq!(table.create_options, "ROW_FORMAT=DYNAMIC STATS_PERSISTENT=1");
}

#[test]
fn unrecognized_create_options_keep_their_relative_order_at_the_end() {
    let mut table = base_table();
    table.create_options = "MYSTERY_OPT=2 ROW_FORMAT=COMPACT".to_string();
    table.create_statement = String::new();

    apply_introspection_fixups(&mut table, &mysql55());
    // nothing in the statement to match against, so the observed relative
    // order survives untouched
    assert_eq!(table.create_options, "MYSTERY_OPT=2 ROW_FORMAT=COMPACT");
}

#[test]
fn generation_expressions_adopt_the_statement_escaping() {
    let flavor = Flavor::new(Vendor::MySql, 5, 7, 30);
    let mut table = base_table();
    let mut generated_column = Column::new("doubled", "int(11)");
    generated_column.generation = Some(Generation {
        // information_schema escaping differs from the statement's
        expr: "(`a` * 2)".to_string(),
        stored: false,
    });
    generated_column.default = ColumnDefault::None;
    table.columns.push(generated_column);

    let mut reference = table.clone();
    reference.columns[3]
        .generation
        .as_mut()
        .expect("generation present")
        .expr = "(`a` * 2)".to_string();
    let create_statement = reference.generated_create_statement(&flavor);
    table.columns[3]
        .generation
        .as_mut()
        .expect("generation present")
        .expr = "(`a`*2)".to_string();
    table.create_statement = create_statement.clone();

    apply_introspection_fixups(&mut table, &flavor);

    assert!(table.supported(), "diff: {:?}", table.unsupported_diff);
    assert_eq!(
        table.columns[3]
            .generation
            .as_ref()
            .expect("generation present")
            .expr,
        "(`a` * 2)"
    );
}

#[test]
fn divergent_tables_are_marked_unsupported_with_diagnostics() {
    let mut table = base_table();
    table.create_statement = "CREATE TABLE `fixture` (\n  something exotic\n)".to_string();

    apply_introspection_fixups(&mut table, &mysql55());

    assert!(!table.supported());
    let diagnostic = table.unsupported_diff.expect("diagnostic diff recorded");
    assert!(diagnostic.contains("generated"));
    assert!(diagnostic.contains("something exotic"));
}
