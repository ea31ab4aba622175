use pretty_assertions::assert_eq;

use driftql_core::{
    Column, ColumnDefault, Flavor, ForeignKey, Index, IndexPart, Table, Vendor,
};

fn mysql57() -> Flavor {
    Flavor::new(Vendor::MySql, 5, 7, 30)
}

fn mysql80() -> Flavor {
    Flavor::new(Vendor::MySql, 8, 0, 21)
}

fn sample_table() -> Table {
    let mut id = Column::new("id", "bigint(20) unsigned");
    id.nullable = false;
    id.auto_increment = true;
    id.default = ColumnDefault::None;

    let mut name = Column::new("name", "varchar(30)");
    name.nullable = false;
    name.default = ColumnDefault::None;
    name.char_set = Some("utf8mb4".to_string());
    name.collation = Some("utf8mb4_general_ci".to_string());

    let email = Column::new("email", "varchar(100)");

    let mut table = Table::named("users");
    table.columns = vec![id, name, email];
    table.primary_key = Some(Index::primary(vec![IndexPart::column("id")]));
    table.secondary_indexes = vec![Index::new(
        "name_idx",
        vec![IndexPart::column("name")],
        false,
        true,
    )];
    table
}

#[test]
fn canonical_create_for_pre_data_dictionary_mysql() {
    let expected = "CREATE TABLE `users` (\n  \
         `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,\n  \
         `name` varchar(30) NOT NULL,\n  \
         `email` varchar(100) DEFAULT NULL,\n  \
         PRIMARY KEY (`id`),\n  \
         UNIQUE KEY `name_idx` (`name`)\n\
         ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";
    assert_eq!(sample_table().generated_create_statement(&mysql57()), expected);
}

#[test]
fn display_widths_are_dropped_but_boolean_convention_survives() {
    let mut table = sample_table();
    let mut flag = Column::new("is_active", "tinyint(1)");
    flag.nullable = false;
    flag.default = ColumnDefault::Literal {
        value: "1".to_string(),
        quoted: true,
    };
    table.columns.push(flag);

    let create = table.generated_create_statement(&mysql80());
    assert!(create.contains("`id` bigint unsigned NOT NULL AUTO_INCREMENT"));
    assert!(create.contains("`is_active` tinyint(1) NOT NULL DEFAULT '1'"));
}

#[test]
fn utf8mb4_collation_is_spelled_out_when_flavor_default_changed() {
    let table = sample_table();
    let create57 = table.generated_create_statement(&mysql57());
    let create80 = table.generated_create_statement(&mysql80());

    assert!(create57.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    assert!(create80.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_general_ci"));
}

#[test]
fn auto_increment_counter_appears_only_past_one() {
    let mut table = sample_table();
    table.next_auto_increment = 1;
    assert!(
        !table
            .generated_create_statement(&mysql57())
            .contains("AUTO_INCREMENT=")
    );

    table.next_auto_increment = 42;
    assert!(
        table
            .generated_create_statement(&mysql57())
            .contains(") ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4")
    );
}

fn foreign_key(name: &str) -> ForeignKey {
    ForeignKey {
        name: name.to_string(),
        columns: vec!["owner_id".to_string()],
        referenced_schema: String::new(),
        referenced_table: "owners".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: String::new(),
        delete_rule: "CASCADE".to_string(),
    }
}

#[test]
fn foreign_keys_sort_lexicographically_only_on_sorting_flavors() {
    let mut table = sample_table();
    table.columns.push(Column::new("owner_id", "bigint(20) unsigned"));
    table.foreign_keys = vec![foreign_key("zz_fk"), foreign_key("aa_fk")];

    let create57 = table.generated_create_statement(&mysql57());
    let zz = create57.find("`zz_fk`").expect("zz_fk present");
    let aa = create57.find("`aa_fk`").expect("aa_fk present");
    assert!(aa < zz, "5.7 sorts foreign keys by name");

    let mysql8019 = Flavor::new(Vendor::MySql, 8, 0, 19);
    let create80 = table.generated_create_statement(&mysql8019);
    let zz = create80.find("`zz_fk`").expect("zz_fk present");
    let aa = create80.find("`aa_fk`").expect("aa_fk present");
    assert!(zz < aa, "8.0.19+ keeps creation order");
}

#[test]
fn restrict_rules_are_elided_like_the_server_does() {
    let mut fk = foreign_key("owner_fk");
    fk.delete_rule = String::new();
    fk.update_rule = "SET NULL".to_string();
    assert_eq!(
        fk.definition(),
        "CONSTRAINT `owner_fk` FOREIGN KEY (`owner_id`) REFERENCES `owners` (`id`) ON UPDATE SET NULL"
    );

    let fk = foreign_key("owner_fk");
    assert_eq!(
        fk.definition(),
        "CONSTRAINT `owner_fk` FOREIGN KEY (`owner_id`) REFERENCES `owners` (`id`) ON DELETE CASCADE"
    );
}

#[test]
fn comments_and_string_values_are_escaped() {
    let mut table = sample_table();
    table.comment = "it's \"quoted\"".to_string();
    let create = table.generated_create_statement(&mysql57());
    assert!(create.ends_with("COMMENT='it''s \"quoted\"'"));
}

#[test]
fn partitioning_clause_is_appended_verbatim() {
    let mut table = sample_table();
    table.partitioning =
        Some("/*!50100 PARTITION BY KEY (`id`)\nPARTITIONS 4 */".to_string());
    let create = table.generated_create_statement(&mysql57());
    assert!(create.ends_with(
        ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4\n/*!50100 PARTITION BY KEY (`id`)\nPARTITIONS 4 */"
    ));
}

#[test]
#[should_panic(expected = "primary key index must be unique")]
fn non_unique_primary_key_is_an_introspection_bug() {
    let _ = Index::new("PRIMARY", vec![IndexPart::column("id")], true, false);
}
