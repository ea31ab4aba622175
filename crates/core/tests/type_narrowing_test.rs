use driftql_core::type_narrows;

#[test]
fn widening_within_a_family_is_safe() {
    assert!(!type_narrows("int", "bigint"));
    assert!(!type_narrows("tinyint", "int"));
    assert!(!type_narrows("float", "double"));
    assert!(!type_narrows("text", "longtext"));
    assert!(!type_narrows("blob", "mediumblob"));
    assert!(!type_narrows("varchar(30)", "varchar(45)"));
    assert!(!type_narrows("char(8)", "char(8)"));
    assert!(!type_narrows("decimal(10,2)", "decimal(12,2)"));
}

#[test]
fn shrinking_within_a_family_is_narrowing() {
    assert!(type_narrows("bigint", "int"));
    assert!(type_narrows("longtext", "text"));
    assert!(type_narrows("varchar(45)", "varchar(30)"));
    assert!(type_narrows("decimal(10,2)", "decimal(8,2)"));
    assert!(type_narrows("decimal(10,4)", "decimal(10,2)"));
    assert!(type_narrows("double", "float"));
}

#[test]
fn sign_flips_are_narrowing_both_ways() {
    assert!(type_narrows("int unsigned", "int"));
    assert!(type_narrows("int", "int unsigned"));
}

#[test]
fn display_width_changes_on_integers_are_cosmetic() {
    assert!(!type_narrows("int(11)", "int"));
    assert!(!type_narrows("int(10)", "int(5)"));
    assert!(!type_narrows("tinyint(1)", "tinyint(4)"));
}

#[test]
fn cross_family_conversions_are_narrowing() {
    assert!(type_narrows("int", "varchar(10)"));
    assert!(type_narrows("varchar(10)", "int"));
    assert!(type_narrows("datetime", "date"));
}

#[test]
fn enum_members_may_only_be_appended() {
    assert!(!type_narrows("enum('a','b')", "enum('a','b','c')"));
    assert!(type_narrows("enum('a','b','c')", "enum('a','b')"));
    assert!(type_narrows("enum('a','b')", "enum('b','a')"));
    assert!(!type_narrows("set('x','y')", "set('x','y','z')"));
}
