use driftql_core::{Flavor, Vendor};

#[test]
fn vendor_and_version_come_from_server_variables() {
    let flavor = Flavor::parse("8.0.28-0ubuntu0.20.04.3", "MySQL Community Server - GPL");
    assert_eq!(flavor.vendor, Vendor::MySql);
    assert_eq!((flavor.major, flavor.minor, flavor.patch), (8, 0, 28));

    let flavor = Flavor::parse("10.6.4-MariaDB-log", "mariadb.org binary distribution");
    assert_eq!(flavor.vendor, Vendor::MariaDb);
    assert_eq!((flavor.major, flavor.minor, flavor.patch), (10, 6, 4));

    let flavor = Flavor::parse("5.7.30-33", "Percona Server (GPL), Release 33");
    assert_eq!(flavor.vendor, Vendor::Percona);
    assert_eq!((flavor.major, flavor.minor), (5, 7));
}

#[test]
fn unknown_vendor_falls_back_to_major_version() {
    assert_eq!(Flavor::parse("8.0.1", "").vendor, Vendor::MySql);
    assert_eq!(Flavor::parse("5.6.40", "").vendor, Vendor::MySql);
    assert_eq!(Flavor::parse("10.3.1", "").vendor, Vendor::MariaDb);
    assert_eq!(Flavor::parse("4.1.0", "").vendor, Vendor::Unknown);
}

#[test]
fn capability_predicates_follow_the_version_matrix() {
    let mysql55 = Flavor::new(Vendor::MySql, 5, 5, 60);
    let mysql57 = Flavor::new(Vendor::MySql, 5, 7, 30);
    let mysql8018 = Flavor::new(Vendor::MySql, 8, 0, 18);
    let mysql8019 = Flavor::new(Vendor::MySql, 8, 0, 19);
    let maria101 = Flavor::new(Vendor::MariaDb, 10, 1, 0);
    let maria103 = Flavor::new(Vendor::MariaDb, 10, 3, 0);

    assert!(!mysql57.has_data_dictionary());
    assert!(mysql8018.has_data_dictionary());
    assert!(!maria103.has_data_dictionary());

    assert!(!mysql55.fractional_timestamps());
    assert!(mysql57.fractional_timestamps());
    assert!(maria101.fractional_timestamps());

    assert!(!mysql55.sorts_foreign_keys());
    assert!(mysql57.sorts_foreign_keys());
    assert!(mysql8018.sorts_foreign_keys());
    assert!(!mysql8019.sorts_foreign_keys());
    assert!(maria103.sorts_foreign_keys());

    assert!(!mysql8018.omit_int_display_width());
    assert!(mysql8019.omit_int_display_width());
    assert!(!maria103.omit_int_display_width());

    assert!(!mysql57.allow_blob_defaults());
    assert!(!maria101.allow_blob_defaults());
    assert!(maria103.allow_blob_defaults());

    assert!(!mysql55.generated_columns());
    assert!(mysql57.generated_columns());
    assert!(maria103.generated_columns());

    assert_eq!(mysql57.default_utf8mb4_collation(), "utf8mb4_general_ci");
    assert_eq!(mysql8019.default_utf8mb4_collation(), "utf8mb4_0900_ai_ci");
    assert_eq!(maria103.default_utf8mb4_collation(), "utf8mb4_general_ci");
}

#[test]
fn row_format_requirements_depend_on_version() {
    let mysql56 = Flavor::new(Vendor::MySql, 5, 6, 0);
    let mysql57 = Flavor::new(Vendor::MySql, 5, 7, 0);

    let reqs = mysql56.inno_row_format_reqs("COMPRESSED");
    assert!(reqs.file_per_table);
    assert!(reqs.barracuda);

    let reqs = mysql57.inno_row_format_reqs("COMPRESSED");
    assert!(reqs.file_per_table);
    assert!(!reqs.barracuda);

    let reqs = mysql56.inno_row_format_reqs("DYNAMIC");
    assert!(reqs.file_per_table);
    let reqs = mysql57.inno_row_format_reqs("DYNAMIC");
    assert!(!reqs.file_per_table);

    let reqs = mysql57.inno_row_format_reqs("COMPACT");
    assert!(!reqs.file_per_table && !reqs.barracuda);
}

#[test]
fn flavor_tags_round_trip_through_display_and_fromstr() {
    let flavor: Flavor = "mysql:8.0".parse().expect("tag should parse");
    assert_eq!(flavor.vendor, Vendor::MySql);
    assert_eq!(flavor.to_string(), "mysql:8.0");

    let flavor: Flavor = "mariadb:10.6.4".parse().expect("tag should parse");
    assert_eq!((flavor.major, flavor.minor, flavor.patch), (10, 6, 4));

    assert!("oracle:19.1".parse::<Flavor>().is_err());
    assert!("mysql".parse::<Flavor>().is_err());
}
