use driftql_fs::{OptionError, OptionFile, OptionKey, ResolvedOptions, parse_connect_options};

fn resolve(files: &[(&str, &str)], environment: &str) -> Result<ResolvedOptions, OptionError> {
    let mut options = ResolvedOptions::default();
    for (origin, contents) in files {
        let file = OptionFile::parse(origin, contents)?;
        options.apply_file(&file, environment)?;
    }
    Ok(options)
}

#[test]
fn top_matter_applies_and_environment_sections_override() {
    let contents = "host=db.example.com\nport=3307\n\n[production]\nhost=prod.example.com\n";
    let options = resolve(&[(".skeema", contents)], "production").expect("resolve");
    assert_eq!(options.get(OptionKey::Host), Some("prod.example.com"));
    assert_eq!(options.get(OptionKey::Port), Some("3307"));

    let options = resolve(&[(".skeema", contents)], "staging").expect("resolve");
    assert_eq!(options.get(OptionKey::Host), Some("db.example.com"));
}

#[test]
fn child_directories_inherit_and_override_parent_options() {
    let parent = "host=db.example.com\nallow-unsafe\n";
    let child = "schema=app\nhost=shard1.example.com\n";
    let options = resolve(&[("parent/.skeema", parent), ("parent/app/.skeema", child)], "production")
        .expect("resolve");

    assert_eq!(options.get(OptionKey::Host), Some("shard1.example.com"));
    assert_eq!(options.get(OptionKey::Schema), Some("app"));
    assert!(options.get_bool(OptionKey::AllowUnsafe));
    assert_eq!(options.origin(OptionKey::Schema), Some("parent/app/.skeema"));
}

#[test]
fn conflicting_schema_redefinition_is_an_error() {
    let error = resolve(
        &[
            ("parent/.skeema", "schema=app\n"),
            ("parent/sub/.skeema", "schema=other\n"),
        ],
        "production",
    )
    .expect_err("schema conflict");
    assert!(matches!(error, OptionError::SchemaRedefined { .. }));

    // restating the same value is allowed
    resolve(
        &[
            ("parent/.skeema", "schema=app\n"),
            ("parent/sub/.skeema", "schema=app\n"),
        ],
        "production",
    )
    .expect("same value is not a conflict");
}

#[test]
fn unknown_options_are_tolerated_at_the_parse_edge() {
    let options = resolve(&[(".skeema", "schema=app\nfrobnicate=9\n")], "production")
        .expect("unknown keys warn, not fail");
    assert_eq!(options.get(OptionKey::Schema), Some("app"));
}

#[test]
fn sizes_accept_human_suffixes() {
    let options = resolve(
        &[(".skeema", "safe-below-size=10M\nalter-wrapper-min-size=4096\n")],
        "production",
    )
    .expect("resolve");
    assert_eq!(
        options.get_u64(OptionKey::SafeBelowSize).expect("parse"),
        Some(10 * 1024 * 1024)
    );
    assert_eq!(
        options
            .get_u64(OptionKey::AlterWrapperMinSize)
            .expect("parse"),
        Some(4096)
    );

    let options = resolve(&[(".skeema", "safe-below-size=lots\n")], "production").expect("resolve");
    assert!(options.get_u64(OptionKey::SafeBelowSize).is_err());
}

#[test]
fn connect_options_parse_quotes_barewords_and_commas() {
    let pairs = parse_connect_options(
        "test",
        "wait_timeout=3600,sql_mode='STRICT_ALL_TABLES,NO_ENGINE_SUBSTITUTION',autocommit",
    )
    .expect("parse");
    assert_eq!(
        pairs,
        vec![
            ("wait_timeout".to_string(), "3600".to_string()),
            (
                "sql_mode".to_string(),
                "STRICT_ALL_TABLES,NO_ENGINE_SUBSTITUTION".to_string()
            ),
            ("autocommit".to_string(), "1".to_string()),
        ]
    );
}

#[test]
fn connect_options_support_escaped_quotes() {
    let pairs = parse_connect_options("test", r"init_command='SET @x=\'a\'',other=''''").expect("parse");
    assert_eq!(pairs[0].1, "SET @x='a'");
    assert_eq!(pairs[1].1, "'");
}

#[test]
fn malformed_connect_options_are_hard_errors() {
    assert!(matches!(
        parse_connect_options("test", "a='unterminated"),
        Err(OptionError::MalformedConnectOptions { .. })
    ));
    assert!(matches!(
        parse_connect_options("test", "=value"),
        Err(OptionError::MalformedConnectOptions { .. })
    ));
}

#[test]
fn safety_critical_settings_cannot_be_overridden() {
    let error = parse_connect_options("test", "foreign_key_checks=1").expect_err("denied");
    assert!(matches!(
        error,
        OptionError::DeniedConnectOption { option, .. } if option == "foreign_key_checks"
    ));
    assert!(parse_connect_options("test", "interpolateParams=false").is_err());
}
