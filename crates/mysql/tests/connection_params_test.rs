use driftql_mysql::{ConnectionParams, DEFAULT_HOST, DEFAULT_PORT};

#[test]
fn identity_prefers_sockets_over_host_and_port() {
    let params = ConnectionParams {
        socket: Some("/var/run/mysqld/mysqld.sock".to_string()),
        ..ConnectionParams::default()
    };
    assert_eq!(params.identity(), "/var/run/mysqld/mysqld.sock");

    let params = ConnectionParams {
        host: Some("db.example.com".to_string()),
        port: Some(3307),
        ..ConnectionParams::default()
    };
    assert_eq!(params.identity(), "db.example.com:3307");
}

#[test]
fn identity_falls_back_to_driver_defaults() {
    let params = ConnectionParams::default();
    assert_eq!(params.identity(), format!("{DEFAULT_HOST}:{DEFAULT_PORT}"));
}
