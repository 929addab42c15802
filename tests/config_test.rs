use rask_measurement_forwarder::app::{App, Config, ConfigError, LogFormat, LogLevel};
use rask_measurement_forwarder::sender::RequiredFieldPolicy;
use serde_json::json;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const ENV_VARS: &[&str] = &[
    "MEASUREMENT_ID",
    "API_SECRET",
    "MEASUREMENT_ENDPOINT",
    "MEASUREMENT_DEBUG_ENDPOINT",
    "CLIENT_ID",
    "USER_ID",
    "SESSION_ID",
    "DEBUG_MODE",
    "NON_PERSONALIZED_ADS",
    "EVENT_TIMESTAMP",
    "EVENTS_FILE",
    "VALIDATE_ONLY",
    "REQUIRED_FIELDS",
    "BATCH_SIZE",
    "MAX_BODY_KB",
    "REQUEST_TIMEOUT_SECS",
    "CONNECTION_TIMEOUT_SECS",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "CONFIG_FILE",
];

fn clean_env() {
    unsafe {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_config_from_args() {
    clean_env();
    let args = vec![
        "rask-measurement-forwarder",
        "--measurement-id",
        "G-ARGS",
        "--api-secret",
        "args-secret",
        "--client-id",
        "555.1",
        "--session-id",
        "42",
        "--debug-mode",
        "--batch-size",
        "10",
        "--user-property",
        "plan=pro",
        "--user-property",
        "seats=3",
        "--required-fields",
        "lenient",
        "--log-level",
        "debug",
    ];

    let config = Config::from_args(args).unwrap();

    assert_eq!(config.measurement_id, "G-ARGS");
    assert_eq!(config.client_id.as_deref(), Some("555.1"));
    assert_eq!(config.session_id, Some(42));
    assert!(config.debug_mode);
    assert_eq!(config.batch_size, 10);
    assert_eq!(config.required_fields, RequiredFieldPolicy::Lenient);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(
        config.parsed_user_properties().unwrap(),
        vec![
            ("plan".to_string(), json!("pro")),
            ("seats".to_string(), json!(3)),
        ]
    );
    assert_eq!(config.sender_config().batch.max_events, 10);
    assert_eq!(config.sender_config().batch.max_body_bytes, 130 * 1024);
}

#[test]
#[serial]
fn test_config_from_args_requires_credentials() {
    clean_env();
    let result = Config::from_args(vec!["rask-measurement-forwarder"]);
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
#[serial]
fn test_config_from_environment() {
    clean_env();
    unsafe {
        std::env::set_var("MEASUREMENT_ID", "G-ENV");
        std::env::set_var("API_SECRET", "env-secret");
        std::env::set_var("USER_ID", "user-env");
        std::env::set_var("SESSION_ID", "7");
        std::env::set_var("REQUIRED_FIELDS", "LENIENT");
        std::env::set_var("LOG_LEVEL", "WARN");
        std::env::set_var("LOG_FORMAT", "json");
        std::env::set_var("REQUEST_TIMEOUT_SECS", "5");
    }

    let config = Config::from_env().unwrap();
    clean_env();

    assert_eq!(config.measurement_id, "G-ENV");
    assert_eq!(config.user_id.as_deref(), Some("user-env"));
    assert_eq!(config.session_id, Some(7));
    assert_eq!(config.required_fields, RequiredFieldPolicy::Lenient);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.request_timeout, Duration::from_secs(5));
}

#[test]
#[serial]
fn test_config_from_environment_rejects_bad_values() {
    clean_env();
    unsafe {
        std::env::set_var("MEASUREMENT_ID", "G-ENV");
        std::env::set_var("API_SECRET", "env-secret");
        std::env::set_var("SESSION_ID", "-1");
    }

    let result = Config::from_env();
    clean_env();

    assert!(matches!(result, Err(ConfigError::EnvError(_))));
}

#[test]
fn test_config_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
measurement_id = "G-FILE"
api_secret = "file-secret"
client_id = "555.2"
batch_size = 5
user_properties = ["tier=gold"]
log_level = "trace"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.measurement_id, "G-FILE");
    assert_eq!(config.client_id.as_deref(), Some("555.2"));
    assert_eq!(config.batch_size, 5);
    assert_eq!(config.log_level, LogLevel::Trace);
    assert_eq!(config.endpoint, "https://www.google-analytics.com/mp/collect");
    assert_eq!(config.connection_timeout, Duration::from_secs(10));
}

#[test]
fn test_config_from_toml_rejects_unknown_types() {
    let result = Config::from_toml("measurement_id = 12");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

fn app_config(server: &MockServer, events_file: &NamedTempFile) -> Config {
    let mut config = Config {
        measurement_id: "G-APP".to_string(),
        api_secret: "app-secret".to_string(),
        endpoint: format!("{}/mp/collect", server.uri()),
        debug_endpoint: format!("{}/debug/mp/collect", server.uri()),
        client_id: Some("555.3".to_string()),
        session_id: Some(9),
        non_personalized_ads: true,
        user_properties: vec!["plan=pro".to_string()],
        input: Some(events_file.path().to_path_buf()),
        ..Config::default()
    };
    config.post_process().unwrap();
    config
}

fn events_file(count: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..count {
        writeln!(file, r#"{{"name":"imported","params":{{"row":{i}}}}}"#).unwrap();
    }
    file
}

#[tokio::test]
async fn test_app_applies_config_and_submits_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mp/collect"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let file = events_file(30);
    let app = App::from_config(app_config(&server, &file)).unwrap();

    assert_eq!(app.sender().client_id(), Some("555.3"));
    assert_eq!(app.sender().session_id(), Some(9));
    assert_eq!(app.sender().non_personalized_ads(), Some(true));
    assert_eq!(app.sender().user_properties().len(), 1);

    app.run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let first: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(first["user_properties"], json!({"plan": {"value": "pro"}}));
    assert_eq!(first["events"][0]["params"]["session_id"], json!(9));
}

#[tokio::test]
async fn test_app_rejects_stale_timestamp() {
    let server = MockServer::start().await;
    let file = events_file(1);
    let config = Config {
        timestamp: Some("1000000000".to_string()),
        ..app_config(&server, &file)
    };

    assert!(App::from_config(config).is_err());
}
