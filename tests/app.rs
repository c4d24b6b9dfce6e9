//! End-to-end runs of the application against a stubbed GreyNoise API.

mod helpers;

use helpers::{fake_reputation::FakeReputationLookup, recording_notifier::RecordingNotifier};
use noisewatch::app::App;
use noisewatch::config::Config;
use noisewatch::core::Notifier;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(dir: &Path, base_url: &str) -> Config {
    let mut config = Config::default();
    config.scan.directory = Some(dir.to_path_buf());
    config.greynoise.api_key = "test-key".to_string();
    config.greynoise.base_url = base_url.to_string();
    config
}

async fn mount_ip(server: &MockServer, ip: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/community/{ip}")))
        .and(header("key", "test-key"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_run_against_stub_api() {
    // Arrange
    let logs = tempfile::tempdir().unwrap();
    fs::write(
        logs.path().join("access.log"),
        "1.1.1.1 - - [01/Jan/2024] \"GET / HTTP/1.1\" 200\n\
         2.2.2.2 - - [01/Jan/2024] \"GET /wp-login.php HTTP/1.1\" 404\n\
         1.1.1.1 - - [01/Jan/2024] \"GET /favicon.ico HTTP/1.1\" 200\n",
    )
    .unwrap();
    fs::write(
        logs.path().join("access.log.1"),
        "3.3.3.3 - - [31/Dec/2023] \"GET /.env HTTP/1.1\" 404\n\
         4.4.4.4 - - [31/Dec/2023] \"GET / HTTP/1.1\" 200\n",
    )
    .unwrap();

    let server = MockServer::start().await;
    mount_ip(&server, "1.1.1.1", 200, json!({"ip": "1.1.1.1", "noise": false, "riot": true,
        "classification": "benign", "name": "Cloudflare"})).await;
    mount_ip(&server, "2.2.2.2", 200, json!({"ip": "2.2.2.2", "noise": true,
        "classification": "malicious", "name": "unknown"})).await;
    mount_ip(&server, "3.3.3.3", 200, json!({"ip": "3.3.3.3", "noise": true,
        "classification": "malicious", "name": "Shodan.io"})).await;
    mount_ip(&server, "4.4.4.4", 429, json!({"message": "rate limited"})).await;

    let notifier = RecordingNotifier::new();
    let app = App::builder(config_for(logs.path(), &server.uri()))
        .notifiers_override(vec![Box::new(notifier.clone()) as Box<dyn Notifier>])
        .build()
        .unwrap();

    // Act
    let report = app.run().await.unwrap();
    app.notify(&report).await.unwrap();

    // Assert
    assert_eq!(report.addresses_scanned, 4);
    assert_eq!(report.failed_lookups, 1);
    assert_eq!(report.unprocessed, 0);
    assert_eq!(report.summary.noisy_count, 2);
    assert_eq!(report.summary.non_noisy_count, 1);
    assert_eq!(
        report.summary.noisy_count + report.summary.non_noisy_count + report.failed_lookups,
        report.addresses_scanned
    );
    assert_eq!(report.summary.top_classifications, vec!["malicious"]);
    assert_eq!(report.summary.top_actor_names, vec!["Shodan.io", "unknown"]);
    assert_eq!(notifier.reports(), vec![report]);
}

#[tokio::test]
async fn test_empty_log_directory_fails_the_run() {
    let logs = tempfile::tempdir().unwrap();
    fs::write(logs.path().join("empty.log"), "").unwrap();

    let app = App::builder(config_for(logs.path(), "http://127.0.0.1:1"))
        .lookup_override(Arc::new(FakeReputationLookup::new()))
        .notifiers_override(vec![])
        .build()
        .unwrap();

    let err = app.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("no IPs parsed"), "{err:#}");
}

#[tokio::test]
async fn test_missing_log_directory_fails_the_run() {
    let logs = tempfile::tempdir().unwrap();
    let missing = logs.path().join("gone");

    let app = App::builder(config_for(&missing, "http://127.0.0.1:1"))
        .lookup_override(Arc::new(FakeReputationLookup::new()))
        .notifiers_override(vec![])
        .build()
        .unwrap();

    let err = app.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("failed to list log directory"), "{err:#}");
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_build() {
    let mut config = Config::default();
    config.scan.directory = Some("relative/logs".into());
    config.greynoise.api_key = "test-key".to_string();

    let result = App::builder(config).build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_notify_tries_every_notifier() {
    let logs = tempfile::tempdir().unwrap();
    fs::write(logs.path().join("a.log"), "9.9.9.9 x\n").unwrap();

    let ok = RecordingNotifier::new();
    let failing = RecordingNotifier::failing();
    let app = App::builder(config_for(logs.path(), "http://127.0.0.1:1"))
        .lookup_override(Arc::new(
            FakeReputationLookup::new().noisy_for(["9.9.9.9".to_string()]),
        ))
        .notifiers_override(vec![
            Box::new(failing.clone()) as Box<dyn Notifier>,
            Box::new(ok.clone()),
        ])
        .build()
        .unwrap();

    let report = app.run().await.unwrap();
    let err = app.notify(&report).await.unwrap_err();

    assert!(err.to_string().contains("failing"));
    assert_eq!(ok.reports().len(), 1);
    assert_eq!(failing.reports().len(), 1);
    assert_eq!(report.summary.noisy_count, 1);
}
