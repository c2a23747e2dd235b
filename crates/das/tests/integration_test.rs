// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use das::{
    config::DasConfig,
    identity::Identity,
    manager::Manager,
    parser::format_event_message,
    record::{LogRecord, Priority},
    source::JsonLinesSource,
    transport::HttpTransport,
};
use mockito::{Matcher, Server};
use std::io::Write;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

fn identity() -> Identity {
    Identity {
        robot_id: "vic-00e20115".to_string(),
        robot_version: "1.8.0".to_string(),
        boot_id: "b0075f1c".to_string(),
    }
}

fn write_records(file: &mut tempfile::NamedTempFile, names: &[&str]) {
    for (i, name) in names.iter().enumerate() {
        let record = LogRecord {
            tag: "vic-robot".to_string(),
            message: format_event_message(name, ["ein", "", "", ""], [i as i64 + 1, 0, 0, 0]),
            priority: Priority::Info,
            seconds: 1_700_000_000 + i as i64,
            nanoseconds: 0,
        };
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        writeln!(file, r#"{{"tag":"vic-robot","message":"not an event","priority":"debug","seconds":0,"nanoseconds":0}}"#).unwrap();
    }
    file.flush().unwrap();
}

fn config(url: String, threshold: usize) -> DasConfig {
    DasConfig {
        url,
        queue_threshold_size: threshold,
        max_deferrals_size: 4,
        idle_sleep: Duration::from_millis(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn manager_ships_batches_and_flushes_on_shutdown() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/events")
        .match_header("Content-Type", "application/json")
        .match_body(Matcher::Regex(r#""robot_id":"vic-00e20115""#.to_string()))
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_records(&mut file, &["hal.body_version", "wakeword.triggered", "go_home.result"]);

    let transport = Arc::new(HttpTransport::new(Duration::from_secs(1)).unwrap());
    let manager = Manager::init(
        &config(format!("{}/v1/events", server.url()), 2),
        identity(),
        JsonLinesSource::new(file.path()),
        transport,
    )
    .await
    .unwrap();

    let shutdown = CancellationToken::new();
    let run = tokio::spawn(manager.run(shutdown.clone()));
    sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    let stats = run.await.unwrap().unwrap();
    assert_eq!(stats.entries, 6);
    assert_eq!(stats.events, 3);
    assert_eq!(stats.upload.upload_success, 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn deferred_batch_is_retried_after_next_success() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/v1/events")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(1)
        .create_async()
        .await;
    let healthy = server
        .mock("POST", "/v1/events")
        .with_status(200)
        .expect(3)
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_records(&mut file, &["a", "b", "c"]);

    let transport = Arc::new(HttpTransport::new(Duration::from_secs(1)).unwrap());
    let manager = Manager::init(
        &config(format!("{}/v1/events", server.url()), 1),
        identity(),
        JsonLinesSource::new(file.path()),
        transport,
    )
    .await
    .unwrap();

    let shutdown = CancellationToken::new();
    let run = tokio::spawn(manager.run(shutdown.clone()));
    sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    let stats = run.await.unwrap().unwrap();
    assert_eq!(stats.upload.upload_fail, 1);
    assert_eq!(stats.upload.upload_success, 3);
    assert_eq!(stats.upload.deferrals, 1);
    assert_eq!(stats.upload.pending, 0);
    failing.assert_async().await;
    healthy.assert_async().await;
}

#[tokio::test]
async fn missing_log_source_fails_init() {
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(1)).unwrap());
    let result = Manager::init(
        &config("http://127.0.0.1:9/v1/events".to_string(), 1),
        identity(),
        JsonLinesSource::new("/no/such/events.jsonl"),
        transport,
    )
    .await;
    assert!(result.is_err());
}
