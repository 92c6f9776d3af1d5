use std::fs;
use std::sync::mpsc;
use std::time::Duration;

use chrono::{Offset, Utc};
use pretty_assertions::assert_eq;
use scout_app::config::{PathSection, ScoutConfig};
use scout_app::effects::EffectRunner;
use scout_app::{build_pipeline, App, AppInput, Flow};
use scout_core::{AppState, ScanStatus};
use serde_json::json;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORDS: &str = r#"[{"title":"Pizza Night","location":"Union 3102","description":"Free pizza",
    "startDate":"2099-04-29T22:00:00Z","endDate":"2099-04-30T00:00:00Z",
    "sourceUrl":"https://events.example.edu/event/X"}]"#;

fn config_for(server: &MockServer) -> ScoutConfig {
    let mut config = ScoutConfig::default();
    config.source.base_url = format!("{}/api/discovery/event/search", server.uri());
    config.forwarding_paths = vec![
        PathSection {
            name: "first".to_string(),
            template: format!("{}/first?url={{url}}", server.uri()),
        },
        PathSection {
            name: "second".to_string(),
            template: format!("{}/second?url={{url}}", server.uri()),
        },
    ];
    config.normalizer.endpoint = server.uri();
    config.normalizer.model = "m".to_string();
    config
}

fn start_app(
    server: &MockServer,
) -> (App<Vec<u8>>, mpsc::Receiver<AppInput>, TempDir) {
    let config = config_for(server);
    let export_dir = tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let runner = EffectRunner::new(
        build_pipeline(&config).unwrap(),
        config.tick_period(),
        export_dir.path().to_path_buf(),
        tx,
    )
    .unwrap();
    let app = App::new(AppState::new(), runner, Utc.fix(), Vec::new());
    (app, rx, export_dir)
}

fn run_until_idle(app: &mut App<Vec<u8>>, rx: &mpsc::Receiver<AppInput>) {
    while app.state().status() == ScanStatus::Scanning {
        let input = rx.recv_timeout(Duration::from_secs(10)).expect("engine reply");
        assert_eq!(app.handle_input(input).unwrap(), Flow::Continue);
    }
}

fn output(app: &App<Vec<u8>>) -> String {
    String::from_utf8_lossy(app.output()).into_owned()
}

async fn mount_source(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>busy</html>", "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"[{"id":"X","name":"Pizza Night"}]"#),
        )
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_merges_events_and_deduplicates_rescans() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    Mock::given(method("POST"))
        .and(path("/models/m:generateContent"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": RECORDS }] } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let (mut app, rx, export_dir) = start_app(&server);
    app.start(Some("secret".to_string()), false).unwrap();

    app.handle_line("scan").unwrap();
    run_until_idle(&mut app, &rx);

    assert_eq!(app.state().status(), ScanStatus::Success);
    assert_eq!(app.state().store().len(), 1);
    assert_eq!(
        app.state().log().latest().map(|e| e.message.as_str()),
        Some("Success! Found 1 new event from the event source.")
    );

    app.handle_line("scan").unwrap();
    run_until_idle(&mut app, &rx);

    assert_eq!(app.state().store().len(), 1);
    assert_eq!(
        app.state().log().latest().map(|e| e.message.as_str()),
        Some("Analysis complete. No new unique events found.")
    );

    app.handle_line("export").unwrap();
    let files: Vec<_> = fs::read_dir(export_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let ics = fs::read_to_string(&files[0]).unwrap();
    assert!(ics.contains("SUMMARY:Pizza Night\r\n"));

    let printed = output(&app);
    assert!(printed.contains("Connecting to event source..."));
    assert!(printed.contains("Exported 1 event to"));
}

#[tokio::test(flavor = "multi_thread")]
async fn scan_without_key_never_touches_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let (mut app, _rx, _dir) = start_app(&server);
    app.start(None, false).unwrap();
    app.handle_line("scan").unwrap();

    assert_eq!(app.state().status(), ScanStatus::Error);
    assert!(output(&app).contains("API key missing. Cannot scan."));
    assert!(!output(&app).contains("Connecting to event source..."));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_source_is_reported_in_log() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (mut app, rx, _dir) = start_app(&server);
    app.start(Some("secret".to_string()), false).unwrap();
    app.handle_line("scan").unwrap();
    run_until_idle(&mut app, &rx);

    assert_eq!(app.state().status(), ScanStatus::Error);
    let latest = app.state().log().latest().map(|e| e.message.clone()).unwrap_or_default();
    assert!(latest.starts_with("Scan failed: no path returned valid data"), "{latest}");
}

#[tokio::test(flavor = "multi_thread")]
async fn console_commands_drive_selection_and_links() {
    let server = MockServer::start().await;
    mount_source(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": RECORDS }] } }]
        })))
        .mount(&server)
        .await;

    let (mut app, rx, _dir) = start_app(&server);
    app.start(Some("secret".to_string()), false).unwrap();
    app.handle_line("scan").unwrap();
    run_until_idle(&mut app, &rx);

    app.handle_line("select 1").unwrap();
    assert_eq!(app.state().selection().len(), 1);
    app.handle_line("select 2").unwrap();
    app.handle_line("link 1").unwrap();
    app.handle_line("clear").unwrap();
    assert!(app.state().selection().is_empty());

    let printed = output(&app);
    assert!(printed.contains("No event #2."));
    assert!(printed
        .contains("https://calendar.google.com/calendar/render?action=TEMPLATE&text=Pizza+Night"));
    assert_eq!(app.handle_line("quit").unwrap(), Flow::Quit);
}
