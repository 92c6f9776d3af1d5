use std::sync::Once;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use scout_engine::{
    default_forwarding_paths, looks_structured, FailureKind, FetchSettings, ForwardingPath,
    ReqwestSourceFetcher, SourceFetcher, SourceQuery,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "https://events.example.edu/api/discovery/event/search?take=50";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

fn path_via(server: &MockServer, name: &str) -> ForwardingPath {
    ForwardingPath::from_template(name, format!("{}/{name}?url={{url}}", server.uri()))
}

#[tokio::test]
async fn falls_back_past_html_error_page() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Rate limited</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .and(query_param("url", TARGET))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"[{"id":"X","name":"Pizza Night"}]"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ReqwestSourceFetcher::new(
        FetchSettings::default(),
        vec![path_via(&server, "first"), path_via(&server, "second")],
    );

    let body = fetcher.fetch(TARGET).await.expect("second path accepted");
    assert_eq!(body.path_name, "second");
    assert_eq!(body.text, r#"[{"id":"X","name":"Pizza Night"}]"#);
}

#[tokio::test]
async fn stops_at_first_accepted_path() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  {\"items\":[]}"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = ReqwestSourceFetcher::new(
        FetchSettings::default(),
        vec![path_via(&server, "first"), path_via(&server, "second")],
    );

    let body = fetcher.fetch(TARGET).await.expect("first path accepted");
    assert_eq!(body.path_name, "first");
}

#[tokio::test]
async fn exhausted_paths_report_source_unreachable() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Too many requests"))
        .mount(&server)
        .await;

    let fetcher = ReqwestSourceFetcher::new(
        FetchSettings::default(),
        vec![path_via(&server, "first"), path_via(&server, "second")],
    );

    let err = fetcher.fetch(TARGET).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::SourceUnreachable);
    assert!(err.message.contains("no path returned valid data"));
    assert!(err.message.contains("first: http status 503"));
    assert!(err.message.contains("second: body is not JSON"));
}

#[tokio::test]
async fn slow_path_times_out_and_next_is_tried() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("[]"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestSourceFetcher::new(
        settings,
        vec![path_via(&server, "slow"), path_via(&server, "fast")],
    );

    let body = fetcher.fetch(TARGET).await.expect("fast path accepted");
    assert_eq!(body.path_name, "fast");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[0123456789]"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestSourceFetcher::new(settings, vec![path_via(&server, "large")]);

    let err = fetcher.fetch(TARGET).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::SourceUnreachable);
    assert!(err.message.contains("too large"));
}

#[tokio::test]
async fn no_paths_is_unreachable() {
    let fetcher = ReqwestSourceFetcher::new(FetchSettings::default(), Vec::new());
    let err = fetcher.fetch(TARGET).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::SourceUnreachable);
}

#[test]
fn templates_encode_the_target() {
    let paths = default_forwarding_paths();
    assert!(paths.len() >= 2);
    assert_eq!(
        paths[0].build("https://a.example/x?y=1&q=Free+Food"),
        "https://corsproxy.io/?https%3A%2F%2Fa.example%2Fx%3Fy%3D1%26q%3DFree%2BFood"
    );
    assert_eq!(
        paths[1].build("https://a.example/x"),
        "https://api.allorigins.win/raw?url=https%3A%2F%2Fa.example%2Fx"
    );

    let raw = ForwardingPath::from_template("direct", "{raw_url}");
    assert_eq!(raw.build("https://a.example/x"), "https://a.example/x");

    let custom = ForwardingPath::new("mirror", |target| format!("{target}&mirror=1"));
    assert_eq!(custom.name(), "mirror");
    assert_eq!(custom.build("https://a.example/?a=b"), "https://a.example/?a=b&mirror=1");
}

#[test]
fn structural_check_accepts_json_only() {
    assert!(looks_structured("{\"a\":1}"));
    assert!(looks_structured("\n   [1, 2]"));
    assert!(!looks_structured("<!DOCTYPE html>"));
    assert!(!looks_structured(""));
    assert!(!looks_structured("   "));
}

#[test]
fn query_window_starts_now_and_carries_filters() {
    let now = Utc.with_ymd_and_hms(2025, 4, 28, 12, 0, 0).unwrap();
    let url = SourceQuery::default().target_url(now).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert_eq!(url.path(), "/api/discovery/event/search");
    assert_eq!(
        pairs,
        vec![
            ("startsAfter".to_string(), "2025-04-28T12:00:00.000Z".to_string()),
            ("orderByField".to_string(), "startsOn".to_string()),
            ("orderByDirection".to_string(), "ascending".to_string()),
            ("status".to_string(), "Approved".to_string()),
            ("take".to_string(), "50".to_string()),
            ("query".to_string(), "Free Food".to_string()),
        ]
    );
}
