use std::fs;
use std::time::Duration;

use chrono::{FixedOffset, Weekday};
use pretty_assertions::assert_eq;
use scout_app::config::{ConfigError, ScoutConfig};
use tempfile::tempdir;

#[test]
fn defaults_without_file() {
    let config = ScoutConfig::load(None).unwrap();
    assert_eq!(config, ScoutConfig::default());

    let names: Vec<String> = config
        .forwarding_paths()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["corsproxy", "allorigins"]);
    assert_eq!(config.tick_period(), Duration::from_secs(1));
    assert_eq!(config.source_query().take, 50);
    assert_eq!(
        config.normalizer_settings().unwrap().prompt_timezone,
        chrono_tz::America::New_York
    );
}

#[test]
fn partial_file_keeps_other_defaults() {
    let config = ScoutConfig::from_ron(
        r#"(
            schedule: (reset_day: "Mon"),
            normalizer: (model: "other-model", prompt_timezone: "Europe/Oslo"),
        )"#,
    )
    .unwrap();

    assert_eq!(config.schedule.reset_day, Weekday::Mon);
    assert_eq!(config.schedule.tick_millis, 1000);
    assert_eq!(config.normalizer.model, "other-model");
    assert_eq!(config.forwarding_paths.len(), 2);

    let offset = FixedOffset::west_opt(4 * 3600).unwrap();
    let schedule = config.schedule_config(offset);
    assert_eq!(schedule.reset_day, Weekday::Mon);
    assert_eq!(schedule.utc_offset, offset);
}

#[test]
fn custom_paths_replace_defaults() {
    let config = ScoutConfig::from_ron(
        r#"(
            forwarding_paths: [
                (name: "mirror", template: "https://mirror.example/fetch?target={url}"),
                (name: "direct", template: "{raw_url}"),
            ],
        )"#,
    )
    .unwrap();

    let paths = config.forwarding_paths();
    assert_eq!(paths.len(), 2);
    assert_eq!(
        paths[0].build("https://a.example/?q=1"),
        "https://mirror.example/fetch?target=https%3A%2F%2Fa.example%2F%3Fq%3D1"
    );
    assert_eq!(paths[1].build("https://a.example/?q=1"), "https://a.example/?q=1");
}

#[test]
fn empty_path_list_is_rejected() {
    let err = ScoutConfig::from_ron("(forwarding_paths: [])").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn single_path_is_rejected() {
    let text = r#"(forwarding_paths: [(name: "only", template: "https://p.example/?{url}")])"#;
    let err = ScoutConfig::from_ron(text).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("two")), "{err}");
}

#[test]
fn template_needs_exactly_one_placeholder() {
    for template in ["https://proxy.example/", "https://p.example/{url}?again={raw_url}"] {
        let text = format!("(forwarding_paths: [(name: \"bad\", template: \"{template}\")])");
        let err = ScoutConfig::from_ron(&text).unwrap_err();
        assert!(err.to_string().contains("bad"), "{err}");
    }
}

#[test]
fn unknown_timezone_is_rejected() {
    let err =
        ScoutConfig::from_ron(r#"(normalizer: (prompt_timezone: "Mars/Olympus"))"#).unwrap_err();
    assert!(err.to_string().contains("Mars/Olympus"));
}

#[test]
fn load_reports_path_on_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scout.ron");
    fs::write(&path, "(source: (take: \"many\"))").unwrap();

    match ScoutConfig::load(Some(&path)) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(matches!(
        ScoutConfig::load(Some(&dir.path().join("missing.ron"))),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn load_reads_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scout.ron");
    fs::write(
        &path,
        "(source: (take: 20, query: \"Pizza\"), fetch: (max_body_bytes: 1024))",
    )
    .unwrap();

    let config = ScoutConfig::load(Some(&path)).unwrap();
    assert_eq!(config.source_query().take, 20);
    assert_eq!(config.source_query().query, "Pizza");
    assert_eq!(config.fetch_settings().max_bytes, 1024);
}
