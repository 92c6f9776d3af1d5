use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::header::CONTENT_TYPE;
use scout_logging::{scout_debug, scout_info, scout_warn};
use serde_json::{json, Value};

use crate::{FailureKind, NormalizedEvent, ScanError};

pub const UNTITLED_EVENT: &str = "Untitled Event";
pub const UNKNOWN_LOCATION: &str = "TBD";
pub const DEFAULT_DESCRIPTION: &str = "Free food event found via the campus events listing.";

/// The forward-looking range events must start in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub now: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl ScanWindow {
    pub fn week_from(now: DateTime<Utc>) -> Self {
        Self {
            now,
            until: now + TimeDelta::days(7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub model: String,
    /// Raw listing text beyond this many characters is cut off.
    pub max_input_chars: usize,
    pub request_timeout: Duration,
    /// Prefix joined with a record id to link an event page.
    pub event_base_url: String,
    pub fallback_url: String,
    /// Zone used for human-readable dates and offset-less timestamps.
    pub prompt_timezone: Tz,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-pro-preview".to_string(),
            max_input_chars: 900_000,
            request_timeout: Duration::from_secs(120),
            event_base_url: "https://heellife.unc.edu/event/".to_string(),
            fallback_url: "https://heellife.unc.edu/events".to_string(),
            prompt_timezone: chrono_tz::America::New_York,
        }
    }
}

#[async_trait::async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(
        &self,
        raw: &str,
        window: &ScanWindow,
        credential: &str,
    ) -> Result<Vec<NormalizedEvent>, ScanError>;
}

/// Client for a `generateContent`-style extraction service.
#[derive(Debug, Clone)]
pub struct GenerativeNormalizer {
    settings: NormalizerSettings,
}

impl GenerativeNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl Normalizer for GenerativeNormalizer {
    async fn normalize(
        &self,
        raw: &str,
        window: &ScanWindow,
        credential: &str,
    ) -> Result<Vec<NormalizedEvent>, ScanError> {
        let prompt = build_prompt(raw, window, &self.settings);
        let body = serde_json::to_vec(&request_body(&prompt)).map_err(failed)?;
        scout_info!(
            "Sending {} prompt chars to extraction model {}",
            prompt.len(),
            self.settings.model
        );

        let client = reqwest::Client::builder()
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(failed)?;
        let response = client
            .post(self.request_url())
            .bearer_auth(credential)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::new(
                FailureKind::NormalizationFailed,
                format!("extraction service returned {status}"),
            ));
        }

        let bytes = response.bytes().await.map_err(failed)?;
        let envelope: Value = serde_json::from_slice(&bytes).map_err(|err| {
            ScanError::new(
                FailureKind::NormalizationFailed,
                format!("unreadable extraction response: {err}"),
            )
        })?;

        let Some(text) = response_text(&envelope) else {
            scout_info!("Extraction service returned no content");
            return Ok(Vec::new());
        };
        parse_records(&text, &self.settings)
    }
}

fn failed(err: impl std::fmt::Display) -> ScanError {
    ScanError::new(FailureKind::NormalizationFailed, err.to_string())
}

/// Longest prefix of `raw` holding at most `max_chars` characters.
pub fn truncate_chars(raw: &str, max_chars: usize) -> &str {
    match raw.char_indices().nth(max_chars) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

fn long_date(moment: DateTime<Utc>, tz: Tz) -> String {
    moment.with_timezone(&tz).format("%A, %B %-d, %Y").to_string()
}

pub fn build_prompt(raw: &str, window: &ScanWindow, settings: &NormalizerSettings) -> String {
    let tz = settings.prompt_timezone;
    let today = long_date(window.now, tz);
    let until = long_date(window.until, tz);
    let input = truncate_chars(raw, settings.max_input_chars);

    format!(
        "Context: Today is {today} ({tz} time).
Target time frame: the coming week (from now until {until}).

Task: Analyze the provided JSON data from the campus event listing API and extract events that offer free food.

Instructions:
1. The INPUT is a JSON response containing a list of events.
2. For each relevant event extract:
   - Title
   - Location (venue name or address)
   - Description (summarize if long)
   - Start time (ISO 8601)
   - End time (ISO 8601)
   - Source URL (\"{base}\" followed by the event id)
3. Filtering rules:
   - Strictly include only events starting between {today} and {until}.
   - The event must offer free food: a free food perk, or mentions of food, pizza, snacks, lunch or dinner.
4. Return a JSON array of event objects.

INPUT JSON DATA:
{input}
",
        base = settings.event_base_url,
    )
}

/// Request envelope with a strict output schema; only title and times are required.
pub fn request_body(prompt: &str) -> Value {
    let string = json!({ "type": "STRING" });
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": string,
                        "location": string,
                        "description": string,
                        "startDate": string,
                        "endDate": string,
                        "sourceUrl": string,
                    },
                    "required": ["title", "startDate", "endDate"],
                },
            },
        },
    })
}

/// Concatenated text parts of the first candidate, if there is any text.
pub fn response_text(envelope: &Value) -> Option<String> {
    let parts = envelope
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Parse the service's JSON array and complete missing optional fields.
///
/// Only an unparsable array fails the whole batch. Fields are read one by one,
/// so a wrongly typed field falls back to its default without touching other
/// records. A record without a usable start time is dropped; a missing end
/// time becomes start + 1h.
pub fn parse_records(
    text: &str,
    settings: &NormalizerSettings,
) -> Result<Vec<NormalizedEvent>, ScanError> {
    let records: Vec<Value> = serde_json::from_str(strip_code_fence(text)).map_err(|err| {
        ScanError::new(
            FailureKind::NormalizationFailed,
            format!("extraction service returned malformed JSON: {err}"),
        )
    })?;
    scout_debug!("Extraction service returned {} records", records.len());

    let tz = settings.prompt_timezone;
    let mut events = Vec::with_capacity(records.len());
    for record in &records {
        if !record.is_object() {
            scout_warn!("Dropping non-object record: {}", record);
            continue;
        }
        let title = text_field(record, "title").unwrap_or_else(|| UNTITLED_EVENT.to_string());
        let Some(start) = text_field(record, "startDate").and_then(|s| parse_timestamp(&s, tz))
        else {
            scout_warn!("Dropping '{}': missing or invalid start time", title);
            continue;
        };
        let end = text_field(record, "endDate")
            .and_then(|s| parse_timestamp(&s, tz))
            .unwrap_or(start + TimeDelta::hours(1));

        events.push(NormalizedEvent {
            title,
            location: text_field(record, "location")
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            description: text_field(record, "description")
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            start,
            end,
            source_url: text_field(record, "sourceUrl")
                .unwrap_or_else(|| settings.fallback_url.clone()),
        });
    }
    Ok(events)
}

/// Trimmed string value of `key`; absent, blank or non-string values are `None`.
fn text_field(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// RFC 3339, or an offset-less local timestamp read in `tz`.
pub fn parse_timestamp(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
