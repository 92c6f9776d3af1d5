use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use scout_logging::{scout_debug, scout_info, scout_warn};
use url::{form_urlencoded, Url};

use crate::decode::decode_body;
use crate::{FailureKind, PathFailure, ScanError, SourceBody};

pub const DEFAULT_SOURCE_URL: &str = "https://heellife.unc.edu/api/discovery/event/search";

/// Query sent to the event listing API. The window always starts at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub base_url: String,
    pub order_by_field: String,
    pub order_by_direction: String,
    pub status: String,
    pub take: u32,
    pub query: String,
}

impl Default for SourceQuery {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            order_by_field: "startsOn".to_string(),
            order_by_direction: "ascending".to_string(),
            status: "Approved".to_string(),
            take: 50,
            query: "Free Food".to_string(),
        }
    }
}

impl SourceQuery {
    pub fn target_url(&self, starts_after: DateTime<Utc>) -> Result<Url, url::ParseError> {
        let starts_after = starts_after.to_rfc3339_opts(SecondsFormat::Millis, true);
        let take = self.take.to_string();
        Url::parse_with_params(
            &self.base_url,
            [
                ("startsAfter", starts_after.as_str()),
                ("orderByField", self.order_by_field.as_str()),
                ("orderByDirection", self.order_by_direction.as_str()),
                ("status", self.status.as_str()),
                ("take", take.as_str()),
                ("query", self.query.as_str()),
            ],
        )
    }
}

type Rewrite = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A URL rewrite that reaches the origin through an intermediary.
#[derive(Clone)]
pub struct ForwardingPath {
    name: String,
    rewrite: Rewrite,
}

impl ForwardingPath {
    pub fn new(
        name: impl Into<String>,
        rewrite: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            rewrite: Arc::new(rewrite),
        }
    }

    /// Build a path from a template: `{url}` becomes the percent-encoded
    /// target, `{raw_url}` the target as-is.
    pub fn from_template(name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        Self::new(name, move |target| {
            template
                .replace("{url}", &encode_component(target))
                .replace("{raw_url}", target)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self, target: &str) -> String {
        (self.rewrite)(target)
    }
}

impl fmt::Debug for ForwardingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingPath")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub fn default_forwarding_paths() -> Vec<ForwardingPath> {
    vec![
        ForwardingPath::from_template("corsproxy", "https://corsproxy.io/?{url}"),
        ForwardingPath::from_template("allorigins", "https://api.allorigins.win/raw?url={url}"),
    ]
}

pub fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Cheap guard against HTML error or rate-limit pages served with 200 OK.
pub fn looks_structured(body: &str) -> bool {
    matches!(body.trim_start().chars().next(), Some('{' | '['))
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, target_url: &str) -> Result<SourceBody, ScanError>;
}

/// Tries each forwarding path in order, one request at a time, and returns
/// the first structurally valid body.
#[derive(Debug, Clone)]
pub struct ReqwestSourceFetcher {
    settings: FetchSettings,
    paths: Vec<ForwardingPath>,
}

impl ReqwestSourceFetcher {
    pub fn new(settings: FetchSettings, paths: Vec<ForwardingPath>) -> Self {
        Self { settings, paths }
    }

    pub fn paths(&self) -> &[ForwardingPath] {
        &self.paths
    }

    fn build_client(&self) -> Result<reqwest::Client, PathFailure> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.settings.redirect_limit))
            .build()
            .map_err(|err| PathFailure::Network(err.to_string()))
    }

    async fn try_path(&self, client: &reqwest::Client, url: &str) -> Result<String, PathFailure> {
        let response = client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PathFailure::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(PathFailure::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(PathFailure::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_body(&bytes, content_type.as_deref())
            .map_err(|err| PathFailure::Decode(err.to_string()))?;
        scout_debug!(
            "Decoded {} bytes as {} from {}",
            bytes.len(),
            decoded.encoding_label,
            url
        );
        if !looks_structured(&decoded.text) {
            return Err(PathFailure::NotStructured);
        }
        Ok(decoded.text)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ReqwestSourceFetcher {
    async fn fetch(&self, target_url: &str) -> Result<SourceBody, ScanError> {
        let client = self
            .build_client()
            .map_err(|err| ScanError::new(FailureKind::SourceUnreachable, err.to_string()))?;

        let mut rejected = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let url = path.build(target_url);
            scout_info!("Fetching events via {} ({})", path.name(), url);
            match self.try_path(&client, &url).await {
                Ok(text) => {
                    scout_info!("Accepted {} chars via {}", text.len(), path.name());
                    return Ok(SourceBody {
                        text,
                        path_name: path.name().to_string(),
                        url,
                    });
                }
                Err(failure) => {
                    scout_warn!("Forwarding path {} rejected: {}", path.name(), failure);
                    rejected.push(format!("{}: {}", path.name(), failure));
                }
            }
        }

        let detail = if rejected.is_empty() {
            "no forwarding paths configured".to_string()
        } else {
            rejected.join("; ")
        };
        Err(ScanError::new(
            FailureKind::SourceUnreachable,
            format!("no path returned valid data ({detail})"),
        ))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> PathFailure {
    if err.is_timeout() {
        return PathFailure::Timeout;
    }
    PathFailure::Network(err.to_string())
}
