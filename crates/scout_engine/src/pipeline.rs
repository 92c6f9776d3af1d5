use std::sync::Arc;

use chrono::{DateTime, Utc};
use scout_logging::scout_info;

use crate::normalize::{Normalizer, ScanWindow};
use crate::source::{SourceFetcher, SourceQuery};
use crate::{EngineEvent, FailureKind, NormalizedEvent, ScanError, ScanId, ScanProgress, ScanStage};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Fetch -> normalize for one scan attempt. Merging is left to the caller.
#[derive(Clone)]
pub struct ScanPipeline {
    query: SourceQuery,
    fetcher: Arc<dyn SourceFetcher>,
    normalizer: Arc<dyn Normalizer>,
}

impl ScanPipeline {
    pub fn new(
        query: SourceQuery,
        fetcher: Arc<dyn SourceFetcher>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        Self {
            query,
            fetcher,
            normalizer,
        }
    }

    pub async fn run(
        &self,
        scan_id: ScanId,
        credential: Option<&str>,
        now: DateTime<Utc>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<NormalizedEvent>, ScanError> {
        // Checked before any network traffic.
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ScanError::new(FailureKind::MissingCredential, "API key is missing"))?;

        let target = self.query.target_url(now).map_err(|err| {
            ScanError::new(
                FailureKind::SourceUnreachable,
                format!("invalid source url {}: {err}", self.query.base_url),
            )
        })?;

        emit_stage(sink, scan_id, ScanStage::Fetching);
        let body = self.fetcher.fetch(target.as_str()).await?;
        scout_info!(
            "Scan {} received {} chars via {}",
            scan_id,
            body.text.len(),
            body.path_name
        );

        emit_stage(sink, scan_id, ScanStage::Normalizing);
        let window = ScanWindow::week_from(now);
        let events = self.normalizer.normalize(&body.text, &window, credential).await?;
        scout_info!("Scan {} normalized {} events", scan_id, events.len());

        emit_stage(sink, scan_id, ScanStage::Done);
        Ok(events)
    }
}

fn emit_stage(sink: &dyn ProgressSink, scan_id: ScanId, stage: ScanStage) {
    sink.emit(EngineEvent::Progress(ScanProgress { scan_id, stage }));
}
