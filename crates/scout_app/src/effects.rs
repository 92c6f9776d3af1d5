use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scout_core::{
    CampusEvent, Effect, EventDraft, FailureKind, Msg, ScanFailure, ScanOutcome, ScanStage,
};
use scout_engine::{
    export_filename, ics_document, write_calendar_file, CalendarEntry, EngineEvent, EngineHandle,
    ExportError, NormalizedEvent, ScanPipeline,
};
use scout_logging::{scout_error, scout_info, scout_warn};

/// Carries core effects out to the engine and the filesystem.
pub struct EffectRunner {
    engine: EngineHandle,
    credential: Option<String>,
    export_dir: PathBuf,
}

impl EffectRunner {
    /// Starts the engine and a thread forwarding its events as core messages
    /// into `msg_tx`.
    pub fn new<T>(
        pipeline: ScanPipeline,
        tick_period: Duration,
        export_dir: PathBuf,
        msg_tx: mpsc::Sender<T>,
    ) -> io::Result<Self>
    where
        T: From<Msg> + Send + 'static,
    {
        let (engine, events) = EngineHandle::new(pipeline, tick_period)?;
        spawn_event_loop(events, msg_tx)?;
        Ok(Self {
            engine,
            credential: None,
            export_dir,
        })
    }

    pub fn credential_present(&self) -> bool {
        self.credential.is_some()
    }

    /// Returns whether a credential is now present.
    pub fn set_credential(&mut self, credential: Option<String>) -> bool {
        self.credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.credential.is_some()
    }

    /// Runs the effects; follow-up messages that complete synchronously are returned.
    pub fn enqueue(&self, effects: Vec<Effect>, now: DateTime<Utc>) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::RunScan { scan_id, trigger } => {
                    scout_info!("RunScan scan_id={} trigger={:?}", scan_id, trigger);
                    self.engine.run_scan(scan_id, self.credential.clone());
                }
                Effect::StartTicker => self.engine.start_ticker(),
                Effect::StopTicker => self.engine.stop_ticker(),
                Effect::ExportCalendar { path, events } => {
                    follow_ups.push(self.export(path, &events, now));
                }
            }
        }
        follow_ups
    }

    fn export(&self, path: Option<PathBuf>, events: &[CampusEvent], now: DateTime<Utc>) -> Msg {
        let entries: Vec<CalendarEntry> = events.iter().map(to_calendar_entry).collect();
        let path = path.unwrap_or_else(|| self.export_dir.join(export_filename(&entries)));
        let result = export_calendar(&path, &entries, now)
            .map(|()| entries.len())
            .map_err(|err| {
                scout_error!("Export to {:?} failed: {}", path, err);
                err.to_string()
            });
        Msg::ExportFinished { path, result, now }
    }
}

pub fn export_calendar(
    path: &Path,
    entries: &[CalendarEntry],
    stamp: DateTime<Utc>,
) -> Result<(), ExportError> {
    let document = ics_document(entries, stamp);
    write_calendar_file(path, &document)?;
    scout_info!("Wrote {} events to {:?}", entries.len(), path);
    Ok(())
}

fn spawn_event_loop<T>(
    events: mpsc::Receiver<EngineEvent>,
    msg_tx: mpsc::Sender<T>,
) -> io::Result<()>
where
    T: From<Msg> + Send + 'static,
{
    thread::Builder::new()
        .name("scout-events".to_string())
        .spawn(move || {
            for event in events {
                let Some(msg) = map_engine_event(event, Utc::now()) else {
                    continue;
                };
                if msg_tx.send(T::from(msg)).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

/// Translate an engine event into a core message. `now` stamps scan completions.
pub fn map_engine_event(event: EngineEvent, now: DateTime<Utc>) -> Option<Msg> {
    match event {
        EngineEvent::Progress(progress) => map_stage(progress.stage).map(|stage| Msg::ScanProgress {
            scan_id: progress.scan_id,
            stage,
        }),
        EngineEvent::ScanCompleted { scan_id, result } => {
            let outcome = match result {
                Ok(events) => ScanOutcome::Found(events.into_iter().map(to_draft).collect()),
                Err(err) => {
                    scout_warn!("Scan {} failed: {}", scan_id, err);
                    ScanOutcome::Failed(ScanFailure {
                        kind: map_failure(err.kind),
                        message: err.message,
                    })
                }
            };
            Some(Msg::ScanFinished {
                scan_id,
                outcome,
                now,
            })
        }
        EngineEvent::Tick { now } => Some(Msg::Tick { now }),
    }
}

fn map_stage(stage: scout_engine::ScanStage) -> Option<ScanStage> {
    match stage {
        scout_engine::ScanStage::Fetching => Some(ScanStage::Fetching),
        scout_engine::ScanStage::Normalizing => Some(ScanStage::Normalizing),
        scout_engine::ScanStage::Done => None,
    }
}

fn map_failure(kind: scout_engine::FailureKind) -> FailureKind {
    match kind {
        scout_engine::FailureKind::MissingCredential => FailureKind::MissingCredential,
        scout_engine::FailureKind::SourceUnreachable => FailureKind::SourceUnreachable,
        scout_engine::FailureKind::NormalizationFailed => FailureKind::NormalizationFailed,
    }
}

pub fn to_draft(event: NormalizedEvent) -> EventDraft {
    EventDraft {
        title: event.title,
        location: event.location,
        description: event.description,
        start: event.start,
        end: event.end,
        source_url: Some(event.source_url),
    }
}

pub fn to_calendar_entry(event: &CampusEvent) -> CalendarEntry {
    CalendarEntry {
        uid: event.id.to_string(),
        title: event.title.clone(),
        description: event.description.clone(),
        location: event.location.clone(),
        start: event.start,
        end: event.end,
        source_url: event.source_url.clone(),
    }
}
