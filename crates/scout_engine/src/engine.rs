use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use scout_logging::scout_warn;

use crate::pipeline::{ChannelProgressSink, ScanPipeline};
use crate::ticker::Ticker;
use crate::{EngineEvent, ScanId};

enum EngineCommand {
    RunScan {
        scan_id: ScanId,
        credential: Option<String>,
    },
    StartTicker,
    StopTicker,
}

/// Owns the worker thread and its tokio runtime. Dropping the handle ends the
/// worker, which stops the ticker and tears down the runtime.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(
        pipeline: ScanPipeline,
        tick_period: Duration,
    ) -> io::Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let pipeline = Arc::new(pipeline);

        thread::Builder::new()
            .name("scout-engine".to_string())
            .spawn(move || {
                let mut ticker = Ticker::new(tick_period);
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::RunScan {
                            scan_id,
                            credential,
                        } => {
                            let pipeline = pipeline.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                run_scan(&pipeline, scan_id, credential, event_tx).await;
                            });
                        }
                        EngineCommand::StartTicker => {
                            ticker.start(runtime.handle(), event_tx.clone())
                        }
                        EngineCommand::StopTicker => ticker.stop(),
                    }
                }
                ticker.stop();
            })?;

        Ok((Self { cmd_tx }, event_rx))
    }

    pub fn run_scan(&self, scan_id: ScanId, credential: Option<String>) {
        self.send(EngineCommand::RunScan {
            scan_id,
            credential,
        });
    }

    pub fn start_ticker(&self) {
        self.send(EngineCommand::StartTicker);
    }

    pub fn stop_ticker(&self) {
        self.send(EngineCommand::StopTicker);
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            scout_warn!("Engine worker is gone; command dropped");
        }
    }
}

async fn run_scan(
    pipeline: &ScanPipeline,
    scan_id: ScanId,
    credential: Option<String>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let result = pipeline
        .run(scan_id, credential.as_deref(), Utc::now(), &sink)
        .await;
    let _ = event_tx.send(EngineEvent::ScanCompleted { scan_id, result });
}
