use std::sync::mpsc;
use std::time::Duration;

use chrono::Utc;
use scout_logging::scout_debug;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::EngineEvent;

/// Periodic wake-up source with an explicit start/stop lifecycle.
///
/// At most one interval task runs at a time; stopping or dropping the ticker
/// cancels it.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    running: Option<CancellationToken>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start emitting [`EngineEvent::Tick`] every period. No-op when running.
    pub fn start(
        &mut self,
        runtime: &tokio::runtime::Handle,
        event_tx: mpsc::Sender<EngineEvent>,
    ) {
        if self.running.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.period;
        runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if event_tx.send(EngineEvent::Tick { now: Utc::now() }).is_err() {
                            break;
                        }
                    }
                }
            }
            scout_debug!("Ticker stopped");
        });
        scout_debug!("Ticker started ({:?})", period);
        self.running = Some(token);
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
