use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::LimitPolicy;
use super::error::LimitWarning;
use super::session::SessionInner;
use super::stats::{CaptureState, SessionEvent};

impl LimitPolicy {
    /// Warning for the given buffered size and elapsed time.
    ///
    /// Size is checked before duration; the first matching threshold wins.
    pub fn evaluate(&self, size_bytes: u64, elapsed: Duration) -> Option<LimitWarning> {
        let minutes = elapsed.as_secs_f64() / 60.0;
        let elapsed_minutes = elapsed.as_secs() / 60;

        if size_bytes >= self.max_size_bytes {
            Some(LimitWarning::HardSize {
                size_bytes,
                max_size_bytes: self.max_size_bytes,
            })
        } else if size_bytes >= self.warning_size_bytes {
            Some(LimitWarning::SoftSize {
                size_bytes,
                max_size_bytes: self.max_size_bytes,
            })
        } else if minutes >= self.max_duration_minutes {
            Some(LimitWarning::HardDuration {
                elapsed_minutes,
                max_duration_minutes: self.max_duration_minutes,
            })
        } else if minutes >= self.warning_duration_minutes {
            Some(LimitWarning::SoftDuration {
                elapsed_minutes,
                max_duration_minutes: self.max_duration_minutes,
            })
        } else {
            None
        }
    }
}

fn same_kind(a: Option<&LimitWarning>, b: Option<&LimitWarning>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::mem::discriminant(a) == std::mem::discriminant(b),
        (None, None) => true,
        _ => false,
    }
}

/// Periodic limit check, alive only while the session is recording
pub(crate) struct MonitorHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub(crate) fn spawn(
        inner: Arc<Mutex<SessionInner>>,
        events: broadcast::Sender<SessionEvent>,
        policy: LimitPolicy,
        period: Duration,
        started_at: Instant,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            debug!("Limit monitor started ({:?} period)", period);

            let mut ticker = tokio::time::interval_at(started_at + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }

                let elapsed = started_at.elapsed();
                let changed = {
                    let mut inner = inner.lock();
                    if inner.state != CaptureState::Recording {
                        break;
                    }

                    inner.elapsed_minutes = elapsed.as_secs() / 60;
                    let warning = policy.evaluate(inner.chunks.total_bytes(), elapsed);
                    // Figures refresh every tick; subscribers hear only about a new kind
                    let kind_changed = !same_kind(inner.warning.as_ref(), warning.as_ref());
                    inner.warning = warning.clone();
                    kind_changed.then_some(warning)
                };

                if let Some(warning) = changed {
                    match &warning {
                        Some(w) => warn!("{}", w),
                        None => info!("Recording back within limits"),
                    }
                    let _ = events.send(SessionEvent::WarningChanged(warning));
                }
            }

            debug!("Limit monitor stopped");
        });

        Self { shutdown_tx, task }
    }

    /// Stop the monitor and wait until it has exited
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                error!("Limit monitor panicked: {}", e);
            }
        }
    }

    /// Stop without waiting, for teardown outside async context
    pub(crate) fn cancel(self) {
        let _ = self.shutdown_tx.send(());
        self.task.abort();
    }
}
