use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::engine::SubjectId;

/// Handle to a periodic recompute task. Dropping it also stops the task.
#[derive(Debug)]
pub struct MonitorHandle {
    subject: SubjectId,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timer and wait for any in-flight tick. No tick starts afterwards.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(error) = self.task.await {
            warn!(subject = %self.subject, error = %error, "monitor task ended abnormally");
        }
    }
}

/// Run `tick` immediately and then every `interval` until stopped.
pub fn spawn_monitor<F, Fut>(subject: SubjectId, interval: Duration, mut tick: F) -> MonitorHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (stop, mut stopped) = watch::channel(false);
    let label = subject.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    tick().await;
                }
            }
        }

        debug!(subject = %label, "monitor stopped");
    });

    MonitorHandle {
        subject,
        stop,
        task,
    }
}
