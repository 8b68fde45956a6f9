//! Background task registry
//!
//! Every long-running job of the daemon (today the expiry sweep) is
//! registered here so it shares one shutdown token and one panic policy.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Loops on its own input until shutdown
    Worker,
    /// Wakes on a timer
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Worker => "worker",
            TaskKind::Periodic => "periodic",
        })
    }
}

struct TaskEntry {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Owns the spawned jobs and their shutdown token
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let sweeper = ExpirySweeper::new(manager, interval, tasks.shutdown_token());
/// tasks.spawn("expiry_sweeper", TaskKind::Periodic, sweeper.run());
/// tasks.shutdown().await;
/// ```
#[derive(Default)]
pub struct BackgroundTasks {
    entries: Vec<TaskEntry>,
    shutdown: CancellationToken,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start `job` on the runtime
    ///
    /// A panic inside the job is logged and contained. A job that returns
    /// before shutdown was requested is logged as a warning.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(()) if !shutdown.is_cancelled() => {
                    tracing::warn!(task = name, %kind, "Background task exited before shutdown");
                }
                Ok(()) => {}
                Err(payload) => {
                    tracing::error!(
                        task = name,
                        %kind,
                        panic = panic_message(payload.as_ref()),
                        "Background task panicked"
                    );
                }
            }
        });
        tracing::debug!(task = name, %kind, "Background task started");
        self.entries.push(TaskEntry { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: TaskKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.len(),
            workers = self.count(TaskKind::Worker),
            periodic = self.count(TaskKind::Periodic),
            "Background tasks running"
        );
    }

    /// Names of jobs that have already stopped
    pub fn finished(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.handle.is_finished())
            .map(|e| e.name)
            .collect()
    }

    /// Signal shutdown and wait for every job
    pub async fn shutdown(self) {
        tracing::info!(count = self.entries.len(), "Stopping background tasks");
        self.shutdown.cancel();

        for entry in self.entries {
            if let Err(e) = entry.handle.await {
                tracing::error!(task = entry.name, error = ?e, "Background task join failed");
            }
        }
        tracing::info!("Background tasks stopped");
    }
}
