//! Concurrent event consumer.
//!
//! A single reader thread pulls events from the [`EventTransport`] into a
//! bounded [`IntakeQueue`]; a pool of worker threads drains the queue and
//! hands each event to the [`EventHandler`]. The transport's own delivery loop
//! runs on a third kind of thread. [`Consumer::stop`] cancels the shared
//! [`ShutdownToken`], closes the queue, and joins every thread before
//! returning a [`StopReport`].
//!
//! Handler calls have no timeout; a handler that never returns keeps
//! [`Consumer::stop`] waiting on its worker.

mod queue;
mod reader;
mod shutdown;
mod worker;

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chime_config::Config;
use tracing::{Span, debug, error, info, info_span, warn};

use crate::handler::EventHandler;
use crate::monitor::{Labels, Monitor, WORKERS};
use crate::telemetry::SERVICE_NAME;
use crate::transport::EventTransport;

pub use self::queue::{Closed, IntakeQueue};
pub use self::shutdown::ShutdownToken;

const CONSUMER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::consumer");

/// Labels attached to every consumer metric.
const SERVICE_LABELS: &Labels<'static> = &[("service", SERVICE_NAME)];

/// Worker pool size used when the requested size is not positive.
pub const DEFAULT_WORKERS: usize = chime_config::DEFAULT_WORKERS as usize;

/// Longest single wait the reader performs on the transport.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const DEFAULT_WORKER_COUNT: NonZeroUsize = match NonZeroUsize::new(DEFAULT_WORKERS) {
    Some(count) => count,
    None => NonZeroUsize::MIN,
};

/// Validated worker pool size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(NonZeroUsize);

impl WorkerCount {
    /// Interprets a requested pool size, falling back to
    /// [`DEFAULT_WORKERS`] for values below one.
    #[must_use]
    pub fn from_requested(requested: i64) -> Self {
        let count = usize::try_from(requested)
            .ok()
            .and_then(NonZeroUsize::new)
            .unwrap_or(DEFAULT_WORKER_COUNT);
        Self(count)
    }

    /// Returns the pool size.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self(DEFAULT_WORKER_COUNT)
    }
}

/// Tunables for a [`Consumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Number of worker threads, which is also the queue capacity.
    pub workers: WorkerCount,
    /// Upper bound on each reader wait.
    pub poll_interval: Duration,
}

impl ConsumerSettings {
    /// Builds settings with the given worker count and the default poll
    /// interval.
    #[must_use]
    pub const fn new(workers: WorkerCount) -> Self {
        Self {
            workers,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Derives settings from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(WorkerCount::from_requested(config.requested_workers()))
    }
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self::new(WorkerCount::default())
    }
}

/// Outcome of [`Consumer::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Reader and worker threads that were joined, including panicked ones.
    pub listeners: usize,
    /// Events taken from the transport but never handled: those buffered
    /// when the queue closed plus any the reader held at that moment.
    pub dropped_events: usize,
    /// Threads (listeners or transport) that terminated by panicking.
    pub panicked: usize,
}

#[derive(Debug)]
struct Running {
    workers: Vec<JoinHandle<()>>,
    reader: Option<JoinHandle<usize>>,
    transport: Option<JoinHandle<()>>,
}

#[derive(Debug)]
enum Lifecycle {
    Idle,
    Running(Running),
    Stopped(StopReport),
}

/// Reader, worker pool, and shutdown coordinator.
pub struct Consumer {
    settings: ConsumerSettings,
    transport: Arc<dyn EventTransport>,
    handler: Arc<dyn EventHandler>,
    monitor: Arc<dyn Monitor>,
    queue: Arc<IntakeQueue>,
    shutdown: ShutdownToken,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("settings", &self.settings)
            .field("queue", &self.queue)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl Consumer {
    /// Builds an idle consumer.
    #[must_use]
    pub fn new(
        settings: ConsumerSettings,
        transport: Arc<dyn EventTransport>,
        handler: Arc<dyn EventHandler>,
        monitor: Arc<dyn Monitor>,
    ) -> Self {
        debug!(
            target: CONSUMER_TARGET,
            workers = settings.workers.get(),
            poll_interval_ms = u64::try_from(settings.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "consumer configured"
        );
        Self {
            queue: Arc::new(IntakeQueue::with_capacity(settings.workers.get())),
            settings,
            transport,
            handler,
            monitor,
            shutdown: ShutdownToken::new(),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Returns the configured worker pool size.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.settings.workers.get()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the workers, the reader, and the transport thread, then returns.
    ///
    /// Calling `start` on a running or stopped consumer logs and does nothing.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            warn!(target: CONSUMER_TARGET, "consumer already started; ignoring start");
            return;
        }

        let parent = Span::current();
        let workers = self.settings.workers.get();
        let worker_handles: Vec<_> = (1..=workers)
            .filter_map(|worker_id| self.spawn_worker(worker_id, &parent))
            .collect();
        let reader = self.spawn_reader(&parent);
        let transport = self.spawn_transport(&parent);

        self.monitor.gauge(
            WORKERS,
            i64::try_from(workers).unwrap_or(i64::MAX),
            SERVICE_LABELS,
        );
        info!(
            target: CONSUMER_TARGET,
            workers,
            listeners = worker_handles.len() + usize::from(reader.is_some()),
            "consumer started"
        );
        *lifecycle = Lifecycle::Running(Running {
            workers: worker_handles,
            reader,
            transport,
        });
    }

    fn spawn_worker(&self, worker_id: usize, parent: &Span) -> Option<JoinHandle<()>> {
        let queue = Arc::clone(&self.queue);
        let handler = Arc::clone(&self.handler);
        let monitor = Arc::clone(&self.monitor);
        let span = info_span!(target: CONSUMER_TARGET, parent: parent, "worker", worker = worker_id);
        spawn_named(format!("chime-worker-{worker_id}"), move || {
            let _entered = span.entered();
            worker::work_loop(worker_id, &queue, handler.as_ref(), monitor.as_ref());
        })
    }

    fn spawn_reader(&self, parent: &Span) -> Option<JoinHandle<usize>> {
        let transport = Arc::clone(&self.transport);
        let queue = Arc::clone(&self.queue);
        let monitor = Arc::clone(&self.monitor);
        let shutdown = self.shutdown.clone();
        let poll_interval = self.settings.poll_interval;
        let span = info_span!(target: CONSUMER_TARGET, parent: parent, "reader");
        spawn_named(String::from("chime-reader"), move || {
            let _entered = span.entered();
            reader::read_loop(
                transport.as_ref(),
                &queue,
                monitor.as_ref(),
                &shutdown,
                poll_interval,
            )
        })
    }

    fn spawn_transport(&self, parent: &Span) -> Option<JoinHandle<()>> {
        let transport = Arc::clone(&self.transport);
        let shutdown = self.shutdown.clone();
        let span = info_span!(target: CONSUMER_TARGET, parent: parent, "transport");
        spawn_named(String::from("chime-transport"), move || {
            let _entered = span.entered();
            transport.run(&shutdown);
        })
    }

    /// Stops the consumer and waits for every thread to finish.
    ///
    /// The first call cancels the shutdown token, closes the intake queue
    /// (discarding buffered events), and joins the reader, the workers, and
    /// the transport thread. An event the reader was pushing when the queue
    /// closed is counted as dropped too. Later calls return the same report.
    pub fn stop(&self) -> StopReport {
        let mut lifecycle = self.lifecycle();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped(StopReport::default())) {
            Lifecycle::Stopped(report) => {
                info!(target: CONSUMER_TARGET, "consumer already stopped");
                *lifecycle = Lifecycle::Stopped(report);
                report
            }
            Lifecycle::Idle => {
                self.shutdown.cancel();
                self.queue.close();
                info!(target: CONSUMER_TARGET, "consumer stopped before start");
                StopReport::default()
            }
            Lifecycle::Running(running) => {
                info!(target: CONSUMER_TARGET, "stopping consumer");
                self.shutdown.cancel();
                let dropped_events = self.queue.close();
                let report = join_all(running, dropped_events);
                info!(
                    target: CONSUMER_TARGET,
                    listeners = report.listeners,
                    dropped_events = report.dropped_events,
                    panicked = report.panicked,
                    "consumer stopped"
                );
                *lifecycle = Lifecycle::Stopped(report);
                report
            }
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.queue.close();
    }
}

fn spawn_named<F, T>(name: String, body: F) -> Option<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match thread::Builder::new().name(name.clone()).spawn(body) {
        Ok(handle) => Some(handle),
        Err(spawn_error) => {
            error!(
                target: CONSUMER_TARGET,
                thread = %name,
                error = %spawn_error,
                "failed to spawn consumer thread"
            );
            None
        }
    }
}

fn join_all(running: Running, dropped_events: usize) -> StopReport {
    let mut report = StopReport {
        dropped_events,
        ..StopReport::default()
    };
    if let Some(reader) = running.reader {
        match reader.join() {
            Ok(rejected) => report.dropped_events += rejected,
            Err(_) => {
                error!(target: CONSUMER_TARGET, "reader panicked");
                report.panicked += 1;
            }
        }
        report.listeners += 1;
    }
    for handle in running.workers {
        let name = handle.thread().name().unwrap_or("worker").to_owned();
        if handle.join().is_err() {
            error!(target: CONSUMER_TARGET, thread = %name, "worker panicked");
            report.panicked += 1;
        }
        report.listeners += 1;
    }
    if let Some(transport) = running.transport
        && transport.join().is_err()
    {
        error!(target: CONSUMER_TARGET, "transport thread panicked");
        report.panicked += 1;
    }
    report
}
