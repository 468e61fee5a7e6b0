//! Thread-confined work scheduling for the map canvas.
//!
//! # Responsibility
//! - Queue render jobs for execution against the single `MapCanvas`.
//! - Support delayed jobs for library workarounds that need a settle time.
//!
//! # Invariants
//! - Jobs run one at a time, in posting order among jobs that are due.
//! - The canvas is owned by the scheduler and never leaves its thread.
//! - Posting never blocks on a running job.

use crate::map::surface::MapCanvas;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Unit of work executed on the render thread.
pub type RenderJob = Box<dyn FnOnce(&mut MapCanvas) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The render queue no longer accepts jobs.
    Closed,
    /// A barrier did not complete in time.
    Timeout,
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "render queue is closed"),
            Self::Timeout => write!(f, "render queue did not drain in time"),
        }
    }
}

impl Error for ScheduleError {}

/// Posting side of a render queue.
pub trait RenderScheduler: Send + Sync {
    fn post(&self, job: RenderJob) -> Result<(), ScheduleError>;
    fn post_delayed(&self, delay: Duration, job: RenderJob) -> Result<(), ScheduleError>;
}

enum RenderCommand {
    Run(RenderJob),
    RunAt(Instant, RenderJob),
    Shutdown,
}

/// Dedicated OS thread that owns the canvas and drains a job channel.
pub struct RenderThread {
    sender: Sender<RenderCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenderThread {
    /// Spawns the render thread. Fails only when the OS refuses a new thread.
    pub fn spawn(canvas: MapCanvas) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded();
        let handle = std::thread::Builder::new()
            .name("froody-render".to_string())
            .spawn(move || run_render_loop(canvas, receiver))?;
        info!("event=render_thread_start module=render status=ok");
        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Blocks until every job posted before this call has run.
    ///
    /// Delayed jobs that are not yet due are not waited for.
    pub fn wait_for_idle(&self, timeout: Duration) -> Result<(), ScheduleError> {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        self.post(Box::new(move |_canvas| {
            let _ = done_tx.send(());
        }))?;
        done_rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ScheduleError::Timeout,
            RecvTimeoutError::Disconnected => ScheduleError::Closed,
        })
    }

    /// Stops the loop after already queued immediate jobs and joins the thread.
    pub fn shutdown(&self) {
        let _ = self.sender.send(RenderCommand::Shutdown);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("event=render_thread_stop module=render status=error reason=job_panicked");
            }
        }
    }
}

impl RenderScheduler for RenderThread {
    fn post(&self, job: RenderJob) -> Result<(), ScheduleError> {
        self.sender
            .send(RenderCommand::Run(job))
            .map_err(|_| ScheduleError::Closed)
    }

    fn post_delayed(&self, delay: Duration, job: RenderJob) -> Result<(), ScheduleError> {
        self.sender
            .send(RenderCommand::RunAt(Instant::now() + delay, job))
            .map_err(|_| ScheduleError::Closed)
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_render_loop(mut canvas: MapCanvas, receiver: Receiver<RenderCommand>) {
    // Kept sorted by due time; equal deadlines stay in posting order.
    let mut delayed: VecDeque<(Instant, RenderJob)> = VecDeque::new();

    loop {
        let command = match delayed.front() {
            Some((due, _)) => {
                let wait = due.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(wait) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            Some(RenderCommand::Run(job)) => job(&mut canvas),
            Some(RenderCommand::RunAt(due, job)) => {
                let index = delayed.partition_point(|(queued, _)| *queued <= due);
                delayed.insert(index, (due, job));
            }
            Some(RenderCommand::Shutdown) => break,
            None => {}
        }

        let now = Instant::now();
        while delayed.front().is_some_and(|(due, _)| *due <= now) {
            if let Some((_, job)) = delayed.pop_front() {
                job(&mut canvas);
            }
        }
    }

    debug!(
        "event=render_thread_stop module=render status=ok dropped_delayed={}",
        delayed.len()
    );
}

struct PendingJob {
    due: Duration,
    job: RenderJob,
}

/// Deterministic in-process scheduler driven by explicit `run_*` calls.
///
/// Time is virtual: delayed jobs become due when the clock is advanced.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

struct ManualState {
    canvas: MapCanvas,
    now: Duration,
    pending: Vec<PendingJob>,
}

impl ManualScheduler {
    pub fn new(canvas: MapCanvas) -> Self {
        Self {
            state: Mutex::new(ManualState {
                canvas,
                now: Duration::ZERO,
                pending: Vec::new(),
            }),
        }
    }

    /// Number of queued jobs, due or not.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Virtual due times of queued jobs.
    pub fn pending_due_times(&self) -> Vec<Duration> {
        self.lock().pending.iter().map(|pending| pending.due).collect()
    }

    /// Runs every job that is due now. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Advances the virtual clock by `by` and runs every job due by then.
    pub fn advance(&self, by: Duration) -> usize {
        let mut state = self.lock();
        state.now += by;
        let mut ran = 0;

        loop {
            let now = state.now;
            let next = state
                .pending
                .iter()
                .enumerate()
                .filter(|(_, pending)| pending.due <= now)
                .min_by_key(|(index, pending)| (pending.due, *index))
                .map(|(index, _)| index);
            let Some(index) = next else {
                break;
            };
            let pending = state.pending.remove(index);
            (pending.job)(&mut state.canvas);
            ran += 1;
        }

        ran
    }

    /// Gives read access to the canvas between runs.
    pub fn with_canvas<T>(&self, f: impl FnOnce(&MapCanvas) -> T) -> T {
        f(&self.lock().canvas)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderScheduler for ManualScheduler {
    fn post(&self, job: RenderJob) -> Result<(), ScheduleError> {
        self.post_delayed(Duration::ZERO, job)
    }

    fn post_delayed(&self, delay: Duration, job: RenderJob) -> Result<(), ScheduleError> {
        let mut state = self.lock();
        let due = state.now + delay;
        state.pending.push(PendingJob { due, job });
        Ok(())
    }
}
