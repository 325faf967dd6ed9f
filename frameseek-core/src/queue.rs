//! # Asynchronous Task Queue
//!
//! Strict FIFO of frame requests executed by one dedicated worker thread.
//! Producers enqueue from any thread and get a [`RequestId`] back at once;
//! results arrive through the callbacks attached to each request.
//!
//! Locking: the queue lock guards the task list and id counter, the engine's
//! session lock guards decoding. The worker never holds both, and holds
//! neither while running callbacks, so callbacks may issue new requests.
//!
//! Cancellation is best effort. A queued task is skipped when popped; an
//! in-flight task finishes its decode step but its result is dropped.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::decode::{duplicate_frame, VideoRange};
use crate::engine::MediaEngine;
use crate::error::{FrameError, QueueError};
use crate::frame::{AudioFrame, MediaKind, VideoFrame};

pub type RequestId = u64;

/// Callback for single-frame requests.
pub type FrameCallback<F> = Box<dyn FnOnce(RequestId, Result<F, FrameError>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeProgress {
    pub completed: usize,
    pub total: usize,
}

/// Final report of a range request.
#[derive(Debug)]
pub struct RangeSummary {
    pub requested: usize,
    pub delivered: usize,
    /// Why the range ended early, `None` when every frame was delivered
    pub stopped_by: Option<FrameError>,
}

/// Callbacks of a range request.
pub struct RangeCallbacks {
    /// Each produced frame, in order
    pub on_frame: Box<dyn FnMut(RequestId, VideoFrame) + Send>,
    /// After every delivered frame
    pub on_progress: Box<dyn FnMut(RequestId, RangeProgress) + Send>,
    /// Once, when the range ends (not invoked if cancelled)
    pub on_done: Option<Box<dyn FnOnce(RequestId, RangeSummary) + Send>>,
}

impl RangeCallbacks {
    pub fn new(
        on_frame: impl FnMut(RequestId, VideoFrame) + Send + 'static,
        on_progress: impl FnMut(RequestId, RangeProgress) + Send + 'static,
    ) -> Self {
        Self {
            on_frame: Box::new(on_frame),
            on_progress: Box::new(on_progress),
            on_done: None,
        }
    }

    pub fn on_done(mut self, f: impl FnOnce(RequestId, RangeSummary) + Send + 'static) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }
}

// ============================================================================
// Tasks
// ============================================================================

enum Target {
    Time(i64),
    Index(i64),
}

enum TaskKind {
    Video(Target, FrameCallback<VideoFrame>),
    Audio(Target, FrameCallback<AudioFrame>),
    VideoRange(VideoRange, RangeCallbacks),
}

struct Task {
    id: RequestId,
    cancelled: Arc<AtomicBool>,
    kind: TaskKind,
}

struct QueueState {
    tasks: VecDeque<Task>,
    next_id: RequestId,
    /// Task currently being executed by the worker
    in_flight: Option<(RequestId, Arc<AtomicBool>)>,
    stopping: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `f`, turning a panic into [`FrameError::TaskPanicked`].
fn guarded<R>(f: impl FnOnce() -> Result<R, FrameError>) -> Result<R, FrameError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(FrameError::TaskPanicked(panic_message(payload))))
}

/// Run a user callback; a panic there is logged and swallowed.
fn invoke(id: RequestId, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(id, "callback panicked: {}", panic_message(payload));
    }
}

// ============================================================================
// Queue
// ============================================================================

pub struct TaskQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Start the worker thread for `engine`.
    pub fn new(engine: Arc<MediaEngine>) -> Result<Self, QueueError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                next_id: 1,
                in_flight: None,
                stopping: false,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(engine.config().worker_thread_name.clone())
            .spawn(move || worker_loop(engine, worker_shared))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    fn push(&self, kind: TaskKind) -> Result<RequestId, QueueError> {
        let mut state = self.shared.state.lock();
        if state.stopping {
            return Err(QueueError::Released);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.push_back(Task {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            kind,
        });
        drop(state);

        self.shared.wake.notify_one();
        debug!(id, "task enqueued");
        Ok(id)
    }

    pub fn enqueue_video_frame(
        &self,
        target_ms: i64,
        callback: impl FnOnce(RequestId, Result<VideoFrame, FrameError>) + Send + 'static,
    ) -> Result<RequestId, QueueError> {
        self.push(TaskKind::Video(Target::Time(target_ms), Box::new(callback)))
    }

    pub fn enqueue_video_frame_at_index(
        &self,
        index: i64,
        callback: impl FnOnce(RequestId, Result<VideoFrame, FrameError>) + Send + 'static,
    ) -> Result<RequestId, QueueError> {
        self.push(TaskKind::Video(Target::Index(index), Box::new(callback)))
    }

    pub fn enqueue_audio_frame(
        &self,
        target_ms: i64,
        callback: impl FnOnce(RequestId, Result<AudioFrame, FrameError>) + Send + 'static,
    ) -> Result<RequestId, QueueError> {
        self.push(TaskKind::Audio(Target::Time(target_ms), Box::new(callback)))
    }

    pub fn enqueue_audio_frame_at_index(
        &self,
        index: i64,
        callback: impl FnOnce(RequestId, Result<AudioFrame, FrameError>) + Send + 'static,
    ) -> Result<RequestId, QueueError> {
        self.push(TaskKind::Audio(Target::Index(index), Box::new(callback)))
    }

    pub fn enqueue_video_range(
        &self,
        range: VideoRange,
        callbacks: RangeCallbacks,
    ) -> Result<RequestId, QueueError> {
        self.push(TaskKind::VideoRange(range, callbacks))
    }

    /// Mark `id` cancelled. Returns false if it is neither queued nor running.
    pub fn cancel(&self, id: RequestId) -> bool {
        let state = self.shared.state.lock();
        let flag = state
            .tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| &t.cancelled)
            .or_else(|| {
                state
                    .in_flight
                    .as_ref()
                    .filter(|(running, _)| *running == id)
                    .map(|(_, flag)| flag)
            });

        match flag {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                debug!(id, "task cancelled");
                true
            }
            None => false,
        }
    }

    /// Queued tasks that have not been cancelled.
    pub fn pending(&self) -> usize {
        self.shared
            .state
            .lock()
            .tasks
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    pub fn is_running(&self) -> bool {
        !self.shared.state.lock().stopping && self.worker.lock().is_some()
    }

    /// Stop the worker and wait for it. Queued tasks are discarded without
    /// their callbacks; a task already running completes first.
    ///
    /// Called from a callback (on the worker itself) it only signals the stop;
    /// the worker exits once that callback returns.
    pub fn release(&self) {
        let discarded = {
            let mut state = self.shared.state.lock();
            state.stopping = true;
            std::mem::take(&mut state.tasks)
        };
        self.shared.wake.notify_all();

        if !discarded.is_empty() {
            debug!(count = discarded.len(), "discarding queued tasks");
        }
        drop(discarded);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                debug!("release requested from the decode worker, not joining");
                return;
            }
            if handle.join().is_err() {
                error!("decode worker exited by panic");
            }
            info!("task queue released");
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Worker
// ============================================================================

fn worker_loop(engine: Arc<MediaEngine>, shared: Arc<Shared>) {
    debug!("decode worker started");
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                if state.stopping {
                    debug!("decode worker stopping");
                    return;
                }
                if let Some(task) = state.tasks.pop_front() {
                    state.in_flight = Some((task.id, task.cancelled.clone()));
                    break task;
                }
                shared.wake.wait(&mut state);
            }
        };

        if task.cancelled.load(Ordering::SeqCst) {
            debug!(id = task.id, "skipping cancelled task");
        } else {
            run_task(&engine, task);
        }

        shared.state.lock().in_flight = None;
    }
}

fn run_task(engine: &MediaEngine, task: Task) {
    let Task {
        id,
        cancelled,
        kind,
    } = task;

    match kind {
        TaskKind::Video(target, callback) => {
            let result = guarded(|| match target {
                Target::Time(ms) => engine.video_frame_at(ms),
                Target::Index(index) => engine.video_frame_at_index(index),
            });
            if !cancelled.load(Ordering::SeqCst) {
                invoke(id, || callback(id, result));
            }
        }
        TaskKind::Audio(target, callback) => {
            let result = guarded(|| match target {
                Target::Time(ms) => engine.audio_frame_at(ms),
                Target::Index(index) => engine.audio_frame_at_index(index),
            });
            if !cancelled.load(Ordering::SeqCst) {
                invoke(id, || callback(id, result));
            }
        }
        TaskKind::VideoRange(range, callbacks) => run_range(engine, id, &cancelled, range, callbacks),
    }
}

/// Deliver a range one frame at a time, releasing the session lock between
/// frames. If another caller moved the read position in between (the seek
/// epoch changed), the next target is re-seeked before decoding.
fn run_range(
    engine: &MediaEngine,
    id: RequestId,
    cancelled: &AtomicBool,
    range: VideoRange,
    mut callbacks: RangeCallbacks,
) {
    let plan = guarded(|| engine.with_session(|s| s.plan_range(range)));
    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => {
            if let Some(done) = callbacks.on_done.take() {
                if !cancelled.load(Ordering::SeqCst) {
                    let summary = RangeSummary {
                        requested: 0,
                        delivered: 0,
                        stopped_by: Some(e),
                    };
                    invoke(id, || done(id, summary));
                }
            }
            return;
        }
    };

    let total = plan.len();
    let mut epoch: Option<u64> = None;
    let mut previous: Option<VideoFrame> = None;
    let mut delivered = 0;
    let mut stopped_by = None;

    for k in 0..total {
        if cancelled.load(Ordering::SeqCst) {
            debug!(id, delivered, "range cancelled");
            return;
        }

        let target_ms = plan.target_ms(k);
        let step = guarded(|| {
            engine.with_session(|s| {
                if epoch != Some(s.epoch()) {
                    if epoch.is_some() {
                        debug!(id, target_ms, "session moved by another caller, re-seeking");
                    }
                    s.seek(target_ms, Some(MediaKind::Video))?;
                }
                let frame = s.range_step(target_ms, previous.as_ref())?;
                Ok((frame, s.epoch()))
            })
        });

        let frame = match step {
            Ok((frame, now)) => {
                epoch = Some(now);
                frame
            }
            Err(e) => {
                debug!(id, k, "range ended early: {e}");
                stopped_by = Some(e);
                break;
            }
        };

        // Keep a copy only when the next target can be served from this frame
        let keep = k + 1 < total && plan.target_ms(k + 1) <= frame.pts_ms;
        let deliver = if keep {
            match duplicate_frame(&frame) {
                Ok(copy) => {
                    previous = Some(frame);
                    copy
                }
                Err(e) => {
                    stopped_by = Some(e);
                    break;
                }
            }
        } else {
            previous = None;
            frame
        };

        if cancelled.load(Ordering::SeqCst) {
            debug!(id, delivered, "range cancelled");
            return;
        }
        invoke(id, || (callbacks.on_frame)(id, deliver));
        delivered += 1;
        if cancelled.load(Ordering::SeqCst) {
            debug!(id, delivered, "range cancelled");
            return;
        }
        let progress = RangeProgress {
            completed: delivered,
            total,
        };
        invoke(id, || (callbacks.on_progress)(id, progress));
    }

    if stopped_by.is_some() && delivered < total {
        warn!(id, delivered, total, "range delivered short");
    }
    if let Some(done) = callbacks.on_done.take() {
        if !cancelled.load(Ordering::SeqCst) {
            let summary = RangeSummary {
                requested: total,
                delivered,
                stopped_by,
            };
            invoke(id, || done(id, summary));
        }
    }
}
