//! Capture sessions: serial frame delivery into a [`FrameOrchestrator`].
//!
//! Frames are handed to a dedicated processing thread one at a time. The capture layer either
//! [`offer`]s frames, in which case frames arriving while the previous one is still being processed
//! are dropped, or [`deliver`]s them, blocking until the processing thread takes the frame.
//!
//! A pose estimator failure is fatal: the session issues its stop signal once, stops accepting
//! frames and the processing thread exits.
//!
//! [`offer`]: FrameSink::offer
//! [`deliver`]: FrameSink::deliver

use std::{
    io,
    panic::resume_unwind,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::classifier::GestureClassifier;
use crate::drop::defer;
use crate::estimator::{Frame, PoseEstimator};
use crate::orchestrator::{FrameError, FrameOrchestrator};
use crate::presenter::Presenter;
use crate::timer::FpsCounter;

/// Receives the session's stop signal.
///
/// [`SessionControl::halt`] is called at most once per session, from the processing thread, after
/// the session has stopped accepting frames.
pub trait SessionControl: Send + 'static {
    fn halt(&mut self, error: &FrameError);
}

impl<F: FnMut(&FrameError) + Send + 'static> SessionControl for F {
    fn halt(&mut self, error: &FrameError) {
        self(error)
    }
}

/// Counters shared between a session and its [`FrameSink`]s.
#[derive(Default)]
struct Shared {
    running: AtomicBool,
    processed: AtomicU64,
    dropped: AtomicU64,
}

/// A snapshot of a session's frame counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames that went through the pipeline.
    pub processed: u64,
    /// Frames discarded by [`FrameSink::offer`] because the pipeline was busy.
    pub dropped: u64,
}

/// What happened to a frame passed to [`FrameSink::offer`] or [`FrameSink::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// The processing thread was busy and the frame was discarded.
    Dropped,
    /// The session is no longer running.
    Stopped,
}

/// The capture layer's handle for feeding frames into a [`CaptureSession`].
#[derive(Clone)]
pub struct FrameSink {
    sender: Sender<Frame>,
    shared: Arc<Shared>,
}

impl FrameSink {
    /// Hands `frame` to the processing thread if it is idle, and drops it otherwise.
    pub fn offer(&self, frame: Frame) -> Delivery {
        if !self.is_running() {
            return Delivery::Stopped;
        }

        match self.sender.try_send(frame) {
            Ok(()) => Delivery::Accepted,
            Err(TrySendError::Full(frame)) => {
                log::trace!("pipeline busy, dropping frame {}", frame.seq());
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Stopped,
        }
    }

    /// Blocks until the processing thread accepts `frame`, or the session stops.
    pub fn deliver(&self, frame: Frame) -> Delivery {
        if !self.is_running() {
            return Delivery::Stopped;
        }

        match self.sender.send(frame) {
            Ok(()) => Delivery::Accepted,
            Err(_) => Delivery::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

/// Owns a [`FrameOrchestrator`] running on a dedicated processing thread.
///
/// Dropping the session stops it and waits for the frame currently being processed (if any).
pub struct CaptureSession<E, C, P> {
    sink: FrameSink,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<FrameOrchestrator<E, C, P>>>,
}

impl<E, C, P> CaptureSession<E, C, P>
where
    E: PoseEstimator + 'static,
    C: GestureClassifier + 'static,
    P: Presenter + Send + 'static,
{
    /// Starts processing frames with `orchestrator`.
    ///
    /// `control` receives the stop signal if the pose estimator fails.
    pub fn start<S: SessionControl>(
        orchestrator: FrameOrchestrator<E, C, P>,
        control: S,
    ) -> io::Result<Self> {
        // A zero-capacity channel only accepts a frame while the processing thread is waiting.
        let (sender, frames) = channel::bounded(0);
        let (stop, stop_recv) = channel::bounded(0);
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            ..Shared::default()
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("frame processor".into())
            .spawn(move || process_frames(orchestrator, control, frames, stop_recv, thread_shared))?;

        Ok(Self {
            sink: FrameSink { sender, shared },
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Returns a new handle for feeding frames into this session.
    pub fn sink(&self) -> FrameSink {
        self.sink.clone()
    }

    pub fn is_running(&self) -> bool {
        self.sink.is_running()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            processed: self.sink.shared.processed.load(Ordering::Relaxed),
            dropped: self.sink.shared.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stops the session and returns the orchestrator once the processing thread has exited.
    ///
    /// A frame that is currently being processed runs to completion first.
    pub fn stop(mut self) -> FrameOrchestrator<E, C, P> {
        self.signal_stop();
        self.join()
    }

    /// Waits for the session to halt on its own (after a pose estimator failure) and returns the
    /// orchestrator.
    pub fn wait(mut self) -> FrameOrchestrator<E, C, P> {
        self.join()
    }

    fn signal_stop(&mut self) {
        self.sink.shared.running.store(false, Ordering::Release);
        // Disconnecting the stop channel wakes up the processing thread.
        drop(self.stop.take());
    }

    fn join(&mut self) -> FrameOrchestrator<E, C, P> {
        let handle = self
            .handle
            .take()
            .expect("`join` called on a session that was already joined");
        match handle.join() {
            Ok(orchestrator) => orchestrator,
            Err(payload) => resume_unwind(payload),
        }
    }
}

impl<E, C, P> Drop for CaptureSession<E, C, P> {
    fn drop(&mut self) {
        self.sink.shared.running.store(false, Ordering::Release);
        drop(self.stop.take());

        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                if !thread::panicking() {
                    resume_unwind(payload);
                }
            }
        }
    }
}

fn process_frames<E, C, P, S>(
    mut orchestrator: FrameOrchestrator<E, C, P>,
    mut control: S,
    frames: Receiver<Frame>,
    stop: Receiver<()>,
    shared: Arc<Shared>,
) -> FrameOrchestrator<E, C, P>
where
    E: PoseEstimator,
    C: GestureClassifier,
    P: Presenter,
    S: SessionControl,
{
    log::trace!("frame processor starting");
    let _guard = defer(|| log::trace!("frame processor exiting"));

    let mut fps = FpsCounter::new("pipeline");
    loop {
        let frame = channel::select! {
            recv(frames) -> frame => match frame {
                Ok(frame) => frame,
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        };

        let result = orchestrator.process(&frame);
        shared.processed.fetch_add(1, Ordering::Relaxed);
        if let Err(error) = result {
            let FrameError::Detector(cause) = &error;
            log::error!(
                "frame {}: {error}: {cause:#}; stopping capture session",
                frame.seq()
            );
            shared.running.store(false, Ordering::Release);
            control.halt(&error);
            break;
        }

        fps.tick_with(orchestrator.timers());
    }

    orchestrator
}
