//! Decode worker thread.
//!
//! Owns the decoder and the strategy chain. Receives one frame at a time,
//! reports exactly one success or failure per frame, and emits nothing once
//! its running flag has been cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use scanloop_core::{DecodeResult, Frame, FramingRect, ResultPoint};
use scanloop_decode::{
    AutoZoomAdvisor, AutoZoomConfig, DecodeAttempt, DecodeHints, DecodeStrategyExecutor, Decoder,
    StrategyOptions, ZoomAdvice,
};

use crate::{CameraHandle, CaptureError};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub(crate) const WORKER_THREAD_NAME: &str = "scanloop-decode";

/// Control context -> worker.
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    FrameReady { request: u64, frame: Frame },
    Quit,
}

/// Worker (and frame sinks) -> control context.
#[derive(Debug)]
pub(crate) enum CaptureEvent {
    DecodeSucceeded {
        request: u64,
        result: DecodeResult,
        attempts: Vec<DecodeAttempt>,
        deliver_at: Instant,
    },
    DecodeFailed {
        request: u64,
        attempts: Vec<DecodeAttempt>,
    },
    ResultPoint(ResultPoint),
    FrameAbandoned {
        request: u64,
    },
}

/// Everything the worker needs besides its channels.
pub(crate) struct WorkerSettings {
    pub options: StrategyOptions,
    pub hints: DecodeHints,
    pub framing: FramingRect,
    pub auto_zoom: AutoZoomConfig,
}

pub(crate) struct DecodeWorker {
    handle: thread::JoinHandle<()>,
    running: Arc<AtomicBool>,
    quit_ack: Receiver<()>,
}

impl DecodeWorker {
    pub(crate) fn spawn(
        decoder: Box<dyn Decoder + Send>,
        settings: WorkerSettings,
        camera: CameraHandle,
        commands: Receiver<WorkerCommand>,
        events: Sender<CaptureEvent>,
    ) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ack_tx, quit_ack) = crossbeam_channel::bounded(1);

        let mut hints = settings.hints;
        hints.point_callback = Some(point_forwarder(events.clone(), running.clone()));
        let executor = DecodeStrategyExecutor::new(decoder, hints, settings.framing);
        let advisor = AutoZoomAdvisor::new(settings.auto_zoom);

        let mut state = WorkerLoop {
            executor,
            advisor,
            options: settings.options,
            camera,
            events,
            running: running.clone(),
        };
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                state.run(&commands);
                let _ = ack_tx.send(());
            })
            .map_err(CaptureError::WorkerSpawn)?;

        Ok(Self {
            handle,
            running,
            quit_ack,
        })
    }

    /// Stop emitting, post quit and wait at most `wait` for the worker to
    /// acknowledge. Returns whether it did.
    pub(crate) fn quit(self, commands: &Sender<WorkerCommand>, wait: Duration) -> bool {
        self.running.store(false, Ordering::SeqCst);
        let _ = commands.send(WorkerCommand::Quit);
        match self.quit_ack.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!("decode worker panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("decode worker did not stop within {wait:?}; detaching");
                false
            }
        }
    }
}

fn point_forwarder(
    events: Sender<CaptureEvent>,
    running: Arc<AtomicBool>,
) -> scanloop_decode::PointCallback {
    Arc::new(move |point| {
        if running.load(Ordering::Relaxed) {
            let _ = events.send(CaptureEvent::ResultPoint(point));
        }
    })
}

struct WorkerLoop {
    executor: DecodeStrategyExecutor<Box<dyn Decoder + Send>>,
    advisor: AutoZoomAdvisor,
    options: StrategyOptions,
    camera: CameraHandle,
    events: Sender<CaptureEvent>,
    running: Arc<AtomicBool>,
}

impl WorkerLoop {
    fn run(&mut self, commands: &Receiver<WorkerCommand>) {
        debug!("decode worker started");
        loop {
            match commands.recv() {
                Ok(WorkerCommand::FrameReady { request, frame }) => {
                    if !self.running.load(Ordering::SeqCst) {
                        continue;
                    }
                    self.decode(request, &frame);
                }
                Ok(WorkerCommand::Quit) | Err(_) => break,
            }
        }
        self.running.store(false, Ordering::SeqCst);
        debug!("decode worker stopped");
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    fn decode(&mut self, request: u64, frame: &Frame) {
        let started = Instant::now();
        let outcome = self.executor.execute(frame, &self.options);
        let elapsed = started.elapsed();

        let event = match outcome.result {
            Some(result) => {
                debug!(
                    "found {} in {:.1} ms via {:?}",
                    result.format,
                    elapsed.as_secs_f64() * 1e3,
                    outcome.attempts.last().map(|a| a.strategy)
                );
                // Symbol size is judged against the preview width whatever
                // orientation the symbol was decoded in.
                let now = Instant::now();
                let deliver_at = match self
                    .advisor
                    .advise(&result, frame.width, now, &mut self.camera)
                {
                    ZoomAdvice::DeliverNow => now,
                    ZoomAdvice::Defer(delay) => now.checked_add(delay).unwrap_or(now),
                };
                CaptureEvent::DecodeSucceeded {
                    request,
                    result,
                    attempts: outcome.attempts,
                    deliver_at,
                }
            }
            None => {
                debug!(
                    "no symbol after {} attempts in {:.1} ms",
                    outcome.attempts.len(),
                    elapsed.as_secs_f64() * 1e3
                );
                CaptureEvent::DecodeFailed {
                    request,
                    attempts: outcome.attempts,
                }
            }
        };

        if self.running.load(Ordering::SeqCst) {
            let _ = self.events.send(event);
        }
    }
}
