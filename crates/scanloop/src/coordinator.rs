//! Capture coordinator: the control-side state machine of a scan session.
//!
//! The coordinator owns the session state, requests preview frames from the
//! camera one at a time, and consumes decode events from the worker through
//! an explicit message pump ([`CaptureCoordinator::dispatch_pending`],
//! [`CaptureCoordinator::wait_and_dispatch`],
//! [`CaptureCoordinator::run_until_done`]). All listener and overlay
//! callbacks run on the thread that drives the pump.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use scanloop_core::{DecodeResult, ResultPoint, Size};
use scanloop_decode::{DecodeAttempt, Decoder};

use crate::inactivity::InactivityTimer;
use crate::worker::{CaptureEvent, DecodeWorker, WorkerCommand, WorkerSettings};
use crate::{CameraHandle, CaptureConfig, CaptureError, FrameSink};

/// Session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureState {
    /// Constructed, not started.
    Idle,
    /// Scanning: a frame is requested or being decoded.
    Preview,
    /// A result was delivered; scanning is paused until restarted.
    Success,
    /// Shut down. Terminal.
    Done,
}

/// Why a session (or a pump run) ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// A result was delivered and the default action finished the session.
    Finished,
    /// [`CaptureCoordinator::shutdown`] was called.
    ShutDown,
    /// No result within the inactivity timeout.
    InactivityTimeout,
    /// Nothing happened for the pump's idle timeout; the session is still live.
    Idle,
}

/// Receives decoded results.
pub trait ResultListener {
    /// Return `true` to take over handling of the result. In single-scan mode
    /// that keeps the session alive instead of finishing it.
    fn on_decoded(&mut self, result: &DecodeResult) -> bool;
}

impl<F> ResultListener for F
where
    F: FnMut(&DecodeResult) -> bool,
{
    fn on_decoded(&mut self, result: &DecodeResult) -> bool {
        self(result)
    }
}

/// Viewfinder feedback.
pub trait Overlay {
    /// A candidate symbol point found mid-decode. Points share the frame
    /// coordinates of decoded results and are mapped to screen coordinates
    /// when a screen resolution is configured.
    fn on_result_point(&mut self, point: ResultPoint);

    /// Scanning resumed after a result.
    fn restart_animation(&mut self);
}

struct DelayedResult {
    deliver_at: Instant,
    result: DecodeResult,
    attempts: Vec<DecodeAttempt>,
}

pub struct CaptureCoordinator {
    config: CaptureConfig,
    state: CaptureState,
    camera: CameraHandle,
    camera_size: Option<Size>,
    decoder: Option<Box<dyn Decoder + Send>>,
    worker: Option<DecodeWorker>,
    commands: Sender<WorkerCommand>,
    pending_commands: Option<Receiver<WorkerCommand>>,
    events: Receiver<CaptureEvent>,
    event_tx: Sender<CaptureEvent>,
    next_request: u64,
    in_flight: Option<u64>,
    delayed: VecDeque<DelayedResult>,
    listener: Box<dyn ResultListener>,
    overlay: Option<Box<dyn Overlay>>,
    inactivity: InactivityTimer,
    last_attempts: Vec<DecodeAttempt>,
    finished: Option<DecodeResult>,
    end: Option<SessionEnd>,
}

impl CaptureCoordinator {
    pub fn new(
        config: CaptureConfig,
        camera: CameraHandle,
        decoder: impl Decoder + Send + 'static,
        listener: impl ResultListener + 'static,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        let (commands, pending_commands) = crossbeam_channel::unbounded();
        let (event_tx, events) = crossbeam_channel::unbounded();
        let inactivity = InactivityTimer::new(config.inactivity_timeout());
        Ok(Self {
            config,
            state: CaptureState::Idle,
            camera,
            camera_size: None,
            decoder: Some(Box::new(decoder)),
            worker: None,
            commands,
            pending_commands: Some(pending_commands),
            events,
            event_tx,
            next_request: 0,
            in_flight: None,
            delayed: VecDeque::new(),
            listener: Box::new(listener),
            overlay: None,
            inactivity,
            last_attempts: Vec::new(),
            finished: None,
            end: None,
        })
    }

    pub fn with_overlay(mut self, overlay: impl Overlay + 'static) -> Self {
        self.overlay = Some(Box::new(overlay));
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn has_frame_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of results held back by auto-zoom.
    pub fn pending_deliveries(&self) -> usize {
        self.delayed.len()
    }

    /// Result that finished a single-scan session.
    pub fn finished_result(&self) -> Option<&DecodeResult> {
        self.finished.as_ref()
    }

    pub fn session_end(&self) -> Option<SessionEnd> {
        self.end
    }

    /// Attempts made on the most recently reported frame.
    pub fn last_attempts(&self) -> &[DecodeAttempt] {
        &self.last_attempts
    }

    /// Open the preview, start the decode worker and request the first frame.
    ///
    /// A camera failure leaves the coordinator in [`CaptureState::Idle`].
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        let (Some(decoder), Some(commands)) =
            (self.decoder.take(), self.pending_commands.take())
        else {
            return Err(CaptureError::InvalidState {
                operation: "start",
                state: self.state,
            });
        };

        let opened = self.camera.lock().and_then(|mut camera| {
            camera.open_preview()?;
            Ok(camera.frame_size())
        });
        self.camera_size = match opened {
            Ok(size) => size,
            Err(err) => {
                self.decoder = Some(decoder);
                self.pending_commands = Some(commands);
                return Err(err.into());
            }
        };

        let settings = WorkerSettings {
            options: self.config.strategy_options(),
            hints: self.config.decode_hints(),
            framing: self.config.framing,
            auto_zoom: self.config.auto_zoom.clone(),
        };
        let worker = DecodeWorker::spawn(
            decoder,
            settings,
            self.camera.clone(),
            commands,
            self.event_tx.clone(),
        );
        self.worker = match worker {
            Ok(worker) => Some(worker),
            Err(err) => {
                if let Ok(mut camera) = self.camera.lock() {
                    camera.stop_preview();
                    camera.close();
                }
                return Err(err);
            }
        };

        self.state = CaptureState::Preview;
        self.inactivity.on_activity(Instant::now());
        info!(
            "capture started ({})",
            if self.config.continuous_scan {
                "continuous"
            } else {
                "single scan"
            }
        );
        self.request_frame();
        Ok(())
    }

    /// Resume scanning after a result. Only valid from
    /// [`CaptureState::Success`]; returns whether scanning resumed.
    pub fn restart_preview_and_decode(&mut self) -> bool {
        if self.state != CaptureState::Success {
            debug!("restart ignored in state {:?}", self.state);
            return false;
        }
        self.state = CaptureState::Preview;
        self.request_frame();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.restart_animation();
        }
        true
    }

    /// Stop the session. Idempotent.
    ///
    /// Stops the preview, asks the worker to quit and waits for it at most
    /// the configured bound, then discards every queued or deferred result.
    pub fn shutdown(&mut self) {
        self.finish(SessionEnd::ShutDown);
    }

    /// Handle the outcome of one frame. Normally driven by the pump.
    pub fn on_frame_decoded(&mut self, result: Option<DecodeResult>, attempts: Vec<DecodeAttempt>) {
        if self.state == CaptureState::Done {
            return;
        }
        self.last_attempts = attempts;
        match result {
            Some(result) => self.deliver(result),
            None => {
                if self.state == CaptureState::Preview {
                    self.request_frame();
                }
            }
        }
    }

    /// Forward a mid-decode point to the overlay.
    pub fn on_result_point(&mut self, point: ResultPoint) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        let point = match (self.config.screen_resolution, self.camera_size) {
            (Some(screen), Some(camera)) => camera_to_screen(point, screen, camera),
            _ => point,
        };
        overlay.on_result_point(point);
    }

    /// Handle every event that is already queued and every deferred result
    /// that is due, without blocking. Returns how many were handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = self.flush_due(Instant::now());
        while self.state != CaptureState::Done {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        self.check_inactivity(Instant::now());
        handled
    }

    /// Block for at most `timeout` until one event arrives or a deferred
    /// result falls due, and handle it. Returns whether anything was handled.
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> bool {
        if self.state == CaptureState::Done {
            return false;
        }
        let now = Instant::now();
        let deadline = [
            now.checked_add(timeout),
            self.delayed.front().map(|d| d.deliver_at),
            self.inactivity.deadline(),
        ]
        .into_iter()
        .flatten()
        .min();

        let received = match deadline {
            Some(deadline) => self.events.recv_deadline(deadline).ok(),
            None => self.events.recv().ok(),
        };
        let mut handled = false;
        if let Some(event) = received {
            self.handle_event(event);
            handled = true;
        }
        handled |= self.flush_due(Instant::now()) > 0;
        self.check_inactivity(Instant::now());
        handled
    }

    /// Pump events until the session is done.
    ///
    /// Returns [`SessionEnd::Idle`] without shutting down when no frame is
    /// outstanding, no result is deferred and nothing happened for
    /// `idle_timeout`.
    pub fn run_until_done(&mut self, idle_timeout: Duration) -> Result<SessionEnd, CaptureError> {
        if self.state == CaptureState::Idle {
            return Err(CaptureError::InvalidState {
                operation: "run_until_done",
                state: self.state,
            });
        }
        let mut last_activity = Instant::now();
        loop {
            if self.state == CaptureState::Done {
                return Ok(self.end.unwrap_or(SessionEnd::ShutDown));
            }
            let wait = if self.is_quiet() {
                idle_timeout.saturating_sub(last_activity.elapsed())
            } else {
                idle_timeout
            };
            if self.wait_and_dispatch(wait) {
                last_activity = Instant::now();
                continue;
            }
            if self.state != CaptureState::Done
                && self.is_quiet()
                && last_activity.elapsed() >= idle_timeout
            {
                return Ok(SessionEnd::Idle);
            }
        }
    }

    fn handle_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::DecodeSucceeded {
                request,
                result,
                attempts,
                deliver_at,
            } => {
                self.settle(request);
                if self.state == CaptureState::Done {
                    return;
                }
                if deliver_at > Instant::now() {
                    debug!("holding result back for auto-zoom");
                    let at = self.delayed.partition_point(|d| d.deliver_at <= deliver_at);
                    self.delayed.insert(
                        at,
                        DelayedResult {
                            deliver_at,
                            result,
                            attempts,
                        },
                    );
                } else {
                    self.on_frame_decoded(Some(result), attempts);
                }
            }
            CaptureEvent::DecodeFailed { request, attempts } => {
                self.settle(request);
                self.on_frame_decoded(None, attempts);
            }
            CaptureEvent::ResultPoint(point) => {
                if self.state != CaptureState::Done {
                    self.on_result_point(point);
                }
            }
            CaptureEvent::FrameAbandoned { request } => {
                if self.settle(request) {
                    debug!("camera abandoned frame request {request}");
                }
            }
        }
    }

    fn is_quiet(&self) -> bool {
        self.in_flight.is_none() && self.delayed.is_empty()
    }

    /// Clear the in-flight marker if it belongs to `request`.
    fn settle(&mut self, request: u64) -> bool {
        if self.in_flight == Some(request) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    fn flush_due(&mut self, now: Instant) -> usize {
        let mut flushed = 0;
        while self.state != CaptureState::Done
            && self.delayed.front().is_some_and(|d| d.deliver_at <= now)
        {
            if let Some(due) = self.delayed.pop_front() {
                self.on_frame_decoded(Some(due.result), due.attempts);
                flushed += 1;
            }
        }
        flushed
    }

    fn check_inactivity(&mut self, now: Instant) {
        if self.state != CaptureState::Done && self.inactivity.is_expired(now) {
            info!("no result within {:?}; ending session", self.config.inactivity_timeout());
            self.finish(SessionEnd::InactivityTimeout);
        }
    }

    fn request_frame(&mut self) {
        if let Some(request) = self.in_flight {
            debug!("frame request {request} still outstanding");
            return;
        }
        let request = self.next_request;
        self.next_request += 1;
        let sink = FrameSink::new(
            request,
            self.config.screen_portrait,
            self.commands.clone(),
            self.event_tx.clone(),
        );
        self.in_flight = Some(request);
        let requested = self
            .camera
            .lock()
            .and_then(|mut camera| camera.request_one_frame(sink));
        if let Err(err) = requested {
            warn!("frame request failed: {err}");
            self.in_flight = None;
        }
    }

    fn deliver(&mut self, result: DecodeResult) {
        self.state = CaptureState::Success;
        self.inactivity.on_activity(Instant::now());
        let intercepted = self.listener.on_decoded(&result);

        if self.config.continuous_scan {
            if self.config.auto_restart {
                self.restart_preview_and_decode();
            }
        } else if !intercepted {
            self.finished = Some(result);
            self.finish(SessionEnd::Finished);
        }
    }

    fn finish(&mut self, reason: SessionEnd) {
        if self.state == CaptureState::Done {
            return;
        }
        let started = self.state != CaptureState::Idle;
        self.state = CaptureState::Done;
        if self.end.is_none() {
            self.end = Some(reason);
        }
        self.inactivity.pause();

        if started {
            match self.camera.lock() {
                Ok(mut camera) => {
                    camera.stop_preview();
                    camera.close();
                }
                Err(err) => warn!("could not stop camera: {err}"),
            }
        }
        if let Some(worker) = self.worker.take() {
            worker.quit(&self.commands, self.config.shutdown_wait());
        }

        let dropped = self.delayed.len() + self.events.try_iter().count();
        self.delayed.clear();
        self.in_flight = None;
        info!("capture session ended: {reason:?} ({dropped} pending events discarded)");
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Map a point from camera preview coordinates to screen coordinates.
///
/// Portrait screens show the landscape sensor rotated, so the camera axes
/// swap before scaling.
pub fn camera_to_screen(point: ResultPoint, screen: Size, camera: Size) -> ResultPoint {
    let (sw, sh) = (screen.width, screen.height);
    let (cw, ch) = (camera.width, camera.height);
    if screen.is_portrait() {
        let scale_x = sw as f32 / ch as f32;
        let scale_y = sh as f32 / cw as f32;
        ResultPoint::new(
            point.x * scale_x - (sw.max(ch) / 2) as f32,
            point.y * scale_y - (sh.min(cw) / 2) as f32,
        )
    } else {
        let scale_x = sw as f32 / cw as f32;
        let scale_y = sh as f32 / ch as f32;
        ResultPoint::new(
            point.x * scale_x - (sh.min(ch) / 2) as f32,
            point.y * scale_y - (sw.max(cw) / 2) as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn portrait_screen_swaps_camera_axes() {
        let p = camera_to_screen(
            ResultPoint::new(100.0, 200.0),
            Size::new(1080, 1920),
            Size::new(1920, 1080),
        );
        // Scales are both 1.0; offsets are max(1080, 1080)/2 and min(1920, 1920)/2.
        assert_relative_eq!(p.x, 100.0 - 540.0);
        assert_relative_eq!(p.y, 200.0 - 960.0);
    }

    #[test]
    fn landscape_screen_scales_directly() {
        let p = camera_to_screen(
            ResultPoint::new(320.0, 240.0),
            Size::new(1280, 720),
            Size::new(640, 480),
        );
        assert_relative_eq!(p.x, 640.0 - 240.0);
        assert_relative_eq!(p.y, 360.0 - 640.0);
    }

    #[test]
    fn listener_closure_reports_interception() {
        let mut seen = 0;
        let mut listener = |_: &DecodeResult| {
            seen += 1;
            true
        };
        let result = DecodeResult::new("x", scanloop_core::BarcodeFormat::QrCode, vec![]);
        assert!(listener.on_decoded(&result));
        drop(listener);
        assert_eq!(seen, 1);
    }
}
