//! Camera provider contract and the shared handle to it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::Sender;
use log::warn;

use scanloop_core::{Frame, Size};
use scanloop_decode::{ZoomControl, ZoomError};

use crate::worker::{CaptureEvent, WorkerCommand};
use crate::CameraError;

/// A preview source.
///
/// Frames are pulled one at a time: [`CameraProvider::request_one_frame`]
/// hands over a [`FrameSink`] which the provider fills with the next preview
/// frame, either right away or later from its own thread.
pub trait CameraProvider: Send {
    fn open_preview(&mut self) -> Result<(), CameraError>;

    fn request_one_frame(&mut self, sink: FrameSink) -> Result<(), CameraError>;

    fn set_zoom(&mut self, level: u32) -> Result<(), CameraError>;

    /// Highest zoom level, `None` when zoom is unsupported.
    fn max_zoom(&self) -> Option<u32>;

    fn zoom(&self) -> u32;

    /// Preview resolution once the preview is open.
    fn frame_size(&self) -> Option<Size>;

    fn stop_preview(&mut self);

    fn close(&mut self);
}

/// One-shot destination for a requested preview frame.
///
/// Delivering consumes the sink, so at most one frame reaches the decoder per
/// request. Dropping it without delivering tells the coordinator the request
/// was abandoned.
pub struct FrameSink {
    request: u64,
    portrait: bool,
    worker: Sender<WorkerCommand>,
    events: Sender<CaptureEvent>,
    delivered: bool,
}

impl FrameSink {
    pub(crate) fn new(
        request: u64,
        portrait: bool,
        worker: Sender<WorkerCommand>,
        events: Sender<CaptureEvent>,
    ) -> Self {
        Self {
            request,
            portrait,
            worker,
            events,
            delivered: false,
        }
    }

    /// Orientation of the screen; providers stamp it on the frame.
    pub fn portrait(&self) -> bool {
        self.portrait
    }

    pub fn deliver(mut self, frame: Frame) {
        let command = WorkerCommand::FrameReady {
            request: self.request,
            frame,
        };
        self.delivered = self.worker.send(command).is_ok();
        if !self.delivered {
            warn!("decode worker gone, frame for request {} dropped", self.request);
        }
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if !self.delivered {
            let _ = self.events.send(CaptureEvent::FrameAbandoned {
                request: self.request,
            });
        }
    }
}

impl fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSink")
            .field("request", &self.request)
            .field("portrait", &self.portrait)
            .finish()
    }
}

/// Camera provider shared between the coordinator and the decode worker.
///
/// The worker locks it only to zoom; the coordinator to open, request frames
/// and stop.
#[derive(Clone)]
pub struct CameraHandle(Arc<Mutex<dyn CameraProvider>>);

impl CameraHandle {
    pub fn new(provider: impl CameraProvider + 'static) -> Self {
        Self(Arc::new(Mutex::new(provider)))
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, dyn CameraProvider + 'static>, CameraError> {
        self.0.lock().map_err(|_| CameraError::Poisoned)
    }
}

impl fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CameraHandle")
    }
}

impl ZoomControl for CameraHandle {
    fn max_zoom(&self) -> Option<u32> {
        self.lock().ok()?.max_zoom()
    }

    fn current_zoom(&self) -> u32 {
        self.lock().map(|camera| camera.zoom()).unwrap_or(0)
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), ZoomError> {
        let mut camera = self
            .lock()
            .map_err(|err| ZoomError::Rejected(err.to_string()))?;
        if camera.max_zoom().is_none() {
            return Err(ZoomError::Unsupported);
        }
        camera
            .set_zoom(level)
            .map_err(|err| ZoomError::Rejected(err.to_string()))
    }
}
