//! Camera provider that replays still images as preview frames.
//!
//! Each frame request consumes the next image. Once the images run out the
//! request is abandoned, which lets a pump run go idle.

use std::collections::VecDeque;

use log::debug;

use scanloop_core::{Frame, Size};

use crate::{CameraError, CameraProvider, FrameSink};

#[derive(Debug, Default)]
pub struct StillCamera {
    frames: VecDeque<Frame>,
    open: bool,
    size: Option<Size>,
}

impl StillCamera {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            open: false,
            size: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl CameraProvider for StillCamera {
    fn open_preview(&mut self) -> Result<(), CameraError> {
        let Some(first) = self.frames.front() else {
            return Err(CameraError::Unavailable("no images to scan".to_string()));
        };
        self.size = Some(first.size());
        self.open = true;
        Ok(())
    }

    fn request_one_frame(&mut self, sink: FrameSink) -> Result<(), CameraError> {
        if !self.open {
            return Err(CameraError::Unavailable("preview is not open".to_string()));
        }
        match self.frames.pop_front() {
            Some(mut frame) => {
                frame.portrait = sink.portrait();
                self.size = Some(frame.size());
                sink.deliver(frame);
            }
            None => debug!("still images exhausted"),
        }
        Ok(())
    }

    fn set_zoom(&mut self, _level: u32) -> Result<(), CameraError> {
        Err(CameraError::Other("still images cannot zoom".to_string()))
    }

    fn max_zoom(&self) -> Option<u32> {
        None
    }

    fn zoom(&self) -> u32 {
        0
    }

    fn frame_size(&self) -> Option<Size> {
        self.size
    }

    fn stop_preview(&mut self) {
        self.open = false;
    }

    fn close(&mut self) {
        self.open = false;
        self.frames.clear();
    }
}

/// Errors produced while loading still images.
#[cfg(feature = "image")]
#[derive(thiserror::Error, Debug)]
pub enum StillImageError {
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error(transparent)]
    Frame(#[from] scanloop_core::FrameError),
}

/// Wrap an `image::GrayImage` as a landscape frame.
#[cfg(feature = "image")]
pub fn frame_from_gray(img: &::image::GrayImage) -> Result<Frame, scanloop_core::FrameError> {
    Frame::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
        false,
    )
}

#[cfg(feature = "image")]
impl StillCamera {
    /// Load images from disk, converting them to 8-bit luma.
    pub fn from_paths<P: AsRef<std::path::Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, StillImageError> {
        let mut frames = Vec::new();
        for path in paths {
            let img = ::image::open(path.as_ref())?.to_luma8();
            frames.push(frame_from_gray(&img)?);
        }
        Ok(Self::new(frames))
    }
}
