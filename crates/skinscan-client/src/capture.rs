/// Live camera capture.
///
/// A [`CaptureSession`] is the capture view: it owns at most one open
/// [`MediaStream`] and stops it when the view closes, when the facing mode
/// changes, after a successful capture, and on drop. There is never more than
/// one live stream per session, and a stream is always stopped before its
/// replacement is requested.
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, info, warn};

use skinscan_common::ids::epoch_millis;

use crate::error::ClientError;
use crate::image_file::ImageFile;
use crate::notice::{Notice, Operation};

/// 0.95 on the browser's 0-1 scale.
pub const JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    #[default]
    Environment,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

/// One RGBA8 video frame at the stream's native resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera access denied")]
    PermissionDenied,

    /// No device for the requested facing mode, or it is busy.
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("no active camera stream")]
    NoStream,

    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BadFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// An open video stream from a capture device.
pub trait MediaStream {
    fn facing(&self) -> FacingMode;

    /// Grab the frame currently being shown.
    fn current_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Stop every track of the stream. Must be idempotent.
    fn stop(&mut self);
}

/// A camera the platform can open in either facing mode.
pub trait CaptureDevice {
    type Stream: MediaStream;

    fn open(&self, facing: FacingMode) -> Result<Self::Stream, CaptureError>;
}

pub struct CaptureSession<'d, D: CaptureDevice> {
    device: &'d D,
    facing: FacingMode,
    stream: Option<D::Stream>,
}

impl<'d, D: CaptureDevice> CaptureSession<'d, D> {
    /// Open the capture view on the rear camera.
    ///
    /// Permission denial is returned as an error; the caller falls back to the
    /// file picker.
    pub fn open(device: &'d D) -> Result<Self, CaptureError> {
        let mut session = Self {
            device,
            facing: FacingMode::default(),
            stream: None,
        };
        session.acquire()?;
        Ok(session)
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Switch between front and rear cameras. The old stream is stopped first;
    /// if the new one cannot be opened the session is left without a stream.
    pub fn toggle_facing(&mut self) -> Result<(), CaptureError> {
        self.release();
        self.facing = self.facing.toggled();
        self.acquire()
    }

    /// Encode the current frame as `capture-<epoch ms>.jpg` and close the view.
    ///
    /// On failure the view stays open so the user can try again.
    pub fn capture(&mut self) -> Result<ImageFile, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NoStream)?;
        let frame = stream.current_frame()?;
        let bytes = encode_jpeg(&frame)?;
        let name = format!("capture-{}.jpg", epoch_millis());
        info!(
            name = %name,
            width = frame.width,
            height = frame.height,
            size = bytes.len(),
            "frame captured"
        );
        self.close();
        Ok(ImageFile {
            name,
            content_type: "image/jpeg".to_string(),
            bytes,
        })
    }

    pub fn close(&mut self) {
        self.release();
    }

    fn acquire(&mut self) -> Result<(), CaptureError> {
        debug_assert!(self.stream.is_none());
        match self.device.open(self.facing) {
            Ok(stream) => {
                debug!(facing = ?self.facing, "camera stream opened");
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, facing = ?self.facing, "camera stream unavailable");
                Err(e)
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!(facing = ?stream.facing(), "camera stream stopped");
        }
    }
}

impl<D: CaptureDevice> Drop for CaptureSession<'_, D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The image to analyze, and the notice to show when the camera could not be
/// used and a picked file stood in.
#[derive(Debug)]
pub struct Acquired {
    pub image: ImageFile,
    pub notice: Option<Notice>,
}

/// Take a still from `device`, or fall back to the file at `fallback` when the
/// camera cannot be used. Without a fallback the capture error is returned.
pub fn capture_or_pick<D: CaptureDevice>(
    device: &D,
    fallback: Option<&Path>,
) -> Result<Acquired, ClientError> {
    let captured = CaptureSession::open(device).and_then(|mut session| session.capture());
    match captured {
        Ok(image) => Ok(Acquired {
            image,
            notice: None,
        }),
        Err(e) => {
            let err = ClientError::Capture(e);
            let Some(path) = fallback else {
                return Err(err);
            };
            warn!(error = %err, path = %path.display(), "camera not usable, using picked file");
            Ok(Acquired {
                notice: Some(err.notice(Operation::Capture)),
                image: ImageFile::from_path(path)?,
            })
        }
    }
}

/// Draw the frame onto an RGB surface of the same size and encode it as JPEG.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 4;
    let bad_frame = || CaptureError::BadFrame {
        width: frame.width,
        height: frame.height,
        expected,
        actual: frame.rgba.len(),
    };
    if expected == 0 || frame.rgba.len() != expected {
        return Err(bad_frame());
    }
    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(bad_frame)?;
    let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}
