//! The machine's own camera as a [`CaptureDevice`].
//!
//! Built with the `camera` feature this opens real devices through nokhwa.
//! Without it, opening always reports the camera as unavailable, so callers
//! take the file-picker path.
use crate::capture::{CaptureDevice, CaptureError, FacingMode, Frame, MediaStream};

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
/// Device indices to try for a facing mode. Desktop platforms do not report
/// which way a camera faces; the first device is taken as the front one.
fn candidate_indices(facing: FacingMode) -> &'static [u32] {
    match facing {
        FacingMode::User => &[0],
        FacingMode::Environment => &[1, 0],
    }
}

#[cfg_attr(not(feature = "camera"), allow(dead_code))]
/// Platform APIs report a refused camera permission only in their message text.
fn classify(message: String) -> CaptureError {
    let lower = message.to_ascii_lowercase();
    if ["permission", "denied", "not authorized", "not authorised"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Unavailable(message)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCamera;

#[cfg(feature = "camera")]
mod native {
    use nokhwa::pixel_format::RgbAFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use nokhwa::{Camera, NokhwaError};
    use tracing::warn;

    use super::*;

    fn from_nokhwa(err: NokhwaError) -> CaptureError {
        classify(err.to_string())
    }

    pub struct SystemStream {
        camera: Camera,
        facing: FacingMode,
        stopped: bool,
    }

    fn open_index(index: u32) -> Result<Camera, CaptureError> {
        let format =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = Camera::new(CameraIndex::Index(index), format).map_err(from_nokhwa)?;
        camera.open_stream().map_err(from_nokhwa)?;
        Ok(camera)
    }

    impl CaptureDevice for SystemCamera {
        type Stream = SystemStream;

        fn open(&self, facing: FacingMode) -> Result<SystemStream, CaptureError> {
            let mut last = CaptureError::Unavailable("no camera found".to_string());
            for &index in candidate_indices(facing) {
                match open_index(index) {
                    Ok(camera) => {
                        return Ok(SystemStream {
                            camera,
                            facing,
                            stopped: false,
                        })
                    }
                    Err(CaptureError::PermissionDenied) => {
                        return Err(CaptureError::PermissionDenied)
                    }
                    Err(e) => last = e,
                }
            }
            Err(last)
        }
    }

    impl MediaStream for SystemStream {
        fn facing(&self) -> FacingMode {
            self.facing
        }

        fn current_frame(&mut self) -> Result<Frame, CaptureError> {
            let buffer = self.camera.frame().map_err(from_nokhwa)?;
            let image = buffer
                .decode_image::<RgbAFormat>()
                .map_err(from_nokhwa)?;
            Ok(Frame {
                width: image.width(),
                height: image.height(),
                rgba: image.into_raw(),
            })
        }

        fn stop(&mut self) {
            if self.stopped {
                return;
            }
            self.stopped = true;
            if let Err(e) = self.camera.stop_stream() {
                warn!(error = %e, "failed to stop camera stream");
            }
        }
    }
}

#[cfg(feature = "camera")]
pub use native::SystemStream;

/// Never constructed: without camera support no stream can be opened.
#[cfg(not(feature = "camera"))]
pub enum SystemStream {}

#[cfg(not(feature = "camera"))]
impl CaptureDevice for SystemCamera {
    type Stream = SystemStream;

    fn open(&self, _facing: FacingMode) -> Result<SystemStream, CaptureError> {
        Err(CaptureError::Unavailable(
            "built without camera support (enable the `camera` feature)".to_string(),
        ))
    }
}

#[cfg(not(feature = "camera"))]
impl MediaStream for SystemStream {
    fn facing(&self) -> FacingMode {
        match *self {}
    }

    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}
