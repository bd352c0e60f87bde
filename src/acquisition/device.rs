use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::AcquisitionError;

use super::ImagePayload;

/// An open camera stream. Deliberately not `Clone`: the holder of the handle is
/// the only one that can close it.
#[derive(Debug)]
pub struct StreamHandle {
    id: u64,
    opened_at: DateTime<Utc>,
}

impl StreamHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
}

/// Device-level camera primitives. Only `AcquisitionController` calls these.
pub trait CameraDevice: Send + Sync {
    fn open(&self) -> Result<StreamHandle, AcquisitionError>;

    fn close(&self, handle: StreamHandle);

    /// Synchronous snapshot of the current frame.
    fn snapshot(&self, handle: &StreamHandle) -> Result<ImagePayload, AcquisitionError>;
}

/// Camera that renders generated PNG frames. Stands in for a capture backend
/// in the console host.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    next_id: AtomicU64,
    frames: AtomicU64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            next_id: AtomicU64::new(1),
            frames: AtomicU64::new(0),
        }
    }

    fn render_frame(&self, frame_no: u64) -> Result<Vec<u8>, AcquisitionError> {
        let shift = (frame_no % 256) as u8;
        let (w, h) = (self.width, self.height);
        let img = RgbImage::from_fn(w, h, |x, y| {
            let r = ((x * 255) / w) as u8;
            let g = ((y * 255) / h) as u8;
            Rgb([r, g, shift])
        });

        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|err| AcquisitionError::DeviceUnavailable(format!("frame encode failed: {err}")))?;
        Ok(out.into_inner())
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

impl CameraDevice for SyntheticCamera {
    fn open(&self) -> Result<StreamHandle, AcquisitionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        log::debug!("synthetic camera opened stream {}", id);
        Ok(StreamHandle::new(id))
    }

    fn close(&self, handle: StreamHandle) {
        log::debug!("synthetic camera closed stream {}", handle.id());
    }

    fn snapshot(&self, handle: &StreamHandle) -> Result<ImagePayload, AcquisitionError> {
        let frame_no = self.frames.fetch_add(1, Ordering::SeqCst);
        let bytes = self.render_frame(frame_no)?;
        log::debug!(
            "captured frame {} from stream {} ({} bytes)",
            frame_no,
            handle.id(),
            bytes.len()
        );
        Ok(ImagePayload::new(bytes, self.width, self.height, "png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frames_decode_as_png() {
        let camera = SyntheticCamera::new(16, 8);
        let handle = camera.open().unwrap();
        let frame = camera.snapshot(&handle).unwrap();

        let decoded = image::load_from_memory_with_format(&frame.bytes, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
        assert_eq!(frame.format, "png");
        camera.close(handle);
    }

    #[test]
    fn test_stream_ids_are_distinct() {
        let camera = SyntheticCamera::default();
        let a = camera.open().unwrap();
        let b = camera.open().unwrap();
        assert_ne!(a.id(), b.id());
    }
}
