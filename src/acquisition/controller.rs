use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::error::AcquisitionError;

use super::{CameraDevice, ImagePayload, StreamHandle};

/// Owns the camera device and at most one live stream.
///
/// Every path that drops the controller or leaves camera mode goes through
/// `stop()`, so a stream is never left open behind the session's back.
pub struct AcquisitionController {
    device: Arc<dyn CameraDevice>,
    live: Option<StreamHandle>,
    settle_delay: Duration,
}

impl AcquisitionController {
    pub fn new(device: Arc<dyn CameraDevice>, settle_delay: Duration) -> Self {
        Self {
            device,
            live: None,
            settle_delay,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn stream_id(&self) -> Option<u64> {
        self.live.as_ref().map(StreamHandle::id)
    }

    /// Opens a stream. Starting while already live keeps the current stream.
    pub fn start(&mut self) -> Result<u64, AcquisitionError> {
        if let Some(handle) = &self.live {
            return Ok(handle.id());
        }

        match self.device.open() {
            Ok(handle) => {
                let id = handle.id();
                info!("camera stream {} started", id);
                self.live = Some(handle);
                Ok(id)
            }
            Err(err) => {
                warn!("camera start failed: {}", err);
                Err(err)
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.live.take() {
            let id = handle.id();
            self.device.close(handle);
            info!("camera stream {} stopped", id);
        }
    }

    /// Fully releases the current stream, waits for the device to settle,
    /// then opens a fresh one. Safe to call repeatedly.
    pub async fn reload(&mut self) -> Result<u64, AcquisitionError> {
        self.stop();
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        self.start()
    }

    /// Snapshots the live stream. A `DeviceUnavailable` from the device means
    /// the stream died under us, so the handle is released and the controller
    /// is no longer live.
    pub fn capture_frame(&mut self) -> Result<ImagePayload, AcquisitionError> {
        let handle = self
            .live
            .as_ref()
            .ok_or_else(|| AcquisitionError::DeviceUnavailable("no live camera stream".into()))?;

        match self.device.snapshot(handle) {
            Err(err @ AcquisitionError::DeviceUnavailable(_)) => {
                warn!(
                    "camera stream {} (opened {}) died: {}",
                    handle.id(),
                    handle.opened_at().format("%H:%M:%S"),
                    err
                );
                self.stop();
                Err(err)
            }
            other => other,
        }
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        self.stop();
    }
}
