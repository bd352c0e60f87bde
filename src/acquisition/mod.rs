pub mod controller;
pub mod device;
pub mod upload;

pub use controller::AcquisitionController;
pub use device::{CameraDevice, StreamHandle, SyntheticCamera};
pub use upload::{decode_payload, read_file};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which source the session currently pulls images from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AcquisitionMode {
    #[default]
    None,
    Camera,
    Upload,
}

impl AcquisitionMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, AcquisitionMode::None)
    }
}

/// Encoded image bytes plus what decoding told us about them.
///
/// Bytes sit behind an `Arc` so a frame can be handed to the inference task
/// without copying.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(skip)]
    pub bytes: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            width,
            height,
            format: format.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
