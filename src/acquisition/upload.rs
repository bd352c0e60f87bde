use std::path::Path;

use image::ImageReader;
use std::io::Cursor;

use crate::error::AcquisitionError;

use super::ImagePayload;

/// Reads an uploaded image and decodes it on the blocking pool so the payload
/// carries real dimensions. Anything that is not a decodable image is
/// `ReadFailed`.
pub async fn read_file(path: &Path) -> Result<ImagePayload, AcquisitionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| AcquisitionError::ReadFailed(format!("{}: {err}", path.display())))?;

    tokio::task::spawn_blocking(move || decode_payload(bytes))
        .await
        .map_err(|err| AcquisitionError::ReadFailed(format!("decode worker join failed: {err}")))?
}

pub fn decode_payload(bytes: Vec<u8>) -> Result<ImagePayload, AcquisitionError> {
    if bytes.is_empty() {
        return Err(AcquisitionError::ReadFailed("file is empty".into()));
    }

    let reader = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|err| AcquisitionError::ReadFailed(err.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| AcquisitionError::ReadFailed("unrecognised image format".into()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| AcquisitionError::ReadFailed(err.to_string()))?;

    let format_name = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("image")
        .to_string();

    Ok(ImagePayload::new(bytes, width, height, format_name))
}
