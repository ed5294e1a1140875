use std::path::Path;

use base64::Engine;
use image::ImageFormat;

use crate::error::ClientError;

/// An image ready for upload: a name, a MIME type, and the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Read a picked file. Any `image/*` type is accepted; size and dimensions are not checked.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let content_type = ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .map_err(|_| ClientError::NotAnImage(path.display().to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ClientError::NotAnImage(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        Self::new(name, content_type, bytes)
    }

    pub fn new(name: String, content_type: String, bytes: Vec<u8>) -> Result<Self, ClientError> {
        if !content_type.starts_with("image/") {
            return Err(ClientError::NotAnImage(name));
        }
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    /// `data:<type>;base64,<payload>`, as a browser file reader would produce.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
