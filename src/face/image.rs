//! Minimal image sniffing and base64 transport helpers.
//!
//! Frames are never decoded here: the detector does that. We only refuse
//! payloads that are obviously not JPEG or PNG before shipping them out.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::FaceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Reject anything that is not a JPEG or PNG frame.
pub fn validate_frame(bytes: &[u8]) -> Result<ImageFormat, FaceError> {
    ImageFormat::sniff(bytes).ok_or(FaceError::InvalidImage)
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 frame, tolerating a `data:image/...;base64,` prefix.
pub fn decode(data: &str) -> Result<Vec<u8>, FaceError> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|_| FaceError::Base64)
}
