use crate::ai::gemini::types::InlineData;
use crate::{Error, Result};
use base64::Engine as _;

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

/// Best-effort container sniffing for uploads sent without a usable content type.
pub fn detect_video_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [_, _, _, _, b'f', b't', b'y', b'p', b'q', b't', ..] => "video/quicktime",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "video/mp4",
        [0x1A, 0x45, 0xDF, 0xA3, ..] => "video/webm",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'A', b'V', b'I', b' ', ..] => "video/x-msvideo",
        _ => {
            tracing::warn!("Unrecognized video container, falling back to video/mp4");
            "video/mp4"
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL into an inline data part.
///
/// The payload must be base64. When the URL carries no MIME type (or a
/// generic one) the type is sniffed from the decoded bytes.
pub fn inline_data_from_url(data_url: &str) -> Result<InlineData> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidRequest("imageDataUrl must be a data: URL".to_string()))?;

    let (header, payload) = rest.split_once(',').ok_or_else(|| {
        Error::InvalidRequest("imageDataUrl is missing its ',' separator".to_string())
    })?;

    let mut params = header.split(';');
    let declared_mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::InvalidRequest(
            "imageDataUrl must be base64 encoded".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidRequest(format!("imageDataUrl is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(Error::InvalidRequest("imageDataUrl is empty".to_string()));
    }

    let mime_type = if declared_mime.is_empty() || declared_mime == "application/octet-stream" {
        detect_image_mime(&bytes).to_string()
    } else {
        declared_mime
    };

    Ok(InlineData {
        mime_type,
        data: payload.trim().to_string(),
    })
}
