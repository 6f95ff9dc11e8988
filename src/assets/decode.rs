use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;

use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// A decoded still image ready for drawing.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Width over height.
    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> ReelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::asset_decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ReelError::asset_decode("decoded image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Build a single-color image.
pub fn solid_image(width: u32, height: u32, color: Rgba8Premul) -> PreparedImage {
    let px = [color.r, color.g, color.b, color.a];
    let len = (width as usize) * (height as usize);
    let mut bytes = Vec::with_capacity(len * 4);
    for _ in 0..len {
        bytes.extend_from_slice(&px);
    }
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(bytes),
    }
}

/// Split a `data:<mime>[;base64],<payload>` URI into its mime type and decoded bytes.
///
/// Returns `None` when `source` is not a data URI.
pub fn parse_data_uri(source: &str) -> Option<ReelResult<(String, Vec<u8>)>> {
    let rest = source.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(ReelError::asset_decode("data URI is missing ','")));
    };
    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    if !is_base64 {
        return Some(Ok((mime.to_owned(), payload.as_bytes().to_vec())));
    }
    Some(
        decode_base64(payload)
            .map(|bytes| (mime.to_owned(), bytes))
            .map_err(|e| ReelError::asset_decode(format!("data URI payload: {e}"))),
    )
}

/// Decode standard (padded) base64, ignoring surrounding whitespace.
pub fn decode_base64(payload: &str) -> ReelResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ReelError::asset_decode(format!("invalid base64: {e}")))
}

/// Read the bytes behind a visual/audio source: a data URI or a filesystem path.
pub fn read_source_bytes(source: &str) -> ReelResult<Vec<u8>> {
    if let Some(parsed) = parse_data_uri(source) {
        return parsed.map(|(_, bytes)| bytes);
    }
    let path = Path::new(source);
    std::fs::read(path).map_err(|e| {
        ReelError::asset_decode(format!("failed to read asset '{}': {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
