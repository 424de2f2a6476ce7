use crate::{
    consts::QOI_HEADER_SIZE,
    decode::{decode_error, prepare, DecodeError, DecodeWarning, QoiDecodeContext},
    header::Header,
};
use alloc::vec::Vec;

/// A decoded image, always RGBA.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub header: Header,
    /// Row-major RGBA samples. Shorter than `width * height * 4` if the stream ended early.
    pub pixels: Vec<u8>,
    pub warnings: Vec<DecodeWarning>,
}

impl Decoded {
    /// Whether all pixels were decoded and the end marker was correct.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }
}

/// Decodes a QOI image into a newly allocated RGBA buffer.
///
/// Header and allocation problems fail the whole call. Everything else is reported through
/// [`Decoded::warnings`], with the pixels decoded up to that point.
pub fn decode_to_vec(data: &[u8]) -> Result<Decoded, DecodeError> {
    let (header, body, pixel_count, bytes) = prepare(data)?;

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(bytes)
        .map_err(|_| decode_error::OutputAllocationSnafu { bytes }.build())?;

    let mut warnings = Vec::new();
    QoiDecodeContext::new().decode_body(
        body,
        QOI_HEADER_SIZE,
        pixel_count,
        &mut pixels,
        &mut warnings,
    );

    Ok(Decoded {
        header,
        pixels,
        warnings,
    })
}
