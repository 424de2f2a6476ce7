use crate::{
    cache::ColorCache,
    consts::QOI_HEADER_SIZE,
    header::{read_end_marker, read_header, Header, HeaderError},
    op::Op,
    pixel::Pixel,
};
use alloc::vec::Vec;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

mod alloc_api;
pub use alloc_api::*;

/// Fatal decode errors. No pixels are produced when one of these occurs.
#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum DecodeError {
    #[snafu(display("Malformed header"))]
    Header { source: HeaderError },
    #[snafu(display("Image dimensions {width}x{height} exceed the addressable memory"))]
    DimensionsOverflow { width: u32, height: u32 },
    #[snafu(display("Could not allocate {bytes} bytes for the decoded image"))]
    OutputAllocation { bytes: usize },
    #[snafu(display("Output buffer holds {len} bytes, but the image needs {needed}"))]
    OutputTooSmall { needed: usize, len: usize },
}

/// Problems found in a stream that still decoded, possibly partially.
///
/// The pixels produced before any of these were detected are valid.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(module)]
pub enum DecodeWarning {
    #[snafu(display(
        "{op} chunk at byte {offset} is truncated: needs {needed} payload bytes, {available} available"
    ))]
    TruncatedStream {
        op: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[snafu(display("End marker missing or incorrect (found {found:?})"))]
    TrailerMismatch { found: Option<u64> },
    #[snafu(display("Only {produced} of {expected} pixels were decoded"))]
    UnderfilledOutput { expected: usize, produced: usize },
}

/// Outcome of decoding into a caller-provided buffer.
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub header: Header,
    /// Number of pixels written to the output buffer.
    pub pixel_count: usize,
    pub warnings: Vec<DecodeWarning>,
}

impl DecodeReport {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Receives decoded RGBA pixels.
pub(crate) trait DecodeOutput {
    fn write_pixel(&mut self, pixel: Pixel);
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize);
}

impl DecodeOutput for Vec<u8> {
    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        self.extend_from_slice(&pixel.to_rgba());
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        self.extend(core::iter::repeat(pixel.to_rgba()).take(count).flatten());
    }
}

/// Writes RGBA pixels into a slice, front to back.
pub(crate) struct SliceDecodeOutput<'a> {
    output: &'a mut [u8],
    output_idx: usize,
}

impl<'a> SliceDecodeOutput<'a> {
    pub(crate) fn new(output: &'a mut [u8]) -> Self {
        Self {
            output,
            output_idx: 0,
        }
    }
}

impl DecodeOutput for SliceDecodeOutput<'_> {
    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        self.output[self.output_idx..][..4].copy_from_slice(&pixel.to_rgba());
        self.output_idx += 4;
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        let rgba = pixel.to_rgba();
        for chunk in self.output[self.output_idx..][..count * 4].chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
        self.output_idx += count * 4;
    }
}

/// Decoder state for one image: the previous pixel and the color array.
pub(crate) struct QoiDecodeContext {
    prev: Pixel,
    arr: ColorCache,
}

impl QoiDecodeContext {
    pub(crate) const fn new() -> Self {
        Self {
            prev: Pixel::INITIAL,
            arr: ColorCache::new(),
        }
    }

    /// Decodes chunks from `body` until `pixel_count` pixels were produced or the input runs out,
    /// then checks the end marker.
    ///
    /// `body_offset` is the position of `body` within the whole stream, used for diagnostics.
    /// Returns the number of pixels written.
    pub(crate) fn decode_body(
        &mut self,
        body: &[u8],
        body_offset: usize,
        pixel_count: usize,
        output: &mut impl DecodeOutput,
        warnings: &mut Vec<DecodeWarning>,
    ) -> usize {
        let mut emitted = 0;
        let mut pos = 0;

        while emitted < pixel_count {
            let Some(read) = Op::read(&body[pos..]) else {
                break;
            };

            let (op, len) = match read {
                Ok(read) => read,
                Err(truncated) => {
                    warnings.push(
                        decode_warning::TruncatedStreamSnafu {
                            op: truncated.op_name(),
                            offset: body_offset + pos,
                            needed: truncated.needed,
                            available: truncated.available,
                        }
                        .build(),
                    );
                    pos = body.len();
                    break;
                }
            };
            pos += len;

            let pixel = match op {
                Op::Rgb(rgb) => self.prev.with_rgb(rgb),
                Op::Rgba(rgba) => Pixel::from_rgba(rgba),
                Op::Diff { dr, dg, db } => self.prev.offset(dr, dg, db),
                Op::Luma { dg, dr_dg, db_dg } => self.prev.offset(dr_dg + dg, dg, db_dg + dg),
                Op::Index(index) => {
                    let pixel = self.arr.lookup(index);
                    self.prev = pixel;
                    output.write_pixel(pixel);
                    emitted += 1;

                    // already in arr
                    continue;
                }
                Op::Run(run) => {
                    // The encoder records the initial pixel when the image starts with it.
                    if emitted == 0 {
                        self.arr.update(self.prev);
                    }

                    let count = usize::from(run).min(pixel_count - emitted);
                    output.write_many_pixels(self.prev, count);
                    emitted += count;

                    // same as prev, not re-indexed
                    continue;
                }
            };

            self.arr.update(pixel);
            self.prev = pixel;
            output.write_pixel(pixel);
            emitted += 1;
        }

        match read_end_marker(&body[pos..]) {
            Some(1) => {}
            found => warnings.push(decode_warning::TrailerMismatchSnafu { found }.build()),
        }

        if emitted < pixel_count {
            warnings.push(
                decode_warning::UnderfilledOutputSnafu {
                    expected: pixel_count,
                    produced: emitted,
                }
                .build(),
            );
        }

        for warning in warnings.iter() {
            log::warn!("{warning}");
        }
        log::debug!(
            "Decoded {emitted} of {pixel_count} pixels from {} bytes",
            body_offset + pos
        );

        emitted
    }
}

/// Parses the header and returns it with the body and the expected RGBA output size in bytes.
fn prepare(data: &[u8]) -> Result<(Header, &[u8], usize, usize), DecodeError> {
    let (header, body) = read_header(data).context(decode_error::HeaderSnafu)?;

    let overflow = decode_error::DimensionsOverflowSnafu {
        width: header.width,
        height: header.height,
    };
    let pixel_count = header.pixel_count().context(overflow)?;
    let bytes = pixel_count.checked_mul(4).context(overflow)?;

    Ok((header, body, pixel_count, bytes))
}

/// Decodes a QOI image into `output` as RGBA, 4 bytes per pixel.
///
/// `output` must hold at least `width * height * 4` bytes. Pixels after the reported
/// [`DecodeReport::pixel_count`] are left untouched.
pub fn decode_to_slice(data: &[u8], output: &mut [u8]) -> Result<DecodeReport, DecodeError> {
    let (header, body, pixel_count, bytes) = prepare(data)?;
    ensure!(
        output.len() >= bytes,
        decode_error::OutputTooSmallSnafu {
            needed: bytes,
            len: output.len()
        }
    );

    let mut output = SliceDecodeOutput::new(&mut output[..bytes]);
    let mut warnings = Vec::new();
    let pixel_count = QoiDecodeContext::new().decode_body(
        body,
        QOI_HEADER_SIZE,
        pixel_count,
        &mut output,
        &mut warnings,
    );

    Ok(DecodeReport {
        header,
        pixel_count,
        warnings,
    })
}
