use crate::{
    cache::ColorCache,
    consts::{QOI_END_MARKER, QOI_HEADER_SIZE, QOI_MAX_RUN},
    header::{Channels, Colorspace, Header},
    op::Op,
    pixel::Pixel,
};
use alloc::vec::Vec;
use itertools::Itertools;
use snafu::{ensure, OptionExt, Snafu};

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum EncodeError {
    #[snafu(display("Unsupported channel count {channels}, expected 3 or 4"))]
    InvalidChannels { channels: u8 },
    #[snafu(display("Unsupported colorspace {colorspace}, expected 0 or 1"))]
    InvalidColorspace { colorspace: u8 },
    #[snafu(display(
        "Specified image dimensions don't match the number of samples: {width} * {height} * {channels} samples expected, but {sample_count} samples were given"
    ))]
    InvalidDimensions {
        width: u32,
        height: u32,
        channels: u8,
        sample_count: usize,
    },
    #[snafu(display("Image dimensions {width}x{height} exceed the addressable memory"))]
    DimensionsOverflow { width: u32, height: u32 },
    #[snafu(display("Could not allocate {bytes} bytes for the encoded image"))]
    OutputAllocation { bytes: usize },
}

/// Upper bound of the encoded size of an image, header and end marker included.
///
/// `None` if the header has an invalid channel count or the size overflows.
pub fn max_encoded_len(header: &Header) -> Option<usize> {
    let channels = usize::from(header.channels()? as u8);
    header
        .pixel_count()?
        .checked_mul(channels + 1)?
        .checked_add(QOI_HEADER_SIZE + QOI_END_MARKER.len())
}

/// Checks that `samples` holds exactly `width * height` pixels of the header's channel count.
pub(crate) fn validate(header: &Header, samples: &[u8]) -> Result<Channels, EncodeError> {
    let channels = header
        .channels()
        .context(encode_error::InvalidChannelsSnafu {
            channels: header.channels,
        })?;
    Colorspace::try_from(header.colorspace)
        .ok()
        .context(encode_error::InvalidColorspaceSnafu {
            colorspace: header.colorspace,
        })?;

    let expected = header
        .pixel_count()
        .and_then(|count| count.checked_mul(usize::from(channels as u8)))
        .context(encode_error::DimensionsOverflowSnafu {
            width: header.width,
            height: header.height,
        })?;
    ensure!(
        samples.len() == expected,
        encode_error::InvalidDimensionsSnafu {
            width: header.width,
            height: header.height,
            channels: channels as u8,
            sample_count: samples.len(),
        }
    );

    Ok(channels)
}

pub(crate) fn pixels(samples: &[u8], channels: Channels) -> impl Iterator<Item = Pixel> + '_ {
    samples
        .chunks_exact(usize::from(channels as u8))
        .map(Pixel::from_samples)
}

/// Encoder state for one image.
pub(crate) struct QoiEncodeContext {
    prev: Pixel,
    arr: ColorCache,
    /// Pending run length, always below [`QOI_MAX_RUN`].
    run: u8,
}

impl QoiEncodeContext {
    pub(crate) const fn new() -> Self {
        Self {
            prev: Pixel::INITIAL,
            arr: ColorCache::new(),
            run: 0,
        }
    }

    /// Encodes `pixels` into chunks, passing each chunk's bytes to `w`. Does not write the header
    /// or the end marker.
    pub(crate) fn encode_pixels<E>(
        &mut self,
        pixels: impl Iterator<Item = Pixel>,
        has_alpha: bool,
        mut w: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut position = 0;

        for (count, pixel) in pixels.dedup_with_count() {
            let mut repeats = count;

            if pixel == self.prev {
                // Only possible for the very first pixel, which continues the implicit initial
                // pixel. Record it the way the decoder does.
                if position == 0 {
                    self.arr.update(pixel);
                }
            } else {
                self.flush_run(&mut w)?;
                let op = self.choose_op(pixel, has_alpha);
                w(&op.to_bytes()[..])?;
                self.prev = pixel;
                repeats -= 1;
            }

            position += count;
            self.extend_run(repeats, &mut w)?;
        }

        self.flush_run(&mut w)
    }

    /// Picks the chunk for a pixel that differs from the previous one, updating the color array
    /// unless the pixel is already in it.
    fn choose_op(&mut self, pixel: Pixel, has_alpha: bool) -> Op {
        if let Some(index) = self.arr.position(pixel) {
            return Op::Index(index);
        }

        self.arr.update(pixel);

        if has_alpha && pixel.a != self.prev.a {
            return Op::Rgba(pixel.to_rgba());
        }

        let delta = pixel.delta_from(self.prev);
        if delta.fits_diff() {
            Op::Diff {
                dr: delta.r,
                dg: delta.g,
                db: delta.b,
            }
        } else if delta.fits_luma() {
            let (dr_dg, db_dg) = delta.relative_to_green();
            Op::Luma {
                dg: delta.g,
                dr_dg,
                db_dg,
            }
        } else {
            Op::Rgb([pixel.r, pixel.g, pixel.b])
        }
    }

    /// Adds `repeats` pixels to the pending run, emitting full runs as they fill up.
    fn extend_run<E>(
        &mut self,
        repeats: usize,
        w: &mut impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let total = usize::from(self.run) + repeats;
        let max = usize::from(QOI_MAX_RUN);

        for _ in 0..total / max {
            w(&Op::Run(QOI_MAX_RUN).to_bytes()[..])?;
        }
        self.run = (total % max) as u8;

        Ok(())
    }

    fn flush_run<E>(&mut self, w: &mut impl FnMut(&[u8]) -> Result<(), E>) -> Result<(), E> {
        if self.run > 0 {
            w(&Op::Run(self.run).to_bytes()[..])?;
            self.run = 0;
        }
        Ok(())
    }
}

/// Encodes `samples` (row-major, `header.channels` interleaved bytes per pixel) into a new
/// buffer, including header and end marker.
///
/// With 3 channels, every pixel is treated as opaque.
pub fn encode_to_vec(header: &Header, samples: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let channels = validate(header, samples)?;
    let max_len = max_encoded_len(header).context(encode_error::DimensionsOverflowSnafu {
        width: header.width,
        height: header.height,
    })?;

    let mut w = Vec::new();
    w.try_reserve_exact(max_len)
        .map_err(|_| encode_error::OutputAllocationSnafu { bytes: max_len }.build())?;

    w.extend_from_slice(&header.to_bytes());
    QoiEncodeContext::new()
        .encode_pixels(
            pixels(samples, channels),
            channels == Channels::Rgba,
            |bytes| {
                w.extend_from_slice(bytes);
                Ok::<_, core::convert::Infallible>(())
            },
        )
        .unwrap_or_else(|never| match never {});
    w.extend_from_slice(&QOI_END_MARKER);

    log::debug!(
        "Encoded {}x{} image into {} bytes",
        header.width,
        header.height,
        w.len()
    );

    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode::decode_to_vec, header::Colorspace};
    use alloc::vec;

    fn rgb(width: u32, height: u32, samples: &[u8]) -> Vec<u8> {
        let header = Header::new(width, height, Channels::Rgb, Colorspace::Srgb);
        encode_to_vec(&header, samples).unwrap()
    }

    fn rgba(width: u32, height: u32, samples: &[u8]) -> Vec<u8> {
        let header = Header::new(width, height, Channels::Rgba, Colorspace::Srgb);
        encode_to_vec(&header, samples).unwrap()
    }

    fn body(encoded: &[u8]) -> &[u8] {
        assert_eq!(&encoded[encoded.len() - 8..], QOI_END_MARKER);
        &encoded[QOI_HEADER_SIZE..encoded.len() - 8]
    }

    #[test]
    fn writes_header_and_end_marker() {
        let header = Header::new(1, 1, Channels::Rgba, Colorspace::Linear);
        let encoded = encode_to_vec(&header, &[1, 2, 3, 4]).unwrap();
        assert_eq!(encoded[..QOI_HEADER_SIZE], header.to_bytes());
        assert_eq!(body(&encoded), [0xff, 1, 2, 3, 4]);
    }

    #[test]
    fn two_identical_pixels_become_rgb_and_run() {
        let encoded = rgb(2, 1, &[10, 20, 30, 10, 20, 30]);
        assert_eq!(body(&encoded), [0xfe, 10, 20, 30, 0b1100_0000]);

        let decoded = decode_to_vec(&encoded).unwrap();
        assert!(decoded.is_complete());
        assert_eq!(decoded.pixels, [10, 20, 30, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn run_lengths_are_biased_and_split() {
        for (len, expected) in [
            (1, &[0xc0][..]),
            (2, &[0xc1][..]),
            (62, &[0xfd][..]),
            (63, &[0xfd, 0xc0][..]),
            (124, &[0xfd, 0xfd][..]),
            (130, &[0xfd, 0xfd, 0xc5][..]),
        ] {
            let encoded = rgb(len, 1, &vec![0; len as usize * 3]);
            assert_eq!(body(&encoded), expected, "run of {len}");
        }
    }

    #[test]
    fn long_run_after_a_color_change() {
        let mut samples = vec![10, 20, 30];
        samples.extend(core::iter::repeat([6, 16, 26]).take(70).flatten());
        let encoded = rgb(71, 1, &samples);

        // -4 per channel: LUMA, then a run of 69 = 62 + 7.
        assert_eq!(
            body(&encoded),
            [0xfe, 10, 20, 30, 0x80 | 28, 0x88, 0xfd, 0xc6]
        );
    }

    #[test]
    fn small_delta_prefers_diff() {
        let encoded = rgb(2, 1, &[10, 20, 30, 11, 21, 31]);
        assert_eq!(body(&encoded), [0xfe, 10, 20, 30, 0b0111_1111]);
    }

    #[test]
    fn delta_of_two_falls_through_to_luma() {
        let encoded = rgb(2, 1, &[10, 20, 30, 12, 22, 32]);
        assert_eq!(body(&encoded), [0xfe, 10, 20, 30, 0x80 | 34, 0x88]);
    }

    #[test]
    fn luma_relative_to_green() {
        let encoded = rgb(2, 1, &[10, 20, 30, 42, 50, 57]);
        assert_eq!(body(&encoded), [0xfe, 10, 20, 30, 0xbe, 0xa5]);
    }

    #[test]
    fn deltas_wrap_around() {
        let encoded = rgb(2, 1, &[255, 0, 0, 0, 0, 0]);
        // -1/0/0 from the initial pixel, then +1/0/0
        assert_eq!(body(&encoded), [0b0101_1010, 0b0111_1010]);
    }

    #[test]
    fn recurring_color_uses_index() {
        let encoded = rgb(3, 1, &[10, 20, 30, 1, 1, 1, 10, 20, 30]);
        assert_eq!(body(&encoded), [0xfe, 10, 20, 30, 0xfe, 1, 1, 1, 9]);
    }

    #[test]
    fn leading_initial_pixel_is_indexed() {
        let encoded = rgb(3, 1, &[0, 0, 0, 10, 10, 10, 0, 0, 0]);
        assert_eq!(body(&encoded), [0b1100_0000, 0b1010_1010, 0x88, 53]);

        let decoded = decode_to_vec(&encoded).unwrap();
        assert_eq!(decoded.pixels, [0, 0, 0, 255, 10, 10, 10, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn transparent_black_matches_empty_slot() {
        let encoded = rgba(1, 1, &[0, 0, 0, 0]);
        assert_eq!(body(&encoded), [0x00]);
    }

    #[test]
    fn alpha_change_needs_rgba() {
        let encoded = rgba(3, 1, &[10, 20, 30, 255, 10, 20, 30, 128, 11, 21, 31, 128]);
        assert_eq!(
            body(&encoded),
            [0xfe, 10, 20, 30, 0xff, 10, 20, 30, 128, 0b0111_1111]
        );
    }

    #[test]
    fn rejects_sample_count_mismatch() {
        let header = Header::new(2, 2, Channels::Rgb, Colorspace::Srgb);
        assert!(matches!(
            encode_to_vec(&header, &[0; 11]),
            Err(EncodeError::InvalidDimensions {
                width: 2,
                height: 2,
                channels: 3,
                sample_count: 11
            })
        ));
    }

    #[test]
    fn rejects_invalid_header_fields() {
        let mut header = Header::new(1, 1, Channels::Rgb, Colorspace::Srgb);
        header.channels = 2;
        assert!(matches!(
            encode_to_vec(&header, &[0; 2]),
            Err(EncodeError::InvalidChannels { channels: 2 })
        ));

        let mut header = Header::new(1, 1, Channels::Rgb, Colorspace::Srgb);
        header.colorspace = 7;
        assert!(matches!(
            encode_to_vec(&header, &[0; 3]),
            Err(EncodeError::InvalidColorspace { colorspace: 7 })
        ));
    }

    #[test]
    fn output_never_exceeds_reserved_size() {
        let samples: Vec<u8> = (0..64 * 4).map(|i| (i * 97 % 251) as u8).collect();
        let header = Header::new(8, 8, Channels::Rgba, Colorspace::Srgb);
        let encoded = encode_to_vec(&header, &samples).unwrap();
        assert!(encoded.len() <= max_encoded_len(&header).unwrap());
        assert_eq!(decode_to_vec(&encoded).unwrap().pixels, samples);
    }
}
