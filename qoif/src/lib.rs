//! Encoder and decoder for the QOI image format.
//!
//! QOI losslessly compresses 8-bit RGB and RGBA images by exploiting three regularities of natural
//! images: runs of identical pixels, small differences between neighbouring pixels, and colors
//! that recur shortly after they were last seen.
//!
//! # Stream format
//!
//! ## Header
//!
//! - 4-byte magic: `qoif`
//! - u32be width
//! - u32be height
//! - u8 channels (3 = RGB, 4 = RGBA). Informational, the decoder always produces RGBA.
//! - u8 colorspace (0 = sRGB with linear alpha, 1 = all channels linear). Informational.
//!
//! ## Body
//!
//! A sequence of chunks, each starting with a tag byte. See [consts] for the different
//! operation types. Encoder and decoder both track the previous pixel, starting at
//! `(0, 0, 0, 255)`, and a 64-slot color array ([`ColorCache`]) that starts zeroed.
//!
//! ## End marker
//!
//! 7 `0x00` bytes followed by a single `0x01`. The decoder reports a missing or wrong end marker,
//! but the pixels decoded before it stay valid.
//!
//! # Usage
//!
//! ```
//! use qoif::{Channels, Colorspace, Header};
//!
//! let header = Header::new(2, 1, Channels::Rgb, Colorspace::Srgb);
//! let encoded = qoif::encode_to_vec(&header, &[10, 20, 30, 10, 20, 30]).unwrap();
//!
//! let decoded = qoif::decode_to_vec(&encoded).unwrap();
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.pixels, [10, 20, 30, 255, 10, 20, 30, 255]);
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod cache;
pub mod decode;
pub mod encode;
pub mod header;
pub mod op;
pub mod pixel;

pub use cache::ColorCache;
pub use decode::{
    decode_to_slice, decode_to_vec, DecodeError, DecodeReport, DecodeWarning, Decoded,
};
#[cfg(feature = "std")]
pub use encode::{encode, encode_header, EncodeWriteError};
pub use encode::{encode_to_vec, max_encoded_len, EncodeError};
pub use header::{read_header, write_header, Channels, Colorspace, Header, HeaderError};
pub use op::Op;
pub use pixel::Pixel;

pub mod consts {
    /// Size of the encoded header, in bytes.
    pub const QOI_HEADER_SIZE: usize = 14;

    /// Magic bytes at the start of every stream.
    pub const QOI_MAGIC: [u8; 4] = *b"qoif";

    /// The end marker, a big-endian `1`.
    pub const QOI_END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

    /// Mask selecting the 2-bit tag of the 2-bit operations.
    pub const QOI_MASK_2: u8 = 0b1100_0000;

    /// Re-emit a pixel from the color array.
    ///
    /// ```plain
    /// .- QOI_OP_INDEX ----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  0  0 |     index       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b00
    /// - 6-bit index into the color array: 0..63
    /// - The re-emitted pixel is _not_ written back to the color array.
    pub const QOI_OP_INDEX: u8 = 0b0000_0000;

    /// Calculate a pixel based on a 2-bit difference from the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_DIFF -----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----+-----+-----|
    /// |  0  1 |  dr |  dg |  db |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b01
    /// - 2-bit red, green, and blue channel differences from the previous pixel, each between
    ///   -2..1 and stored with a bias of 2
    /// - Differences wrap around, so `255 + 1 == 0` and `0 - 1 == 255`.
    /// - Alpha stays unchanged.
    pub const QOI_OP_DIFF: u8 = 0b0100_0000;

    /// Calculate a pixel based on a 6-bit green-channel difference from the previous pixel, and
    /// differences to the green-channel difference for red and blue.
    ///
    /// ```plain
    /// .- QOI_OP_LUMA -------------------------------------.
    /// |         Byte[0]         |         Byte[1]         |
    /// |  7  6  5  4  3  2  1  0 |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------+-------------+-----------|
    /// |  1  0 |   green diff    |   dr - dg   |  db - dg  |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - 2-bit tag b10
    /// - 6-bit green channel difference from the previous pixel (`-32..31`), stored with a bias of
    ///   32
    /// - 4-bit red channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    /// - 4-bit blue channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    /// - Alpha stays unchanged.
    pub const QOI_OP_LUMA: u8 = 0b1000_0000;

    /// Repeats the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RUN ------------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  1  1 |       run       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b11
    /// - 6-bit run-length repeating the previous pixel: 1..62
    /// - The run-length is stored with a bias of -1. Note that the run-lengths 63 and 64 (`b111110`
    ///   and `b111111`) are illegal as they are occupied by the QOI_OP_RGB and QOI_OP_RGBA tags.
    pub const QOI_OP_RUN: u8 = 0b1100_0000;

    /// Emits a full pixel, keeping the previous alpha.
    ///
    /// ```plain
    /// .- QOI_OP_RGB ------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  0 |   red   |  green  |  blue   |
    /// `-------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111110
    pub const QOI_OP_RGB: u8 = 0b1111_1110;

    /// Emits a full pixel including alpha. The only operation that can change alpha.
    ///
    /// ```plain
    /// .- QOI_OP_RGBA ---------------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] | Byte[4] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  1 |   red   |  green  |  blue   |  alpha  |
    /// `-----------------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111111
    pub const QOI_OP_RGBA: u8 = 0b1111_1111;

    /// Longest run a single QOI_OP_RUN chunk can describe.
    pub const QOI_MAX_RUN: u8 = 62;
}
