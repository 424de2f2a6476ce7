use crate::consts::{QOI_END_MARKER, QOI_HEADER_SIZE, QOI_MAGIC};
use byteorder::{BigEndian, ByteOrder};
use snafu::{ensure, Snafu};

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum HeaderError {
    #[snafu(display("Header needs 14 bytes, but only {len} are available"))]
    UnexpectedEof { len: usize },
    #[snafu(display("Invalid magic bytes {magic:02x?}, expected `qoif`"))]
    InvalidMagic { magic: [u8; 4] },
}

/// Number of interleaved samples per pixel of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channels {
    Rgb = 3,
    Rgba = 4,
}

impl TryFrom<u8> for Channels {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Channels::Rgb),
            4 => Ok(Channels::Rgba),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Colorspace {
    /// sRGB color channels with linear alpha.
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl TryFrom<u8> for Colorspace {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Colorspace::Srgb),
            1 => Ok(Colorspace::Linear),
            other => Err(other),
        }
    }
}

/// The fixed 14-byte stream header.
///
/// `channels` and `colorspace` are kept as the raw bytes from the stream, since they do not
/// affect decoding. Use [`Header::channels`] and [`Header::colorspace`] for typed views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub colorspace: u8,
}

impl Header {
    pub const fn new(width: u32, height: u32, channels: Channels, colorspace: Colorspace) -> Self {
        Self {
            width,
            height,
            channels: channels as u8,
            colorspace: colorspace as u8,
        }
    }

    pub fn channels(&self) -> Option<Channels> {
        Channels::try_from(self.channels).ok()
    }

    pub fn colorspace(&self) -> Option<Colorspace> {
        Colorspace::try_from(self.colorspace).ok()
    }

    /// `width * height`, or `None` if it does not fit a `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        let width = usize::try_from(self.width).ok()?;
        let height = usize::try_from(self.height).ok()?;
        width.checked_mul(height)
    }

    pub fn to_bytes(&self) -> [u8; QOI_HEADER_SIZE] {
        let mut bytes = [0; QOI_HEADER_SIZE];
        bytes[..4].copy_from_slice(&QOI_MAGIC);
        BigEndian::write_u32(&mut bytes[4..8], self.width);
        BigEndian::write_u32(&mut bytes[8..12], self.height);
        bytes[12] = self.channels;
        bytes[13] = self.colorspace;
        bytes
    }
}

/// Parses the header at the start of `data` and returns it together with the remaining bytes.
pub fn read_header(data: &[u8]) -> Result<(Header, &[u8]), HeaderError> {
    ensure!(
        data.len() >= QOI_HEADER_SIZE,
        header_error::UnexpectedEofSnafu { len: data.len() }
    );

    let (header, rest) = data.split_at(QOI_HEADER_SIZE);
    let magic = [header[0], header[1], header[2], header[3]];
    ensure!(magic == QOI_MAGIC, header_error::InvalidMagicSnafu { magic });

    let header = Header {
        width: BigEndian::read_u32(&header[4..8]),
        height: BigEndian::read_u32(&header[8..12]),
        channels: header[12],
        colorspace: header[13],
    };
    log::debug!(
        "QOI w:{} h:{} channels:{} color:{}",
        header.width,
        header.height,
        header.channels,
        header.colorspace
    );

    Ok((header, rest))
}

pub fn write_header(header: &Header) -> [u8; QOI_HEADER_SIZE] {
    header.to_bytes()
}

/// Reads the 8-byte end marker. Returns `None` if fewer than 8 bytes are left, otherwise the
/// big-endian value found, which is `1` for a well-formed stream.
pub fn read_end_marker(data: &[u8]) -> Option<u64> {
    data.get(..QOI_END_MARKER.len()).map(BigEndian::read_u64)
}

pub const fn end_marker() -> [u8; 8] {
    QOI_END_MARKER
}
