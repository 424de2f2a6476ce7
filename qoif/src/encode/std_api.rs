use crate::{
    consts::QOI_END_MARKER,
    encode::{pixels, validate, EncodeError, QoiEncodeContext},
    header::{Channels, Header},
};
use snafu::{ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum EncodeWriteError {
    #[snafu(display("Invalid encoder input"))]
    InvalidInput { source: EncodeError },
    WriteIo { source: std::io::Error },
}

/// Writes the 14-byte header.
pub fn encode_header<W: Write>(header: &Header, mut w: W) -> Result<(), EncodeWriteError> {
    w.write_all(&header.to_bytes()).context(WriteIoSnafu)
}

/// Encodes `samples` into `w`, including header and end marker.
///
/// Every chunk is written separately, so `w` should be buffered.
pub fn encode<W: Write>(header: &Header, samples: &[u8], mut w: W) -> Result<(), EncodeWriteError> {
    let channels = validate(header, samples).context(InvalidInputSnafu)?;

    encode_header(header, &mut w)?;
    QoiEncodeContext::new()
        .encode_pixels(
            pixels(samples, channels),
            channels == Channels::Rgba,
            |bytes| w.write_all(bytes),
        )
        .context(WriteIoSnafu)?;
    w.write_all(&QOI_END_MARKER).context(WriteIoSnafu)?;

    log::debug!("Encoded {}x{} image", header.width, header.height);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode::encode_to_vec, header::Colorspace};
    use std::io;

    #[test]
    fn matches_vec_encoder() {
        let header = Header::new(4, 2, Channels::Rgba, Colorspace::Srgb);
        let samples: Vec<u8> = (0..32u8).map(|i| i.wrapping_mul(37)).collect();

        let mut written = Vec::new();
        encode(&header, &samples, &mut written).unwrap();
        assert_eq!(written, encode_to_vec(&header, &samples).unwrap());
    }

    #[test]
    fn validates_before_writing() {
        let header = Header::new(4, 2, Channels::Rgb, Colorspace::Srgb);
        let mut written = Vec::new();
        assert!(matches!(
            encode(&header, &[0; 3], &mut written),
            Err(EncodeWriteError::InvalidInput {
                source: EncodeError::InvalidDimensions { .. }
            })
        ));
        assert!(written.is_empty());
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reports_write_errors() {
        let header = Header::new(1, 1, Channels::Rgb, Colorspace::Srgb);
        assert!(matches!(
            encode(&header, &[1, 2, 3], FailingWriter),
            Err(EncodeWriteError::WriteIo { .. })
        ));
    }
}
