//! Chunk operations and their byte layout. See [`crate::consts`] for the bit diagrams.

use crate::consts::*;
use core::ops::Deref;

/// Length of the longest chunk (`QOI_OP_RGBA`), in bytes.
pub const MAX_OP_LEN: usize = 5;

/// A single decoded chunk.
///
/// Differences are stored unbiased, as signed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Rgb([u8; 3]),
    Rgba([u8; 4]),
    Index(u8),
    Diff { dr: i8, dg: i8, db: i8 },
    Luma { dg: i8, dr_dg: i8, db_dg: i8 },
    /// Run-length, 1..=62.
    Run(u8),
}

/// A chunk whose tag was read, but whose payload is cut off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedOp {
    pub tag: u8,
    /// Payload bytes the tag requires.
    pub needed: usize,
    /// Payload bytes that were available.
    pub available: usize,
}

impl TruncatedOp {
    pub fn op_name(&self) -> &'static str {
        op_name_for_tag(self.tag)
    }
}

fn op_name_for_tag(tag: u8) -> &'static str {
    match tag {
        QOI_OP_RGB => "QOI_OP_RGB",
        QOI_OP_RGBA => "QOI_OP_RGBA",
        _ => match tag & QOI_MASK_2 {
            QOI_OP_INDEX => "QOI_OP_INDEX",
            QOI_OP_DIFF => "QOI_OP_DIFF",
            QOI_OP_LUMA => "QOI_OP_LUMA",
            _ => "QOI_OP_RUN",
        },
    }
}

impl Op {
    /// Reads one chunk from the start of `data`.
    ///
    /// Returns `None` if `data` is empty, otherwise the chunk and the number of bytes it
    /// occupies, or the truncation if the payload is incomplete.
    pub fn read(data: &[u8]) -> Option<Result<(Op, usize), TruncatedOp>> {
        let (&tag, payload) = data.split_first()?;
        Some(Self::read_payload(tag, payload).map(|op| (op, op.encoded_len())))
    }

    fn read_payload(tag: u8, payload: &[u8]) -> Result<Op, TruncatedOp> {
        let truncated = |needed| TruncatedOp {
            tag,
            needed,
            available: payload.len(),
        };

        let op = match tag {
            QOI_OP_RGB => {
                let &[r, g, b, ..] = payload else {
                    return Err(truncated(3));
                };
                Op::Rgb([r, g, b])
            }
            QOI_OP_RGBA => {
                let &[r, g, b, a, ..] = payload else {
                    return Err(truncated(4));
                };
                Op::Rgba([r, g, b, a])
            }
            _ => match tag & QOI_MASK_2 {
                QOI_OP_INDEX => Op::Index(tag & 0b0011_1111),
                QOI_OP_DIFF => Op::Diff {
                    dr: ((tag >> 4) & 0b11) as i8 - 2,
                    dg: ((tag >> 2) & 0b11) as i8 - 2,
                    db: (tag & 0b11) as i8 - 2,
                },
                QOI_OP_LUMA => {
                    let &[rb, ..] = payload else {
                        return Err(truncated(1));
                    };
                    Op::Luma {
                        dg: (tag & 0b0011_1111) as i8 - 32,
                        dr_dg: (rb >> 4) as i8 - 8,
                        db_dg: (rb & 0b1111) as i8 - 8,
                    }
                }
                _ => Op::Run((tag & 0b0011_1111) + 1),
            },
        };

        Ok(op)
    }

    /// Encoded size of the chunk, including the tag byte.
    pub const fn encoded_len(&self) -> usize {
        match self {
            Op::Rgb(_) => 4,
            Op::Rgba(_) => 5,
            Op::Index(_) | Op::Diff { .. } | Op::Run(_) => 1,
            Op::Luma { .. } => 2,
        }
    }

    /// Serializes the chunk. Values must be within the ranges documented on the tag constants.
    pub fn to_bytes(self) -> OpBytes {
        let mut bytes = [0; MAX_OP_LEN];
        match self {
            Op::Rgb([r, g, b]) => bytes[..4].copy_from_slice(&[QOI_OP_RGB, r, g, b]),
            Op::Rgba([r, g, b, a]) => bytes.copy_from_slice(&[QOI_OP_RGBA, r, g, b, a]),
            Op::Index(index) => {
                debug_assert!(index < 64);
                bytes[0] = QOI_OP_INDEX | index;
            }
            Op::Diff { dr, dg, db } => {
                debug_assert!(matches!((dr, dg, db), (-2..=1, -2..=1, -2..=1)));
                bytes[0] = QOI_OP_DIFF
                    | ((dr + 2) as u8) << 4
                    | ((dg + 2) as u8) << 2
                    | (db + 2) as u8;
            }
            Op::Luma { dg, dr_dg, db_dg } => {
                debug_assert!(matches!((dg, dr_dg, db_dg), (-32..=31, -8..=7, -8..=7)));
                bytes[0] = QOI_OP_LUMA | (dg + 32) as u8;
                bytes[1] = ((dr_dg + 8) as u8) << 4 | (db_dg + 8) as u8;
            }
            Op::Run(run) => {
                debug_assert!((1..=QOI_MAX_RUN).contains(&run));
                bytes[0] = QOI_OP_RUN | (run - 1);
            }
        }

        OpBytes {
            bytes,
            len: self.encoded_len() as u8,
        }
    }
}

/// The serialized form of an [`Op`].
#[derive(Debug, Clone, Copy)]
pub struct OpBytes {
    bytes: [u8; MAX_OP_LEN],
    len: u8,
}

impl Deref for OpBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(data: &[u8]) -> Op {
        let (op, len) = Op::read(data).unwrap().unwrap();
        assert_eq!(len, data.len(), "{op:?} should consume the whole input");
        op
    }

    #[test]
    fn dispatches_every_tag_family() {
        assert_eq!(read_one(&[0xfe, 1, 2, 3]), Op::Rgb([1, 2, 3]));
        assert_eq!(read_one(&[0xff, 1, 2, 3, 4]), Op::Rgba([1, 2, 3, 4]));
        assert_eq!(read_one(&[0b0010_1010]), Op::Index(42));
        assert_eq!(
            read_one(&[0b0111_1001]),
            Op::Diff {
                dr: 1,
                dg: 0,
                db: -1
            }
        );
        assert_eq!(
            read_one(&[0b1011_1110, 0xa5]),
            Op::Luma {
                dg: 30,
                dr_dg: 2,
                db_dg: -3
            }
        );
        assert_eq!(read_one(&[0b1100_0000]), Op::Run(1));
        assert_eq!(read_one(&[0b1111_1101]), Op::Run(62));
    }

    #[test]
    fn reads_only_the_first_chunk() {
        let (op, len) = Op::read(&[0x01, 0xfe, 1, 2, 3]).unwrap().unwrap();
        assert_eq!(op, Op::Index(1));
        assert_eq!(len, 1);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        assert!(Op::read(&[]).is_none());
    }

    #[test]
    fn reports_truncated_payloads() {
        let truncated = Op::read(&[0xfe, 1, 2]).unwrap().unwrap_err();
        assert_eq!(
            truncated,
            TruncatedOp {
                tag: 0xfe,
                needed: 3,
                available: 2
            }
        );
        assert_eq!(truncated.op_name(), "QOI_OP_RGB");

        let truncated = Op::read(&[0xff]).unwrap().unwrap_err();
        assert_eq!(truncated.needed, 4);
        assert_eq!(truncated.op_name(), "QOI_OP_RGBA");

        let truncated = Op::read(&[0x80]).unwrap().unwrap_err();
        assert_eq!(truncated.needed, 1);
        assert_eq!(truncated.op_name(), "QOI_OP_LUMA");
    }

    #[test]
    fn serializes_to_the_bytes_it_was_read_from() {
        for bytes in [
            &[0xfe, 9, 8, 7][..],
            &[0xff, 9, 8, 7, 6],
            &[0b0011_1111],
            &[0b0100_0000],
            &[0b0111_1111],
            &[0b1000_0000, 0x00],
            &[0b1011_1111, 0xff],
            &[0b1110_0100],
        ] {
            assert_eq!(&*read_one(bytes).to_bytes(), bytes);
        }
    }

    #[test]
    fn run_bias() {
        assert_eq!(&*Op::Run(1).to_bytes(), &[0b1100_0000]);
        assert_eq!(&*Op::Run(62).to_bytes(), &[0b1111_1101]);
    }
}
