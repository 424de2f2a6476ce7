//! RGBA pixels and the wrapping channel arithmetic shared by encoder and decoder.

/// A single RGBA pixel. All channel arithmetic wraps modulo 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Per-channel wrapping difference between two pixels, interpreted as signed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub r: i8,
    pub g: i8,
    pub b: i8,
}

impl Pixel {
    /// The implicit previous pixel at the start of every stream.
    pub const INITIAL: Pixel = Pixel::new(0, 0, 0, 255);

    /// Content of a color array slot that was never written.
    pub const ZERO: Pixel = Pixel::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn from_rgba([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }

    #[inline]
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Builds a pixel from 3 or 4 interleaved samples. Missing alpha becomes opaque.
    #[inline]
    pub(crate) fn from_samples(samples: &[u8]) -> Self {
        match *samples {
            [r, g, b, a, ..] => Self::new(r, g, b, a),
            [r, g, b] => Self::new(r, g, b, 255),
            _ => panic!("a pixel needs at least 3 samples, got {}", samples.len()),
        }
    }

    /// Position of this pixel in the color array: `(r * 3 + g * 5 + b * 7 + a * 11) % 64`.
    #[inline]
    pub const fn hash_index(self) -> u8 {
        // 64 divides 256, so wrapping u8 arithmetic keeps the low 6 bits exact.
        self.r
            .wrapping_mul(3)
            .wrapping_add(self.g.wrapping_mul(5))
            .wrapping_add(self.b.wrapping_mul(7))
            .wrapping_add(self.a.wrapping_mul(11))
            & 0b0011_1111
    }

    /// Difference `self - prev` per color channel, ignoring alpha.
    #[inline]
    pub const fn delta_from(self, prev: Pixel) -> Delta {
        Delta {
            r: self.r.wrapping_sub(prev.r) as i8,
            g: self.g.wrapping_sub(prev.g) as i8,
            b: self.b.wrapping_sub(prev.b) as i8,
        }
    }

    /// Applies signed per-channel differences, keeping alpha.
    #[inline]
    pub const fn offset(self, dr: i8, dg: i8, db: i8) -> Pixel {
        Pixel {
            r: self.r.wrapping_add(dr as u8),
            g: self.g.wrapping_add(dg as u8),
            b: self.b.wrapping_add(db as u8),
            a: self.a,
        }
    }

    /// Replaces the color channels, keeping alpha.
    #[inline]
    pub const fn with_rgb(self, [r, g, b]: [u8; 3]) -> Pixel {
        Pixel::new(r, g, b, self.a)
    }
}

impl From<[u8; 4]> for Pixel {
    fn from(rgba: [u8; 4]) -> Self {
        Self::from_rgba(rgba)
    }
}

impl From<Pixel> for [u8; 4] {
    fn from(pixel: Pixel) -> Self {
        pixel.to_rgba()
    }
}

impl Delta {
    /// Whether all three differences fit the 2-bit `-2..1` range of `QOI_OP_DIFF`.
    #[inline]
    pub const fn fits_diff(self) -> bool {
        (self.r as u8).wrapping_add(2) <= 3
            && (self.g as u8).wrapping_add(2) <= 3
            && (self.b as u8).wrapping_add(2) <= 3
    }

    /// Red and blue differences relative to the green difference, as used by `QOI_OP_LUMA`.
    #[inline]
    pub const fn relative_to_green(self) -> (i8, i8) {
        (self.r.wrapping_sub(self.g), self.b.wrapping_sub(self.g))
    }

    /// Whether the differences fit `QOI_OP_LUMA`: green in `-32..31`, red and blue relative to
    /// green in `-8..7`.
    #[inline]
    pub const fn fits_luma(self) -> bool {
        let (dr_dg, db_dg) = self.relative_to_green();
        (self.g as u8).wrapping_add(32) < 64
            && (dr_dg as u8).wrapping_add(8) < 16
            && (db_dg as u8).wrapping_add(8) < 16
    }
}
