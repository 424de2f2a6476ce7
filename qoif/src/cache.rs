use crate::pixel::Pixel;

/// The 64-slot color array of recently seen pixels.
///
/// Each slot holds the last pixel written to it. Pixels are placed by [`Pixel::hash_index`], so
/// a later pixel with the same hash silently replaces an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCache {
    slots: [Pixel; 64],
}

impl ColorCache {
    pub const fn new() -> Self {
        Self {
            slots: [Pixel::ZERO; 64],
        }
    }

    /// Returns the pixel stored at `index`. Only the low 6 bits of `index` are used.
    #[inline]
    pub const fn lookup(&self, index: u8) -> Pixel {
        self.slots[(index & 0b0011_1111) as usize]
    }

    /// Stores `pixel` in its slot, replacing the previous occupant.
    #[inline]
    pub fn update(&mut self, pixel: Pixel) {
        self.slots[usize::from(pixel.hash_index())] = pixel;
    }

    /// Returns the slot index of `pixel` if the cache currently holds exactly that pixel.
    #[inline]
    pub fn position(&self, pixel: Pixel) -> Option<u8> {
        let index = pixel.hash_index();
        (self.lookup(index) == pixel).then_some(index)
    }
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}
