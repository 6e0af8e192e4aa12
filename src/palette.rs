use crate::image::Rgba;

/// Grayscale-to-color lookup used for `Image::Gray` frames.
///
/// Entries are packed `0xAABBGGRR`, matching a little-endian RGBA byte
/// layout. The derived RGBA view always carries an opaque alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteTable {
    packed: [u32; 256],
    rgba: [Rgba; 256],
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl PaletteTable {
    /// Identity gray ramp: entry `i` is `(i, i, i)`.
    pub fn identity() -> Self {
        let mut packed = [0u32; 256];
        for (i, slot) in packed.iter_mut().enumerate() {
            let mut c = i as u32;
            c |= c << 8;
            c |= c << 16;
            *slot = c | 0xff << 24;
        }
        Self::from_packed(packed)
    }

    pub fn from_packed(packed: [u32; 256]) -> Self {
        let rgba = std::array::from_fn(|i| unpack(packed[i]));
        Self { packed, rgba }
    }

    /// Two-segment gradient: black at 0, `mid` at 128, white at 255.
    pub fn gradient(mid: Rgba) -> Self {
        let lerp = |a: u8, b: u8, num: u32, den: u32| {
            (a as i32 + (b as i32 - a as i32) * num as i32 / den as i32) as u8
        };
        let mut packed = [0u32; 256];
        for (i, slot) in packed.iter_mut().enumerate() {
            let i = i as u32;
            let (r, g, b) = if i < 128 {
                (
                    lerp(0, mid.r, i, 128),
                    lerp(0, mid.g, i, 128),
                    lerp(0, mid.b, i, 128),
                )
            } else {
                (
                    lerp(mid.r, 255, i - 128, 127),
                    lerp(mid.g, 255, i - 128, 127),
                    lerp(mid.b, 255, i - 128, 127),
                )
            };
            *slot = pack(Rgba::opaque(r, g, b));
        }
        Self::from_packed(packed)
    }

    /// Replace every entry. Callers must not do this while a batch render is
    /// running on other threads.
    pub fn replace(&mut self, packed: [u32; 256]) {
        *self = Self::from_packed(packed);
    }

    pub fn packed(&self, v: u8) -> u32 {
        self.packed[v as usize]
    }

    pub fn rgba(&self, v: u8) -> Rgba {
        self.rgba[v as usize]
    }

    pub fn entries(&self) -> &[Rgba; 256] {
        &self.rgba
    }
}

fn unpack(c: u32) -> Rgba {
    Rgba::opaque(c as u8, (c >> 8) as u8, (c >> 16) as u8)
}

fn pack(c: Rgba) -> u32 {
    c.r as u32 | (c.g as u32) << 8 | (c.b as u32) << 16 | (c.a as u32) << 24
}
