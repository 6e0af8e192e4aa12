//! Image → presentable RGBA buffer conversion.

use crate::image::{AlphaMode, Image, palette_lut};
use crate::palette::PaletteTable;

/// Row order a presentation surface expects in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the top of the picture (canvas / image-data convention).
    TopDown,
    /// Row 0 is the bottom of the picture (window / GL texture convention).
    BottomUp,
}

/// Straight RGBA destination buffer. `stride` is in pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub order: RowOrder,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, order: RowOrder) -> Self {
        Self::with_stride(width, height, width, order)
    }

    pub fn with_stride(width: usize, height: usize, stride: usize, order: RowOrder) -> Self {
        let stride = stride.max(width);
        Self {
            width,
            height,
            stride,
            order,
            data: vec![0; stride * height * 4],
        }
    }

    /// Memory row holding visual row `y` (0 = top of the picture).
    pub fn memory_row(&self, y: usize) -> usize {
        match self.order {
            RowOrder::TopDown => y,
            RowOrder::BottomUp => self.height - 1 - y,
        }
    }

    /// Pixel at visual coordinates (`y` = 0 is the top).
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (self.memory_row(y) * self.stride + x) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Bytes of visual row `y`, `width` pixels long.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = self.memory_row(y) * self.stride * 4;
        &self.data[start..start + self.width * 4]
    }

    fn row_mut(&mut self, y: usize, len_px: usize) -> &mut [u8] {
        let start = self.memory_row(y) * self.stride * 4;
        &mut self.data[start..start + len_px * 4]
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Tightly packed visual-top-first copy, as canvas-style consumers want it.
    pub fn to_top_down_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}

/// Write `src` into `dst`, clipping to the smaller of the two extents.
///
/// Gray samples go through `palette`; paletted samples through the image's
/// own palette. Rows land in `dst` according to its [`RowOrder`].
pub fn convert(dst: &mut PixelBuffer, src: &Image, palette: &PaletteTable) {
    let w = src.width().min(dst.width);
    let h = src.height().min(dst.height);
    if w == 0 || h == 0 {
        return;
    }

    match src {
        Image::Paletted(img) => {
            let lut = palette_lut(img.palette());
            for y in 0..h {
                let d_line = dst.row_mut(y, w);
                for (px, &v) in d_line.chunks_exact_mut(4).zip(img.row(y)) {
                    px.copy_from_slice(&lut[v as usize]);
                }
            }
        }
        Image::Gray(img) => {
            for y in 0..h {
                let d_line = dst.row_mut(y, w);
                for (px, &v) in d_line.chunks_exact_mut(4).zip(img.row(y)) {
                    let p = palette.packed(v);
                    px[0] = p as u8;
                    px[1] = (p >> 8) as u8;
                    px[2] = (p >> 16) as u8;
                    px[3] = 0xff;
                }
            }
        }
        Image::Truecolor(img)
            if img.alpha() == AlphaMode::Straight && dst.order == RowOrder::TopDown =>
        {
            for y in 0..h {
                dst.row_mut(y, w).copy_from_slice(&img.row(y)[..w * 4]);
            }
        }
        Image::Truecolor(_) => {
            let straight = src.to_straight_rgba(palette);
            let pitch = src.width() * 4;
            for y in 0..h {
                let start = y * pitch;
                dst.row_mut(y, w).copy_from_slice(&straight[start..start + w * 4]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_row_maps_visual_rows() {
        let top = PixelBuffer::new(2, 3, RowOrder::TopDown);
        let bottom = PixelBuffer::new(2, 3, RowOrder::BottomUp);
        assert_eq!(top.memory_row(0), 0);
        assert_eq!(bottom.memory_row(0), 2);
        assert_eq!(bottom.memory_row(2), 0);
    }

    #[test]
    fn oversized_source_is_clipped() {
        let src = Image::gray(4, 4, 4, vec![9; 16]).unwrap();
        let mut dst = PixelBuffer::new(2, 2, RowOrder::TopDown);
        convert(&mut dst, &src, &PaletteTable::identity());
        assert_eq!(dst.data, [9, 9, 9, 255].repeat(4));
    }
}
