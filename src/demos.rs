//! Built-in effects, one per image kind, used by the binary and the tests.

use crate::effect::{EffectOptions, FrameSource, ProgressiveEffect};
use crate::image::{AlphaMode, Image, Rgba};
use std::f64::consts::TAU;

/// Sum-of-sines plasma rendered as grayscale; colors come from the palette
/// table.
pub struct Plasma {
    frame: Image,
}

impl Plasma {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: Image::new_gray(width, height),
        }
    }
}

impl FrameSource for Plasma {
    fn render(&mut self, t: f64) -> &Image {
        let (w, h) = (self.frame.width(), self.frame.height());
        let phase = t * TAU;
        let pix = self.frame.pix_mut();
        for y in 0..h {
            let fy = y as f64 / h.max(1) as f64;
            for x in 0..w {
                let fx = x as f64 / w.max(1) as f64;
                let v = (fx * 10.0 + phase).sin()
                    + (fy * 8.0 - phase * 2.0).sin()
                    + ((fx + fy) * 6.0 + phase).sin()
                    + (((fx - 0.5).powi(2) + (fy - 0.5).powi(2)).sqrt() * 12.0 - phase * 3.0).sin();
                pix[y * w + x] = ((v + 4.0) * 31.875) as u8;
            }
        }
        &self.frame
    }
}

/// Concentric rings cycling through a fixed 16-color palette.
pub struct Rings {
    frame: Image,
}

const RING_COLORS: usize = 16;

impl Rings {
    pub fn new(width: usize, height: usize) -> Self {
        let palette = (0..RING_COLORS)
            .map(|i| {
                let a = i as f64 / RING_COLORS as f64 * TAU;
                let c = |off: f64| ((a + off).sin() * 127.0 + 128.0) as u8;
                Rgba::opaque(c(0.0), c(TAU / 3.0), c(2.0 * TAU / 3.0))
            })
            .collect();
        Self {
            frame: Image::new_paletted(width, height, palette),
        }
    }
}

impl FrameSource for Rings {
    fn render(&mut self, t: f64) -> &Image {
        let (w, h) = (self.frame.width(), self.frame.height());
        let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
        let shift = t * RING_COLORS as f64;
        let pix = self.frame.pix_mut();
        for y in 0..h {
            for x in 0..w {
                let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
                let band = (d / 3.0 + shift) as usize % RING_COLORS;
                pix[y * w + x] = band as u8;
            }
        }
        &self.frame
    }
}

/// Textured tunnel with a dark vignette, rendered as premultiplied RGBA.
pub struct Tunnel {
    frame: Image,
}

impl Tunnel {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: Image::new_truecolor(width, height, AlphaMode::Premultiplied),
        }
    }
}

impl FrameSource for Tunnel {
    fn render(&mut self, t: f64) -> &Image {
        let (w, h) = (self.frame.width(), self.frame.height());
        let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
        let radius = cx.min(cy).max(1.0);
        let pix = self.frame.pix_mut();
        for y in 0..h {
            for x in 0..w {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                let dist = (dx * dx + dy * dy).sqrt().max(0.5);
                let u = (32.0 / dist + t * 8.0).fract();
                let v = (dy.atan2(dx) / TAU + 0.5 + t).fract();
                let check = ((u * 8.0) as u32 ^ (v * 16.0) as u32) & 1;
                let alpha = (dist / radius).min(1.0);
                let a = (alpha * 255.0) as u8;
                let base: [f64; 3] = if check == 1 {
                    [255.0, 180.0, 60.0]
                } else {
                    [40.0, 60.0, 160.0]
                };
                let o = (y * w + x) * 4;
                for c in 0..3 {
                    pix[o + c] = (base[c] * alpha) as u8;
                }
                pix[o + 3] = a;
            }
        }
        &self.frame
    }
}

/// Scrolls a loaded picture horizontally once per cycle, wrapping around.
/// Truecolor pictures are shown through their luma.
pub struct Scroller {
    source: Image,
    frame: Image,
}

impl Scroller {
    pub fn new(picture: Image) -> Self {
        let source = match picture {
            img @ (Image::Paletted(_) | Image::Gray(_)) => img,
            other => crate::assets::to_gray(&other),
        };
        let (w, h) = (source.width(), source.height());
        let frame = match &source {
            Image::Paletted(src) => Image::new_paletted(w, h, src.palette().to_vec()),
            _ => Image::new_gray(w, h),
        };
        Self { source, frame }
    }
}

impl FrameSource for Scroller {
    fn render(&mut self, t: f64) -> &Image {
        let (w, h) = (self.source.width(), self.source.height());
        if w == 0 {
            return &self.frame;
        }
        let offset = ((t * w as f64) as usize) % w;
        let dst = self.frame.pix_mut();
        for y in 0..h {
            let row = self.source.row(y);
            let out = &mut dst[y * w..(y + 1) * w];
            out[..w - offset].copy_from_slice(&row[offset..]);
            out[w - offset..].copy_from_slice(&row[..offset]);
        }
        &self.frame
    }
}

/// Conway's game of life. Advances one generation per frame regardless of
/// time; reseeds when the board dies out or stagnates.
pub struct Life {
    width: usize,
    height: usize,
    cells: Vec<bool>,
    next: Vec<bool>,
    frame: Image,
    rng: fastrand::Rng,
    generation: u64,
}

const LIFE_PALETTE: [Rgba; 2] = [Rgba::BLACK, Rgba::opaque(120, 255, 120)];

impl Life {
    pub fn new(seed: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
            next: Vec::new(),
            frame: Image::new_paletted(0, 0, LIFE_PALETTE.to_vec()),
            rng: fastrand::Rng::with_seed(seed),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn alive(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    fn seed(&mut self) {
        for c in &mut self.cells {
            *c = self.rng.u8(..) < 80;
        }
        self.generation = 0;
    }

    fn step(&mut self) {
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            for x in 0..w {
                let mut n = 0;
                let neighbours = [
                    (w - 1, h - 1),
                    (0, h - 1),
                    (1, h - 1),
                    (w - 1, 0),
                    (1, 0),
                    (w - 1, 1),
                    (0, 1),
                    (1, 1),
                ];
                for (dx, dy) in neighbours {
                    if self.cells[((y + dy) % h) * w + (x + dx) % w] {
                        n += 1;
                    }
                }
                let alive = self.cells[y * w + x];
                self.next[y * w + x] = matches!((alive, n), (true, 2) | (_, 3));
            }
        }
        let changed = self.cells != self.next;
        std::mem::swap(&mut self.cells, &mut self.next);
        self.generation += 1;
        if !changed || !self.cells.contains(&true) {
            self.seed();
        }
    }
}

impl ProgressiveEffect for Life {
    fn reset(&mut self, options: EffectOptions) {
        self.width = options.width;
        self.height = options.height;
        let n = self.width * self.height;
        self.cells = vec![false; n];
        self.next = vec![false; n];
        self.frame = Image::new_paletted(self.width, self.height, LIFE_PALETTE.to_vec());
        self.seed();
    }

    fn render(&mut self) -> &Image {
        if self.width > 0 && self.height > 0 {
            self.step();
        }
        let pix = self.frame.pix_mut();
        for (p, &c) in pix.iter_mut().zip(&self.cells) {
            *p = u8::from(c);
        }
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn life_blinker_oscillates() {
        let mut life = Life::new(1);
        life.reset(EffectOptions {
            width: 5,
            height: 5,
        });
        life.cells.fill(false);
        for x in 1..4 {
            life.cells[2 * 5 + x] = true;
        }
        life.render();
        let vertical: Vec<usize> = (0..25).filter(|&i| life.cells[i]).collect();
        assert_eq!(vertical, vec![7, 12, 17]);
        life.render();
        let horizontal: Vec<usize> = (0..25).filter(|&i| life.cells[i]).collect();
        assert_eq!(horizontal, vec![11, 12, 13]);
    }

    #[test]
    fn scroller_wraps_rows() {
        let pic = Image::gray(4, 1, 5, vec![1, 2, 3, 4, 99]).unwrap();
        let mut s = Scroller::new(pic);
        assert_eq!(s.render(0.0).pix(), &[1, 2, 3, 4]);
        assert_eq!(s.render(0.5).pix(), &[3, 4, 1, 2]);
    }

    #[test]
    fn effects_render_their_own_kind() {
        assert_eq!(Plasma::new(8, 4).render(0.3).kind(), "gray");
        assert_eq!(Rings::new(8, 4).render(0.3).kind(), "paletted");
        let mut tunnel = Tunnel::new(8, 4);
        let img = tunnel.render(0.3);
        assert!(matches!(
            img,
            Image::Truecolor(tc) if tc.alpha() == AlphaMode::Premultiplied
        ));
    }
}
