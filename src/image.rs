use crate::error::{FxError, FxResult};

/// Straight 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// How the color channels of a truecolor image relate to its alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    Straight,
    Premultiplied,
}

/// Pixel rows shared by every image kind. Fields stay private to this
/// module and every construction satisfies `check_geometry`, so `row` never
/// indexes past `pix`.
#[derive(Clone, Debug, PartialEq)]
struct Raster {
    width: usize,
    height: usize,
    stride: usize,
    pix: Vec<u8>,
}

impl Raster {
    fn new(
        width: usize,
        height: usize,
        stride: usize,
        pix: Vec<u8>,
        bytes_per_pixel: usize,
    ) -> FxResult<Self> {
        check_geometry(width, height, stride, pix.len(), bytes_per_pixel)?;
        Ok(Self {
            width,
            height,
            stride,
            pix,
        })
    }

    fn blank(width: usize, height: usize, bytes_per_pixel: usize) -> Self {
        Self {
            width,
            height,
            stride: width,
            pix: vec![0; width * height * bytes_per_pixel],
        }
    }

    fn row(&self, y: usize, bytes_per_pixel: usize) -> &[u8] {
        if self.width == 0 {
            return &[];
        }
        let start = y * self.stride * bytes_per_pixel;
        &self.pix[start..start + self.width * bytes_per_pixel]
    }
}

macro_rules! raster_accessors {
    ($ty:ident, $bpp:expr) => {
        impl $ty {
            pub fn width(&self) -> usize {
                self.raster.width
            }

            pub fn height(&self) -> usize {
                self.raster.height
            }

            /// Row pitch in pixels.
            pub fn stride(&self) -> usize {
                self.raster.stride
            }

            pub fn pix(&self) -> &[u8] {
                &self.raster.pix
            }

            /// Row `y` (`y < height`) without stride padding.
            pub fn row(&self, y: usize) -> &[u8] {
                self.raster.row(y, $bpp)
            }

            pub fn into_pix(self) -> Vec<u8> {
                self.raster.pix
            }
        }
    };
}

/// One index per pixel into at most 256 colors.
#[derive(Clone, Debug, PartialEq)]
pub struct PalettedImage {
    raster: Raster,
    palette: Vec<Rgba>,
}

impl PalettedImage {
    pub fn palette(&self) -> &[Rgba] {
        &self.palette
    }
}

/// One intensity per pixel, colored through the render context's palette.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    raster: Raster,
}

/// Four bytes of RGBA per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct TruecolorImage {
    raster: Raster,
    alpha: AlphaMode,
}

impl TruecolorImage {
    pub fn alpha(&self) -> AlphaMode {
        self.alpha
    }
}

raster_accessors!(PalettedImage, 1);
raster_accessors!(GrayImage, 1);
raster_accessors!(TruecolorImage, 4);

/// An effect's output frame.
///
/// Every kind carries a row `stride` (in pixels) that may exceed `width`,
/// so an image can be a view into a wider backing buffer. The payloads are
/// opaque: the constructors below are the only way to build one, and they
/// reject buffers too short for the declared geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Image {
    Paletted(PalettedImage),
    Gray(GrayImage),
    Truecolor(TruecolorImage),
}

impl Image {
    pub fn paletted(
        width: usize,
        height: usize,
        stride: usize,
        pix: Vec<u8>,
        palette: Vec<Rgba>,
    ) -> FxResult<Self> {
        if palette.len() > 256 {
            return Err(FxError::validation(format!(
                "palette has {} entries (max 256)",
                palette.len()
            )));
        }
        Ok(Self::Paletted(PalettedImage {
            raster: Raster::new(width, height, stride, pix, 1)?,
            palette,
        }))
    }

    pub fn gray(width: usize, height: usize, stride: usize, pix: Vec<u8>) -> FxResult<Self> {
        Ok(Self::Gray(GrayImage {
            raster: Raster::new(width, height, stride, pix, 1)?,
        }))
    }

    pub fn truecolor(
        width: usize,
        height: usize,
        stride: usize,
        pix: Vec<u8>,
        alpha: AlphaMode,
    ) -> FxResult<Self> {
        Ok(Self::Truecolor(TruecolorImage {
            raster: Raster::new(width, height, stride, pix, 4)?,
            alpha,
        }))
    }

    /// Blank images with `stride == width`, for effects that render in place.
    pub fn new_gray(width: usize, height: usize) -> Self {
        Self::Gray(GrayImage {
            raster: Raster::blank(width, height, 1),
        })
    }

    pub fn new_paletted(width: usize, height: usize, palette: Vec<Rgba>) -> Self {
        let mut palette = palette;
        palette.truncate(256);
        Self::Paletted(PalettedImage {
            raster: Raster::blank(width, height, 1),
            palette,
        })
    }

    pub fn new_truecolor(width: usize, height: usize, alpha: AlphaMode) -> Self {
        Self::Truecolor(TruecolorImage {
            raster: Raster::blank(width, height, 4),
            alpha,
        })
    }

    fn raster(&self) -> &Raster {
        match self {
            Self::Paletted(img) => &img.raster,
            Self::Gray(img) => &img.raster,
            Self::Truecolor(img) => &img.raster,
        }
    }

    pub fn width(&self) -> usize {
        self.raster().width
    }

    pub fn height(&self) -> usize {
        self.raster().height
    }

    pub fn stride(&self) -> usize {
        self.raster().stride
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Paletted(_) => "paletted",
            Self::Gray(_) => "gray",
            Self::Truecolor(_) => "truecolor",
        }
    }

    pub fn pix(&self) -> &[u8] {
        &self.raster().pix
    }

    /// Row `y` (`y < height`) without stride padding.
    pub fn row(&self, y: usize) -> &[u8] {
        match self {
            Self::Paletted(img) => img.row(y),
            Self::Gray(img) => img.row(y),
            Self::Truecolor(img) => img.row(y),
        }
    }

    /// Mutable access to the raw sample buffer, for effects drawing in place.
    /// The buffer length is fixed, so the geometry stays valid.
    pub fn pix_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Paletted(img) => &mut img.raster.pix,
            Self::Gray(img) => &mut img.raster.pix,
            Self::Truecolor(img) => &mut img.raster.pix,
        }
    }

    /// Straight-alpha RGBA copy with `stride == width`. Gray samples go
    /// through `palette`; premultiplied samples are composited source-over
    /// onto a transparent canvas, which yields the straight color.
    pub fn to_truecolor(&self, palette: &crate::palette::PaletteTable) -> Self {
        let (w, h) = (self.width(), self.height());
        Self::Truecolor(TruecolorImage {
            raster: Raster {
                width: w,
                height: h,
                stride: w,
                pix: self.to_straight_rgba(palette),
            },
            alpha: AlphaMode::Straight,
        })
    }

    /// Tightly packed straight-alpha RGBA bytes, `width * height * 4` long.
    pub fn to_straight_rgba(&self, palette: &crate::palette::PaletteTable) -> Vec<u8> {
        let (w, h) = (self.width(), self.height());
        let mut out = vec![0u8; w * h * 4];
        if w == 0 {
            return out;
        }
        let rows = out.chunks_exact_mut(w * 4).take(h).enumerate();
        match self {
            Self::Paletted(img) => {
                let lut = palette_lut(img.palette());
                for (y, dst) in rows {
                    for (px, &idx) in dst.chunks_exact_mut(4).zip(img.row(y)) {
                        px.copy_from_slice(&lut[idx as usize]);
                    }
                }
            }
            Self::Gray(img) => {
                for (y, dst) in rows {
                    for (px, &v) in dst.chunks_exact_mut(4).zip(img.row(y)) {
                        px.copy_from_slice(&palette.rgba(v).to_array());
                    }
                }
            }
            Self::Truecolor(img) => {
                for (y, dst) in rows {
                    let line = img.row(y);
                    match img.alpha {
                        AlphaMode::Straight => dst.copy_from_slice(line),
                        AlphaMode::Premultiplied => {
                            for (d, s) in dst.chunks_exact_mut(4).zip(line.chunks_exact(4)) {
                                d.copy_from_slice(&unpremultiply([s[0], s[1], s[2], s[3]]));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// 256-entry lookup built from an embedded palette. Entries past the
/// palette's end stay transparent black.
pub(crate) fn palette_lut(colors: &[Rgba]) -> [[u8; 4]; 256] {
    let mut lut = [[0u8; 4]; 256];
    for (slot, col) in lut.iter_mut().zip(colors) {
        *slot = col.to_array();
    }
    lut
}

pub(crate) fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3] as u32;
    match a {
        0 => [0, 0, 0, 0],
        255 => px,
        _ => {
            let un = |c: u8| ((c as u32 * 255 + a / 2) / a).min(255) as u8;
            [un(px[0]), un(px[1]), un(px[2]), px[3]]
        }
    }
}

fn check_geometry(
    width: usize,
    height: usize,
    stride: usize,
    len: usize,
    bytes_per_pixel: usize,
) -> FxResult<()> {
    if stride < width {
        return Err(FxError::validation(format!(
            "stride {stride} is smaller than width {width}"
        )));
    }
    if width == 0 || height == 0 {
        return Ok(());
    }
    let need = (stride * (height - 1) + width) * bytes_per_pixel;
    if len < need {
        return Err(FxError::validation(format!(
            "pixel buffer too small for {width}x{height} stride {stride} (need {need}, got {len})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_lut_pads_missing_entries() {
        let lut = palette_lut(&[Rgba::new(200, 100, 50, 128), Rgba::opaque(1, 2, 3)]);
        assert_eq!(lut[0], [200, 100, 50, 128]);
        assert_eq!(lut[1], [1, 2, 3, 255]);
        assert_eq!(lut[2], [0, 0, 0, 0]);
    }

    #[test]
    fn unpremultiply_restores_straight_color() {
        assert_eq!(unpremultiply([64, 32, 0, 128]), [128, 64, 0, 128]);
        assert_eq!(unpremultiply([9, 9, 9, 0]), [0, 0, 0, 0]);
        assert_eq!(unpremultiply([9, 8, 7, 255]), [9, 8, 7, 255]);
    }

    #[test]
    fn to_truecolor_normalizes_gray_through_the_palette() {
        let img = Image::gray(2, 1, 3, vec![0, 255, 7]).unwrap();
        let tc = img.to_truecolor(&crate::palette::PaletteTable::identity());
        let Image::Truecolor(tc) = tc else {
            panic!("expected truecolor, got {}", tc.kind());
        };
        assert_eq!((tc.width(), tc.height(), tc.stride()), (2, 1, 2));
        assert_eq!(tc.pix(), &[0, 0, 0, 255, 255, 255, 255, 255]);
        assert_eq!(tc.alpha(), AlphaMode::Straight);
    }

    #[test]
    fn constructors_reject_short_buffers() {
        assert!(Image::gray(4, 2, 3, vec![0; 8]).is_err());
        assert!(Image::gray(4, 2, 6, vec![0; 9]).is_err());
        assert!(Image::gray(4, 2, 6, vec![0; 10]).is_ok());
        assert!(Image::truecolor(2, 2, 2, vec![0; 15], AlphaMode::Straight).is_err());
        assert!(Image::paletted(1, 1, 1, vec![0], vec![Rgba::BLACK; 257]).is_err());
    }

    #[test]
    fn rows_skip_stride_padding() {
        let Image::Truecolor(img) =
            Image::truecolor(1, 2, 2, (0..16).collect(), AlphaMode::Straight).unwrap()
        else {
            panic!("expected truecolor");
        };
        assert_eq!(img.row(0), &[0, 1, 2, 3]);
        assert_eq!(img.row(1), &[8, 9, 10, 11]);
    }
}
