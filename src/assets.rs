use crate::error::{FxError, FxResult};
use crate::image::{AlphaMode, Image, Rgba, palette_lut};
use crate::loader::LoaderChain;
use log::debug;
use png::{BitDepth, ColorType, Transformations};
use std::io::Cursor;

/// Load a PNG as a paletted image. Grayscale files become paletted with a
/// 256-step gray ramp; anything else is rejected.
pub fn load_paletted_picture(loaders: &LoaderChain, name: &str) -> FxResult<Image> {
    let bytes = loaders.load(name)?;
    match decode_png(&bytes).map_err(|e| FxError::decode(format!("{name}: {e}")))? {
        img @ Image::Paletted(_) => Ok(img),
        Image::Gray(gray) => {
            let ramp = (0..=255u8).map(|v| Rgba::opaque(v, v, v)).collect();
            let (w, h, stride) = (gray.width(), gray.height(), gray.stride());
            Image::paletted(w, h, stride, gray.into_pix(), ramp)
        }
        other => Err(FxError::decode(format!(
            "{name}: expected a paletted or grayscale picture, got {}",
            other.kind()
        ))),
    }
}

/// Load a PNG as a grayscale image, converting color files by luma.
pub fn load_gray_picture(loaders: &LoaderChain, name: &str) -> FxResult<Image> {
    let bytes = loaders.load(name)?;
    let img = decode_png(&bytes).map_err(|e| FxError::decode(format!("{name}: {e}")))?;
    Ok(match img {
        gray @ Image::Gray(_) => gray,
        other => to_gray(&other),
    })
}

/// Luma conversion of any image, ITU-R 601 weights. Color is weighted after
/// premultiplying by alpha, so transparent pixels come out black.
pub fn to_gray(img: &Image) -> Image {
    let (w, h) = (img.width(), img.height());
    let mut out = Image::new_gray(w, h);
    let dst = out.pix_mut();
    match img {
        Image::Gray(src) => {
            for y in 0..h {
                dst[y * w..(y + 1) * w].copy_from_slice(src.row(y));
            }
        }
        Image::Paletted(src) => {
            let lut = palette_lut(src.palette());
            for y in 0..h {
                for (d, &idx) in dst[y * w..(y + 1) * w].iter_mut().zip(src.row(y)) {
                    *d = luma(lut[idx as usize], AlphaMode::Straight);
                }
            }
        }
        Image::Truecolor(src) => {
            for y in 0..h {
                let line = src.row(y).chunks_exact(4);
                for (d, s) in dst[y * w..(y + 1) * w].iter_mut().zip(line) {
                    *d = luma([s[0], s[1], s[2], s[3]], src.alpha());
                }
            }
        }
    }
    out
}

fn luma(px: [u8; 4], alpha: AlphaMode) -> u8 {
    let [mut r, mut g, mut b, a] = px.map(u32::from);
    if alpha == AlphaMode::Straight && a != 255 {
        r = (r * a + 127) / 255;
        g = (g * a + 127) / 255;
        b = (b * a + 127) / 255;
    }
    ((19595 * r + 38470 * g + 7471 * b + (1 << 15)) >> 16) as u8
}

/// Decode PNG bytes into the closest [`Image`] variant: indexed files stay
/// paletted, gray files stay gray, everything else becomes straight RGBA.
pub fn decode_png(bytes: &[u8]) -> anyhow::Result<Image> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let (color_type, depth) = (reader.info().color_type, reader.info().bit_depth);

    match color_type {
        ColorType::Indexed => {
            let palette = indexed_palette(reader.info());
            let mut buf = vec![0u8; reader.output_buffer_size()];
            let frame = reader.next_frame(&mut buf)?;
            let (w, h) = (frame.width as usize, frame.height as usize);
            let pix = unpack_rows(&buf, frame.line_size, w, h, depth, false);
            debug!("png: {w}x{h} indexed {depth:?}, {} colors", palette.len());
            Ok(Image::paletted(w, h, w, pix, palette)?)
        }
        ColorType::Grayscale => {
            let mut buf = vec![0u8; reader.output_buffer_size()];
            let frame = reader.next_frame(&mut buf)?;
            let (w, h) = (frame.width as usize, frame.height as usize);
            let pix = unpack_rows(&buf, frame.line_size, w, h, depth, true);
            debug!("png: {w}x{h} gray {depth:?}");
            Ok(Image::gray(w, h, w, pix)?)
        }
        _ => {
            drop(reader);
            let mut decoder = png::Decoder::new(Cursor::new(bytes));
            decoder.set_transformations(Transformations::normalize_to_color8());
            let mut reader = decoder.read_info()?;
            let mut buf = vec![0u8; reader.output_buffer_size()];
            let frame = reader.next_frame(&mut buf)?;
            let (w, h) = (frame.width as usize, frame.height as usize);
            let mut pix = Vec::with_capacity(w * h * 4);
            for row in buf.chunks(frame.line_size).take(h) {
                match frame.color_type {
                    ColorType::Rgba => pix.extend_from_slice(&row[..w * 4]),
                    ColorType::Rgb => {
                        for c in row[..w * 3].chunks_exact(3) {
                            pix.extend_from_slice(&[c[0], c[1], c[2], 0xff]);
                        }
                    }
                    ColorType::GrayscaleAlpha => {
                        for c in row[..w * 2].chunks_exact(2) {
                            pix.extend_from_slice(&[c[0], c[0], c[0], c[1]]);
                        }
                    }
                    other => anyhow::bail!("unexpected decoded color type {other:?}"),
                }
            }
            debug!("png: {w}x{h} {color_type:?} {depth:?} -> rgba");
            Ok(Image::truecolor(w, h, w, pix, AlphaMode::Straight)?)
        }
    }
}

fn indexed_palette(info: &png::Info<'_>) -> Vec<Rgba> {
    let Some(rgb) = info.palette.as_deref() else {
        return Vec::new();
    };
    let trns = info.trns.as_deref().unwrap_or(&[]);
    rgb.chunks_exact(3)
        .take(256)
        .enumerate()
        .map(|(i, c)| Rgba::new(c[0], c[1], c[2], trns.get(i).copied().unwrap_or(0xff)))
        .collect()
}

/// One byte per sample out of packed PNG rows. Sub-byte gray samples are
/// scaled to the full 0..=255 range; 16-bit samples keep the high byte.
fn unpack_rows(
    buf: &[u8],
    line_size: usize,
    width: usize,
    height: usize,
    depth: BitDepth,
    scale_gray: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height);
    for row in buf.chunks(line_size).take(height) {
        match depth {
            BitDepth::Eight => out.extend_from_slice(&row[..width]),
            BitDepth::Sixteen => out.extend(row.chunks_exact(2).take(width).map(|s| s[0])),
            BitDepth::One | BitDepth::Two | BitDepth::Four => {
                let bits = depth as usize;
                let per_byte = 8 / bits;
                let mask = ((1u16 << bits) - 1) as u8;
                let scale = if scale_gray { 255 / mask } else { 1 };
                for x in 0..width {
                    let byte = row[x / per_byte];
                    let shift = 8 - bits * (x % per_byte + 1);
                    out.push(((byte >> shift) & mask) * scale);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(width: u32, height: u32, color: ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut enc = png::Encoder::new(&mut out, width, height);
            enc.set_color(color);
            enc.set_depth(BitDepth::Eight);
            if color == ColorType::Indexed {
                enc.set_palette(vec![255, 0, 0, 0, 255, 0]);
            }
            let mut w = enc.write_header().unwrap();
            w.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn indexed_png_stays_paletted() {
        let img = decode_png(&encode(2, 1, ColorType::Indexed, &[1, 0])).unwrap();
        let Image::Paletted(img) = img else {
            panic!("expected paletted");
        };
        assert_eq!(img.pix(), &[1, 0]);
        assert_eq!(img.palette(), &[Rgba::opaque(255, 0, 0), Rgba::opaque(0, 255, 0)]);
    }

    #[test]
    fn rgb_png_becomes_opaque_truecolor() {
        let img = decode_png(&encode(1, 1, ColorType::Rgb, &[1, 2, 3])).unwrap();
        let Image::Truecolor(img) = img else {
            panic!("expected truecolor");
        };
        assert_eq!(img.pix(), &[1, 2, 3, 255]);
        assert_eq!(img.alpha(), AlphaMode::Straight);
    }

    #[test]
    fn gray_picture_from_color_uses_luma() {
        let mut chain = LoaderChain::new();
        let bytes = encode(3, 1, ColorType::Rgb, &[255, 0, 0, 0, 255, 0, 255, 255, 255]);
        chain.push("mem", move |_| Ok(bytes.clone()));
        let gray = load_gray_picture(&chain, "x.png").unwrap();
        assert_eq!(gray.kind(), "gray");
        assert_eq!(gray.pix(), &[76, 150, 255]);
    }

    #[test]
    fn paletted_picture_rejects_truecolor() {
        let mut chain = LoaderChain::new();
        let bytes = encode(1, 1, ColorType::Rgba, &[0, 0, 0, 0]);
        chain.push("mem", move |_| Ok(bytes.clone()));
        assert!(matches!(
            load_paletted_picture(&chain, "x.png"),
            Err(FxError::Decode(_))
        ));
    }

    #[test]
    fn sub_byte_gray_is_scaled() {
        let out = unpack_rows(&[0b1011_0000], 1, 4, 1, BitDepth::One, true);
        assert_eq!(out, vec![255, 0, 255, 255]);
    }
}
