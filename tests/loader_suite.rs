use fxloop::assets::{load_gray_picture, load_paletted_picture, to_gray};
use fxloop::error::FxError;
use fxloop::image::{AlphaMode, Image, Rgba};
use fxloop::loader::{LoaderChain, embedded_loader, fs_loader};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test_log::test]
fn first_success_wins_and_later_loaders_are_skipped() {
    let third_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&third_calls);

    let chain = LoaderChain::new()
        .with("broken", |name| anyhow::bail!("cannot read {name}"))
        .with("ok", |_| Ok(b"ok".to_vec()))
        .with("never", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(b"x".to_vec())
        });

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.load("thing.bin").unwrap(), b"ok");
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn all_failures_yield_not_found() {
    let chain = LoaderChain::new().with("broken", |_| anyhow::bail!("nope"));
    let err = chain.load("missing.png").unwrap_err();
    assert!(matches!(err, FxError::NotFound(ref n) if n == "missing.png"), "{err}");
}

#[test]
fn empty_chain_finds_nothing() {
    let chain = LoaderChain::new();
    assert!(chain.is_empty());
    assert!(matches!(chain.load("a"), Err(FxError::NotFound(_))));
}

#[test]
fn embedded_assets_back_up_the_file_system() {
    let dir = std::env::temp_dir().join(format!("fxloop-{}-loader", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("on-disk.txt"), b"disk").unwrap();

    let mut builtin = HashMap::new();
    builtin.insert("on-disk.txt", b"builtin".as_slice());
    builtin.insert("only-builtin.txt", b"fallback".as_slice());

    let mut chain = LoaderChain::new();
    chain.push("fs", fs_loader(&dir));
    chain.push("builtin", embedded_loader(builtin));

    assert_eq!(chain.load("on-disk.txt").unwrap(), b"disk");
    assert_eq!(chain.load("only-builtin.txt").unwrap(), b"fallback");
    assert!(chain.load("neither.txt").is_err());

    let _ = std::fs::remove_dir_all(&dir);
}

fn png_bytes(
    color: png::ColorType,
    w: u32,
    h: u32,
    data: &[u8],
    palette: Option<&[u8]>,
) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = png::Encoder::new(&mut out, w, h);
        enc.set_color(color);
        enc.set_depth(png::BitDepth::Eight);
        if let Some(p) = palette {
            enc.set_palette(p.to_vec());
        }
        enc.write_header().unwrap().write_image_data(data).unwrap();
    }
    out
}

fn chain_serving(bytes: Vec<u8>) -> LoaderChain {
    LoaderChain::new().with("mem", move |_| Ok(bytes.clone()))
}

#[test]
fn gray_png_loads_as_gray_and_as_paletted_ramp() {
    let chain = chain_serving(png_bytes(png::ColorType::Grayscale, 2, 1, &[10, 250], None));

    let gray = load_gray_picture(&chain, "g.png").unwrap();
    assert_eq!(gray.kind(), "gray");
    assert_eq!(gray.pix(), &[10, 250]);

    let Image::Paletted(ramp) = load_paletted_picture(&chain, "g.png").unwrap() else {
        panic!("expected paletted");
    };
    assert_eq!(ramp.pix(), &[10, 250]);
    assert_eq!(ramp.palette().len(), 256);
    assert_eq!(ramp.palette()[250], Rgba::opaque(250, 250, 250));
}

#[test]
fn indexed_png_keeps_its_palette() {
    let chain = chain_serving(png_bytes(
        png::ColorType::Indexed,
        1,
        2,
        &[1, 0],
        Some(&[0, 0, 0, 255, 255, 255]),
    ));
    let Image::Paletted(pic) = load_paletted_picture(&chain, "p.png").unwrap() else {
        panic!("expected paletted");
    };
    assert_eq!(pic.pix(), &[1, 0]);
    assert_eq!(pic.palette(), &[Rgba::BLACK, Rgba::WHITE]);
}

#[test]
fn missing_picture_is_not_found() {
    let chain = LoaderChain::new();
    assert!(matches!(load_gray_picture(&chain, "nope.png"), Err(FxError::NotFound(_))));
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let chain = chain_serving(b"definitely not a png".to_vec());
    assert!(matches!(load_gray_picture(&chain, "bad.png"), Err(FxError::Decode(_))));
}

#[test]
fn to_gray_ignores_stride_and_darkens_transparent_pixels() {
    let pix = vec![
        255, 255, 255, 255, 0, 0, 0, 0, //
        255, 255, 255, 0,
    ];
    let img = Image::truecolor(1, 2, 2, pix, AlphaMode::Straight).unwrap();
    let gray = to_gray(&img);
    assert_eq!(gray.pix(), &[255, 0]);
    assert_eq!(gray.stride(), 1);
}
