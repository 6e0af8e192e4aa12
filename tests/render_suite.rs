use fxloop::convert::{PixelBuffer, RowOrder};
use fxloop::render::{Frame, HalfBlockPainter, KittyPainter, Painter};

/// Solid-color buffer in the given row order.
fn solid(w: usize, h: usize, order: RowOrder, rgb: [u8; 3]) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h, order);
    for px in buf.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    buf
}

/// Top half red, bottom half blue, as seen on screen.
fn split(w: usize, h: usize, order: RowOrder) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h, order);
    for y in 0..h {
        let color = if y < h / 2 { [255, 0, 0, 255] } else { [0, 0, 255, 255] };
        let start = buf.memory_row(y) * buf.stride * 4;
        for px in buf.data[start..start + w * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }
    buf
}

fn make_frame<'a>(cols: u16, visual_rows: u16, pixels: &'a PixelBuffer, sync: bool) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 1,
        visual_rows,
        pixels,
        hud: "Plasma | time: 0.500 | FPS: 60 | vFPS: 900",
        hud_rows: 1,
        sync_updates: sync,
    }
}

// ── HalfBlock painter ──────────────────────────────────────────────────────

#[test]
fn halfblock_paints_cells_with_sync_and_hud() {
    let pixels = solid(16, 8, RowOrder::BottomUp, [200, 100, 50]);
    let frame = make_frame(8, 4, &pixels, true);
    let mut out = Vec::new();
    HalfBlockPainter::new().paint(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[?2026h"), "missing sync-begin");
    assert!(s.contains("\x1b[?2026l"), "missing sync-end");
    assert!(s.contains("\x1b[?7l") && s.contains("\x1b[?7h"), "missing autowrap toggle");
    assert_eq!(s.matches('\u{2580}').count(), 8 * 4);
    assert!(s.contains("38;2;200;100;50"), "missing FG color");
    assert!(s.contains("48;2;200;100;50"), "missing BG color");
    assert!(s.contains("vFPS: 900"), "HUD text missing");
}

#[test]
fn halfblock_reads_bottom_up_buffers_right_side_up() {
    let pixels = split(2, 4, RowOrder::BottomUp);
    let frame = make_frame(1, 2, &pixels, false);
    let mut out = Vec::new();
    HalfBlockPainter::new().paint(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    let red = s.find("38;2;255;0;0").expect("red foreground");
    let blue = s.find("38;2;0;0;255").expect("blue foreground");
    assert!(red < blue, "top row must be painted first");
}

#[test]
fn halfblock_caches_repeated_colors() {
    let pixels = solid(4, 4, RowOrder::BottomUp, [1, 2, 3]);
    let frame = make_frame(4, 2, &pixels, false);
    let mut out = Vec::new();
    HalfBlockPainter::new().paint(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert_eq!(s.matches("38;2;1;2;3").count(), 1);
}

#[test]
fn halfblock_skips_empty_geometry() {
    let pixels = PixelBuffer::new(0, 0, RowOrder::BottomUp);
    let frame = make_frame(10, 4, &pixels, false);
    let mut out = Vec::new();
    HalfBlockPainter::new().paint(&frame, &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn halfblock_reports_its_row_order() {
    let p = HalfBlockPainter::new();
    assert_eq!(p.name(), "half-block");
    assert_eq!(p.row_order(), RowOrder::BottomUp);
}

// ── Kitty painter ──────────────────────────────────────────────────────────

#[test]
fn kitty_uploads_top_down_rgba() {
    let pixels = solid(4, 2, RowOrder::TopDown, [9, 9, 9]);
    let frame = make_frame(10, 5, &pixels, false);
    let mut out = Vec::new();
    let mut painter = KittyPainter::new();
    assert_eq!(painter.row_order(), RowOrder::TopDown);
    painter.paint(&frame, &mut out).unwrap();
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b_Ga=T,f=32,s=4,v=2,"), "missing kitty header: {s}");
    assert!(s.contains("c=10,r=5"), "placement must cover the visual area");
    assert!(s.contains("vFPS: 900"), "HUD text missing");
}

#[test]
fn kitty_skips_empty_geometry() {
    let pixels = solid(4, 2, RowOrder::TopDown, [9, 9, 9]);
    let frame = make_frame(0, 5, &pixels, false);
    let mut out = Vec::new();
    KittyPainter::new().paint(&frame, &mut out).unwrap();
    assert!(out.is_empty());
}
