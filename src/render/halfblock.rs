use crate::convert::RowOrder;
use crate::render::{Frame, Painter, write_hud};
use std::io::Write;

/// Paints two pixel rows per terminal cell with the upper-half block glyph.
///
/// Reads bottom-up buffers, like a GL-backed window texture, and scales the
/// picture to the cell grid with nearest-neighbor sampling.
pub struct HalfBlockPainter {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

impl HalfBlockPainter {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Default for HalfBlockPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl Painter for HalfBlockPainter {
    fn name(&self) -> &'static str {
        "half-block"
    }

    fn row_order(&self) -> RowOrder {
        RowOrder::BottomUp
    }

    fn paint(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let px = frame.pixels;
        let (w, h) = (px.width, px.height);

        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }

        out.write_all(b"\x1b[H\x1b[0m")?;
        // Some terminals wrap when the last column is written; keep DECAWM off
        // while painting full-width rows.
        out.write_all(b"\x1b[?7l")?;
        self.last_fg = None;
        self.last_bg = None;

        const HALF_BLOCK: char = '\u{2580}';
        let sub_rows = visual_rows * 2;

        for row in 0..visual_rows {
            let top_y = (row * 2) * h / sub_rows;
            let bot_y = (row * 2 + 1) * h / sub_rows;
            for col in 0..cols {
                let x = col * w / cols;
                let [tr, tg, tb, _] = px.pixel(x, top_y);
                let [br, bg, bb, _] = px.pixel(x, bot_y);

                if self.last_fg != Some((tr, tg, tb)) {
                    write!(out, "\x1b[38;2;{};{};{}m", tr, tg, tb)?;
                    self.last_fg = Some((tr, tg, tb));
                }
                if self.last_bg != Some((br, bg, bb)) {
                    write!(out, "\x1b[48;2;{};{};{}m", br, bg, bb)?;
                    self.last_bg = Some((br, bg, bb));
                }
                write!(out, "{HALF_BLOCK}")?;
            }
            out.write_all(b"\r\n")?;
        }

        write_hud(out, frame)?;

        out.write_all(b"\x1b[?7h")?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}
