mod halfblock;
mod kitty;

pub use halfblock::HalfBlockPainter;
pub use kitty::KittyPainter;

use crate::convert::{PixelBuffer, RowOrder};
use std::io::Write;

/// One presented frame plus the terminal geometry it is painted into.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    /// Rows above the HUD available for the picture.
    pub visual_rows: u16,
    pub pixels: &'a PixelBuffer,
    pub hud: &'a str,
    pub hud_rows: u16,
    pub sync_updates: bool,
}

/// Turns a pixel buffer into terminal output.
pub trait Painter {
    fn name(&self) -> &'static str;
    /// Memory row order this painter reads.
    fn row_order(&self) -> RowOrder;
    fn paint(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub(crate) fn write_hud_line(
    out: &mut dyn Write,
    row: usize,
    cols: usize,
    line: Option<&str>,
) -> anyhow::Result<()> {
    write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    if let Some(line) = line {
        let clipped: String = line.chars().take(cols).collect();
        write!(out, "{clipped}")?;
    }
    Ok(())
}

pub(crate) fn write_hud(out: &mut dyn Write, frame: &Frame<'_>) -> anyhow::Result<()> {
    let cols = frame.term_cols as usize;
    let mut lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write_hud_line(out, frame.visual_rows as usize + i + 1, cols, lines.next())?;
    }
    Ok(())
}
