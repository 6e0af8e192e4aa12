use crate::convert::RowOrder;
use crate::render::{Frame, Painter, write_hud};
use anyhow::{Context, anyhow};
use base64::Engine;
use log::warn;
use std::borrow::Cow;
use std::fs;
use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KittyTransport {
    Direct,
    File,
}

impl KittyTransport {
    fn label(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::File => "file",
        }
    }
}

/// Canvas-style target: uploads the whole top-down RGBA buffer as one kitty
/// graphics image per frame and lets the terminal scale it to the grid.
pub struct KittyPainter {
    image_id: u32,
    placement_id: u32,
    temp_path: String,
    temp_payload_b64: String,
    transports: Vec<KittyTransport>,
    active_transport_idx: usize,
    b64_buf: Vec<u8>,
}

impl KittyPainter {
    pub fn new() -> Self {
        let pid = std::process::id();
        let temp_path = std::env::temp_dir()
            .join(format!("fxloop-{pid}.rgba"))
            .to_string_lossy()
            .into_owned();
        let temp_payload_b64 =
            base64::engine::general_purpose::STANDARD.encode(temp_path.as_bytes());

        Self {
            image_id: 1,
            placement_id: 1,
            temp_path,
            temp_payload_b64,
            transports: pick_transport_chain(),
            active_transport_idx: 0,
            b64_buf: Vec::new(),
        }
    }

    fn write_frame_with_transport(
        &mut self,
        transport: KittyTransport,
        rgba: &[u8],
        out: &mut dyn Write,
        geom: Placement,
    ) -> anyhow::Result<()> {
        match transport {
            KittyTransport::Direct => {
                write_kitty_direct_rgba(
                    out,
                    rgba,
                    geom,
                    self.image_id,
                    self.placement_id,
                    &mut self.b64_buf,
                )
            }
            KittyTransport::File => {
                // Stringified: the transport loop treats io::Error as fatal.
                fs::write(self.temp_path.as_str(), rgba)
                    .map_err(|e| anyhow!("write kitty temp file {}: {e}", self.temp_path))?;

                write!(
                    out,
                    "\x1b_Ga=T,f=32,s={},v={},t=f,i={},p={},c={},r={},C=1,q=2,z=-1;{}\x1b\\",
                    geom.width,
                    geom.height,
                    self.image_id,
                    self.placement_id,
                    geom.cols,
                    geom.rows,
                    self.temp_payload_b64.as_str()
                )?;
                Ok(())
            }
        }
    }
}

impl Default for KittyPainter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
struct Placement {
    width: usize,
    height: usize,
    cols: usize,
    rows: usize,
}

impl Painter for KittyPainter {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn paint(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let px = frame.pixels;
        let geom = Placement {
            width: px.width,
            height: px.height,
            cols: frame.term_cols as usize,
            rows: frame.visual_rows as usize,
        };
        if geom.cols == 0 || geom.rows == 0 || geom.width == 0 || geom.height == 0 {
            return Ok(());
        }

        let rgba: Cow<'_, [u8]> = if px.order == RowOrder::TopDown && px.stride == px.width {
            Cow::Borrowed(&px.data[..px.width * px.height * 4])
        } else {
            Cow::Owned(px.to_top_down_rgba())
        };

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H")?;

        let start_idx = self
            .active_transport_idx
            .min(self.transports.len().saturating_sub(1));
        let mut rendered = false;
        let mut last_err: Option<anyhow::Error> = None;
        for step in 0..self.transports.len() {
            let idx = (start_idx + step) % self.transports.len();
            let transport = self.transports[idx];
            match self.write_frame_with_transport(transport, &rgba, out, geom) {
                Ok(()) => {
                    if idx != self.active_transport_idx {
                        warn!("kitty: switched to '{}' transport", transport.label());
                    }
                    self.active_transport_idx = idx;
                    rendered = true;
                    break;
                }
                Err(err) => {
                    // Terminal I/O failures will not improve with another transport.
                    if err.downcast_ref::<std::io::Error>().is_some() {
                        return Err(err);
                    }
                    last_err = Some(err.context(format!(
                        "kitty transport '{}' failed",
                        transport.label()
                    )));
                }
            }
        }
        if !rendered {
            return Err(last_err.unwrap_or_else(|| anyhow!("no kitty transport succeeded")));
        }

        write_hud(out, frame)?;

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for KittyPainter {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.temp_path.as_str());
    }
}

fn pick_transport_chain() -> Vec<KittyTransport> {
    if let Ok(v) = std::env::var("FXLOOP_KITTY_TRANSPORT") {
        match v.trim().to_ascii_lowercase().as_str() {
            "direct" | "d" => return vec![KittyTransport::Direct],
            "file" | "f" | "temp" | "tempfile" => return vec![KittyTransport::File],
            _ => {}
        }
    }
    vec![KittyTransport::Direct, KittyTransport::File]
}

fn write_kitty_direct_rgba(
    out: &mut dyn Write,
    rgba: &[u8],
    geom: Placement,
    image_id: u32,
    placement_id: u32,
    b64_buf: &mut Vec<u8>,
) -> anyhow::Result<()> {
    const RAW_CHUNK: usize = 3 * 1024; // 3072 -> 4096 bytes base64

    if rgba.is_empty() {
        return Ok(());
    }

    let mut off = 0usize;
    let len = rgba.len();
    let mut first = true;
    while off < len {
        let end = (off + RAW_CHUNK).min(len);
        let chunk = &rgba[off..end];
        let b64_len = chunk.len().div_ceil(3) * 4;
        if b64_buf.len() < b64_len {
            b64_buf.resize(b64_len, 0);
        }

        let written = base64::engine::general_purpose::STANDARD
            .encode_slice(chunk, &mut b64_buf[..b64_len])
            .context("base64 encode pixels")?;

        let more = end < len;
        if first {
            write!(
                out,
                "\x1b_Ga=T,f=32,s={},v={},t=d,i={},p={},c={},r={},C=1,q=2,z=-1,m={};",
                geom.width,
                geom.height,
                image_id,
                placement_id,
                geom.cols,
                geom.rows,
                u8::from(more)
            )?;
            first = false;
        } else {
            write!(out, "\x1b_Gm={};", u8::from(more))?;
        }

        out.write_all(&b64_buf[..written])?;
        out.write_all(b"\x1b\\")?;

        off = end;
    }

    Ok(())
}
