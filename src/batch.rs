use crate::context::RenderContext;
use crate::effect::FrameSource;
use crate::error::{FxError, FxResult};
use crate::image::{Image, Rgba, palette_lut};
use crate::palette::PaletteTable;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_WORKERS: usize = 8;

#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// How many times to run through the whole cycle.
    pub cycles: u32,
    /// Frames per second of the recorded sequence.
    pub fps: u32,
    /// Length of one cycle.
    pub cycle: Duration,
    /// Output path with exactly one frame number placeholder.
    pub template: String,
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            cycles: 1,
            fps: crate::presenter::DEFAULT_TARGET_FPS,
            cycle: crate::time_cursor::DEFAULT_CYCLE,
            template: "frames/%05d.png".to_string(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl BatchOptions {
    pub fn frames_per_cycle(&self) -> usize {
        (self.fps as f64 * self.cycle.as_secs_f64()).round() as usize
    }

    fn validate(&self) -> FxResult<()> {
        if self.workers == 0 {
            return Err(FxError::validation("batch needs at least one worker"));
        }
        if self.frames_per_cycle() == 0 {
            return Err(FxError::validation(format!(
                "cycle of {:?} at {} fps has no frames",
                self.cycle, self.fps
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub frames: usize,
    /// Written files in frame-index order.
    pub paths: Vec<PathBuf>,
}

/// Output file name pattern: `%d`, `%5d`, `%05d` or `{}` stand for the
/// frame index. `%%` is a literal percent sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTemplate {
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
}

impl FrameTemplate {
    pub fn parse(template: &str) -> FxResult<Self> {
        let mut found: Option<(String, usize, bool)> = None;
        let mut literal = String::new();
        let bytes = template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let rest = &template[i..];
            let placeholder = if rest.starts_with("{}") {
                Some((0, false, 2))
            } else if rest.starts_with("%%") {
                literal.push('%');
                i += 2;
                continue;
            } else if let Some(spec) = rest.strip_prefix('%') {
                let digits = spec.bytes().take_while(u8::is_ascii_digit).count();
                if spec.as_bytes().get(digits) == Some(&b'd') {
                    let zero_pad = digits > 1 && spec.starts_with('0');
                    let width = spec[..digits].parse::<usize>().unwrap_or(0);
                    Some((width, zero_pad, 1 + digits + 1))
                } else {
                    None
                }
            } else {
                None
            };

            match placeholder {
                Some((width, zero_pad, len)) => {
                    if found.is_some() {
                        return Err(FxError::validation(format!(
                            "template {template:?} has more than one frame placeholder"
                        )));
                    }
                    found = Some((std::mem::take(&mut literal), width, zero_pad));
                    i += len;
                }
                None => {
                    let ch = rest.chars().next().unwrap_or_default();
                    literal.push(ch);
                    i += ch.len_utf8();
                }
            }
        }

        let Some((prefix, width, zero_pad)) = found else {
            return Err(FxError::validation(format!(
                "template {template:?} needs a frame placeholder (%d, %05d or {{}})"
            )));
        };
        Ok(Self {
            prefix,
            suffix: literal,
            width,
            zero_pad,
        })
    }

    pub fn format(&self, index: usize) -> String {
        let n = if self.zero_pad {
            format!("{index:0w$}", w = self.width)
        } else {
            format!("{index:w$}", w = self.width)
        };
        format!("{}{n}{}", self.prefix, self.suffix)
    }
}

/// An image reduced to what the PNG encoder needs, built on the render
/// thread so workers never touch effect state or the palette table.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodableFrame {
    Indexed {
        width: usize,
        height: usize,
        pix: Vec<u8>,
        palette: Vec<Rgba>,
    },
    Rgba {
        width: usize,
        height: usize,
        pix: Vec<u8>,
    },
}

impl EncodableFrame {
    pub fn from_image(img: &Image, palette: &PaletteTable) -> Self {
        let (width, height) = (img.width(), img.height());
        match img {
            Image::Paletted(p) => {
                let pix = tight_rows(p.height(), |y| p.row(y));
                let colors = p.palette();
                let used = pix.iter().copied().max().map_or(1, |m| m as usize + 1);
                let lut = palette_lut(colors);
                let palette = lut[..used.max(colors.len())]
                    .iter()
                    .map(|&[r, g, b, a]| Rgba::new(r, g, b, a))
                    .collect();
                Self::Indexed {
                    width,
                    height,
                    pix,
                    palette,
                }
            }
            Image::Gray(g) => Self::Indexed {
                width,
                height,
                pix: tight_rows(g.height(), |y| g.row(y)),
                palette: palette.entries().to_vec(),
            },
            Image::Truecolor(_) => Self::Rgba {
                width,
                height,
                pix: img.to_straight_rgba(palette),
            },
        }
    }

    pub fn encode_to(&self, path: &Path) -> FxResult<()> {
        let file = File::create(path)?;
        let (width, height) = match self {
            Self::Indexed { width, height, .. } | Self::Rgba { width, height, .. } => {
                (*width as u32, *height as u32)
            }
        };
        let mut enc = png::Encoder::new(BufWriter::new(file), width, height);
        enc.set_depth(png::BitDepth::Eight);
        let data = match self {
            Self::Indexed { pix, palette, .. } => {
                enc.set_color(png::ColorType::Indexed);
                enc.set_palette(palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect::<Vec<_>>());
                if palette.iter().any(|c| c.a != 0xff) {
                    enc.set_trns(palette.iter().map(|c| c.a).collect::<Vec<_>>());
                }
                pix
            }
            Self::Rgba { pix, .. } => {
                enc.set_color(png::ColorType::Rgba);
                pix
            }
        };
        let encode_err = |e: png::EncodingError| {
            FxError::Other(anyhow::anyhow!("encode {}: {e}", path.display()))
        };
        let mut writer = enc.write_header().map_err(encode_err)?;
        writer.write_image_data(data).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
        Ok(())
    }
}

fn tight_rows<'a>(height: usize, row: impl Fn(usize) -> &'a [u8]) -> Vec<u8> {
    (0..height).flat_map(row).copied().collect()
}

struct Job {
    index: usize,
    path: PathBuf,
    frame: EncodableFrame,
}

/// Render `cycles` full cycles of `effect` and write every frame as a PNG.
///
/// Frames are rendered on the calling thread in order; encoding happens on a
/// fixed pool of workers fed through a bounded queue, so a slow disk stalls
/// rendering instead of buffering the whole sequence.
pub fn render_to_disk(
    effect: &mut dyn FrameSource,
    ctx: &RenderContext,
    opts: &BatchOptions,
) -> FxResult<BatchReport> {
    opts.validate()?;
    let template = FrameTemplate::parse(&opts.template)?;
    let length = opts.frames_per_cycle();
    let total = length.checked_mul(opts.cycles as usize).ok_or_else(|| {
        FxError::validation(format!("{} cycles of {length} frames overflow", opts.cycles))
    })?;

    let first = template.format(0);
    if let Some(dir) = Path::new(&first).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    info!(
        "batch: {} cycles x {length} frames -> {} ({} workers)",
        opts.cycles, opts.template, opts.workers
    );
    let started = Instant::now();

    let (tx, rx) = sync_channel::<Job>(opts.workers);
    let rx = Arc::new(Mutex::new(rx));
    let handles: Vec<_> = (0..opts.workers)
        .map(|n| {
            let rx = Arc::clone(&rx);
            thread::Builder::new()
                .name(format!("png-encoder-{n}"))
                .spawn(move || encode_worker(&rx))
        })
        .collect::<Result<_, _>>()?;

    let paths = queue_frames(effect, ctx, &template, length, total, tx);

    let mut errors = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(errs) => errors.extend(errs),
            Err(_) => errors.push((
                usize::MAX,
                FxError::Other(anyhow::anyhow!("encoder thread panicked")),
            )),
        }
    }
    if let Some((index, err)) = errors.into_iter().min_by_key(|(i, _)| *i) {
        warn!("batch: frame {index} failed: {err}");
        return Err(err);
    }

    info!(
        "batch: wrote {} frames in {:.2}s",
        paths.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(BatchReport {
        frames: paths.len(),
        paths,
    })
}

/// Render frames `0..total` and hand them to the encoders. Returns the paths
/// of the frames actually queued; stops early once every encoder is gone.
fn queue_frames(
    effect: &mut dyn FrameSource,
    ctx: &RenderContext,
    template: &FrameTemplate,
    length: usize,
    total: usize,
    tx: SyncSender<Job>,
) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(total);
    for index in 0..total {
        let t = (index % length) as f64 / length as f64;
        let frame = EncodableFrame::from_image(effect.render(t), &ctx.palette);
        let path = PathBuf::from(template.format(index));
        let job = Job {
            index,
            path: path.clone(),
            frame,
        };
        if tx.send(job).is_err() {
            warn!("batch: all encoders exited, stopping at frame {index}");
            break;
        }
        paths.push(path);
        if (index + 1) % length == 0 {
            debug!("batch: cycle {} queued", index / length);
        }
    }
    paths
}

fn encode_worker(rx: &Mutex<Receiver<Job>>) -> Vec<(usize, FxError)> {
    let mut errors = Vec::new();
    loop {
        let job = {
            let Ok(guard) = rx.lock() else { break };
            match guard.recv() {
                Ok(job) => job,
                Err(_) => break,
            }
        };
        if let Err(err) = job.frame.encode_to(&job.path) {
            errors.push((job.index, err));
        }
    }
    errors
}
