use anyhow::bail;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "fxloop", version, about = "Timed demo-effect harness for the terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = Target::HalfBlock)]
    pub target: Target,

    #[arg(long, value_enum, default_value_t = EffectKind::Plasma)]
    pub effect: EffectKind,

    /// Frame budget the deadline bar measures against; also the pace of the
    /// kitty target and of `--dump`.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seconds for `t` to run from 0 to 1.
    #[arg(long, default_value_t = 10.0)]
    pub cycle_secs: f64,

    #[arg(long, default_value_t = 320)]
    pub width: usize,

    #[arg(long, default_value_t = 180)]
    pub height: usize,

    #[arg(long, default_value = "fxloop")]
    pub title: String,

    /// Picture shown by `--effect picture`, resolved through the asset loaders.
    #[arg(long)]
    pub picture: Option<String>,

    /// WAV soundtrack; playback start resets the clock.
    #[arg(long)]
    pub music: Option<String>,

    #[arg(long, default_value_t = false)]
    pub mute: bool,

    #[arg(long, value_enum, default_value_t = PaletteChoice::Gray)]
    pub palette: PaletteChoice,

    /// Directory searched first for assets.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Render to PNG files instead of the terminal, e.g. `out/%05d.png`.
    #[arg(long)]
    pub dump: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    #[arg(long, default_value_t = crate::batch::DEFAULT_WORKERS)]
    pub workers: usize,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Window-like half-block cells, row 0 at the bottom.
    #[value(
        name = "half-block",
        alias = "halfblock",
        alias = "half_block",
        alias = "hb",
        alias = "native"
    )]
    HalfBlock,
    /// Flat RGBA canvas over the kitty graphics protocol.
    #[value(alias = "canvas")]
    Kitty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EffectKind {
    Plasma,
    Rings,
    Tunnel,
    Life,
    Picture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaletteChoice {
    Gray,
    Ember,
    Ice,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fps == 0 {
            bail!("--fps must be >= 1");
        }
        match Duration::try_from_secs_f64(self.cycle_secs) {
            Ok(cycle) if !cycle.is_zero() => {}
            _ => bail!(
                "--cycle-secs must be a positive, representable number of seconds (got {})",
                self.cycle_secs
            ),
        }
        if self.width == 0 {
            bail!("--width must be >= 1");
        }
        if self.height == 0 {
            bail!("--height must be >= 1");
        }
        if self.cycles == 0 {
            bail!("--cycles must be >= 1");
        }
        if self.workers == 0 {
            bail!("--workers must be >= 1");
        }
        if self.effect == EffectKind::Picture && self.picture.is_none() {
            bail!("--effect picture needs --picture <NAME>");
        }
        if self.dump.is_some() && self.music.is_some() {
            bail!("--dump renders offline and cannot follow --music");
        }
        Ok(())
    }

    /// Cycle length. Zero for values `validate` rejects.
    pub fn cycle(&self) -> Duration {
        Duration::try_from_secs_f64(self.cycle_secs).unwrap_or_default()
    }
}
