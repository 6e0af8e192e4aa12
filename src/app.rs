use crate::assets::load_gray_picture;
use crate::batch::{BatchOptions, render_to_disk};
use crate::capability::probe_target;
use crate::config::{Config, EffectKind, PaletteChoice, Target};
use crate::context::RenderContext;
use crate::demos::{Life, Plasma, Rings, Scroller, Tunnel};
use crate::effect::{EffectOptions, FrameSource, Progressive};
use crate::image::Rgba;
use crate::loader::{LoaderChain, fs_loader};
use crate::music::{MusicPlayer, SilentPlayer, load_music, run_timed_music};
use crate::palette::PaletteTable;
use crate::presenter::{Paced, Presenter, PresenterConfig};
use crate::render::{HalfBlockPainter, KittyPainter, Painter};
use crate::stats::Cadence;
use crate::terminal::TerminalSurface;
use anyhow::Context;
use log::info;
use std::time::{Duration, Instant};

pub fn run(cfg: Config) -> anyhow::Result<()> {
    cfg.validate()?;

    let ctx = RenderContext::new(palette_for(cfg.palette), loader_chain(&cfg));
    let mut effect = make_effect(&cfg, &ctx)?;

    if let Some(template) = &cfg.dump {
        let opts = BatchOptions {
            cycles: cfg.cycles,
            fps: cfg.fps,
            cycle: cfg.cycle(),
            template: template.clone(),
            workers: cfg.workers,
        };
        let report = render_to_disk(&mut *effect, &ctx, &opts)
            .with_context(|| format!("render frames to {template}"))?;
        info!("dump: {} frames written", report.frames);
        return Ok(());
    }

    let probe = probe_target(cfg.target, cfg.auto_probe);
    for note in probe.notes() {
        info!("capability: {note}");
    }
    info!("capability: {}", probe.status_label());

    let (painter, cadence): (Box<dyn Painter>, Cadence) = match probe.target {
        Target::HalfBlock => (
            Box::new(HalfBlockPainter::new()),
            Cadence::Interval(Duration::from_millis(500)),
        ),
        Target::Kitty => (Box::new(KittyPainter::new()), Cadence::Frames(cfg.fps)),
    };

    let mut player: Box<dyn MusicPlayer> = match (&cfg.music, cfg.mute) {
        (Some(path), false) => {
            load_music(path, &ctx.loaders).with_context(|| format!("load music {path}"))?
        }
        _ => Box::new(SilentPlayer::new()),
    };

    let surface = TerminalSurface::open(painter, cfg.sync_updates)
        .with_context(|| format!("open {:?} surface", probe.target))?;
    let pcfg = PresenterConfig {
        title: cfg.title.clone(),
        target_fps: cfg.fps,
        cadence,
        cycle: cfg.cycle(),
        interactive: true,
    };
    let mut presenter = Presenter::new(surface, effect, &ctx, pcfg);
    let mut scheduler = Paced::new(cfg.fps);

    run_timed_music(&mut *player, |pos| {
        let now = Instant::now();
        presenter
            .cursor_mut()
            .restart(now.checked_sub(pos).unwrap_or(now));
        presenter.run(&mut scheduler)
    })
}

pub fn palette_for(choice: PaletteChoice) -> PaletteTable {
    match choice {
        PaletteChoice::Gray => PaletteTable::identity(),
        PaletteChoice::Ember => PaletteTable::gradient(Rgba::opaque(224, 96, 32)),
        PaletteChoice::Ice => PaletteTable::gradient(Rgba::opaque(64, 160, 224)),
    }
}

/// `--assets` first, then the working directory.
pub fn loader_chain(cfg: &Config) -> LoaderChain {
    let mut chain = LoaderChain::new();
    if let Some(dir) = &cfg.assets {
        chain.push(format!("assets:{}", dir.display()), fs_loader(dir.clone()));
    }
    chain.push("cwd", fs_loader("."));
    chain
}

pub fn make_effect(cfg: &Config, ctx: &RenderContext) -> anyhow::Result<Box<dyn FrameSource>> {
    let (w, h) = (cfg.width, cfg.height);
    Ok(match cfg.effect {
        EffectKind::Plasma => Box::new(Plasma::new(w, h)),
        EffectKind::Rings => Box::new(Rings::new(w, h)),
        EffectKind::Tunnel => Box::new(Tunnel::new(w, h)),
        EffectKind::Life => Box::new(Progressive::new(
            Life::new(fastrand::u64(..)),
            EffectOptions {
                width: w,
                height: h,
            },
        )),
        EffectKind::Picture => {
            let name = cfg
                .picture
                .as_deref()
                .context("--effect picture needs --picture <NAME>")?;
            let picture = load_gray_picture(&ctx.loaders, name)
                .with_context(|| format!("load picture {name}"))?;
            Box::new(Scroller::new(picture))
        }
    })
}
