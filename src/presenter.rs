use crate::context::RenderContext;
use crate::convert::{PixelBuffer, convert};
use crate::effect::FrameSource;
use crate::stats::{Cadence, FpsReport, FrameTiming};
use crate::surface::{Key, Surface};
use crate::time_cursor::{InputSnapshot, TimeCursor};
use crate::timer::FrameTimer;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Virtual frame rate the deadline indicator measures against.
pub const DEFAULT_TARGET_FPS: u32 = 60;
/// Width of the deadline indicator bar in pixels.
pub const INDICATOR_WIDTH: usize = 2;

const MET_COLOR: [u8; 4] = [0x00, 0xff, 0x00, 0xff];
const MISSED_COLOR: [u8; 4] = [0xff, 0x00, 0x00, 0xff];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenterState {
    Running,
    Closed,
}

/// Whether the scheduler should run another frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Clone, Debug)]
pub struct PresenterConfig {
    pub title: String,
    pub target_fps: u32,
    pub cadence: Cadence,
    pub cycle: Duration,
    /// Wire keyboard time overrides (pin, scrub, freeze) into the cursor.
    pub interactive: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            title: "Effect".to_string(),
            target_fps: DEFAULT_TARGET_FPS,
            cadence: Cadence::Interval(Duration::from_millis(500)),
            cycle: crate::time_cursor::DEFAULT_CYCLE,
            interactive: true,
        }
    }
}

/// Outcome of the deadline check for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Deadline {
    /// Render cost stayed under the frame budget; bar height fraction.
    Met(f64),
    /// Render cost reached or exceeded the budget.
    Missed,
}

/// Render cost relative to one virtual frame, clamped to 1.0.
pub fn deadline_ratio(spent: Duration, target_fps: u32) -> f64 {
    (spent.as_secs_f64() * target_fps.max(1) as f64).min(1.0)
}

pub fn classify_deadline(ratio: f64) -> Deadline {
    if ratio < 1.0 {
        Deadline::Met(ratio.max(0.0))
    } else {
        Deadline::Missed
    }
}

/// Paint the deadline bar along the left edge, growing down from the top of
/// the picture.
pub fn draw_indicator(buf: &mut PixelBuffer, deadline: Deadline) {
    let (rows, color) = match deadline {
        Deadline::Met(frac) => ((frac * buf.height as f64) as usize, MET_COLOR),
        Deadline::Missed => (buf.height, MISSED_COLOR),
    };
    let bar_w = INDICATOR_WIDTH.min(buf.width);
    for y in 0..rows.min(buf.height) {
        let start = buf.memory_row(y) * buf.stride * 4;
        for px in buf.data[start..start + bar_w * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }
}

/// The per-frame loop shared by every surface.
pub struct Presenter<'c, S, F> {
    surface: S,
    effect: F,
    ctx: &'c RenderContext,
    cfg: PresenterConfig,
    state: PresenterState,
    cursor: TimeCursor,
    timer: FrameTimer,
    timing: FrameTiming,
    buffer: PixelBuffer,
    last_report: Option<FpsReport>,
    frames: u64,
}

impl<'c, S: Surface, F: FrameSource> Presenter<'c, S, F> {
    pub fn new(surface: S, effect: F, ctx: &'c RenderContext, cfg: PresenterConfig) -> Self {
        let now = Instant::now();
        let buffer = PixelBuffer::new(0, 0, surface.row_order());
        Self {
            cursor: TimeCursor::with_start(now, cfg.cycle),
            timing: FrameTiming::new(cfg.cadence, now),
            timer: FrameTimer::default(),
            surface,
            effect,
            ctx,
            cfg,
            state: PresenterState::Running,
            buffer,
            last_report: None,
            frames: 0,
        }
    }

    pub fn with_timer(mut self, timer: FrameTimer) -> Self {
        self.timer = timer;
        self
    }

    pub fn state(&self) -> PresenterState {
        self.state
    }

    pub fn cursor(&self) -> &TimeCursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut TimeCursor {
        &mut self.cursor
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn last_report(&self) -> Option<&FpsReport> {
        self.last_report.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn into_parts(self) -> (S, F) {
        (self.surface, self.effect)
    }

    /// Run one frame: input, time, render, convert, indicator, present, stats.
    pub fn step(&mut self) -> anyhow::Result<Flow> {
        if self.state == PresenterState::Closed {
            return Ok(Flow::Stop);
        }
        self.surface.poll()?;
        if self.surface.close_requested() || self.surface.just_pressed(Key::Exit) {
            self.surface.request_close();
            self.state = PresenterState::Closed;
            info!("{}: closed after {} frames", self.surface.name(), self.frames);
            return Ok(Flow::Stop);
        }

        let mark = self.timer.start();
        let input = if self.cfg.interactive {
            InputSnapshot::from_keys(&self.surface)
        } else {
            InputSnapshot::default()
        };
        let t = self.cursor.advance(mark.instant, &input);
        let image = self.effect.render(t);
        let spent = self.timer.elapsed(&mark);

        if self.buffer.width != image.width() || self.buffer.height != image.height() {
            debug!(
                "presentation buffer -> {}x{} ({})",
                image.width(),
                image.height(),
                image.kind()
            );
            self.buffer = PixelBuffer::new(image.width(), image.height(), self.surface.row_order());
        }
        convert(&mut self.buffer, image, &self.ctx.palette);

        let ratio = deadline_ratio(spent, self.cfg.target_fps);
        draw_indicator(&mut self.buffer, classify_deadline(ratio));

        self.surface.present(&self.buffer)?;
        self.frames += 1;

        if let Some(report) = self.timing.record(Instant::now(), spent, t) {
            let line = report.status_line(&self.cfg.title);
            debug!("{line}");
            self.surface.set_title(&line);
            self.last_report = Some(report);
        }
        Ok(Flow::Continue)
    }

    pub fn run(&mut self, scheduler: &mut dyn Scheduler) -> anyhow::Result<()> {
        scheduler.drive(&mut || self.step())
    }
}

/// Decides when the next frame runs.
pub trait Scheduler {
    fn drive(&mut self, frame: &mut dyn FnMut() -> anyhow::Result<Flow>) -> anyhow::Result<()>;
}

/// Back-to-back frames; the surface's present call is the only pacing.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeRunning;

impl Scheduler for FreeRunning {
    fn drive(&mut self, frame: &mut dyn FnMut() -> anyhow::Result<Flow>) -> anyhow::Result<()> {
        while frame()? == Flow::Continue {}
        Ok(())
    }
}

/// One frame per host tick, like a display-refresh callback.
#[derive(Clone, Copy, Debug)]
pub struct Paced {
    interval: Duration,
}

impl Paced {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Scheduler for Paced {
    fn drive(&mut self, frame: &mut dyn FnMut() -> anyhow::Result<Flow>) -> anyhow::Result<()> {
        loop {
            let tick = Instant::now();
            if frame()? == Flow::Stop {
                return Ok(());
            }
            let elapsed = tick.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
    }
}

/// Stops after a fixed number of frames. Handy for smoke runs and tests.
#[derive(Clone, Copy, Debug)]
pub struct Bounded {
    pub frames: u64,
}

impl Scheduler for Bounded {
    fn drive(&mut self, frame: &mut dyn FnMut() -> anyhow::Result<Flow>) -> anyhow::Result<()> {
        for _ in 0..self.frames {
            if frame()? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}
