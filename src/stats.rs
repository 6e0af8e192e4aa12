use std::time::{Duration, Instant};

/// When the accumulator closes a reporting window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    /// Wall-clock interval (native windows report twice a second).
    Interval(Duration),
    /// Every `n` presented frames (canvas-style hosts).
    Frames(u32),
}

/// Numbers for one closed reporting window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FpsReport {
    pub last_t: f64,
    pub frames: u32,
    pub window: Duration,
    pub real_fps: f64,
    /// Frames per second if render cost were the only limit.
    pub virtual_fps: u64,
}

impl FpsReport {
    pub fn status_line(&self, title: &str) -> String {
        format!(
            "{} | time: {:.3} | FPS: {:.0} | vFPS: {}",
            title, self.last_t, self.real_fps, self.virtual_fps
        )
    }
}

/// Aggregates per-frame timing into real and virtual frame rates.
#[derive(Clone, Debug)]
pub struct FrameTiming {
    cadence: Cadence,
    frames: u32,
    render_cost: Duration,
    window_start: Instant,
    last_t: f64,
}

impl FrameTiming {
    pub fn new(cadence: Cadence, now: Instant) -> Self {
        Self {
            cadence,
            frames: 0,
            render_cost: Duration::ZERO,
            window_start: now,
            last_t: 0.0,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn frames_in_window(&self) -> u32 {
        self.frames
    }

    /// Count one presented frame. Returns a report when the window closes,
    /// after which the window restarts at `now`.
    pub fn record(&mut self, now: Instant, render_cost: Duration, t: f64) -> Option<FpsReport> {
        self.frames += 1;
        self.render_cost += render_cost;
        self.last_t = t;

        let window = now.saturating_duration_since(self.window_start);
        let due = match self.cadence {
            Cadence::Interval(every) => window >= every,
            Cadence::Frames(n) => self.frames >= n.max(1),
        };
        if !due {
            return None;
        }

        let report = FpsReport {
            last_t: self.last_t,
            frames: self.frames,
            window,
            real_fps: rate(self.frames, window),
            virtual_fps: rate(self.frames, self.render_cost).round() as u64,
        };
        self.frames = 0;
        self.render_cost = Duration::ZERO;
        self.window_start = now;
        Some(report)
    }
}

fn rate(frames: u32, span: Duration) -> f64 {
    if span.is_zero() {
        return 0.0;
    }
    frames as f64 / span.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_cadence_reports_every_n_frames() {
        let start = Instant::now();
        let mut timing = FrameTiming::new(Cadence::Frames(3), start);
        let cost = Duration::from_millis(2);
        assert!(timing.record(start + Duration::from_millis(10), cost, 0.1).is_none());
        assert!(timing.record(start + Duration::from_millis(20), cost, 0.2).is_none());
        let report = timing
            .record(start + Duration::from_millis(30), cost, 0.3)
            .unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(report.virtual_fps, 500);
        assert!((report.real_fps - 100.0).abs() < 1e-9);
        assert_eq!(timing.frames_in_window(), 0);
    }

    #[test]
    fn interval_cadence_waits_for_the_window() {
        let start = Instant::now();
        let mut timing = FrameTiming::new(Cadence::Interval(Duration::from_millis(500)), start);
        assert!(timing.record(start + Duration::from_millis(499), Duration::ZERO, 0.5).is_none());
        let report = timing
            .record(start + Duration::from_millis(500), Duration::ZERO, 0.5)
            .unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.virtual_fps, 0);
    }

    #[test]
    fn status_line_format() {
        let report = FpsReport {
            last_t: 0.12345,
            frames: 30,
            window: Duration::from_millis(500),
            real_fps: 59.6,
            virtual_fps: 812,
        };
        assert_eq!(
            report.status_line("Plasma"),
            "Plasma | time: 0.123 | FPS: 60 | vFPS: 812"
        );
    }
}
