use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("high-resolution timer unavailable: {0}")]
pub struct TimerUnavailable(pub String);

/// Optional platform performance counter.
pub trait HiResTimer {
    fn counter(&self) -> Result<i64, TimerUnavailable>;
    /// Counter ticks per second.
    fn frequency(&self) -> Result<i64, TimerUnavailable>;
}

/// `CLOCK_MONOTONIC` in nanoseconds on unix; unavailable elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicCounter;

impl HiResTimer for MonotonicCounter {
    #[cfg(unix)]
    fn counter(&self) -> Result<i64, TimerUnavailable> {
        use nix::time::{ClockId, clock_gettime};
        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| TimerUnavailable(e.to_string()))?;
        Ok(ts.tv_sec() as i64 * 1_000_000_000 + ts.tv_nsec() as i64)
    }

    #[cfg(not(unix))]
    fn counter(&self) -> Result<i64, TimerUnavailable> {
        Err(TimerUnavailable("no monotonic counter on this platform".into()))
    }

    #[cfg(unix)]
    fn frequency(&self) -> Result<i64, TimerUnavailable> {
        Ok(1_000_000_000)
    }

    #[cfg(not(unix))]
    fn frequency(&self) -> Result<i64, TimerUnavailable> {
        Err(TimerUnavailable("no monotonic counter on this platform".into()))
    }
}

/// A timer that never works, forcing the `Instant` path.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCounter;

impl HiResTimer for NoCounter {
    fn counter(&self) -> Result<i64, TimerUnavailable> {
        Err(TimerUnavailable("disabled".into()))
    }

    fn frequency(&self) -> Result<i64, TimerUnavailable> {
        Err(TimerUnavailable("disabled".into()))
    }
}

/// Start mark of one measured span.
#[derive(Clone, Copy, Debug)]
pub struct FrameMark {
    pub instant: Instant,
    counter: Option<i64>,
}

/// Measures render cost, preferring the performance counter and silently
/// falling back to `Instant` when either counter read fails.
pub struct FrameTimer {
    source: Box<dyn HiResTimer>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Box::new(MonotonicCounter))
    }
}

impl FrameTimer {
    pub fn new(source: Box<dyn HiResTimer>) -> Self {
        Self { source }
    }

    pub fn start(&self) -> FrameMark {
        FrameMark {
            instant: Instant::now(),
            counter: self.source.counter().ok(),
        }
    }

    pub fn elapsed(&self, mark: &FrameMark) -> Duration {
        let coarse = mark.instant.elapsed();
        let (Some(x), Ok(y), Ok(freq)) =
            (mark.counter, self.source.counter(), self.source.frequency())
        else {
            return coarse;
        };
        ticks_to_duration(y - x, freq).unwrap_or(coarse)
    }
}

fn ticks_to_duration(ticks: i64, freq: i64) -> Option<Duration> {
    if ticks < 0 || freq <= 0 {
        return None;
    }
    let nanos = (ticks as i128 * 1_000_000_000) / freq as i128;
    Some(Duration::from_nanos(u64::try_from(nanos).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Scripted {
        reads: Cell<i64>,
        step: i64,
    }

    impl HiResTimer for Scripted {
        fn counter(&self) -> Result<i64, TimerUnavailable> {
            let v = self.reads.get();
            self.reads.set(v + self.step);
            Ok(v)
        }

        fn frequency(&self) -> Result<i64, TimerUnavailable> {
            Ok(1000)
        }
    }

    #[test]
    fn counter_ticks_are_scaled_by_frequency() {
        let timer = FrameTimer::new(Box::new(Scripted {
            reads: Cell::new(0),
            step: 25,
        }));
        let mark = timer.start();
        assert_eq!(timer.elapsed(&mark), Duration::from_millis(25));
    }

    #[test]
    fn missing_counter_falls_back_to_instant() {
        let timer = FrameTimer::new(Box::new(NoCounter));
        let mark = timer.start();
        assert!(timer.elapsed(&mark) < Duration::from_secs(5));
    }

    #[test]
    fn backwards_counter_is_rejected() {
        assert_eq!(ticks_to_duration(-1, 10), None);
        assert_eq!(ticks_to_duration(5, 0), None);
        assert_eq!(ticks_to_duration(3, 1000), Some(Duration::from_millis(3)));
    }
}
