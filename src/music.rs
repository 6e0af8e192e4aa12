use crate::error::{FxError, FxResult};
use crate::loader::LoaderChain;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A soundtrack that a timed run synchronizes to.
pub trait MusicPlayer {
    /// Begin playback, then call `on_started` with the playback position at
    /// which the caller should consider the music to be.
    fn start(&mut self, on_started: Box<dyn FnOnce(Duration) + '_>) -> FxResult<()>;

    /// Time since playback started. Zero before `start`.
    fn position(&self) -> Duration;
}

/// Decoded mono samples of a WAV file.
#[derive(Clone, Debug)]
pub struct WavTrack {
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl WavTrack {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Parse a RIFF/WAVE file (PCM16 or float32, any channel count), downmixed
/// to mono.
pub fn parse_wav(bytes: &[u8]) -> FxResult<WavTrack> {
    if bytes.len() < 44 {
        return Err(FxError::decode("wav too small"));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(FxError::decode("not a RIFF/WAVE file"));
    }

    let mut format = 0u16;
    let mut channels = 0u16;
    let mut sample_rate = 0u32;
    let mut bits = 0u16;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size =
            u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
                as usize;
        let start = pos + 8;
        let end = start.saturating_add(size);
        if end > bytes.len() {
            break;
        }

        if id == b"fmt " {
            if size < 16 {
                return Err(FxError::decode("invalid fmt chunk"));
            }
            let c = &bytes[start..end];
            format = u16::from_le_bytes([c[0], c[1]]);
            channels = u16::from_le_bytes([c[2], c[3]]);
            sample_rate = u32::from_le_bytes([c[4], c[5], c[6], c[7]]);
            bits = u16::from_le_bytes([c[14], c[15]]);
        } else if id == b"data" {
            data = Some(&bytes[start..end]);
        }

        pos = end + (size % 2);
    }

    let data = data.ok_or_else(|| FxError::decode("missing data chunk"))?;
    if channels == 0 || sample_rate == 0 {
        return Err(FxError::decode("invalid channel count or sample rate"));
    }

    let ch = channels as usize;
    let samples: Vec<f32> = match (format, bits) {
        (1, 16) => downmix(data, ch, 2, |s| i16::from_le_bytes([s[0], s[1]]) as f32 / 32768.0),
        (3, 32) => downmix(data, ch, 4, |s| f32::from_le_bytes([s[0], s[1], s[2], s[3]])),
        _ => {
            return Err(FxError::decode(format!(
                "unsupported wav format {format}/{bits}-bit (expected PCM16 or Float32)"
            )));
        }
    };

    Ok(WavTrack {
        sample_rate,
        samples: samples.into(),
    })
}

fn downmix(data: &[u8], channels: usize, width: usize, sample: impl Fn(&[u8]) -> f32) -> Vec<f32> {
    data.chunks_exact(channels * width)
        .map(|frame| {
            let acc: f32 = frame.chunks_exact(width).map(&sample).sum();
            (acc / channels as f32).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Load a WAV through the loader chain and open the default output device.
pub fn load_music(path: &str, loaders: &LoaderChain) -> FxResult<Box<dyn MusicPlayer>> {
    let bytes = loaders.load(path)?;
    let track = parse_wav(&bytes)?;
    info!(
        "music: {path} {} Hz, {:.1}s",
        track.sample_rate,
        track.duration().as_secs_f64()
    );
    Ok(Box::new(CpalPlayer::open(track)?))
}

/// Plays a [`WavTrack`] on the default cpal output device.
pub struct CpalPlayer {
    track: WavTrack,
    device: cpal::Device,
    config: cpal::StreamConfig,
    format: SampleFormat,
    stream: Option<cpal::Stream>,
    started_at: Option<Instant>,
    // Source position in 1/65536 frames, advanced by the audio thread.
    cursor: Arc<AtomicU64>,
}

impl CpalPlayer {
    pub fn open(track: WavTrack) -> FxResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| FxError::audio("no default output device found"))?;
        let supported = device
            .default_output_config()
            .map_err(|e| FxError::audio(format!("get default output config: {e}")))?;
        debug!(
            "music: output {} Hz x{} {:?}",
            supported.sample_rate().0,
            supported.channels(),
            supported.sample_format()
        );
        Ok(Self {
            track,
            device,
            format: supported.sample_format(),
            config: supported.config(),
            stream: None,
            started_at: None,
            cursor: Arc::new(AtomicU64::new(0)),
        })
    }

    fn build_stream<T>(&self) -> FxResult<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let samples = Arc::clone(&self.track.samples);
        let cursor = Arc::clone(&self.cursor);
        let channels = self.config.channels.max(1) as usize;
        let step =
            ((self.track.sample_rate as u64) << 16) / (self.config.sample_rate.0.max(1) as u64);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cursor.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let s = samples.get((pos >> 16) as usize).copied().unwrap_or(0.0);
                        frame.fill(T::from_sample(s));
                        pos += step;
                    }
                    cursor.store(pos, Ordering::Relaxed);
                },
                |err| warn!("music: output stream error: {err}"),
                None,
            )
            .map_err(|e| FxError::audio(format!("build output stream: {e}")))?;
        Ok(stream)
    }
}

impl MusicPlayer for CpalPlayer {
    fn start(&mut self, on_started: Box<dyn FnOnce(Duration) + '_>) -> FxResult<()> {
        let stream = match self.format {
            SampleFormat::F32 => self.build_stream::<f32>()?,
            SampleFormat::I16 => self.build_stream::<i16>()?,
            SampleFormat::U16 => self.build_stream::<u16>()?,
            fmt => return Err(FxError::audio(format!("unsupported sample format: {fmt:?}"))),
        };
        stream
            .play()
            .map_err(|e| FxError::audio(format!("start output stream: {e}")))?;
        self.stream = Some(stream);
        // Playback latency is not observable here; treat "now" as the start.
        self.started_at = Some(Instant::now());
        on_started(Duration::ZERO);
        Ok(())
    }

    fn position(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

/// A player with no audio output, keeping the same clock semantics.
#[derive(Debug, Default)]
pub struct SilentPlayer {
    started_at: Option<Instant>,
}

impl SilentPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MusicPlayer for SilentPlayer {
    fn start(&mut self, on_started: Box<dyn FnOnce(Duration) + '_>) -> FxResult<()> {
        self.started_at = Some(Instant::now());
        on_started(Duration::ZERO);
        Ok(())
    }

    fn position(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

/// Start `player` and run `body` from inside its start callback, returning
/// what `body` returns.
pub fn run_timed_music<R>(
    player: &mut dyn MusicPlayer,
    body: impl FnOnce(Duration) -> anyhow::Result<R>,
) -> anyhow::Result<R> {
    let mut outcome = None;
    player.start(Box::new(|pos| outcome = Some(body(pos))))?;
    outcome.unwrap_or_else(|| Err(anyhow::anyhow!("music player did not start")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav(format: u16, channels: u16, bits: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&8000u32.to_le_bytes());
        let block = channels as u32 * bits as u32 / 8;
        out.extend_from_slice(&(8000 * block).to_le_bytes());
        out.extend_from_slice(&(block as u16).to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn pcm16_stereo_is_downmixed() {
        let mut data = Vec::new();
        for s in [16384i16, 0, -32768, -32768] {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let track = parse_wav(&wav(1, 2, 16, &data)).unwrap();
        assert_eq!(track.sample_rate, 8000);
        assert_eq!(&*track.samples, &[0.25, -1.0]);
    }

    #[test]
    fn float32_mono_is_read() {
        let mut data = Vec::new();
        for s in [0.5f32, -0.25] {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let track = parse_wav(&wav(3, 1, 32, &data)).unwrap();
        assert_eq!(&*track.samples, &[0.5, -0.25]);
    }

    #[test]
    fn unsupported_format_is_a_decode_error() {
        let err = parse_wav(&wav(1, 1, 8, &[0; 8])).unwrap_err();
        assert!(matches!(err, FxError::Decode(_)));
    }

    #[test]
    fn silent_player_reports_zero_at_start() {
        let mut player = SilentPlayer::new();
        assert_eq!(player.position(), Duration::ZERO);
        let seen = run_timed_music(&mut player, |pos| Ok(pos)).unwrap();
        assert_eq!(seen, Duration::ZERO);
    }
}
