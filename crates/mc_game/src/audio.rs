//! Sound effects backed by rodio.
//!
//! Each effect is decoded once at startup to learn its duration and kept as
//! raw bytes; every `play()` builds a fresh sink. A missing file, a decode
//! error or a machine without an output device all produce a `Failed` track,
//! which every wait treats as "resolve now", so the session runs silently
//! instead of stalling.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use mc_core::media::{MediaStatus, MediaTrack, TrackSet};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    Open,
    Reel,
    Close,
    Claim,
}

impl Sfx {
    pub const ALL: [Sfx; 4] = [Sfx::Open, Sfx::Reel, Sfx::Close, Sfx::Claim];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Open => "open.ogg",
            Self::Reel => "reel.ogg",
            Self::Close => "close.ogg",
            Self::Claim => "claim.ogg",
        }
    }
}

pub struct RodioTrack {
    handle: Option<OutputStreamHandle>,
    bytes: Option<Arc<[u8]>>,
    duration_ms: Option<f64>,
    status: MediaStatus,
    sink: Option<Sink>,
    volume: f32,
    looping: bool,
}

impl RodioTrack {
    pub fn load(path: &Path, handle: Option<OutputStreamHandle>) -> Self {
        match read_and_measure(path) {
            Ok((bytes, duration_ms)) => {
                log::info!(
                    "Loaded sound {} ({})",
                    path.display(),
                    duration_ms.map_or("unknown length".to_string(), |d| format!("{d:.0}ms"))
                );
                Self {
                    handle,
                    bytes: Some(bytes),
                    duration_ms,
                    status: MediaStatus::Ready,
                    sink: None,
                    volume: 1.0,
                    looping: false,
                }
            }
            Err(e) => {
                log::warn!("{e}; continuing without this sound");
                Self::failed()
            }
        }
    }

    fn failed() -> Self {
        Self {
            handle: None,
            bytes: None,
            duration_ms: None,
            status: MediaStatus::Failed,
            sink: None,
            volume: 1.0,
            looping: false,
        }
    }
}

impl MediaTrack for RodioTrack {
    fn status(&self) -> MediaStatus {
        self.status
    }

    fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    fn rewind(&mut self) {
        // A new sink starts from the beginning; dropping the old one stops it.
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn play(&mut self) -> Result<(), String> {
        if let Some(sink) = &self.sink {
            if sink.is_paused() && !sink.empty() {
                sink.play();
                return Ok(());
            }
        }
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| "no audio output device".to_string())?;
        let bytes = self
            .bytes
            .clone()
            .ok_or_else(|| "sound failed to load".to_string())?;
        let sink = Sink::try_new(handle).map_err(|e| format!("Failed to create sink: {e}"))?;
        let source =
            Decoder::new(Cursor::new(bytes)).map_err(|e| format!("Failed to decode sound: {e}"))?;
        sink.set_volume(self.volume);
        if self.looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn has_ended(&self) -> bool {
        self.sink.as_ref().is_none_or(|sink| sink.empty())
    }
}

fn read_and_measure(path: &Path) -> Result<(Arc<[u8]>, Option<f64>), String> {
    let raw = fs::read(path)
        .map_err(|e| format!("Failed to read sound file {}: {e}", path.display()))?;
    let bytes: Arc<[u8]> = Arc::from(raw);
    let decoder = Decoder::new(Cursor::new(bytes.clone()))
        .map_err(|e| format!("Failed to decode sound file {}: {e}", path.display()))?;

    if let Some(duration) = decoder.total_duration() {
        return Ok((bytes, Some(duration.as_secs_f64() * 1000.0)));
    }
    // Some containers carry no length header; count the samples instead.
    let channels = f64::from(decoder.channels());
    let rate = f64::from(decoder.sample_rate());
    let samples = decoder.count() as f64;
    let duration_ms = (channels > 0.0 && rate > 0.0).then(|| samples / (channels * rate) * 1000.0);
    Ok((bytes, duration_ms))
}

/// The four session sounds keyed by [`Sfx`].
pub struct SoundBank {
    _stream: Option<OutputStream>,
    tracks: HashMap<Sfx, Box<dyn MediaTrack>>,
}

impl SoundBank {
    /// Open the default output device and load every effect from `dir`.
    pub fn load(dir: &Path) -> Self {
        let (stream, handle) = match OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), Some(handle)),
            Err(e) => {
                log::warn!("No audio output available ({e}); sounds are disabled");
                (None, None)
            }
        };

        let mut tracks: HashMap<Sfx, Box<dyn MediaTrack>> = HashMap::new();
        for sfx in Sfx::ALL {
            let track = RodioTrack::load(&dir.join(sfx.file_name()), handle.clone());
            tracks.insert(sfx, Box::new(track));
        }

        Self {
            _stream: stream,
            tracks,
        }
    }

    /// Bank built from caller-supplied tracks, no output device.
    pub fn from_tracks(tracks: impl IntoIterator<Item = (Sfx, Box<dyn MediaTrack>)>) -> Self {
        Self {
            _stream: None,
            tracks: tracks.into_iter().collect(),
        }
    }

    /// A bank with no tracks at all; every wait resolves immediately.
    pub fn silent() -> Self {
        Self::from_tracks(std::iter::empty())
    }

    pub fn duration_ms(&self, sfx: Sfx) -> Option<f64> {
        self.tracks
            .get(&sfx)
            .filter(|t| t.status() == MediaStatus::Ready)
            .and_then(|t| t.duration_ms())
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Play from the top without waiting on the end. Returns whether
    /// playback started.
    pub fn start(&mut self, sfx: Sfx, volume: f32) -> bool {
        let Some(track) = self.tracks.get_mut(&sfx) else {
            return false;
        };
        if track.status() == MediaStatus::Failed {
            return false;
        }
        track.rewind();
        track.set_volume(volume);
        match track.play() {
            Ok(()) => true,
            Err(err) => {
                log::debug!("{:?} refused to play: {err}", sfx);
                false
            }
        }
    }

    /// Pause and rewind.
    pub fn stop(&mut self, sfx: Sfx) {
        if let Some(track) = self.tracks.get_mut(&sfx) {
            track.pause();
            track.rewind();
        }
    }

    pub fn set_loop(&mut self, sfx: Sfx, looping: bool) {
        if let Some(track) = self.tracks.get_mut(&sfx) {
            track.set_loop(looping);
        }
    }
}

impl TrackSet<Sfx> for SoundBank {
    fn track(&self, key: Sfx) -> Option<&dyn MediaTrack> {
        self.tracks.get(&key).map(|t| t.as_ref() as &dyn MediaTrack)
    }

    fn track_mut(&mut self, key: Sfx) -> Option<&mut dyn MediaTrack> {
        self.tracks
            .get_mut(&key)
            .map(|t| t.as_mut() as &mut dyn MediaTrack)
    }
}
