//! Time-boxed waits over media tracks.
//!
//! Every wait here is a plain value polled once per frame with the current
//! time. None of them can fail and none can hang: each carries a deadline,
//! and a missing or broken track resolves the wait immediately. Waits
//! compose through [`WaitAll`], which completes once every member has.

use crate::time::ms_to_us;

/// Load state of a media resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    /// Metadata (duration) not available yet.
    Loading,
    /// Duration known, playback possible.
    Ready,
    /// Decoding or I/O failed; the track will never become ready.
    Failed,
}

/// The playback surface the session consumes.
pub trait MediaTrack {
    fn status(&self) -> MediaStatus;
    /// Natural duration once metadata has loaded.
    fn duration_ms(&self) -> Option<f64>;
    /// Reset the playback position to the start.
    fn rewind(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn set_loop(&mut self, looping: bool);
    /// Begin playback. An `Err` means the platform refused to start it.
    fn play(&mut self) -> Result<(), String>;
    fn pause(&mut self);
    /// Playback reached its natural end.
    fn has_ended(&self) -> bool;
}

/// Resolves a key to a track.
pub trait TrackSet<K> {
    fn track(&self, key: K) -> Option<&dyn MediaTrack>;
    fn track_mut(&mut self, key: K) -> Option<&mut dyn MediaTrack>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Done,
}

impl Progress {
    pub fn is_done(self) -> bool {
        self == Progress::Done
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedWait<K> {
    Delay { deadline_us: u64 },
    MediaReady { track: K, deadline_us: u64 },
    Playback { track: K, deadline_us: u64 },
    Resolved,
}

impl<K: Copy> TimedWait<K> {
    /// Completes `ms` after `now_us`.
    pub fn delay(now_us: u64, ms: f64) -> Self {
        Self::Delay {
            deadline_us: now_us + ms_to_us(ms),
        }
    }

    /// Completes when `track` has metadata, fails, or `timeout_ms` passes.
    pub fn media_ready(track: K, now_us: u64, timeout_ms: f64) -> Self {
        Self::MediaReady {
            track,
            deadline_us: now_us + ms_to_us(timeout_ms),
        }
    }

    /// Rewind, set volume and start `track`, completing when it ends,
    /// fails, or `timeout_ms` passes. A refused start resolves immediately.
    pub fn play<S: TrackSet<K> + ?Sized>(
        track: K,
        tracks: &mut S,
        volume: f32,
        timeout_ms: f64,
        now_us: u64,
    ) -> Self {
        let Some(media) = tracks.track_mut(track) else {
            return Self::Resolved;
        };
        if media.status() == MediaStatus::Failed {
            return Self::Resolved;
        }
        media.rewind();
        media.set_volume(volume);
        if let Err(err) = media.play() {
            log::debug!("Playback refused, continuing without sound: {err}");
            return Self::Resolved;
        }
        Self::Playback {
            track,
            deadline_us: now_us + ms_to_us(timeout_ms),
        }
    }

    pub fn poll<S: TrackSet<K> + ?Sized>(&mut self, now_us: u64, tracks: &S) -> Progress {
        let done = match *self {
            Self::Resolved => true,
            Self::Delay { deadline_us } => now_us >= deadline_us,
            Self::MediaReady { track, deadline_us } => {
                now_us >= deadline_us
                    || tracks
                        .track(track)
                        .is_none_or(|m| m.status() != MediaStatus::Loading)
            }
            Self::Playback { track, deadline_us } => {
                now_us >= deadline_us
                    || tracks
                        .track(track)
                        .is_none_or(|m| m.status() == MediaStatus::Failed || m.has_ended())
            }
        };
        if done {
            *self = Self::Resolved;
            Progress::Done
        } else {
            Progress::Pending
        }
    }
}

/// Concurrent "wait for all" over a set of timed waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitAll<K> {
    waits: Vec<TimedWait<K>>,
}

impl<K: Copy> WaitAll<K> {
    pub fn new() -> Self {
        Self { waits: Vec::new() }
    }

    pub fn with(mut self, wait: TimedWait<K>) -> Self {
        self.waits.push(wait);
        self
    }

    pub fn len(&self) -> usize {
        self.waits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }

    /// Polls every member; an empty set is already done.
    pub fn poll<S: TrackSet<K> + ?Sized>(&mut self, now_us: u64, tracks: &S) -> Progress {
        let mut all_done = true;
        for wait in &mut self.waits {
            if !wait.poll(now_us, tracks).is_done() {
                all_done = false;
            }
        }
        if all_done {
            Progress::Done
        } else {
            Progress::Pending
        }
    }
}

impl<K: Copy> Default for WaitAll<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Track whose state is set directly by the test.
    struct FakeTrack {
        status: MediaStatus,
        ended: bool,
        refuse_play: bool,
        plays: u32,
        volume: f32,
        rewound: bool,
    }

    impl FakeTrack {
        fn new(status: MediaStatus) -> Self {
            Self {
                status,
                ended: false,
                refuse_play: false,
                plays: 0,
                volume: 1.0,
                rewound: false,
            }
        }
    }

    impl MediaTrack for FakeTrack {
        fn status(&self) -> MediaStatus {
            self.status
        }
        fn duration_ms(&self) -> Option<f64> {
            (self.status == MediaStatus::Ready).then_some(1000.0)
        }
        fn rewind(&mut self) {
            self.rewound = true;
        }
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
        fn set_loop(&mut self, _looping: bool) {}
        fn play(&mut self) -> Result<(), String> {
            if self.refuse_play {
                return Err("autoplay blocked".to_string());
            }
            self.plays += 1;
            Ok(())
        }
        fn pause(&mut self) {}
        fn has_ended(&self) -> bool {
            self.ended
        }
    }

    struct Tracks(Vec<FakeTrack>);

    impl TrackSet<usize> for Tracks {
        fn track(&self, key: usize) -> Option<&dyn MediaTrack> {
            self.0.get(key).map(|t| t as &dyn MediaTrack)
        }
        fn track_mut(&mut self, key: usize) -> Option<&mut dyn MediaTrack> {
            self.0.get_mut(key).map(|t| t as &mut dyn MediaTrack)
        }
    }

    #[test]
    fn delay_resolves_at_deadline() {
        let tracks = Tracks(vec![]);
        let mut wait: TimedWait<usize> = TimedWait::delay(1_000, 5.0);
        assert_eq!(wait.poll(5_999, &tracks), Progress::Pending);
        assert_eq!(wait.poll(6_000, &tracks), Progress::Done);
        // Resolved waits stay resolved.
        assert_eq!(wait.poll(0, &tracks), Progress::Done);
    }

    #[test]
    fn media_ready_resolves_on_metadata_or_error() {
        let mut tracks = Tracks(vec![
            FakeTrack::new(MediaStatus::Loading),
            FakeTrack::new(MediaStatus::Failed),
        ]);
        let mut loading = TimedWait::media_ready(0usize, 0, 1000.0);
        let mut failed = TimedWait::media_ready(1usize, 0, 1000.0);
        assert_eq!(loading.poll(10, &tracks), Progress::Pending);
        assert_eq!(failed.poll(10, &tracks), Progress::Done);
        tracks.0[0].status = MediaStatus::Ready;
        assert_eq!(loading.poll(20, &tracks), Progress::Done);
    }

    #[test]
    fn stalled_media_wait_resolves_at_timeout() {
        let tracks = Tracks(vec![FakeTrack::new(MediaStatus::Loading)]);
        let mut wait = TimedWait::media_ready(0usize, 2_000, 250.0);
        assert_eq!(wait.poll(251_999, &tracks), Progress::Pending);
        assert_eq!(wait.poll(252_000, &tracks), Progress::Done);
    }

    #[test]
    fn stalled_playback_resolves_at_timeout() {
        let mut tracks = Tracks(vec![FakeTrack::new(MediaStatus::Ready)]);
        let mut wait = TimedWait::play(0usize, &mut tracks, 0.4, 300.0, 0);
        assert_eq!(tracks.0[0].plays, 1);
        assert!(tracks.0[0].rewound);
        assert!((tracks.0[0].volume - 0.4).abs() < f32::EPSILON);
        // The track never reports an end; the ceiling still applies.
        assert_eq!(wait.poll(299_999, &tracks), Progress::Pending);
        assert_eq!(wait.poll(300_000, &tracks), Progress::Done);
    }

    #[test]
    fn playback_resolves_when_track_ends() {
        let mut tracks = Tracks(vec![FakeTrack::new(MediaStatus::Ready)]);
        let mut wait = TimedWait::play(0usize, &mut tracks, 1.0, 10_000.0, 0);
        assert_eq!(wait.poll(1, &tracks), Progress::Pending);
        tracks.0[0].ended = true;
        assert_eq!(wait.poll(2, &tracks), Progress::Done);
    }

    #[test]
    fn refused_playback_resolves_immediately() {
        let mut tracks = Tracks(vec![FakeTrack::new(MediaStatus::Ready)]);
        tracks.0[0].refuse_play = true;
        let mut wait = TimedWait::play(0usize, &mut tracks, 1.0, 10_000.0, 0);
        assert_eq!(wait, TimedWait::Resolved);
        assert_eq!(wait.poll(0, &tracks), Progress::Done);
    }

    #[test]
    fn missing_track_resolves_immediately() {
        let mut tracks = Tracks(vec![]);
        let mut play = TimedWait::play(3usize, &mut tracks, 1.0, 10_000.0, 0);
        let mut ready = TimedWait::media_ready(3usize, 0, 10_000.0);
        assert_eq!(play.poll(0, &tracks), Progress::Done);
        assert_eq!(ready.poll(0, &tracks), Progress::Done);
    }

    #[test]
    fn wait_all_completes_after_slowest_member() {
        let tracks = Tracks(vec![FakeTrack::new(MediaStatus::Loading)]);
        let mut all = WaitAll::new()
            .with(TimedWait::delay(0, 100.0))
            .with(TimedWait::media_ready(0usize, 0, 400.0));
        assert_eq!(all.len(), 2);
        assert_eq!(all.poll(150_000, &tracks), Progress::Pending);
        assert_eq!(all.poll(400_000, &tracks), Progress::Done);
    }

    #[test]
    fn empty_wait_all_is_done() {
        let tracks = Tracks(vec![]);
        let mut all: WaitAll<usize> = WaitAll::new();
        assert!(all.is_empty());
        assert_eq!(all.poll(0, &tracks), Progress::Done);
    }
}
