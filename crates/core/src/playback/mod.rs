use std::{cell::Cell, collections::BTreeMap, fmt, rc::Rc, time::Instant};

use tracing::{debug, info};

use crate::{
    audio::{AudioTrack, AudioTrackList},
    coords::quantize_to_frame,
    EditorError, Result,
};

/// Monotonic millisecond clock the playback position is derived from.
pub trait TimeBase {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeBase {
    origin: Instant,
}

impl SystemTimeBase {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeBase for SystemTimeBase {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Externally driven clock for offline rendering and tests. Clones share the
/// same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeBase {
    now: Rc<Cell<f64>>,
}

impl ManualTimeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl TimeBase for ManualTimeBase {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Playback position. While playing the current time is derived from the
/// wall clock anchor instead of being accumulated, so it cannot drift from
/// the audio outputs started against the same anchor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaybackClock {
    is_playing: bool,
    pause_offset: f64,
    wall_clock_anchor: f64,
}

impl PlaybackClock {
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn pause_offset(&self) -> f64 {
        self.pause_offset
    }

    pub fn current_time(&self, now_ms: f64) -> f64 {
        if self.is_playing {
            ((now_ms - self.wall_clock_anchor) / 1000.0).max(0.0)
        } else {
            self.pause_offset
        }
    }

    pub fn play(&mut self, now_ms: f64) {
        if self.is_playing {
            return;
        }
        self.wall_clock_anchor = now_ms - self.pause_offset * 1000.0;
        self.is_playing = true;
    }

    pub fn pause(&mut self, now_ms: f64) {
        if !self.is_playing {
            return;
        }
        self.pause_offset = self.current_time(now_ms);
        self.is_playing = false;
    }

    pub fn seek(&mut self, seconds: f64, now_ms: f64) {
        self.pause_offset = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };
        if self.is_playing {
            self.wall_clock_anchor = now_ms - self.pause_offset * 1000.0;
        }
    }
}

/// Sink for one audio track's decoded buffer.
pub trait AudioOutput {
    /// Starts playing from `offset_seconds` into the buffer.
    fn start(&mut self, offset_seconds: f64);
    fn stop(&mut self);
    fn set_gain(&mut self, gain: f64);
}

/// Owns the clock and every audio output. All outputs are started together
/// with one offset, and every transport change goes through this type.
pub struct PlaybackSession {
    clock: PlaybackClock,
    time_base: Box<dyn TimeBase>,
    tracks: AudioTrackList,
    outputs: BTreeMap<String, Box<dyn AudioOutput>>,
    fallback_duration: f64,
}

impl PlaybackSession {
    /// `fallback_duration` is the timeline length while no usable audio is
    /// loaded.
    pub fn new(
        tracks: AudioTrackList,
        time_base: Box<dyn TimeBase>,
        fallback_duration: f64,
    ) -> Self {
        Self {
            clock: PlaybackClock::default(),
            time_base,
            tracks,
            outputs: BTreeMap::new(),
            fallback_duration: fallback_duration.max(0.0),
        }
    }

    pub fn with_system_clock(tracks: AudioTrackList, fallback_duration: f64) -> Self {
        Self::new(tracks, Box::new(SystemTimeBase::new()), fallback_duration)
    }

    pub fn tracks(&self) -> &AudioTrackList {
        &self.tracks
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Length of the timeline: the longest usable track, or the fallback.
    pub fn duration(&self) -> f64 {
        let audio = self.tracks.duration();
        if audio > 0.0 {
            audio
        } else {
            self.fallback_duration
        }
    }

    pub fn current_time(&self) -> f64 {
        self.clock
            .current_time(self.time_base.now_ms())
            .min(self.duration())
    }

    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.clock.pause_offset() >= self.duration() {
            self.clock.seek(0.0, self.time_base.now_ms());
        }
        let offset = self.clock.pause_offset();
        self.start_outputs(offset);
        self.clock.play(self.time_base.now_ms());
        info!(offset, "playback started");
    }

    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.stop_outputs();
        self.clock.pause(self.time_base.now_ms());
        let offset = self.clock.pause_offset().min(self.duration());
        self.clock.seek(offset, self.time_base.now_ms());
        info!(offset, "playback paused");
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Moves the playhead to `seconds`, clamped to the timeline. Playing
    /// outputs are restarted from the new position.
    pub fn seek(&mut self, seconds: f64) {
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration())
        } else {
            0.0
        };
        if self.is_playing() {
            self.stop_outputs();
            self.start_outputs(target);
        }
        self.clock.seek(target, self.time_base.now_ms());
        debug!(time = target, "seek");
    }

    /// Moves by whole frames, landing on a frame boundary.
    pub fn step_frames(&mut self, frames: i64, fps: f64) {
        if fps <= 0.0 {
            return;
        }
        let target = self.current_time() + frames as f64 / fps;
        self.seek(quantize_to_frame(target, fps));
    }

    pub fn jump_by(&mut self, seconds: f64) {
        self.seek(self.current_time() + seconds);
    }

    /// Called once per rendered frame. Stops playback at the end of the
    /// timeline and returns the time to render.
    pub fn tick(&mut self) -> f64 {
        let duration = self.duration();
        if self.is_playing()
            && self.clock.current_time(self.time_base.now_ms()) >= duration
        {
            self.stop_outputs();
            self.clock.pause(self.time_base.now_ms());
            self.clock.seek(duration, self.time_base.now_ms());
            info!(duration, "playback reached the end");
        }
        self.current_time()
    }

    /// Connects an output to a track. While playing, every output restarts
    /// together so the new one joins in sync.
    pub fn attach_output(&mut self, track_id: &str, output: Box<dyn AudioOutput>) -> Result<()> {
        self.require_track(track_id)?;
        let playing = self.is_playing();
        let offset = self.current_time();
        if playing {
            self.stop_outputs();
        }
        self.outputs.insert(track_id.to_string(), output);
        if playing {
            self.start_outputs(offset);
            self.clock.seek(offset, self.time_base.now_ms());
        }
        Ok(())
    }

    pub fn detach_output(&mut self, track_id: &str) -> Option<Box<dyn AudioOutput>> {
        let mut output = self.outputs.remove(track_id)?;
        output.stop();
        Some(output)
    }

    pub fn set_active_track(&mut self, track_id: &str) -> Result<()> {
        self.tracks.set_active(track_id)
    }

    pub fn cycle_active_track(&mut self) -> Option<String> {
        self.tracks.cycle_active().map(str::to_string)
    }

    /// Excludes a track whose audio failed to decode. Other tracks keep
    /// playing.
    pub fn mark_unusable(&mut self, track_id: &str) -> Result<()> {
        self.tracks.mark_unusable(track_id)?;
        if let Some(output) = self.outputs.get_mut(track_id) {
            output.stop();
        }
        Ok(())
    }

    pub fn set_muted(&mut self, track_id: &str, muted: bool) -> Result<()> {
        self.tracks.set_muted(track_id, muted)?;
        self.refresh_gain(track_id);
        Ok(())
    }

    pub fn set_volume(&mut self, track_id: &str, volume: f64) -> Result<()> {
        self.tracks.set_volume(track_id, volume)?;
        self.refresh_gain(track_id);
        Ok(())
    }

    fn require_track(&self, track_id: &str) -> Result<&AudioTrack> {
        self.tracks
            .get(track_id)
            .ok_or_else(|| EditorError::UnknownAudioTrack(track_id.to_string()))
    }

    fn refresh_gain(&mut self, track_id: &str) {
        if let (Some(track), Some(output)) =
            (self.tracks.get(track_id), self.outputs.get_mut(track_id))
        {
            output.set_gain(track.gain());
        }
    }

    /// Starts every usable output in one pass with the same offset.
    fn start_outputs(&mut self, offset: f64) {
        let mut started = 0usize;
        for (id, output) in &mut self.outputs {
            let Some(track) = self.tracks.get(id).filter(|track| track.usable) else {
                continue;
            };
            output.set_gain(track.gain());
            output.start(offset);
            started += 1;
        }
        debug!(offset, outputs = started, "outputs started");
    }

    fn stop_outputs(&mut self) {
        for output in self.outputs.values_mut() {
            output.stop();
        }
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("clock", &self.clock)
            .field("tracks", &self.tracks)
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("fallback_duration", &self.fallback_duration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(String, f64),
        Stop(String),
        Gain(String, f64),
    }

    type Log = Rc<RefCell<Vec<Call>>>;

    struct Recording {
        id: String,
        log: Log,
    }

    impl AudioOutput for Recording {
        fn start(&mut self, offset_seconds: f64) {
            self.log
                .borrow_mut()
                .push(Call::Start(self.id.clone(), offset_seconds));
        }

        fn stop(&mut self) {
            self.log.borrow_mut().push(Call::Stop(self.id.clone()));
        }

        fn set_gain(&mut self, gain: f64) {
            self.log.borrow_mut().push(Call::Gain(self.id.clone(), gain));
        }
    }

    fn session() -> (PlaybackSession, ManualTimeBase, Log) {
        let clock = ManualTimeBase::new();
        clock.set(10_000.0);
        let mut tracks = AudioTrackList::new();
        tracks.add(AudioTrack::new("a", 30.0)).unwrap();
        tracks.add(AudioTrack::new("b", 20.0)).unwrap();
        let mut session = PlaybackSession::new(tracks, Box::new(clock.clone()), 60.0);
        let log: Log = Rc::default();
        for id in ["a", "b"] {
            session
                .attach_output(
                    id,
                    Box::new(Recording {
                        id: id.to_string(),
                        log: log.clone(),
                    }),
                )
                .unwrap();
        }
        (session, clock, log)
    }

    fn starts(log: &Log) -> Vec<f64> {
        log.borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Start(_, offset) => Some(*offset),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn clock_derives_time_from_anchor() {
        let mut clock = PlaybackClock::default();
        clock.seek(2.0, 0.0);
        clock.play(1_000.0);
        assert!((clock.current_time(1_500.0) - 2.5).abs() < 1e-12);
        clock.pause(2_000.0);
        assert!((clock.current_time(9_999.0) - 3.0).abs() < 1e-12);
        clock.seek(1.0, 9_999.0);
        assert_eq!(clock.current_time(50_000.0), 1.0);
    }

    #[test]
    fn play_starts_every_output_with_one_offset() {
        let (mut session, _, log) = session();
        session.seek(4.0);
        session.play();
        assert_eq!(starts(&log), vec![4.0, 4.0]);
    }

    #[test]
    fn seek_while_playing_restarts_outputs() {
        let (mut session, clock, log) = session();
        session.play();
        clock.advance(1_000.0);
        session.seek(12.0);
        assert_eq!(starts(&log), vec![0.0, 0.0, 12.0, 12.0]);
        clock.advance(500.0);
        assert!((session.current_time() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn pause_captures_position() {
        let (mut session, clock, log) = session();
        session.play();
        clock.advance(2_500.0);
        session.pause();
        clock.advance(10_000.0);
        assert!((session.current_time() - 2.5).abs() < 1e-9);
        assert!(log.borrow().contains(&Call::Stop("a".into())));
    }

    #[test]
    fn duration_follows_longest_usable_track() {
        let (mut session, _, _) = session();
        assert_eq!(session.duration(), 30.0);
        session.mark_unusable("a").unwrap();
        assert_eq!(session.duration(), 20.0);
        session.mark_unusable("b").unwrap();
        assert_eq!(session.duration(), 60.0);
    }

    #[test]
    fn unusable_tracks_are_not_started() {
        let (mut session, _, log) = session();
        session.mark_unusable("b").unwrap();
        session.play();
        let started: Vec<Call> = log
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Start(..)))
            .cloned()
            .collect();
        assert_eq!(started, vec![Call::Start("a".into(), 0.0)]);
    }

    #[test]
    fn tick_stops_at_the_end() {
        let (mut session, clock, _) = session();
        session.seek(29.0);
        session.play();
        clock.advance(2_000.0);
        assert_eq!(session.tick(), 30.0);
        assert!(!session.is_playing());

        session.play();
        assert_eq!(session.current_time(), 0.0);
    }

    #[test]
    fn frame_steps_land_on_frame_boundaries() {
        let (mut session, _, _) = session();
        session.seek(1.01);
        session.step_frames(1, 30.0);
        assert!((session.current_time() - 31.0 / 30.0).abs() < 1e-9);
        session.step_frames(-100, 30.0);
        assert_eq!(session.current_time(), 0.0);
        session.jump_by(500.0);
        assert_eq!(session.current_time(), 30.0);
    }

    #[test]
    fn muting_updates_gain() {
        let (mut session, _, log) = session();
        session.set_muted("a", true).unwrap();
        assert_eq!(log.borrow().last(), Some(&Call::Gain("a".into(), 0.0)));
        assert!(session.set_muted("zzz", true).is_err());
    }
}
