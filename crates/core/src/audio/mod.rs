use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EditorError, Result};

/// Coarse spectral region reported by the analysis collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBand {
    #[default]
    Bass,
    Mid,
    High,
}

/// Per-frame band energies of one audio track, each normalised to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandSnapshot {
    pub bass: f64,
    pub mid: f64,
    pub high: f64,
}

impl BandSnapshot {
    pub fn new(bass: f64, mid: f64, high: f64) -> Self {
        Self { bass, mid, high }
    }

    pub fn energy(&self, band: FrequencyBand) -> f64 {
        match band {
            FrequencyBand::Bass => self.bass,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::High => self.high,
        }
    }
}

/// Supplies this frame's band energies per audio track.
pub trait FrequencySource {
    /// Energies for `track_id`, or `None` when the track produces no signal.
    fn bands(&self, track_id: &str) -> Option<BandSnapshot>;
}

/// Source that never reports a signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl FrequencySource for Silence {
    fn bands(&self, _track_id: &str) -> Option<BandSnapshot> {
        None
    }
}

/// A single frame of snapshots keyed by audio track id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalFrame {
    pub bands: BTreeMap<String, BandSnapshot>,
}

impl SignalFrame {
    pub fn with(mut self, track_id: impl Into<String>, bands: BandSnapshot) -> Self {
        self.bands.insert(track_id.into(), bands);
        self
    }
}

impl FrequencySource for SignalFrame {
    fn bands(&self, track_id: &str) -> Option<BandSnapshot> {
        self.bands.get(track_id).copied()
    }
}

fn usable_default() -> bool {
    true
}

/// A loaded audio file on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Where the decoded buffer came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "full_volume")]
    pub volume: f64,
    /// Cleared when decoding fails. Never persisted.
    #[serde(skip, default = "usable_default")]
    pub usable: bool,
}

fn full_volume() -> f64 {
    1.0
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, duration_seconds: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source: None,
            duration_seconds,
            active: false,
            muted: false,
            volume: 1.0,
            usable: true,
        }
    }

    /// Gain actually sent to the output.
    pub fn gain(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

/// The loaded audio tracks. At most one is active at a time, and only
/// usable tracks can be active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioTrackList {
    tracks: Vec<AudioTrack>,
}

impl AudioTrackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: impl IntoIterator<Item = AudioTrack>) -> Self {
        let mut list = Self {
            tracks: tracks.into_iter().collect(),
        };
        list.validate();
        list
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn get(&self, id: &str) -> Option<&AudioTrack> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn is_usable(&self, id: &str) -> bool {
        self.get(id).map(|track| track.usable).unwrap_or(false)
    }

    pub fn usable(&self) -> impl Iterator<Item = &AudioTrack> + '_ {
        self.tracks.iter().filter(|track| track.usable)
    }

    pub fn active(&self) -> Option<&AudioTrack> {
        self.tracks.iter().find(|track| track.active)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|track| track.id.as_str())
    }

    /// Longest usable track, or zero without any.
    pub fn duration(&self) -> f64 {
        self.usable()
            .map(|track| track.duration_seconds)
            .fold(0.0, f64::max)
    }

    /// Adds a track. The first usable track added becomes active.
    pub fn add(&mut self, mut track: AudioTrack) -> Result<()> {
        if self.get(&track.id).is_some() {
            return Err(EditorError::msg(format!(
                "audio track `{}` already exists",
                track.id
            )));
        }
        track.active = track.usable && self.active().is_none();
        self.tracks.push(track);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<AudioTrack> {
        let index = self.index_of(id)?;
        let removed = self.tracks.remove(index);
        if removed.active {
            self.activate_next_usable(index);
        }
        Ok(removed)
    }

    /// Makes `id` the only active track.
    pub fn set_active(&mut self, id: &str) -> Result<()> {
        let index = self.index_of(id)?;
        if !self.tracks[index].usable {
            return Err(EditorError::AudioTrackUnusable(id.to_string()));
        }
        for (position, track) in self.tracks.iter_mut().enumerate() {
            track.active = position == index;
        }
        debug!(track = id, "audio track activated");
        Ok(())
    }

    /// Activates the next usable track after the current one, wrapping
    /// around. Returns the new active id.
    pub fn cycle_active(&mut self) -> Option<&str> {
        let start = self
            .tracks
            .iter()
            .position(|track| track.active)
            .map(|index| index + 1)
            .unwrap_or(0);
        self.activate_next_usable(start);
        self.active_id()
    }

    /// Marks a track whose audio failed to decode. It is deactivated and the
    /// next usable track takes over.
    pub fn mark_unusable(&mut self, id: &str) -> Result<()> {
        let index = self.index_of(id)?;
        let track = &mut self.tracks[index];
        track.usable = false;
        let was_active = std::mem::replace(&mut track.active, false);
        warn!(track = id, "audio track marked unusable");
        if was_active {
            self.activate_next_usable(index + 1);
        }
        Ok(())
    }

    pub fn set_muted(&mut self, id: &str, muted: bool) -> Result<()> {
        let index = self.index_of(id)?;
        self.tracks[index].muted = muted;
        Ok(())
    }

    /// Sets the volume, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&mut self, id: &str, volume: f64) -> Result<()> {
        let index = self.index_of(id)?;
        if volume.is_finite() {
            self.tracks[index].volume = volume.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Restores the single-active invariant after a load.
    pub fn validate(&mut self) {
        let mut seen_active = false;
        for track in &mut self.tracks {
            if !track.volume.is_finite() {
                track.volume = 1.0;
            }
            track.volume = track.volume.clamp(0.0, 1.0);
            if !track.duration_seconds.is_finite() || track.duration_seconds < 0.0 {
                track.duration_seconds = 0.0;
            }
            if track.active && (seen_active || !track.usable) {
                track.active = false;
            }
            seen_active |= track.active;
        }
    }

    /// Wraps `source` so that unusable tracks never report a signal.
    pub fn filter_signals<'a>(&'a self, source: &'a dyn FrequencySource) -> UsableSignals<'a> {
        UsableSignals {
            tracks: self,
            source,
        }
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.tracks
            .iter()
            .position(|track| track.id == id)
            .ok_or_else(|| EditorError::UnknownAudioTrack(id.to_string()))
    }

    fn activate_next_usable(&mut self, start: usize) {
        let len = self.tracks.len();
        for track in &mut self.tracks {
            track.active = false;
        }
        if let Some(index) = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|index| self.tracks[*index].usable)
        {
            self.tracks[index].active = true;
            debug!(track = %self.tracks[index].id, "audio track activated");
        }
    }
}

/// [`FrequencySource`] that hides unusable tracks.
pub struct UsableSignals<'a> {
    tracks: &'a AudioTrackList,
    source: &'a dyn FrequencySource,
}

impl FrequencySource for UsableSignals<'_> {
    fn bands(&self, track_id: &str) -> Option<BandSnapshot> {
        if self.tracks.is_usable(track_id) {
            self.source.bands(track_id)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for UsableSignals<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsableSignals")
            .field("tracks", &self.tracks.tracks.len())
            .finish()
    }
}
