//! Save/load unit bundling every track with the transport state.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    audio::{AudioTrack, AudioTrackList, FrequencyBand},
    easing::EasingKind,
    playback::{PlaybackSession, TimeBase},
    track::{
        CameraFxClip, CameraFxKind, CameraFxPatch, CameraPose, Clip, ClipTrack, EnvironmentKind,
        EnvironmentState, EventParameter, ItemId, ItemSpan, Keyframe, KeyframePatch,
        KeyframeTrack, LetterboxState, ParameterEvent, ParameterEventPatch, ParameterValue,
        PresetState, TextState, TrackKind, TrackValue,
    },
    EditorError, Result,
};

/// Addresses one keyframe or clip across all tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: TrackKind,
    pub id: ItemId,
}

impl ItemRef {
    pub fn new(kind: TrackKind, id: ItemId) -> Self {
        Self { kind, id }
    }
}

/// Field-wise update addressed to one track.
#[derive(Debug, Clone)]
pub enum ItemPatch {
    Camera(KeyframePatch<CameraPose>),
    Preset(KeyframePatch<PresetState>),
    Text(KeyframePatch<TextState>),
    Environment(KeyframePatch<EnvironmentState>),
    Letterbox(KeyframePatch<LetterboxState>),
    Event(ParameterEventPatch),
    CameraFx(CameraFxPatch),
}

impl ItemPatch {
    pub fn kind(&self) -> TrackKind {
        match self {
            ItemPatch::Camera(_) => TrackKind::Camera,
            ItemPatch::Preset(_) => TrackKind::Preset,
            ItemPatch::Text(_) => TrackKind::Text,
            ItemPatch::Environment(_) => TrackKind::Environment,
            ItemPatch::Letterbox(_) => TrackKind::Letterbox,
            ItemPatch::Event(_) => TrackKind::ParameterEvent,
            ItemPatch::CameraFx(_) => TrackKind::CameraFx,
        }
    }
}

/// Every track of an edit plus the transport state restored on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub camera: KeyframeTrack<CameraPose>,
    pub presets: KeyframeTrack<PresetState>,
    pub text: KeyframeTrack<TextState>,
    pub environment: KeyframeTrack<EnvironmentState>,
    pub letterbox: KeyframeTrack<LetterboxState>,
    pub events: ClipTrack<ParameterEvent>,
    pub camera_fx: ClipTrack<CameraFxClip>,
    pub audio_tracks: AudioTrackList,
    pub pause_offset: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_audio_track: Option<String>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and re-validates a project.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut project: Project = serde_json::from_str(text)?;
        project.validate();
        Ok(project)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "project saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let project = Self::from_json(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), "project loaded");
        Ok(project)
    }

    /// Re-establishes every track invariant and the single active audio track.
    pub fn validate(&mut self) {
        self.camera.validate();
        self.presets.validate();
        self.text.validate();
        self.environment.validate();
        self.letterbox.validate();
        self.events.validate();
        self.camera_fx.validate();
        self.audio_tracks.validate();

        if !self.pause_offset.is_finite() || self.pause_offset < 0.0 {
            self.pause_offset = 0.0;
        }
        if let Some(id) = self.active_audio_track.clone() {
            if let Err(err) = self.audio_tracks.set_active(&id) {
                warn!(%err, "ignoring saved active audio track");
            }
        }
        self.active_audio_track = self.audio_tracks.active_id().map(str::to_string);
    }

    /// Copies the transport and audio state of `session` for saving.
    pub fn capture(&mut self, session: &PlaybackSession) {
        self.audio_tracks = session.tracks().clone();
        self.pause_offset = session.current_time();
        self.active_audio_track = session.tracks().active_id().map(str::to_string);
    }

    /// Builds a paused session over the saved audio tracks, with the saved
    /// active track selected and the playhead back at `pause_offset`.
    pub fn restore(
        &self,
        time_base: Box<dyn TimeBase>,
        fallback_duration: f64,
    ) -> PlaybackSession {
        let mut session =
            PlaybackSession::new(self.audio_tracks.clone(), time_base, fallback_duration);
        if let Some(id) = &self.active_audio_track {
            if let Err(err) = session.set_active_track(id) {
                warn!(%err, "saved active audio track not restored");
            }
        }
        session.seek(self.pause_offset);
        info!(time = session.current_time(), "playback state restored");
        session
    }

    pub fn set_min_clip_duration(&mut self, min_duration: f64) {
        self.events.set_min_duration(min_duration);
        self.camera_fx.set_min_duration(min_duration);
    }

    pub fn min_clip_duration(&self) -> f64 {
        self.events.min_duration()
    }

    /// Positions of every item on one track.
    pub fn spans(&self, kind: TrackKind) -> Vec<(ItemId, ItemSpan)> {
        match kind {
            TrackKind::Camera => keyframe_spans(&self.camera),
            TrackKind::Preset => keyframe_spans(&self.presets),
            TrackKind::Text => keyframe_spans(&self.text),
            TrackKind::Environment => keyframe_spans(&self.environment),
            TrackKind::Letterbox => keyframe_spans(&self.letterbox),
            TrackKind::ParameterEvent => clip_spans(&self.events),
            TrackKind::CameraFx => clip_spans(&self.camera_fx),
        }
    }

    pub fn span_of(&self, item: ItemRef) -> Option<ItemSpan> {
        self.spans(item.kind)
            .into_iter()
            .find(|(id, _)| *id == item.id)
            .map(|(_, span)| span)
    }

    pub fn items(&self) -> Vec<ItemRef> {
        TrackKind::ALL
            .into_iter()
            .flat_map(|kind| {
                self.spans(kind)
                    .into_iter()
                    .map(move |(id, _)| ItemRef::new(kind, id))
            })
            .collect()
    }

    /// Last instant covered by any item.
    pub fn end_time(&self) -> f64 {
        TrackKind::ALL
            .into_iter()
            .flat_map(|kind| self.spans(kind))
            .map(|(_, span)| span.last())
            .fold(0.0, f64::max)
    }

    /// Single entry point for field edits. The target track re-validates its
    /// invariants afterwards.
    pub fn apply_patch(&mut self, id: ItemId, patch: &ItemPatch) -> Result<()> {
        match patch {
            ItemPatch::Camera(patch) => self.camera.apply_patch(id, patch),
            ItemPatch::Preset(patch) => self.presets.apply_patch(id, patch),
            ItemPatch::Text(patch) => self.text.apply_patch(id, patch),
            ItemPatch::Environment(patch) => self.environment.apply_patch(id, patch),
            ItemPatch::Letterbox(patch) => self.letterbox.apply_patch(id, patch),
            ItemPatch::Event(patch) => self.events.apply_patch(id, patch),
            ItemPatch::CameraFx(patch) => self.camera_fx.apply_patch(id, patch),
        }
    }

    /// Whether moving keyframes to the given spans would land one of them on
    /// a keyframe outside the move.
    pub fn collides(&self, moves: &[(ItemRef, ItemSpan)]) -> bool {
        TrackKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_clip())
            .any(|kind| {
                let retimes = retimes_for(kind, moves);
                !retimes.is_empty()
                    && match kind {
                        TrackKind::Camera => self.camera.collides(&retimes),
                        TrackKind::Preset => self.presets.collides(&retimes),
                        TrackKind::Text => self.text.collides(&retimes),
                        TrackKind::Environment => self.environment.collides(&retimes),
                        TrackKind::Letterbox => self.letterbox.collides(&retimes),
                        TrackKind::ParameterEvent | TrackKind::CameraFx => false,
                    }
            })
    }

    /// Moves a group of items in one step. Keyframes on the same track move
    /// together so group members never replace each other.
    pub fn move_items(&mut self, moves: &[(ItemRef, ItemSpan)]) -> Result<()> {
        for kind in TrackKind::ALL {
            if kind.is_clip() {
                for (item, span) in moves.iter().filter(|(item, _)| item.kind == kind) {
                    self.set_span(*item, span.start, span.last())?;
                }
                continue;
            }
            let retimes = retimes_for(kind, moves);
            if retimes.is_empty() {
                continue;
            }
            match kind {
                TrackKind::Camera => self.camera.retime(&retimes)?,
                TrackKind::Preset => self.presets.retime(&retimes)?,
                TrackKind::Text => self.text.retime(&retimes)?,
                TrackKind::Environment => self.environment.retime(&retimes)?,
                TrackKind::Letterbox => self.letterbox.retime(&retimes)?,
                TrackKind::ParameterEvent | TrackKind::CameraFx => {}
            }
        }
        Ok(())
    }

    /// Moves or resizes one item. Keyframes only use `start`.
    pub fn set_span(&mut self, item: ItemRef, start: f64, end: f64) -> Result<()> {
        let retime = [(item.id, start)];
        match item.kind {
            TrackKind::Camera => self.camera.retime(&retime),
            TrackKind::Preset => self.presets.retime(&retime),
            TrackKind::Text => self.text.retime(&retime),
            TrackKind::Environment => self.environment.retime(&retime),
            TrackKind::Letterbox => self.letterbox.retime(&retime),
            TrackKind::ParameterEvent => self.events.set_span(item.id, start, end),
            TrackKind::CameraFx => self.camera_fx.set_span(item.id, start, end),
        }
    }

    pub fn remove_item(&mut self, item: ItemRef) -> Result<()> {
        match item.kind {
            TrackKind::Camera => self.camera.remove(item.id).map(drop),
            TrackKind::Preset => self.presets.remove(item.id).map(drop),
            TrackKind::Text => self.text.remove(item.id).map(drop),
            TrackKind::Environment => self.environment.remove(item.id).map(drop),
            TrackKind::Letterbox => self.letterbox.remove(item.id).map(drop),
            TrackKind::ParameterEvent => self.events.remove(item.id).map(drop),
            TrackKind::CameraFx => self.camera_fx.remove(item.id).map(drop),
        }
    }

    /// Copies an item `offset` seconds later and returns the copy.
    pub fn duplicate_item(&mut self, item: ItemRef, offset: f64) -> Result<ItemRef> {
        let span = self.span_of(item).ok_or(EditorError::UnknownItem {
            kind: item.kind,
            id: item.id,
        })?;
        let at = span.start + offset;
        let id = match item.kind {
            TrackKind::Camera => self.camera.duplicate(item.id, at)?,
            TrackKind::Preset => self.presets.duplicate(item.id, at)?,
            TrackKind::Text => self.text.duplicate(item.id, at)?,
            TrackKind::Environment => self.environment.duplicate(item.id, at)?,
            TrackKind::Letterbox => self.letterbox.duplicate(item.id, at)?,
            TrackKind::ParameterEvent => self.events.duplicate(item.id, at)?,
            TrackKind::CameraFx => self.camera_fx.duplicate(item.id, at)?,
        };
        Ok(ItemRef::new(item.kind, id))
    }

    /// A small project exercising every track kind.
    pub fn demo() -> Self {
        let mut project = Project::new();

        project.camera.insert(Keyframe::new(0.0, CameraPose::default()));
        project.camera.insert(
            Keyframe::new(
                8.0,
                CameraPose {
                    distance: 25.0,
                    height: 4.0,
                    rotation: 180.0,
                },
            )
            .with_easing(EasingKind::InOutSine),
        );
        project.camera.insert(Keyframe::new(
            16.0,
            CameraPose {
                distance: 12.0,
                height: -2.0,
                rotation: 360.0,
            },
        ));

        project.presets.insert(Keyframe::new(0.0, PresetState::default()));
        project.presets.insert(Keyframe::new(
            8.0,
            PresetState {
                preset: "spiral".to_string(),
                speed: 2.0,
            },
        ));

        project.text.insert(Keyframe::new(
            1.0,
            TextState {
                visible: true,
                content: "intro".to_string(),
            },
        ));
        project.text.insert(Keyframe::new(4.0, TextState::default()));

        project.environment.insert(Keyframe::new(
            0.0,
            EnvironmentState {
                environment: EnvironmentKind::Starfield,
                intensity: 0.6,
                color: [0.8, 0.9, 1.0],
            },
        ));

        project
            .letterbox
            .insert(Keyframe::new(0.0, LetterboxState::default()));
        project.letterbox.insert(
            Keyframe::new(
                2.0,
                LetterboxState {
                    size: 12.0,
                    invert: false,
                },
            )
            .with_easing(EasingKind::OutCubic),
        );

        project.events.insert(
            ParameterEvent::manual("drop flash", 8.0, 8.5)
                .with_parameter(EventParameter::BackgroundFlash, ParameterValue::Intensity(0.9)),
        );
        project.events.insert(
            ParameterEvent::automated("kick", FrequencyBand::Bass, 0.6, 0.4)
                .with_parameter(EventParameter::CameraShake, ParameterValue::Intensity(0.5))
                .with_parameter(
                    EventParameter::ColorTint,
                    ParameterValue::Rgb {
                        color: [1.0, 0.2, 0.4],
                        intensity: 0.6,
                    },
                ),
        );

        project
            .camera_fx
            .insert(CameraFxClip::new(CameraFxKind::ZoomPunch, 8.0, 9.0, 0.7));

        if let Err(err) = project.audio_tracks.add(AudioTrack::new("music", 20.0)) {
            warn!(%err, "demo audio track not added");
        }
        project.active_audio_track = project.audio_tracks.active_id().map(str::to_string);
        project
    }
}

fn keyframe_spans<V: TrackValue>(track: &KeyframeTrack<V>) -> Vec<(ItemId, ItemSpan)> {
    track
        .keyframes()
        .iter()
        .map(|keyframe| (keyframe.id, ItemSpan::point(keyframe.time)))
        .collect()
}

fn clip_spans<C: Clip>(track: &ClipTrack<C>) -> Vec<(ItemId, ItemSpan)> {
    track
        .clips()
        .iter()
        .map(|clip| (clip.id(), clip.span()))
        .collect()
}

fn retimes_for(kind: TrackKind, moves: &[(ItemRef, ItemSpan)]) -> Vec<(ItemId, f64)> {
    moves
        .iter()
        .filter(|(item, _)| item.kind == kind)
        .map(|(item, span)| (item.id, span.start))
        .collect()
}
