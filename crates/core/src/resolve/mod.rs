use serde::{Deserialize, Serialize};

use crate::{
    audio::{AudioTrackList, FrequencySource},
    project::Project,
    track::{
        CameraFxKind, CameraPose, EnvironmentState, EventParameter, LetterboxState, PresetState,
        TextState,
    },
    trigger::{EventEffects, EventTrigger},
};

/// Summed intensity of the camera effects active at one time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraFxState {
    pub shake: f64,
    pub zoom_punch: f64,
    pub roll: f64,
}

impl CameraFxState {
    fn add(&mut self, kind: CameraFxKind, intensity: f64) {
        match kind {
            CameraFxKind::Shake => self.shake += intensity,
            CameraFxKind::ZoomPunch => self.zoom_punch += intensity,
            CameraFxKind::Roll => self.roll += intensity,
        }
    }
}

/// Everything the scene needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFrame {
    pub time: f64,
    pub camera: CameraPose,
    pub preset: PresetState,
    pub text: TextState,
    pub environment: EnvironmentState,
    pub letterbox: LetterboxState,
    pub camera_fx: CameraFxState,
    pub effects: EventEffects,
}

impl ResolvedFrame {
    /// Flattens the numeric parts of the frame into named updates.
    pub fn parameter_updates(&self) -> Vec<ParameterUpdate> {
        let mut updates = vec![
            ParameterUpdate::new("camera.distance", self.camera.distance),
            ParameterUpdate::new("camera.height", self.camera.height),
            ParameterUpdate::new("camera.rotation", self.camera.rotation),
            ParameterUpdate::new("preset.speed", self.preset.speed),
            ParameterUpdate::new("text.visible", flag(self.text.visible)),
            ParameterUpdate::new("environment.intensity", self.environment.intensity),
            ParameterUpdate::new("environment.color.r", self.environment.color[0]),
            ParameterUpdate::new("environment.color.g", self.environment.color[1]),
            ParameterUpdate::new("environment.color.b", self.environment.color[2]),
            ParameterUpdate::new("letterbox.size", self.letterbox.size),
            ParameterUpdate::new("letterbox.invert", flag(self.letterbox.invert)),
            ParameterUpdate::new("camera_fx.shake", self.camera_fx.shake),
            ParameterUpdate::new("camera_fx.zoom_punch", self.camera_fx.zoom_punch),
            ParameterUpdate::new("camera_fx.roll", self.camera_fx.roll),
        ];
        updates.extend(EventParameter::ALL.into_iter().map(|parameter| {
            ParameterUpdate::new(
                format!("event.{}", parameter.name()),
                self.effects.get(parameter),
            )
        }));
        for (channel, value) in ["r", "g", "b"].into_iter().zip(self.effects.tint) {
            updates.push(ParameterUpdate::new(format!("event.tint.{channel}"), value));
        }
        updates
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Concrete value routed to a render or scene parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub target: String,
    pub value: f64,
}

impl ParameterUpdate {
    pub fn new(target: impl Into<String>, value: f64) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

/// Evaluates a project frame by frame. Keyframe tracks are stateless; the
/// resolver carries the event latches from one frame to the next.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    trigger: EventTrigger,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) -> &EventTrigger {
        &self.trigger
    }

    pub fn reset(&mut self) {
        self.trigger.reset();
    }

    /// Resolves every track at `time`. Only usable audio tracks feed
    /// automated events, and events without a track follow the active one.
    pub fn resolve(
        &mut self,
        project: &Project,
        audio: &AudioTrackList,
        time: f64,
        signals: &dyn FrequencySource,
    ) -> ResolvedFrame {
        let usable = audio.filter_signals(signals);
        let effects = self
            .trigger
            .evaluate(&project.events, time, &usable, audio.active_id());

        let mut camera_fx = CameraFxState::default();
        for clip in project.camera_fx.active_at(time) {
            camera_fx.add(clip.effect, clip.intensity);
        }

        ResolvedFrame {
            time,
            camera: project.camera.sample(time),
            preset: project.presets.sample(time),
            text: project.text.sample(time),
            environment: project.environment.sample(time),
            letterbox: project.letterbox.sample(time),
            camera_fx,
            effects,
        }
    }
}
