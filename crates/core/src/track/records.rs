use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    lenient::{self, coerce},
    Clip, ItemId, TrackKind, TrackValue,
};
use crate::{
    audio::FrequencyBand,
    interpolate::{lerp, Blend, ContinuousBlendInterpolator, DiscreteHoldInterpolator},
};

/// Orbit camera placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub distance: f64,
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub height: f64,
    /// Degrees around the vertical axis.
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub rotation: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            distance: 15.0,
            height: 0.0,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CameraPosePatch {
    pub distance: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
}

impl TrackValue for CameraPose {
    const KIND: TrackKind = TrackKind::Camera;
    type Interpolator = ContinuousBlendInterpolator;
    type Patch = CameraPosePatch;

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(distance) = patch.distance {
            self.distance = distance;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        let distance = coerce(&mut self.distance, fallback.distance);
        let height = coerce(&mut self.height, fallback.height);
        let rotation = coerce(&mut self.rotation, fallback.rotation);
        distance || height || rotation
    }
}

impl Blend for CameraPose {
    fn blend(from: &Self, to: &Self, t: f64) -> Self {
        Self {
            distance: lerp(from.distance, to.distance, t),
            height: lerp(from.height, to.height, t),
            rotation: lerp(from.rotation, to.rotation, t),
        }
    }
}

/// Which animation preset drives the scene objects, and how fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetState {
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub speed: f64,
}

fn default_preset() -> String {
    "orbit".to_string()
}

impl Default for PresetState {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresetPatch {
    pub preset: Option<String>,
    pub speed: Option<f64>,
}

impl TrackValue for PresetState {
    const KIND: TrackKind = TrackKind::Preset;
    type Interpolator = DiscreteHoldInterpolator;
    type Patch = PresetPatch;

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(preset) = &patch.preset {
            self.preset = preset.clone();
        }
        if let Some(speed) = patch.speed {
            self.speed = speed;
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        coerce(&mut self.speed, fallback.speed)
    }
}

/// On-screen caption.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextState {
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextPatch {
    pub visible: Option<bool>,
    pub content: Option<String>,
}

impl TrackValue for TextState {
    const KIND: TrackKind = TrackKind::Text;
    type Interpolator = DiscreteHoldInterpolator;
    type Patch = TextPatch;

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
    }

    fn coerce_from(&mut self, _fallback: &Self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    #[default]
    None,
    Starfield,
    Fog,
    Grid,
    Nebula,
}

/// Backdrop surrounding the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    #[serde(default)]
    pub environment: EnvironmentKind,
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub intensity: f64,
    #[serde(default = "lenient::missing_rgb", deserialize_with = "lenient::rgb")]
    pub color: [f64; 3],
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self {
            environment: EnvironmentKind::None,
            intensity: 0.5,
            color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvironmentPatch {
    pub environment: Option<EnvironmentKind>,
    pub intensity: Option<f64>,
    pub color: Option<[f64; 3]>,
}

impl TrackValue for EnvironmentState {
    const KIND: TrackKind = TrackKind::Environment;
    type Interpolator = DiscreteHoldInterpolator;
    type Patch = EnvironmentPatch;

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(environment) = patch.environment {
            self.environment = environment;
        }
        if let Some(intensity) = patch.intensity {
            self.intensity = intensity;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        let mut coerced = coerce(&mut self.intensity, fallback.intensity);
        for (channel, fallback) in self.color.iter_mut().zip(fallback.color) {
            coerced |= coerce(channel, fallback);
        }
        coerced
    }
}

/// Cinematic bars. `size` is a percentage of the frame height in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterboxState {
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub size: f64,
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LetterboxPatch {
    pub size: Option<f64>,
    pub invert: Option<bool>,
}

impl TrackValue for LetterboxState {
    const KIND: TrackKind = TrackKind::Letterbox;
    type Interpolator = ContinuousBlendInterpolator;
    type Patch = LetterboxPatch;

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(size) = patch.size {
            self.size = size.clamp(0.0, 100.0);
        }
        if let Some(invert) = patch.invert {
            self.invert = invert;
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        coerce(&mut self.size, fallback.size)
    }
}

impl Blend for LetterboxState {
    // The invert flag is not numeric and holds until the next keyframe.
    fn blend(from: &Self, to: &Self, t: f64) -> Self {
        Self {
            size: lerp(from.size, to.size, t),
            invert: from.invert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFxKind {
    Shake,
    ZoomPunch,
    Roll,
}

/// Camera effect applied at a constant intensity over its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFxClip {
    #[serde(default)]
    pub id: ItemId,
    pub effect: CameraFxKind,
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub start_time: f64,
    #[serde(default = "lenient::missing", deserialize_with = "lenient::number")]
    pub end_time: f64,
    #[serde(default = "full_intensity", deserialize_with = "lenient::number")]
    pub intensity: f64,
}

fn full_intensity() -> f64 {
    1.0
}

impl CameraFxClip {
    pub fn new(effect: CameraFxKind, start_time: f64, end_time: f64, intensity: f64) -> Self {
        Self {
            id: ItemId::UNASSIGNED,
            effect,
            start_time,
            end_time,
            intensity,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CameraFxPatch {
    pub effect: Option<CameraFxKind>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub intensity: Option<f64>,
}

impl Clip for CameraFxClip {
    const KIND: TrackKind = TrackKind::CameraFx;
    type Patch = CameraFxPatch;

    fn id(&self) -> ItemId {
        self.id
    }

    fn set_id(&mut self, id: ItemId) {
        self.id = id;
    }

    fn start(&self) -> f64 {
        self.start_time
    }

    fn end(&self) -> f64 {
        self.end_time
    }

    fn set_span(&mut self, start: f64, end: f64) {
        self.start_time = start;
        self.end_time = end;
    }

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(effect) = patch.effect {
            self.effect = effect;
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(intensity) = patch.intensity {
            self.intensity = intensity.clamp(0.0, 1.0);
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        coerce(&mut self.intensity, fallback.intensity)
    }

    fn clamp_ranges(&mut self) {
        coerce(&mut self.intensity, full_intensity());
        self.intensity = self.intensity.clamp(0.0, 1.0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Fires whenever the query time is inside `[start_time, end_time)`.
    #[default]
    Manual,
    /// Fires when the monitored band rises above the threshold. Only the
    /// window length `end_time - start_time` matters: it is the effect
    /// duration. Where the window sits on the timeline is ignored, since the
    /// onset comes from the signal.
    Automated,
}

/// Scene parameters an event can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventParameter {
    BackgroundFlash,
    CameraShake,
    Vignette,
    Saturation,
    ChromaticAberration,
    ColorTint,
}

impl EventParameter {
    pub const ALL: [EventParameter; 6] = [
        EventParameter::BackgroundFlash,
        EventParameter::CameraShake,
        EventParameter::Vignette,
        EventParameter::Saturation,
        EventParameter::ChromaticAberration,
        EventParameter::ColorTint,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventParameter::BackgroundFlash => "background_flash",
            EventParameter::CameraShake => "camera_shake",
            EventParameter::Vignette => "vignette",
            EventParameter::Saturation => "saturation",
            EventParameter::ChromaticAberration => "chromatic_aberration",
            EventParameter::ColorTint => "color_tint",
        }
    }
}

/// Peak strength of one event parameter, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    // Listed first so an object is never read as a bare intensity.
    Rgb {
        #[serde(deserialize_with = "lenient::rgb")]
        color: [f64; 3],
        #[serde(deserialize_with = "lenient::number")]
        intensity: f64,
    },
    Intensity(#[serde(deserialize_with = "lenient::number")] f64),
}

impl ParameterValue {
    pub fn intensity(&self) -> f64 {
        match self {
            ParameterValue::Intensity(intensity) => *intensity,
            ParameterValue::Rgb { intensity, .. } => *intensity,
        }
    }

    pub fn color(&self) -> Option<[f64; 3]> {
        match self {
            ParameterValue::Intensity(_) => None,
            ParameterValue::Rgb { color, .. } => Some(*color),
        }
    }

    /// The same value with intensity and color channels clamped to `[0, 1]`.
    /// `NaN` passes through so validation can still coerce it.
    pub fn clamped(self) -> Self {
        match self {
            ParameterValue::Intensity(intensity) => {
                ParameterValue::Intensity(intensity.clamp(0.0, 1.0))
            }
            ParameterValue::Rgb { color, intensity } => ParameterValue::Rgb {
                color: color.map(|channel| channel.clamp(0.0, 1.0)),
                intensity: intensity.clamp(0.0, 1.0),
            },
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            ParameterValue::Intensity(intensity) => intensity.is_finite(),
            ParameterValue::Rgb { color, intensity } => {
                intensity.is_finite() && color.iter().all(|c| c.is_finite())
            }
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// A timed or signal-triggered burst of scene parameter changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParameterEventRecord")]
pub struct ParameterEvent {
    pub id: ItemId,
    pub name: String,
    pub mode: EventMode,
    pub start_time: f64,
    pub end_time: f64,
    /// Audio track whose spectrum is monitored. The active track when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_track: Option<String>,
    pub band: FrequencyBand,
    /// Band energy in `[0, 1]` that must be exceeded to fire.
    pub threshold: f64,
    pub parameters: BTreeMap<EventParameter, ParameterValue>,
}

impl ParameterEvent {
    pub fn manual(name: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id: ItemId::UNASSIGNED,
            name: name.into(),
            mode: EventMode::Manual,
            start_time,
            end_time,
            audio_track: None,
            band: FrequencyBand::Bass,
            threshold: default_threshold(),
            parameters: BTreeMap::new(),
        }
    }

    /// An automated event firing for `duration` seconds whenever `band`
    /// rises above `threshold`.
    pub fn automated(
        name: impl Into<String>,
        band: FrequencyBand,
        threshold: f64,
        duration: f64,
    ) -> Self {
        Self {
            mode: EventMode::Automated,
            band,
            threshold: threshold.clamp(0.0, 1.0),
            ..Self::manual(name, 0.0, duration)
        }
    }

    pub fn with_parameter(mut self, parameter: EventParameter, value: ParameterValue) -> Self {
        self.parameters.insert(parameter, value.clamped());
        self
    }

    pub fn with_audio_track(mut self, track: impl Into<String>) -> Self {
        self.audio_track = Some(track.into());
        self
    }
}

/// On-disk shape of a [`ParameterEvent`]. Older files describe the window
/// as `time` plus `duration`; those are converted on load.
#[derive(Deserialize)]
struct ParameterEventRecord {
    #[serde(default)]
    id: ItemId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mode: EventMode,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    start_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    end_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    time: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    duration: Option<f64>,
    audio_track: Option<String>,
    #[serde(default)]
    band: FrequencyBand,
    #[serde(default = "default_threshold", deserialize_with = "lenient::number")]
    threshold: f64,
    #[serde(default)]
    parameters: BTreeMap<EventParameter, ParameterValue>,
}

impl From<ParameterEventRecord> for ParameterEvent {
    fn from(record: ParameterEventRecord) -> Self {
        let finite = |value: Option<f64>| value.filter(|value| value.is_finite());
        let start_time = finite(record.start_time)
            .or(finite(record.time))
            .unwrap_or(0.0);
        let end_time = finite(record.end_time)
            .or_else(|| finite(record.duration).map(|duration| start_time + duration))
            .unwrap_or(start_time);
        let parameters = record
            .parameters
            .into_iter()
            .map(|(parameter, value)| (parameter, value.clamped()))
            .collect();
        Self {
            id: record.id,
            name: record.name,
            mode: record.mode,
            start_time,
            end_time,
            audio_track: record.audio_track,
            band: record.band,
            threshold: record.threshold.clamp(0.0, 1.0),
            parameters,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterEventPatch {
    pub name: Option<String>,
    pub mode: Option<EventMode>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// `Some(None)` reverts to following the active audio track.
    pub audio_track: Option<Option<String>>,
    pub band: Option<FrequencyBand>,
    pub threshold: Option<f64>,
    /// Sets (`Some`) or removes (`None`) individual parameters.
    pub parameters: Vec<(EventParameter, Option<ParameterValue>)>,
}

impl Clip for ParameterEvent {
    const KIND: TrackKind = TrackKind::ParameterEvent;
    type Patch = ParameterEventPatch;

    fn id(&self) -> ItemId {
        self.id
    }

    fn set_id(&mut self, id: ItemId) {
        self.id = id;
    }

    fn start(&self) -> f64 {
        self.start_time
    }

    fn end(&self) -> f64 {
        self.end_time
    }

    fn set_span(&mut self, start: f64, end: f64) {
        self.start_time = start;
        self.end_time = end;
    }

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
        if let Some(track) = &patch.audio_track {
            self.audio_track = track.clone();
        }
        if let Some(band) = patch.band {
            self.band = band;
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = threshold.clamp(0.0, 1.0);
        }
        for (parameter, value) in &patch.parameters {
            match value {
                Some(value) => {
                    self.parameters.insert(*parameter, value.clamped());
                }
                None => {
                    self.parameters.remove(parameter);
                }
            }
        }
    }

    fn coerce_from(&mut self, fallback: &Self) -> bool {
        let mut coerced = coerce(&mut self.threshold, fallback.threshold);
        let broken: Vec<EventParameter> = self
            .parameters
            .iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(parameter, _)| *parameter)
            .collect();
        for parameter in broken {
            coerced = true;
            match fallback.parameters.get(&parameter) {
                Some(previous) if previous.is_finite() => {
                    self.parameters.insert(parameter, *previous);
                }
                _ => {
                    self.parameters.remove(&parameter);
                }
            }
        }
        coerced
    }

    fn clamp_ranges(&mut self) {
        coerce(&mut self.threshold, default_threshold());
        self.threshold = self.threshold.clamp(0.0, 1.0);
        self.parameters.retain(|_, value| value.is_finite());
        for value in self.parameters.values_mut() {
            *value = value.clamped();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Keyframe;

    #[test]
    fn keyframe_json_is_flat() {
        let keyframe = Keyframe::new(
            2.0,
            CameraPose {
                distance: 20.0,
                height: 1.0,
                rotation: 90.0,
            },
        );
        let json = serde_json::to_value(&keyframe).unwrap();
        assert_eq!(json["time"], 2.0);
        assert_eq!(json["distance"], 20.0);
        assert!(json.get("easing").is_none());
    }

    #[test]
    fn missing_numeric_fields_load_as_nan() {
        let keyframe: Keyframe<CameraPose> =
            serde_json::from_str(r#"{"time": 1.0, "distance": "far"}"#).unwrap();
        assert!(keyframe.value.distance.is_nan());
        assert!(keyframe.value.height.is_nan());
    }

    #[test]
    fn legacy_event_shape_is_converted() {
        let event: ParameterEvent = serde_json::from_str(
            r#"{"name": "drop", "time": 4.0, "duration": 0.5,
                "parameters": {"background_flash": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(event.start_time, 4.0);
        assert_eq!(event.end_time, 4.5);
        assert_eq!(
            event.parameters.get(&EventParameter::BackgroundFlash),
            Some(&ParameterValue::Intensity(0.8))
        );
    }

    #[test]
    fn canonical_event_shape_round_trips() {
        let event = ParameterEvent::automated("kick", FrequencyBand::Bass, 0.6, 0.4)
            .with_parameter(
                EventParameter::ColorTint,
                ParameterValue::Rgb {
                    color: [1.0, 0.0, 0.5],
                    intensity: 0.7,
                },
            );
        let json = serde_json::to_string(&event).unwrap();
        let back: ParameterEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn letterbox_blend_holds_invert_flag() {
        let from = LetterboxState {
            size: 0.0,
            invert: true,
        };
        let to = LetterboxState {
            size: 10.0,
            invert: false,
        };
        let mid = LetterboxState::blend(&from, &to, 0.5);
        assert_eq!(mid.size, 5.0);
        assert!(mid.invert);
    }

    #[test]
    fn numeric_strings_load_in_clips() {
        let event: ParameterEvent = serde_json::from_str(
            r#"{"name": "kick", "start_time": "1.5", "end_time": "2", "threshold": "0.7"}"#,
        )
        .unwrap();
        assert_eq!((event.start_time, event.end_time), (1.5, 2.0));
        assert_eq!(event.threshold, 0.7);

        let legacy: ParameterEvent =
            serde_json::from_str(r#"{"time": "4", "duration": "0.5"}"#).unwrap();
        assert_eq!((legacy.start_time, legacy.end_time), (4.0, 4.5));

        let clip: CameraFxClip = serde_json::from_str(
            r#"{"effect": "roll", "start_time": "1", "end_time": 2.5, "intensity": "0.3"}"#,
        )
        .unwrap();
        assert_eq!((clip.start_time, clip.end_time, clip.intensity), (1.0, 2.5, 0.3));
    }

    #[test]
    fn loaded_events_are_clamped() {
        let event: ParameterEvent = serde_json::from_str(
            r#"{"start_time": 0, "end_time": 1, "threshold": 1.7,
                "parameters": {"vignette": 2.5,
                               "color_tint": {"color": [2, 0.5, -1], "intensity": -0.2}}}"#,
        )
        .unwrap();
        assert_eq!(event.threshold, 1.0);
        assert_eq!(
            event.parameters.get(&EventParameter::Vignette),
            Some(&ParameterValue::Intensity(1.0))
        );
        assert_eq!(
            event.parameters.get(&EventParameter::ColorTint),
            Some(&ParameterValue::Rgb {
                color: [1.0, 0.5, 0.0],
                intensity: 0.0,
            })
        );
    }

    #[test]
    fn builder_clamps_parameter_values() {
        let event = ParameterEvent::manual("flash", 0.0, 1.0)
            .with_parameter(EventParameter::BackgroundFlash, ParameterValue::Intensity(3.0));
        assert_eq!(
            event.parameters.get(&EventParameter::BackgroundFlash),
            Some(&ParameterValue::Intensity(1.0))
        );
    }

    #[test]
    fn event_patch_clamps_threshold_and_parameters() {
        let mut event = ParameterEvent::manual("flash", 0.0, 1.0);
        event.apply(&ParameterEventPatch {
            threshold: Some(-0.5),
            parameters: vec![(EventParameter::Saturation, Some(ParameterValue::Intensity(1.4)))],
            ..ParameterEventPatch::default()
        });
        assert_eq!(event.threshold, 0.0);
        assert_eq!(
            event.parameters.get(&EventParameter::Saturation),
            Some(&ParameterValue::Intensity(1.0))
        );
    }

    #[test]
    fn clamp_ranges_restores_defaults() {
        let mut event = ParameterEvent::manual("flash", 0.0, 1.0);
        event.threshold = f64::NAN;
        event
            .parameters
            .insert(EventParameter::Vignette, ParameterValue::Intensity(f64::NAN));
        event
            .parameters
            .insert(EventParameter::CameraShake, ParameterValue::Intensity(4.0));
        event.clamp_ranges();
        assert_eq!(event.threshold, 0.5);
        assert!(!event.parameters.contains_key(&EventParameter::Vignette));
        assert_eq!(
            event.parameters.get(&EventParameter::CameraShake),
            Some(&ParameterValue::Intensity(1.0))
        );

        let mut clip = CameraFxClip::new(CameraFxKind::Shake, 0.0, 1.0, f64::NAN);
        clip.clamp_ranges();
        assert_eq!(clip.intensity, 1.0);
    }

    #[test]
    fn event_patch_drops_broken_parameters() {
        let mut event = ParameterEvent::manual("flash", 0.0, 1.0)
            .with_parameter(EventParameter::Vignette, ParameterValue::Intensity(0.3));
        let before = event.clone();
        event.apply(&ParameterEventPatch {
            parameters: vec![
                (EventParameter::Vignette, Some(ParameterValue::Intensity(f64::NAN))),
                (EventParameter::Saturation, Some(ParameterValue::Intensity(f64::NAN))),
            ],
            ..ParameterEventPatch::default()
        });
        assert!(event.coerce_from(&before));
        assert_eq!(
            event.parameters.get(&EventParameter::Vignette),
            Some(&ParameterValue::Intensity(0.3))
        );
        assert!(!event.parameters.contains_key(&EventParameter::Saturation));
    }
}
