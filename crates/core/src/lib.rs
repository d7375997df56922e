//! Core library for the visualiser timeline editor.
//!
//! Keyframe and clip tracks describe how the visual scene evolves over a
//! song. The crate evaluates those tracks at any time, fires audio-reactive
//! events from band energies, keeps several audio outputs in sync with one
//! playback clock, and implements the pointer and keyboard editing model of
//! the timeline widget. Drawing is left to the embedding application.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod coords;
pub mod easing;
pub mod error;
pub mod interaction;
pub mod interpolate;
pub mod playback;
pub mod project;
pub mod resolve;
pub mod track;
pub mod trigger;

pub use analysis::{analyse_buffer, BandAnalyzer, BandFrame, BandTimeline, RecordedSignals};
pub use audio::{
    AudioTrack, AudioTrackList, BandSnapshot, FrequencyBand, FrequencySource, SignalFrame,
    Silence,
};
pub use config::{AnalysisConfig, AppConfig, PlaybackConfig, TimelineConfig};
pub use coords::{format_timecode, quantize_to_frame, snap_to_grid, Viewport, ZoomBounds};
pub use easing::{ease, EasingKind};
pub use error::{EditorError, Result};
pub use interaction::{
    DragState, HitTarget, KeyCommand, Modifiers, PointerButton, PointerPos, Selection,
    TimelineEditor,
};
pub use interpolate::interpolate;
pub use playback::{
    AudioOutput, ManualTimeBase, PlaybackClock, PlaybackSession, SystemTimeBase, TimeBase,
};
pub use project::{ItemPatch, ItemRef, Project};
pub use resolve::{CameraFxState, ParameterUpdate, ResolvedFrame, Resolver};
pub use track::{ClipTrack, ItemId, ItemSpan, Keyframe, KeyframeTrack, TrackKind};
pub use trigger::{EventEffects, EventTrigger};
