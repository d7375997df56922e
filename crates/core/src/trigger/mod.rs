//! Turns parameter events into per-frame effect intensities.
//!
//! Manual events fire while the query time is inside their window. Automated
//! events latch an onset when the monitored band rises above the threshold
//! and then decay over the event duration from that onset, whatever the
//! signal does afterwards. A new onset needs the signal to come from below
//! the threshold while no effect is running, so a signal hovering around the
//! threshold never restarts the decay.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    audio::FrequencySource,
    easing::{ease, EasingKind},
    track::{Clip, ClipTrack, EventMode, EventParameter, ItemId, ParameterEvent},
};

/// Strength of an effect `progress` of the way through its duration: `1` at
/// onset, falling along an inverted ease-out-cubic curve to `0`.
pub fn decay(progress: f64) -> f64 {
    1.0 - ease(progress, EasingKind::OutCubic)
}

/// Transient latch of one automated event. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latch {
    /// Time of the onset currently decaying, if any.
    pub active_since: Option<f64>,
    /// Whether the previous sample was above the threshold.
    pub above: bool,
}

/// An event contributing to the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiredEvent {
    pub id: ItemId,
    /// Seconds since the onset.
    pub effect_age: f64,
    /// Decay multiplier applied to the event's parameters.
    pub strength: f64,
}

/// Accumulated output of every event firing at one query time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEffects {
    /// Summed intensity per parameter.
    pub intensities: BTreeMap<EventParameter, f64>,
    /// Summed RGB tint contributed by colour-carrying parameters.
    pub tint: [f64; 3],
    pub fired: Vec<FiredEvent>,
}

impl EventEffects {
    pub fn get(&self, parameter: EventParameter) -> f64 {
        self.intensities.get(&parameter).copied().unwrap_or(0.0)
    }

    pub fn is_triggered(&self, id: ItemId) -> bool {
        self.fired.iter().any(|fired| fired.id == id)
    }

    pub fn fired(&self, id: ItemId) -> Option<&FiredEvent> {
        self.fired.iter().find(|fired| fired.id == id)
    }

    fn accumulate(&mut self, event: &ParameterEvent, strength: f64) {
        for (parameter, value) in &event.parameters {
            let intensity = value.intensity() * strength;
            *self.intensities.entry(*parameter).or_insert(0.0) += intensity;
            if let Some(color) = value.color() {
                for (channel, component) in self.tint.iter_mut().zip(color) {
                    *channel += component * intensity;
                }
            }
        }
    }
}

/// Owns the latch of every automated event.
#[derive(Debug, Clone, Default)]
pub struct EventTrigger {
    latches: HashMap<ItemId, Latch>,
}

impl EventTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latch(&self, id: ItemId) -> Option<Latch> {
        self.latches.get(&id).copied()
    }

    /// Forgets every onset, e.g. after loading another project.
    pub fn reset(&mut self) {
        self.latches.clear();
    }

    /// Evaluates every event at `time`.
    ///
    /// Automated events without an explicit audio track listen to
    /// `default_track`. Tracks the source does not report count as silent.
    pub fn evaluate(
        &mut self,
        events: &ClipTrack<ParameterEvent>,
        time: f64,
        signals: &dyn FrequencySource,
        default_track: Option<&str>,
    ) -> EventEffects {
        self.latches.retain(|id, _| {
            events
                .get(*id)
                .map_or(false, |event| event.mode == EventMode::Automated)
        });

        let mut effects = EventEffects::default();
        for event in events.clips() {
            let onset = match event.mode {
                EventMode::Manual => event.covers(time).then_some(event.start_time),
                EventMode::Automated => self.update_latch(event, time, signals, default_track),
            };
            let Some(onset) = onset else { continue };

            let duration = event.duration();
            if duration <= 0.0 {
                continue;
            }
            let effect_age = time - onset;
            let strength = decay(effect_age / duration);
            effects.accumulate(event, strength);
            effects.fired.push(FiredEvent {
                id: event.id,
                effect_age,
                strength,
            });
        }
        effects
    }

    /// Advances the latch of an automated event and returns its onset while
    /// the effect is still running.
    fn update_latch(
        &mut self,
        event: &ParameterEvent,
        time: f64,
        signals: &dyn FrequencySource,
        default_track: Option<&str>,
    ) -> Option<f64> {
        let duration = event.duration();
        let latch = self.latches.entry(event.id).or_default();

        if let Some(since) = latch.active_since {
            // Expired, or the clock jumped back before the onset.
            if time < since || time - since >= duration {
                latch.active_since = None;
            }
        }

        let energy = event
            .audio_track
            .as_deref()
            .or(default_track)
            .and_then(|track| signals.bands(track))
            .map(|bands| bands.energy(event.band));
        let above = energy.map_or(false, |energy| energy > event.threshold);

        if above && !latch.above && latch.active_since.is_none() {
            latch.active_since = Some(time);
            debug!(event = %event.id, name = %event.name, time, "automated event onset");
        }
        latch.above = above;
        latch.active_since
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{BandSnapshot, FrequencyBand, SignalFrame},
        track::ParameterValue,
    };

    fn bass(level: f64) -> SignalFrame {
        SignalFrame::default().with("music", BandSnapshot::new(level, 0.0, 0.0))
    }

    fn flash(event: ParameterEvent, intensity: f64) -> ParameterEvent {
        event.with_parameter(
            EventParameter::BackgroundFlash,
            ParameterValue::Intensity(intensity),
        )
    }

    fn automated(duration: f64) -> ParameterEvent {
        flash(
            ParameterEvent::automated("kick", FrequencyBand::Bass, 0.5, duration),
            1.0,
        )
    }

    #[test]
    fn decay_runs_from_full_to_zero() {
        assert_eq!(decay(0.0), 1.0);
        assert_eq!(decay(1.0), 0.0);
        assert!((decay(0.5) - 0.125).abs() < 1e-12);
        let mut previous = 1.0;
        for step in 1..=20 {
            let value = decay(step as f64 / 20.0);
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn manual_event_fires_inside_half_open_window() {
        let events = ClipTrack::from_clips([flash(ParameterEvent::manual("hit", 1.0, 2.0), 0.8)]);
        let mut trigger = EventTrigger::new();

        assert!(trigger.evaluate(&events, 0.99, &bass(0.0), None).fired.is_empty());
        let at_start = trigger.evaluate(&events, 1.0, &bass(0.0), None);
        assert!((at_start.get(EventParameter::BackgroundFlash) - 0.8).abs() < 1e-12);
        let later = trigger.evaluate(&events, 1.5, &bass(0.0), None);
        assert!((later.fired[0].effect_age - 0.5).abs() < 1e-12);
        assert!(trigger.evaluate(&events, 2.0, &bass(0.0), None).fired.is_empty());
    }

    #[test]
    fn latched_onset_outlives_the_signal() {
        let events = ClipTrack::from_clips([automated(0.5).with_audio_track("music")]);
        let id = events.clips()[0].id;
        let mut trigger = EventTrigger::new();

        for (time, level) in [(0.0, 0.2), (0.1, 0.6), (0.2, 0.6)] {
            trigger.evaluate(&events, time, &bass(level), None);
        }
        assert_eq!(trigger.latch(id).unwrap().active_since, Some(0.1));

        let effects = trigger.evaluate(&events, 0.3, &bass(0.3), None);
        let fired = effects.fired(id).unwrap();
        assert!((fired.effect_age - 0.2).abs() < 1e-9);
        assert!(fired.strength > 0.0 && fired.strength < 1.0);
    }

    #[test]
    fn oscillating_signal_does_not_restart_decay() {
        let events = ClipTrack::from_clips([automated(1.0)]);
        let id = events.clips()[0].id;
        let mut trigger = EventTrigger::new();

        for step in 0..10 {
            let time = step as f64 * 0.05;
            let level = if step % 2 == 0 { 0.51 } else { 0.49 };
            trigger.evaluate(&events, time, &bass(level), Some("music"));
            assert_eq!(trigger.latch(id).unwrap().active_since, Some(0.0));
        }
    }

    #[test]
    fn new_onset_requires_rising_edge_after_expiry() {
        let events = ClipTrack::from_clips([automated(0.2)]);
        let id = events.clips()[0].id;
        let mut trigger = EventTrigger::new();

        trigger.evaluate(&events, 0.0, &bass(0.9), Some("music"));
        let held = trigger.evaluate(&events, 0.3, &bass(0.9), Some("music"));
        assert!(!held.is_triggered(id));

        trigger.evaluate(&events, 0.4, &bass(0.1), Some("music"));
        let again = trigger.evaluate(&events, 0.5, &bass(0.9), Some("music"));
        assert!(again.is_triggered(id));
        assert_eq!(trigger.latch(id).unwrap().active_since, Some(0.5));
    }

    #[test]
    fn simultaneous_events_add_up() {
        let events = ClipTrack::from_clips([
            flash(ParameterEvent::automated("a", FrequencyBand::Bass, 0.5, 1.0), 0.4),
            flash(ParameterEvent::automated("b", FrequencyBand::Bass, 0.5, 1.0), 0.3),
        ]);
        let mut trigger = EventTrigger::new();
        let effects = trigger.evaluate(&events, 2.0, &bass(0.8), Some("music"));
        assert!((effects.get(EventParameter::BackgroundFlash) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn tint_accumulates_colour() {
        let events = ClipTrack::from_clips([ParameterEvent::manual("tint", 0.0, 1.0)
            .with_parameter(
                EventParameter::ColorTint,
                ParameterValue::Rgb {
                    color: [1.0, 0.5, 0.0],
                    intensity: 0.5,
                },
            )]);
        let mut trigger = EventTrigger::new();
        let effects = trigger.evaluate(&events, 0.0, &bass(0.0), None);
        assert_eq!(effects.tint, [0.5, 0.25, 0.0]);
        assert_eq!(effects.get(EventParameter::ColorTint), 0.5);
    }

    #[test]
    fn missing_signal_never_fires() {
        let events = ClipTrack::from_clips([automated(1.0).with_audio_track("other")]);
        let mut trigger = EventTrigger::new();
        let effects = trigger.evaluate(&events, 0.0, &bass(1.0), Some("music"));
        assert!(effects.fired.is_empty());
    }

    #[test]
    fn seeking_back_clears_the_onset() {
        let events = ClipTrack::from_clips([automated(1.0)]);
        let id = events.clips()[0].id;
        let mut trigger = EventTrigger::new();
        trigger.evaluate(&events, 5.0, &bass(0.9), Some("music"));
        let effects = trigger.evaluate(&events, 1.0, &bass(0.9), Some("music"));
        assert!(!effects.is_triggered(id));
    }

    #[test]
    fn deleted_events_lose_their_latch() {
        let mut events = ClipTrack::from_clips([automated(1.0)]);
        let id = events.clips()[0].id;
        let mut trigger = EventTrigger::new();
        trigger.evaluate(&events, 0.0, &bass(0.9), Some("music"));
        events.remove(id).unwrap();
        trigger.evaluate(&events, 0.1, &bass(0.9), Some("music"));
        assert!(trigger.latch(id).is_none());
    }
}
