//! Stateless evaluation of a keyframe track at an arbitrary time.
//!
//! Each track kind picks one of two strategies through
//! [`TrackValue::Interpolator`]: [`ContinuousBlendInterpolator`] blends the
//! numeric fields of neighbouring keyframes, [`DiscreteHoldInterpolator`]
//! holds the earlier keyframe until the later one is reached.

use crate::{
    easing::{ease, EasingKind},
    track::{sanitize_time, Keyframe, TrackValue},
};

/// Derives the value between two keyframes at eased progress `t`.
pub trait Interpolator<V> {
    fn interpolate(from: &V, to: &V, t: f64) -> V;
}

/// Values whose fields can be blended.
pub trait Blend {
    fn blend(from: &Self, to: &Self, t: f64) -> Self;
}

/// Returns `from` until the next keyframe is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscreteHoldInterpolator;

impl<V: Clone> Interpolator<V> for DiscreteHoldInterpolator {
    fn interpolate(from: &V, _to: &V, _t: f64) -> V {
        from.clone()
    }
}

/// Blends every numeric field with the eased progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousBlendInterpolator;

impl<V: Blend> Interpolator<V> for ContinuousBlendInterpolator {
    fn interpolate(from: &V, to: &V, t: f64) -> V {
        V::blend(from, to, t)
    }
}

/// Linear blend that reproduces `from` at `t == 0` and `to` at `t == 1`
/// exactly.
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

/// Evaluates `keyframes` at `time`.
///
/// The slice may be unsorted and may contain malformed values: a sorted,
/// sanitised view is built on every call. Before the first keyframe and after
/// the last one the boundary value is returned unchanged. An empty slice
/// yields `V::default()`.
pub fn interpolate<V: TrackValue>(keyframes: &[Keyframe<V>], time: f64) -> V {
    let view = sorted_view(keyframes);
    let (first, last) = match (view.first(), view.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return V::default(),
    };

    let time = if time.is_nan() { 0.0 } else { time };
    if time <= first.time {
        return first.value.clone();
    }
    if time >= last.time {
        return last.value.clone();
    }

    // Number of keyframes at or before `time`; at least one, fewer than all.
    let next_index = view.partition_point(|entry| entry.time <= time);
    let prev = &view[next_index - 1];
    let next = &view[next_index];

    if time == prev.time {
        return prev.value.clone();
    }
    let span = next.time - prev.time;
    if span <= 0.0 {
        return next.value.clone();
    }

    let progress = (time - prev.time) / span;
    let eased = ease(progress, prev.easing.unwrap_or(EasingKind::Linear));
    <V::Interpolator as Interpolator<V>>::interpolate(&prev.value, &next.value, eased)
}

struct ViewEntry<V> {
    time: f64,
    easing: Option<EasingKind>,
    value: V,
}

/// Time-sorted copy of the keyframes with non-finite fields replaced by the
/// last finite value seen earlier on the track.
fn sorted_view<V: TrackValue>(keyframes: &[Keyframe<V>]) -> Vec<ViewEntry<V>> {
    let mut ordered: Vec<&Keyframe<V>> = keyframes.iter().collect();
    ordered.sort_by(|a, b| sanitize_time(a.time).total_cmp(&sanitize_time(b.time)));

    let mut last_good = V::default();
    ordered
        .into_iter()
        .map(|keyframe| {
            let mut value = keyframe.value.clone();
            value.coerce_from(&last_good);
            last_good = value.clone();
            ViewEntry {
                time: sanitize_time(keyframe.time),
                easing: keyframe.easing,
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{CameraPose, KeyframeTrack, LetterboxState, PresetState, TextState};

    fn camera(time: f64, distance: f64) -> Keyframe<CameraPose> {
        Keyframe::new(
            time,
            CameraPose {
                distance,
                ..CameraPose::default()
            },
        )
    }

    fn preset(time: f64, name: &str, speed: f64) -> Keyframe<PresetState> {
        Keyframe::new(
            time,
            PresetState {
                preset: name.to_string(),
                speed,
            },
        )
    }

    #[test]
    fn linear_midpoint() {
        let keyframes = vec![
            camera(0.0, 15.0),
            camera(20.0, 25.0).with_easing(EasingKind::Linear),
        ];
        let value = interpolate(&keyframes, 10.0);
        assert!((value.distance - 20.0).abs() < 1e-12);
    }

    #[test]
    fn exact_keyframe_times_return_keyframe_values() {
        let keyframes = vec![
            camera(0.0, 15.0).with_easing(EasingKind::OutElastic),
            camera(1.3, 21.7).with_easing(EasingKind::InOutBack),
            camera(2.9, 3.1).with_easing(EasingKind::InBounce),
            camera(4.0, 8.0),
        ];
        for keyframe in &keyframes {
            let value = interpolate(&keyframes, keyframe.time);
            assert_eq!(value.distance, keyframe.value.distance);
        }
    }

    #[test]
    fn no_extrapolation_outside_range() {
        let keyframes = vec![camera(2.0, 10.0), camera(4.0, 30.0)];
        assert_eq!(interpolate(&keyframes, -5.0).distance, 10.0);
        assert_eq!(interpolate(&keyframes, 1.0).distance, 10.0);
        assert_eq!(interpolate(&keyframes, 4.5).distance, 30.0);
        assert_eq!(interpolate(&keyframes, 1e9).distance, 30.0);
    }

    #[test]
    fn unsorted_input_is_sorted_before_use() {
        let keyframes = vec![camera(20.0, 25.0), camera(0.0, 15.0)];
        assert!((interpolate(&keyframes, 10.0).distance - 20.0).abs() < 1e-12);
    }

    #[test]
    fn empty_track_yields_default() {
        let keyframes: Vec<Keyframe<CameraPose>> = Vec::new();
        assert_eq!(interpolate(&keyframes, 3.0), CameraPose::default());
    }

    #[test]
    fn easing_of_previous_keyframe_shapes_segment() {
        let keyframes = vec![
            camera(0.0, 0.0).with_easing(EasingKind::InQuad),
            camera(10.0, 100.0),
        ];
        assert!((interpolate(&keyframes, 5.0).distance - 25.0).abs() < 1e-9);
    }

    #[test]
    fn discrete_fields_hold_then_snap() {
        let keyframes = vec![preset(0.0, "orbit", 1.0), preset(10.0, "spiral", 3.0)];
        let held = interpolate(&keyframes, 9.999);
        assert_eq!(held.preset, "orbit");
        assert_eq!(held.speed, 1.0);

        let snapped = interpolate(&keyframes, 10.0);
        assert_eq!(snapped.preset, "spiral");
        assert_eq!(snapped.speed, 3.0);
    }

    #[test]
    fn text_track_holds_content() {
        let keyframes = vec![
            Keyframe::new(
                1.0,
                TextState {
                    visible: true,
                    content: "hello".into(),
                },
            ),
            Keyframe::new(3.0, TextState::default()),
        ];
        let value = interpolate(&keyframes, 2.5);
        assert!(value.visible);
        assert_eq!(value.content, "hello");
        assert!(!interpolate(&keyframes, 3.0).visible);
    }

    #[test]
    fn letterbox_blends_size_only() {
        let keyframes = vec![
            Keyframe::new(
                0.0,
                LetterboxState {
                    size: 0.0,
                    invert: false,
                },
            ),
            Keyframe::new(
                2.0,
                LetterboxState {
                    size: 20.0,
                    invert: true,
                },
            ),
        ];
        let value = interpolate(&keyframes, 1.0);
        assert_eq!(value.size, 10.0);
        assert!(!value.invert);
    }

    #[test]
    fn nan_fields_fall_back_to_last_good_value() {
        let keyframes = vec![camera(0.0, 10.0), camera(2.0, f64::NAN), camera(4.0, 30.0)];
        let value = interpolate(&keyframes, 1.0);
        assert_eq!(value.distance, 10.0);
        let value = interpolate(&keyframes, 3.0);
        assert!((value.distance - 20.0).abs() < 1e-12);
        assert!(value.height.is_finite());
    }

    #[test]
    fn identical_times_snap_to_later_keyframe() {
        let keyframes = vec![camera(0.0, 0.0), camera(2.0, 5.0), camera(2.0, 9.0), camera(4.0, 1.0)];
        assert_eq!(interpolate(&keyframes, 2.0).distance, 9.0);
        let value = interpolate(&keyframes, 1.0);
        assert!(value.distance.is_finite());
    }

    #[test]
    fn track_sample_matches_free_function() {
        let track = KeyframeTrack::from_keyframes([camera(0.0, 15.0), camera(20.0, 25.0)]);
        assert_eq!(track.sample(10.0), interpolate(track.keyframes(), 10.0));
    }
}
