//! Time-indexed tracks and the invariants they maintain.
//!
//! Two shapes of track exist. [`KeyframeTrack`] holds point-in-time records
//! whose values are interpolated between neighbours; no two keyframes on one
//! track share a time, and an insert or edit that lands on an occupied time
//! replaces the occupant. [`ClipTrack`] holds records spanning
//! `[start, end)` that may overlap freely but never shrink below the track's
//! minimum duration.
//!
//! Every mutation goes through a method on the track so the invariants are
//! re-established in one place. `keyframes_mut` is the one escape hatch and
//! readers never rely on its order.

pub(crate) mod lenient;
mod records;

pub use records::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    easing::EasingKind,
    interpolate::{self, Interpolator},
    EditorError, Result,
};

/// Clips never get shorter than this unless configured otherwise.
pub const DEFAULT_MIN_CLIP_DURATION: f64 = 0.1;

/// Identifier of a keyframe or clip, unique within its track.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Placeholder carried by records that have not been inserted yet.
    pub const UNASSIGNED: ItemId = ItemId(0);
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Camera,
    Preset,
    Text,
    Environment,
    Letterbox,
    ParameterEvent,
    CameraFx,
}

impl TrackKind {
    pub const ALL: [TrackKind; 7] = [
        TrackKind::Camera,
        TrackKind::Preset,
        TrackKind::Text,
        TrackKind::Environment,
        TrackKind::Letterbox,
        TrackKind::ParameterEvent,
        TrackKind::CameraFx,
    ];

    /// Whether items on this track span a range rather than a single instant.
    pub fn is_clip(self) -> bool {
        matches!(self, TrackKind::ParameterEvent | TrackKind::CameraFx)
    }

    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Camera => "camera",
            TrackKind::Preset => "preset",
            TrackKind::Text => "text",
            TrackKind::Environment => "environment",
            TrackKind::Letterbox => "letterbox",
            TrackKind::ParameterEvent => "parameter event",
            TrackKind::CameraFx => "camera fx",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where an item sits on the timeline. Keyframes have no end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSpan {
    pub start: f64,
    pub end: Option<f64>,
}

impl ItemSpan {
    pub fn point(time: f64) -> Self {
        Self {
            start: time,
            end: None,
        }
    }

    pub fn range(start: f64, end: f64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn shifted(self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end.map(|end| end + delta),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end.map(|end| end - self.start).unwrap_or(0.0)
    }

    /// The last instant covered by the item.
    pub fn last(&self) -> f64 {
        self.end.unwrap_or(self.start)
    }
}

/// Coerces a keyframe time to a finite, non-negative value.
pub(crate) fn sanitize_time(time: f64) -> f64 {
    if time.is_finite() {
        time.max(0.0)
    } else {
        0.0
    }
}

/// Track-specific payload of a keyframe.
pub trait TrackValue: Clone + Default + fmt::Debug {
    const KIND: TrackKind;
    /// Strategy used to derive values between two keyframes.
    type Interpolator: Interpolator<Self>;
    /// Per-field update message.
    type Patch: Clone + Default + fmt::Debug;

    fn apply(&mut self, patch: &Self::Patch);

    /// Replaces every non-finite numeric field with the matching field of
    /// `fallback`. Returns whether anything was replaced.
    fn coerce_from(&mut self, fallback: &Self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<V> {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default, deserialize_with = "lenient::number")]
    pub time: f64,
    /// Curve applied from this keyframe to the next one. Linear when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<EasingKind>,
    #[serde(flatten)]
    pub value: V,
}

impl<V: TrackValue> Keyframe<V> {
    pub fn new(time: f64, value: V) -> Self {
        Self {
            id: ItemId::UNASSIGNED,
            time,
            easing: None,
            value,
        }
    }

    pub fn with_easing(mut self, easing: EasingKind) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// Field-wise update of one keyframe. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct KeyframePatch<V: TrackValue> {
    pub time: Option<f64>,
    /// `Some(None)` clears the easing back to linear.
    pub easing: Option<Option<EasingKind>>,
    pub value: V::Patch,
}

impl<V: TrackValue> KeyframePatch<V> {
    pub fn time(time: f64) -> Self {
        Self {
            time: Some(time),
            easing: None,
            value: V::Patch::default(),
        }
    }

    pub fn value(value: V::Patch) -> Self {
        Self {
            time: None,
            easing: None,
            value,
        }
    }
}

/// Ordered keyframes of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize",
    deserialize = "V: Deserialize<'de>"
))]
pub struct KeyframeTrack<V> {
    keyframes: Vec<Keyframe<V>>,
    #[serde(skip)]
    next_id: u64,
}

impl<V> Default for KeyframeTrack<V> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            next_id: 1,
        }
    }
}

impl<V: TrackValue> KeyframeTrack<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a track by inserting each keyframe in turn.
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe<V>>) -> Self {
        let mut track = Self::new();
        for keyframe in keyframes {
            track.insert(keyframe);
        }
        track
    }

    pub fn kind(&self) -> TrackKind {
        V::KIND
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn keyframes(&self) -> &[Keyframe<V>] {
        &self.keyframes
    }

    /// Raw access to the stored keyframes. Nothing is re-validated until the
    /// next call to [`KeyframeTrack::validate`]; interpolation copes with any
    /// order or malformed values on its own.
    pub fn keyframes_mut(&mut self) -> &mut Vec<Keyframe<V>> {
        &mut self.keyframes
    }

    pub fn get(&self, id: ItemId) -> Option<&Keyframe<V>> {
        self.keyframes.iter().find(|keyframe| keyframe.id == id)
    }

    /// Value of the track at `time`.
    pub fn sample(&self, time: f64) -> V {
        interpolate::interpolate(&self.keyframes, time)
    }

    /// Inserts a keyframe and returns its id. A keyframe already sitting at the
    /// same time is replaced.
    pub fn insert(&mut self, mut keyframe: Keyframe<V>) -> ItemId {
        keyframe.time = sanitize_time(keyframe.time);
        let fallback = self.value_before(keyframe.time);
        if keyframe.value.coerce_from(&fallback) {
            warn!(kind = %V::KIND, time = keyframe.time, "coerced malformed keyframe fields");
        }
        let id = self.allocate_id();
        keyframe.id = id;
        self.keyframes.push(keyframe);
        self.normalise(&[id]);
        id
    }

    /// Copies keyframe `id` to `time` under a fresh id.
    pub fn duplicate(&mut self, id: ItemId, time: f64) -> Result<ItemId> {
        let mut copy = self.require(id)?.clone();
        copy.time = time;
        Ok(self.insert(copy))
    }

    pub fn remove(&mut self, id: ItemId) -> Result<Keyframe<V>> {
        let index = self.index_of(id)?;
        Ok(self.keyframes.remove(index))
    }

    /// Applies a field-wise update and re-validates the track.
    ///
    /// Non-finite values in the patch fall back to the keyframe's previous
    /// values, a negative time is clamped to zero and moving onto another
    /// keyframe's time replaces that keyframe.
    pub fn apply_patch(&mut self, id: ItemId, patch: &KeyframePatch<V>) -> Result<()> {
        let index = self.index_of(id)?;
        let keyframe = &mut self.keyframes[index];
        let before = keyframe.clone();

        if let Some(time) = patch.time {
            keyframe.time = if time.is_finite() {
                time.max(0.0)
            } else {
                before.time
            };
        }
        if let Some(easing) = patch.easing {
            keyframe.easing = easing;
        }
        keyframe.value.apply(&patch.value);
        if keyframe.value.coerce_from(&before.value) {
            warn!(kind = %V::KIND, %id, "ignored non-finite fields in keyframe patch");
        }

        self.normalise(&[id]);
        Ok(())
    }

    /// Moves several keyframes at once. Keyframes in `moves` win over
    /// untouched keyframes when their new times coincide.
    pub fn retime(&mut self, moves: &[(ItemId, f64)]) -> Result<()> {
        for (id, _) in moves {
            self.index_of(*id)?;
        }
        for (id, time) in moves {
            if let Some(keyframe) = self.keyframes.iter_mut().find(|k| k.id == *id) {
                if time.is_finite() {
                    keyframe.time = time.max(0.0);
                }
            }
        }
        let preferred: Vec<ItemId> = moves.iter().map(|(id, _)| *id).collect();
        self.normalise(&preferred);
        Ok(())
    }

    /// Whether applying `moves` would land a keyframe on the time of a
    /// keyframe that is not part of the move.
    pub fn collides(&self, moves: &[(ItemId, f64)]) -> bool {
        moves.iter().any(|(id, time)| {
            let time = sanitize_time(*time);
            self.keyframes
                .iter()
                .filter(|other| moves.iter().all(|(moved, _)| *moved != other.id))
                .any(|other| other.id != *id && other.time == time)
        })
    }

    /// Re-establishes every invariant after a raw edit or a load.
    pub fn validate(&mut self) {
        let mut seen = std::collections::BTreeSet::new();
        let mut next = self
            .keyframes
            .iter()
            .map(|keyframe| keyframe.id.0)
            .max()
            .unwrap_or(0)
            + 1;
        for keyframe in &mut self.keyframes {
            keyframe.time = sanitize_time(keyframe.time);
            if keyframe.id == ItemId::UNASSIGNED || !seen.insert(keyframe.id) {
                keyframe.id = ItemId(next);
                seen.insert(keyframe.id);
                next += 1;
            }
        }
        self.next_id = self.next_id.max(next);
        self.normalise(&[]);

        let mut last_good = V::default();
        for keyframe in &mut self.keyframes {
            if keyframe.value.coerce_from(&last_good) {
                warn!(kind = %V::KIND, id = %keyframe.id, "coerced malformed keyframe fields");
            }
            last_good = keyframe.value.clone();
        }
    }

    fn require(&self, id: ItemId) -> Result<&Keyframe<V>> {
        self.get(id).ok_or(EditorError::UnknownItem { kind: V::KIND, id })
    }

    fn index_of(&self, id: ItemId) -> Result<usize> {
        self.keyframes
            .iter()
            .position(|keyframe| keyframe.id == id)
            .ok_or(EditorError::UnknownItem { kind: V::KIND, id })
    }

    fn allocate_id(&mut self) -> ItemId {
        if self.next_id == 0 {
            self.next_id = self.keyframes.iter().map(|k| k.id.0).max().unwrap_or(0) + 1;
        }
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn value_before(&self, time: f64) -> V {
        self.keyframes
            .iter()
            .filter(|keyframe| keyframe.time <= time)
            .max_by(|a, b| a.time.total_cmp(&b.time))
            .map(|keyframe| keyframe.value.clone())
            .unwrap_or_default()
    }

    /// Sorts by time and collapses keyframes sharing a time. Among colliding
    /// keyframes the one ranked latest in `preferred` survives, then the one
    /// stored last.
    fn normalise(&mut self, preferred: &[ItemId]) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        let rank = |id: ItemId| preferred.iter().position(|candidate| *candidate == id);
        let mut kept: Vec<Keyframe<V>> = Vec::with_capacity(self.keyframes.len());
        for keyframe in self.keyframes.drain(..) {
            match kept.last_mut() {
                Some(last) if last.time == keyframe.time => {
                    if rank(keyframe.id) >= rank(last.id) {
                        debug!(
                            kind = %V::KIND,
                            dropped = %last.id,
                            time = keyframe.time,
                            "keyframe replaced"
                        );
                        *last = keyframe;
                    } else {
                        debug!(
                            kind = %V::KIND,
                            dropped = %keyframe.id,
                            time = keyframe.time,
                            "keyframe replaced"
                        );
                    }
                }
                _ => kept.push(keyframe),
            }
        }
        self.keyframes = kept;
    }
}

/// Records that occupy `[start, end)` on a track.
pub trait Clip: Clone + fmt::Debug {
    const KIND: TrackKind;
    type Patch: Clone + Default + fmt::Debug;

    fn id(&self) -> ItemId;
    fn set_id(&mut self, id: ItemId);
    fn start(&self) -> f64;
    fn end(&self) -> f64;
    fn set_span(&mut self, start: f64, end: f64);
    fn apply(&mut self, patch: &Self::Patch);
    /// Replaces non-finite numeric fields other than the span with those of
    /// `fallback`. Returns whether anything was replaced.
    fn coerce_from(&mut self, fallback: &Self) -> bool;
    /// Clamps bounded fields into range. Non-finite ones take their defaults.
    fn clamp_ranges(&mut self);

    fn span(&self) -> ItemSpan {
        ItemSpan::range(self.start(), self.end())
    }

    fn duration(&self) -> f64 {
        self.end() - self.start()
    }

    /// Whether `time` falls inside `[start, end)`.
    fn covers(&self, time: f64) -> bool {
        time >= self.start() && time < self.end()
    }
}

/// Brings a clip span back inside `start >= 0` and `end >= start + min_duration`.
pub fn normalise_span(start: f64, end: f64, min_duration: f64) -> (f64, f64) {
    let start = sanitize_time(start);
    let end = if end.is_finite() { end } else { start + min_duration };
    (start, end.max(start + min_duration))
}

fn default_min_duration() -> f64 {
    DEFAULT_MIN_CLIP_DURATION
}

/// Clips of one kind ordered by start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize",
    deserialize = "C: Deserialize<'de>"
))]
pub struct ClipTrack<C> {
    clips: Vec<C>,
    #[serde(skip)]
    next_id: u64,
    #[serde(skip, default = "default_min_duration")]
    min_duration: f64,
}

impl<C> Default for ClipTrack<C> {
    fn default() -> Self {
        Self {
            clips: Vec::new(),
            next_id: 1,
            min_duration: DEFAULT_MIN_CLIP_DURATION,
        }
    }
}

impl<C: Clip> ClipTrack<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: impl IntoIterator<Item = C>) -> Self {
        let mut track = Self::new();
        for clip in clips {
            track.insert(clip);
        }
        track
    }

    pub fn kind(&self) -> TrackKind {
        C::KIND
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clips(&self) -> &[C] {
        &self.clips
    }

    pub fn min_duration(&self) -> f64 {
        self.min_duration
    }

    /// Changes the duration floor and re-validates existing clips against it.
    pub fn set_min_duration(&mut self, min_duration: f64) {
        self.min_duration = if min_duration.is_finite() {
            min_duration.max(0.0)
        } else {
            DEFAULT_MIN_CLIP_DURATION
        };
        self.validate();
    }

    pub fn get(&self, id: ItemId) -> Option<&C> {
        self.clips.iter().find(|clip| clip.id() == id)
    }

    /// Clips whose window covers `time`.
    pub fn active_at(&self, time: f64) -> impl Iterator<Item = &C> + '_ {
        self.clips.iter().filter(move |clip| clip.covers(time))
    }

    pub fn insert(&mut self, mut clip: C) -> ItemId {
        let (start, end) = normalise_span(clip.start(), clip.end(), self.min_duration);
        clip.set_span(start, end);
        clip.clamp_ranges();
        let id = self.allocate_id();
        clip.set_id(id);
        self.clips.push(clip);
        self.sort();
        id
    }

    /// Copies clip `id` so that it starts at `start`, keeping its duration.
    pub fn duplicate(&mut self, id: ItemId, start: f64) -> Result<ItemId> {
        let mut copy = self.require(id)?.clone();
        let duration = copy.duration();
        copy.set_span(start, start + duration);
        Ok(self.insert(copy))
    }

    pub fn remove(&mut self, id: ItemId) -> Result<C> {
        let index = self.index_of(id)?;
        Ok(self.clips.remove(index))
    }

    /// Applies a field-wise update, then clamps the span and coerces any
    /// non-finite field back to its previous value.
    pub fn apply_patch(&mut self, id: ItemId, patch: &C::Patch) -> Result<()> {
        let index = self.index_of(id)?;
        let min_duration = self.min_duration;
        let clip = &mut self.clips[index];
        let before = clip.clone();

        clip.apply(patch);
        if clip.coerce_from(&before) {
            warn!(kind = %C::KIND, %id, "ignored non-finite fields in clip patch");
        }
        clip.clamp_ranges();
        let start = if clip.start().is_finite() {
            clip.start()
        } else {
            before.start()
        };
        let end = if clip.end().is_finite() {
            clip.end()
        } else {
            before.end()
        };
        let (start, end) = normalise_span(start, end, min_duration);
        clip.set_span(start, end);

        self.sort();
        Ok(())
    }

    /// Moves or resizes clip `id`.
    pub fn set_span(&mut self, id: ItemId, start: f64, end: f64) -> Result<()> {
        let index = self.index_of(id)?;
        let (start, end) = normalise_span(start, end, self.min_duration);
        self.clips[index].set_span(start, end);
        self.sort();
        Ok(())
    }

    /// Re-establishes span floors, id uniqueness and ordering after a load.
    /// Non-finite fields are coerced from the preceding clip, then every
    /// clip is clamped into range.
    pub fn validate(&mut self) {
        let mut seen = std::collections::BTreeSet::new();
        let mut next = self.clips.iter().map(|clip| clip.id().0).max().unwrap_or(0) + 1;
        for clip in &mut self.clips {
            let (start, end) = normalise_span(clip.start(), clip.end(), self.min_duration);
            clip.set_span(start, end);
            if clip.id() == ItemId::UNASSIGNED || !seen.insert(clip.id()) {
                clip.set_id(ItemId(next));
                seen.insert(clip.id());
                next += 1;
            }
        }
        self.next_id = self.next_id.max(next);
        self.sort();

        let mut previous: Option<C> = None;
        for clip in &mut self.clips {
            if let Some(previous) = &previous {
                if clip.coerce_from(previous) {
                    warn!(kind = %C::KIND, id = %clip.id(), "coerced non-finite clip fields");
                }
            }
            clip.clamp_ranges();
            previous = Some(clip.clone());
        }
    }

    fn require(&self, id: ItemId) -> Result<&C> {
        self.get(id).ok_or(EditorError::UnknownItem { kind: C::KIND, id })
    }

    fn index_of(&self, id: ItemId) -> Result<usize> {
        self.clips
            .iter()
            .position(|clip| clip.id() == id)
            .ok_or(EditorError::UnknownItem { kind: C::KIND, id })
    }

    fn allocate_id(&mut self) -> ItemId {
        if self.next_id == 0 {
            self.next_id = self.clips.iter().map(|c| c.id().0).max().unwrap_or(0) + 1;
        }
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn sort(&mut self) {
        self.clips.sort_by(|a, b| a.start().total_cmp(&b.start()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(time: f64, distance: f64) -> Keyframe<CameraPose> {
        Keyframe::new(
            time,
            CameraPose {
                distance,
                ..CameraPose::default()
            },
        )
    }

    fn distances(track: &KeyframeTrack<CameraPose>) -> Vec<(f64, f64)> {
        track
            .keyframes()
            .iter()
            .map(|k| (k.time, k.value.distance))
            .collect()
    }

    #[test]
    fn insert_keeps_keyframes_sorted() {
        let track =
            KeyframeTrack::from_keyframes([camera(4.0, 40.0), camera(1.0, 10.0), camera(2.0, 20.0)]);
        assert_eq!(distances(&track), vec![(1.0, 10.0), (2.0, 20.0), (4.0, 40.0)]);
    }

    #[test]
    fn insert_collision_is_last_write_wins() {
        let mut track = KeyframeTrack::new();
        let first = track.insert(camera(2.0, 20.0));
        let second = track.insert(camera(2.0, 99.0));

        assert_eq!(track.len(), 1);
        assert!(track.get(first).is_none());
        assert_eq!(track.get(second).unwrap().value.distance, 99.0);
    }

    #[test]
    fn insert_clamps_negative_time() {
        let mut track = KeyframeTrack::new();
        let id = track.insert(camera(-3.0, 20.0));
        assert_eq!(track.get(id).unwrap().time, 0.0);
    }

    #[test]
    fn patch_revalidates_order_and_collisions() {
        let mut track = KeyframeTrack::new();
        let a = track.insert(camera(1.0, 10.0));
        let b = track.insert(camera(2.0, 20.0));
        let c = track.insert(camera(3.0, 30.0));

        track.apply_patch(a, &KeyframePatch::time(5.0)).unwrap();
        assert_eq!(distances(&track), vec![(2.0, 20.0), (3.0, 30.0), (5.0, 10.0)]);

        track.apply_patch(a, &KeyframePatch::time(3.0)).unwrap();
        assert!(track.get(c).is_none());
        assert!(track.get(b).is_some());
        assert_eq!(distances(&track), vec![(2.0, 20.0), (3.0, 10.0)]);
    }

    #[test]
    fn patch_with_nan_keeps_previous_value() {
        let mut track = KeyframeTrack::new();
        let id = track.insert(camera(1.0, 10.0));
        let patch = KeyframePatch::value(CameraPosePatch {
            distance: Some(f64::NAN),
            height: Some(4.0),
            ..CameraPosePatch::default()
        });
        track.apply_patch(id, &patch).unwrap();

        let keyframe = track.get(id).unwrap();
        assert_eq!(keyframe.value.distance, 10.0);
        assert_eq!(keyframe.value.height, 4.0);

        track.apply_patch(id, &KeyframePatch::time(f64::NAN)).unwrap();
        assert_eq!(track.get(id).unwrap().time, 1.0);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut track: KeyframeTrack<CameraPose> = KeyframeTrack::new();
        let err = track.remove(ItemId(42)).unwrap_err();
        assert!(format!("{err}").contains("#42"));
    }

    #[test]
    fn duplicate_creates_fresh_id() {
        let mut track = KeyframeTrack::new();
        let id = track.insert(camera(1.0, 10.0));
        let copy = track.duplicate(id, 6.0).unwrap();
        assert_ne!(id, copy);
        assert_eq!(track.get(copy).unwrap().value.distance, 10.0);
        assert_eq!(track.get(copy).unwrap().time, 6.0);
    }

    #[test]
    fn retime_moves_group_without_eating_members() {
        let mut track = KeyframeTrack::new();
        let a = track.insert(camera(1.0, 10.0));
        let b = track.insert(camera(2.0, 20.0));
        let c = track.insert(camera(3.0, 30.0));

        track.retime(&[(a, 2.0), (b, 3.0)]).unwrap();
        assert!(track.get(c).is_none());
        assert_eq!(distances(&track), vec![(2.0, 10.0), (3.0, 20.0)]);
    }

    #[test]
    fn collision_probe_ignores_group_members() {
        let mut track = KeyframeTrack::new();
        let a = track.insert(camera(1.0, 10.0));
        let b = track.insert(camera(2.0, 20.0));
        track.insert(camera(4.0, 40.0));

        assert!(!track.collides(&[(a, 2.0), (b, 3.0)]));
        assert!(track.collides(&[(a, 3.0), (b, 4.0)]));
    }

    #[test]
    fn validate_repairs_raw_edits() {
        let mut track = KeyframeTrack::new();
        track.insert(camera(1.0, 10.0));
        track.keyframes_mut().push(camera(0.5, f64::NAN));
        track.keyframes_mut().push(camera(f64::NAN, 30.0));
        track.validate();

        let keyframes = track.keyframes();
        assert_eq!(keyframes.len(), 3);
        assert_eq!(keyframes[0].time, 0.0);
        assert_eq!(keyframes[1].time, 0.5);
        assert_eq!(keyframes[1].value.distance, 30.0);
        let ids: std::collections::BTreeSet<_> = keyframes.iter().map(|k| k.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&ItemId::UNASSIGNED));
    }

    fn fx(start: f64, end: f64) -> CameraFxClip {
        CameraFxClip::new(CameraFxKind::Shake, start, end, 0.5)
    }

    #[test]
    fn clip_insert_enforces_floor() {
        let mut track = ClipTrack::new();
        let id = track.insert(fx(-1.0, -0.5));
        let clip = track.get(id).unwrap();
        assert_eq!(clip.start(), 0.0);
        assert!((clip.end() - DEFAULT_MIN_CLIP_DURATION).abs() < 1e-12);
    }

    #[test]
    fn clip_set_span_never_inverts() {
        let mut track = ClipTrack::new();
        let id = track.insert(fx(1.0, 2.0));
        track.set_span(id, 3.0, 2.0).unwrap();
        let clip = track.get(id).unwrap();
        assert_eq!(clip.start(), 3.0);
        assert!(clip.end() > clip.start());
    }

    #[test]
    fn clip_duplicate_keeps_duration() {
        let mut track = ClipTrack::new();
        let id = track.insert(fx(1.0, 2.5));
        let copy = track.duplicate(id, 4.0).unwrap();
        let clip = track.get(copy).unwrap();
        assert_eq!((clip.start(), clip.end()), (4.0, 5.5));
    }

    #[test]
    fn clip_insert_clamps_intensity() {
        let mut track = ClipTrack::new();
        let id = track.insert(CameraFxClip::new(CameraFxKind::Roll, 0.0, 1.0, 2.0));
        assert_eq!(track.get(id).unwrap().intensity, 1.0);
    }

    #[test]
    fn clip_validate_coerces_from_previous_clip() {
        let mut track: ClipTrack<CameraFxClip> = serde_json::from_str(
            r#"{"clips": [
                {"effect": "roll", "start_time": 3.0, "end_time": 4.0, "intensity": "strong"},
                {"effect": "shake", "start_time": "1.5", "end_time": 2.0, "intensity": 0.4},
                {"effect": "zoom_punch", "start_time": 5.0, "end_time": 6.0, "intensity": 3.0}
            ]}"#,
        )
        .unwrap();
        track.validate();

        let clips = track.clips();
        assert_eq!(clips[0].start_time, 1.5);
        assert_eq!(clips[1].intensity, 0.4);
        assert_eq!(clips[2].intensity, 1.0);
    }

    #[test]
    fn event_validate_clamps_threshold_and_parameters() {
        let mut track: ClipTrack<ParameterEvent> = serde_json::from_str(
            r#"{"clips": [
                {"name": "a", "start_time": 0.0, "end_time": 1.0, "threshold": 0.3,
                 "parameters": {"vignette": 0.2}},
                {"name": "b", "start_time": 2.0, "end_time": 3.0, "threshold": "loud",
                 "parameters": {"vignette": null, "saturation": null}}
            ]}"#,
        )
        .unwrap();
        track.validate();

        let b = &track.clips()[1];
        assert_eq!(b.threshold, 0.3);
        assert_eq!(
            b.parameters.get(&EventParameter::Vignette),
            Some(&ParameterValue::Intensity(0.2))
        );
        assert!(!b.parameters.contains_key(&EventParameter::Saturation));
    }

    #[test]
    fn active_clips_use_half_open_windows() {
        let track = ClipTrack::from_clips([fx(1.0, 2.0), fx(1.5, 3.0)]);
        assert_eq!(track.active_at(1.0).count(), 1);
        assert_eq!(track.active_at(1.75).count(), 2);
        assert_eq!(track.active_at(2.0).count(), 1);
        assert_eq!(track.active_at(3.0).count(), 0);
    }
}
