use crate::{
    coords::Viewport,
    project::{ItemRef, Project},
    track::TrackKind,
};

/// Vertical arrangement of the timeline: a ruler strip followed by one lane
/// per track kind.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneLayout {
    pub ruler_height: f64,
    pub lane_height: f64,
    pub lanes: Vec<TrackKind>,
}

impl LaneLayout {
    pub fn new(ruler_height: f64, lane_height: f64) -> Self {
        Self {
            ruler_height: ruler_height.max(0.0),
            lane_height: lane_height.max(1.0),
            lanes: TrackKind::ALL.to_vec(),
        }
    }

    /// Lane under the content-space `y` coordinate.
    pub fn lane_at(&self, y: f64) -> Option<TrackKind> {
        if y < self.ruler_height {
            return None;
        }
        let index = ((y - self.ruler_height) / self.lane_height).floor() as usize;
        self.lanes.get(index).copied()
    }

    pub fn lane_top(&self, kind: TrackKind) -> Option<f64> {
        self.lanes
            .iter()
            .position(|lane| *lane == kind)
            .map(|index| self.ruler_height + index as f64 * self.lane_height)
    }

    /// Lanes touched by the vertical band between `y0` and `y1`.
    pub fn lanes_between(&self, y0: f64, y1: f64) -> Vec<TrackKind> {
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        self.lanes
            .iter()
            .copied()
            .filter(|kind| {
                self.lane_top(*kind).map_or(false, |lane_top| {
                    lane_top <= bottom && lane_top + self.lane_height > top
                })
            })
            .collect()
    }
}

/// Pixel tolerances used when picking items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitZones {
    pub playhead_px: f64,
    pub keyframe_radius_px: f64,
    pub edge_px: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    Playhead,
    Ruler,
    Keyframe(ItemRef),
    ClipBody(ItemRef),
    ClipStartEdge(ItemRef),
    ClipEndEdge(ItemRef),
    /// Empty space inside a lane.
    Lane(TrackKind),
    Empty,
}

/// Finds what sits under the pointer. Items in the lane under the pointer
/// win over the playhead line, so an item parked under the playhead can
/// still be grabbed. The playhead wins over the ruler and empty lane space.
pub fn hit_test(
    project: &Project,
    viewport: &Viewport,
    layout: &LaneLayout,
    zones: &HitZones,
    playhead_time: f64,
    x: f64,
    y: f64,
) -> HitTarget {
    let on_playhead = (x - viewport.x_at(playhead_time)).abs() <= zones.playhead_px;
    let fallback = |target: HitTarget| {
        if on_playhead {
            HitTarget::Playhead
        } else {
            target
        }
    };

    if y < layout.ruler_height {
        return fallback(HitTarget::Ruler);
    }
    let Some(kind) = layout.lane_at(y) else {
        return fallback(HitTarget::Empty);
    };
    let spans = project.spans(kind);

    if !kind.is_clip() {
        return spans
            .iter()
            .map(|(id, span)| (*id, (viewport.x_at(span.start) - x).abs()))
            .filter(|(_, distance)| *distance <= zones.keyframe_radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| HitTarget::Keyframe(ItemRef::new(kind, id)))
            .unwrap_or_else(|| fallback(HitTarget::Lane(kind)));
    }

    // Later clips draw on top, so they are picked first.
    for (id, span) in spans.iter().rev() {
        let item = ItemRef::new(kind, *id);
        let start_x = viewport.x_at(span.start);
        let end_x = viewport.x_at(span.last());
        if let Some(edge) = pick_edge(item, x, start_x, end_x, zones.edge_px) {
            return edge;
        }
        if x > start_x && x < end_x {
            return HitTarget::ClipBody(item);
        }
    }
    fallback(HitTarget::Lane(kind))
}

/// Items whose span intersects `[t0, t1]` on the given lanes.
pub fn items_in_range(project: &Project, lanes: &[TrackKind], t0: f64, t1: f64) -> Vec<ItemRef> {
    let (from, to) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    lanes
        .iter()
        .flat_map(|kind| {
            project
                .spans(*kind)
                .into_iter()
                .filter(move |(_, span)| span.start <= to && span.last() >= from)
                .map(move |(id, _)| ItemRef::new(*kind, id))
        })
        .collect()
}

fn pick_edge(item: ItemRef, x: f64, start_x: f64, end_x: f64, zone: f64) -> Option<HitTarget> {
    let to_start = (x - start_x).abs();
    let to_end = (x - end_x).abs();
    match (to_start <= zone, to_end <= zone) {
        (true, true) if to_end < to_start => Some(HitTarget::ClipEndEdge(item)),
        (true, _) => Some(HitTarget::ClipStartEdge(item)),
        (false, true) => Some(HitTarget::ClipEndEdge(item)),
        (false, false) => None,
    }
}
