use crate::{
    coords::snap_to_grid,
    project::ItemRef,
    track::ItemSpan,
};

use super::{selection::Selection, PointerPos};

/// Pointer gesture in progress. Every variant captures what it needs at
/// pointer-down so each update is computed from the origin rather than
/// accumulated.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingPlayhead,
    MovingKeyframeOrClip {
        origin_x: f64,
        /// Item under the pointer; snapping aligns its start to the grid.
        anchor: ItemRef,
        /// Every moved item with its span at pointer-down.
        items: Vec<(ItemRef, ItemSpan)>,
    },
    ResizingStart {
        origin_x: f64,
        item: ItemRef,
        span: ItemSpan,
    },
    ResizingEnd {
        origin_x: f64,
        item: ItemRef,
        span: ItemSpan,
    },
    Panning {
        origin_x: f64,
        origin_scroll: f64,
    },
    MarqueeSelecting {
        origin: PointerPos,
        current: PointerPos,
        /// Selection to extend when the gesture started with shift held.
        base: Option<Selection>,
    },
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DragState::Idle => "idle",
            DragState::DraggingPlayhead => "playhead",
            DragState::MovingKeyframeOrClip { .. } => "move",
            DragState::ResizingStart { .. } => "resize start",
            DragState::ResizingEnd { .. } => "resize end",
            DragState::Panning { .. } => "pan",
            DragState::MarqueeSelecting { .. } => "marquee",
        }
    }
}

/// Shared time offset for a group move.
///
/// The anchor start is snapped when `snap` is set, then the offset is limited
/// so that no item in the group starts before zero.
pub fn move_delta(
    items: &[(ItemRef, ItemSpan)],
    anchor_start: f64,
    raw_delta: f64,
    snap: Option<f64>,
) -> f64 {
    let mut target = anchor_start + raw_delta;
    if let Some(interval) = snap {
        target = snap_to_grid(target, interval);
    }
    let earliest = items
        .iter()
        .map(|(_, span)| span.start)
        .fold(f64::INFINITY, f64::min);
    let delta = target - anchor_start;
    if earliest.is_finite() && earliest + delta < 0.0 {
        -earliest
    } else {
        delta
    }
}

/// New `(start, end)` when dragging the start handle. The start stays in
/// `[0, end - min_duration]`.
pub fn resize_start(
    span: ItemSpan,
    raw_delta: f64,
    min_duration: f64,
    snap: Option<f64>,
) -> (f64, f64) {
    let end = span.last();
    let mut start = span.start + raw_delta;
    if let Some(interval) = snap {
        start = snap_to_grid(start, interval);
    }
    (start.max(0.0).min(end - min_duration).max(0.0), end)
}

/// New `(start, end)` when dragging the end handle. The end never comes
/// closer than `min_duration` to the start.
pub fn resize_end(
    span: ItemSpan,
    raw_delta: f64,
    min_duration: f64,
    snap: Option<f64>,
) -> (f64, f64) {
    let mut end = span.last() + raw_delta;
    if let Some(interval) = snap {
        end = snap_to_grid(end, interval);
    }
    (span.start, end.max(span.start + min_duration))
}
