//! Pointer and keyboard handling for the timeline.
//!
//! [`TimelineEditor`] holds only view state (viewport, selection, the drag in
//! progress). The project and the playback session are borrowed per call,
//! and each gesture edits them through their own methods, so there is a
//! single writer at any time.
//!
//! Pointer moves during a drag are not applied when they arrive. They are
//! recorded in a [`MoveCoalescer`] and applied from [`TimelineEditor::on_frame`],
//! once per rendered frame, using the most recent position only. Releasing
//! the pointer applies whatever is pending and commits; there is no abort.

mod coalesce;
mod drag;
mod hit;
mod selection;

pub use coalesce::MoveCoalescer;
pub use drag::{move_delta, resize_end, resize_start, DragState};
pub use hit::{hit_test, items_in_range, HitTarget, HitZones, LaneLayout};
pub use selection::Selection;

use tracing::{debug, warn};

use crate::{
    config::TimelineConfig,
    coords::{snap_to_grid, Viewport},
    playback::PlaybackSession,
    project::{ItemRef, Project},
    track::ItemSpan,
};

/// Pointer position in timeline coordinates: `x` in screen pixels from the
/// left edge of the lanes, `y` from the top of the ruler.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPos {
    pub x: f64,
    pub y: f64,
}

impl PointerPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Keyboard actions. Bindings are up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    TogglePlay,
    StepForward,
    StepBackward,
    JumpForward,
    JumpBackward,
    JumpToStart,
    JumpToEnd,
    DeleteSelection,
    DuplicateSelection,
    SelectAll,
    ClearSelection,
    ToggleSnap,
    CycleAudioTrack,
}

#[derive(Debug, Clone)]
pub struct TimelineEditor {
    config: TimelineConfig,
    viewport: Viewport,
    layout: LaneLayout,
    selection: Selection,
    drag: DragState,
    coalescer: MoveCoalescer,
    snap_enabled: bool,
}

impl TimelineEditor {
    pub fn new(config: TimelineConfig) -> Self {
        let bounds = config.zoom_bounds();
        Self {
            viewport: Viewport::new(
                bounds.clamp(config.default_pixels_per_second),
                config.view_width_px,
            ),
            layout: LaneLayout::new(config.ruler_height_px, config.lane_height_px),
            selection: Selection::new(),
            drag: DragState::Idle,
            coalescer: MoveCoalescer::new(),
            snap_enabled: config.snap_enabled,
            config,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_view_width(&mut self, width_px: f64) {
        self.viewport.width_px = width_px.max(0.0);
    }

    pub fn layout(&self) -> &LaneLayout {
        &self.layout
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    /// Whether a coalesced pointer move is waiting for the next frame.
    pub fn has_pending_update(&self) -> bool {
        self.coalescer.is_pending()
    }

    pub fn hit_test(
        &self,
        project: &Project,
        session: &PlaybackSession,
        pos: PointerPos,
    ) -> HitTarget {
        hit_test(
            project,
            &self.viewport,
            &self.layout,
            &self.hit_zones(),
            session.current_time(),
            pos.x,
            pos.y,
        )
    }

    /// Starts a gesture. Selection changes and seeks on the ruler happen
    /// immediately.
    pub fn pointer_down(
        &mut self,
        project: &mut Project,
        session: &mut PlaybackSession,
        pos: PointerPos,
        button: PointerButton,
        modifiers: Modifiers,
    ) {
        if !self.drag.is_idle() {
            self.finish_drag(project, session);
        }

        if button == PointerButton::Middle {
            self.begin(DragState::Panning {
                origin_x: pos.x,
                origin_scroll: self.viewport.scroll_px,
            });
            return;
        }
        if button != PointerButton::Primary {
            return;
        }

        let target = self.hit_test(project, session, pos);
        let state = match target {
            HitTarget::Playhead => DragState::DraggingPlayhead,
            HitTarget::Ruler => {
                self.scrub_to(session, pos.x);
                DragState::DraggingPlayhead
            }
            HitTarget::Keyframe(item) | HitTarget::ClipBody(item) => {
                if modifiers.shift {
                    if !self.selection.toggle(item) {
                        return;
                    }
                } else if !self.selection.contains(item) {
                    self.selection.select_only(item);
                }
                match self.begin_move(project, item, pos.x) {
                    Some(state) => state,
                    None => return,
                }
            }
            HitTarget::ClipStartEdge(item) | HitTarget::ClipEndEdge(item) => {
                let Some(span) = project.span_of(item) else {
                    return;
                };
                self.selection.select_only(item);
                if matches!(target, HitTarget::ClipStartEdge(_)) {
                    DragState::ResizingStart {
                        origin_x: pos.x,
                        item,
                        span,
                    }
                } else {
                    DragState::ResizingEnd {
                        origin_x: pos.x,
                        item,
                        span,
                    }
                }
            }
            HitTarget::Lane(_) | HitTarget::Empty if modifiers.alt => DragState::Panning {
                origin_x: pos.x,
                origin_scroll: self.viewport.scroll_px,
            },
            HitTarget::Lane(_) | HitTarget::Empty => {
                let base = modifiers.shift.then(|| self.selection.clone());
                if base.is_none() {
                    self.selection.clear();
                }
                DragState::MarqueeSelecting {
                    origin: pos,
                    current: pos,
                    base,
                }
            }
        };
        self.begin(state);
    }

    /// Records a pointer move. Returns `true` when the host must request an
    /// animation frame to have it applied.
    pub fn pointer_move(&mut self, pos: PointerPos) -> bool {
        if self.drag.is_idle() {
            return false;
        }
        self.coalescer.push(pos)
    }

    /// Frame callback. Applies the latest coalesced pointer position and
    /// keeps the playhead in view during playback.
    pub fn on_frame(&mut self, project: &mut Project, session: &mut PlaybackSession) {
        if let Some(pos) = self.coalescer.take() {
            self.apply(project, session, pos);
        }
        if self.drag.is_idle() && session.is_playing() {
            let content = self.content_duration(project, session);
            self.viewport
                .scroll_to_reveal(session.current_time(), content);
        }
    }

    /// Ends the gesture, committing the edit at `pos`.
    pub fn pointer_up(
        &mut self,
        project: &mut Project,
        session: &mut PlaybackSession,
        pos: PointerPos,
    ) {
        if self.drag.is_idle() {
            return;
        }
        self.coalescer.clear();
        self.apply(project, session, pos);
        debug!(gesture = self.drag.name(), "drag committed");
        self.drag = DragState::Idle;
    }

    /// Wheel input: zoom about the pointer with ctrl held, pan otherwise.
    /// `notches` is positive when scrolling down or right.
    pub fn wheel(
        &mut self,
        project: &Project,
        session: &PlaybackSession,
        pos: PointerPos,
        notches: f64,
        modifiers: Modifiers,
    ) {
        if !notches.is_finite() || notches == 0.0 {
            return;
        }
        if modifiers.ctrl {
            let factor = self.config.zoom_step.powf(-notches);
            self.viewport
                .zoom_about(pos.x, factor, self.config.zoom_bounds());
        } else {
            let content = self.content_duration(project, session);
            self.viewport
                .pan_by(notches * self.config.pan_step_px, content);
        }
    }

    /// Keyboard commands run immediately.
    pub fn key(
        &mut self,
        project: &mut Project,
        session: &mut PlaybackSession,
        command: KeyCommand,
    ) {
        match command {
            KeyCommand::TogglePlay => session.toggle(),
            KeyCommand::StepForward => session.step_frames(1, self.config.fps),
            KeyCommand::StepBackward => session.step_frames(-1, self.config.fps),
            KeyCommand::JumpForward => session.jump_by(self.config.jump_seconds),
            KeyCommand::JumpBackward => session.jump_by(-self.config.jump_seconds),
            KeyCommand::JumpToStart => session.seek(0.0),
            KeyCommand::JumpToEnd => session.seek(session.duration()),
            KeyCommand::DeleteSelection => {
                self.finish_drag(project, session);
                for item in self.selection.iter().collect::<Vec<_>>() {
                    if let Err(err) = project.remove_item(item) {
                        warn!(%err, "selected item already gone");
                    }
                }
                self.selection.clear();
            }
            KeyCommand::DuplicateSelection => {
                self.finish_drag(project, session);
                let mut copies = Vec::with_capacity(self.selection.len());
                for item in self.selection.iter().collect::<Vec<_>>() {
                    match project.duplicate_item(item, self.config.duplicate_offset) {
                        Ok(copy) => copies.push(copy),
                        Err(err) => warn!(%err, "could not duplicate selected item"),
                    }
                }
                self.selection.replace(copies);
            }
            KeyCommand::SelectAll => self.selection.replace(project.items()),
            KeyCommand::ClearSelection => self.selection.clear(),
            KeyCommand::ToggleSnap => self.snap_enabled = !self.snap_enabled,
            KeyCommand::CycleAudioTrack => {
                let active = session.cycle_active_track();
                debug!(?active, "active audio track cycled");
            }
        }
        if matches!(
            command,
            KeyCommand::StepForward
                | KeyCommand::StepBackward
                | KeyCommand::JumpForward
                | KeyCommand::JumpBackward
                | KeyCommand::JumpToStart
                | KeyCommand::JumpToEnd
        ) {
            let content = self.content_duration(project, session);
            self.viewport
                .scroll_to_reveal(session.current_time(), content);
        }
    }

    fn hit_zones(&self) -> HitZones {
        HitZones {
            playhead_px: self.config.playhead_hit_zone_px,
            keyframe_radius_px: self.config.keyframe_hit_radius_px,
            edge_px: self.config.edge_hit_zone_px,
        }
    }

    fn snap_interval(&self) -> Option<f64> {
        (self.snap_enabled && self.config.snap_interval > 0.0)
            .then_some(self.config.snap_interval)
    }

    fn content_duration(&self, project: &Project, session: &PlaybackSession) -> f64 {
        session.duration().max(project.end_time())
    }

    fn begin(&mut self, state: DragState) {
        debug!(gesture = state.name(), "drag started");
        self.drag = state;
    }

    fn begin_move(
        &mut self,
        project: &Project,
        anchor: ItemRef,
        origin_x: f64,
    ) -> Option<DragState> {
        self.selection.retain(|item| project.span_of(item).is_some());
        let items: Vec<(ItemRef, ItemSpan)> = self
            .selection
            .iter()
            .filter_map(|item| project.span_of(item).map(|span| (item, span)))
            .collect();
        if !items.iter().any(|(item, _)| *item == anchor) {
            return None;
        }
        Some(DragState::MovingKeyframeOrClip {
            origin_x,
            anchor,
            items,
        })
    }

    fn finish_drag(&mut self, project: &mut Project, session: &mut PlaybackSession) {
        if let Some(pos) = self.coalescer.take() {
            self.apply(project, session, pos);
        }
        self.drag = DragState::Idle;
    }

    fn scrub_to(&self, session: &mut PlaybackSession, x: f64) {
        let mut time = self.viewport.time_at(x);
        if let Some(interval) = self.snap_interval() {
            time = snap_to_grid(time, interval);
        }
        session.seek(time.clamp(0.0, session.duration()));
    }

    /// Applies the current gesture for pointer position `pos`.
    fn apply(&mut self, project: &mut Project, session: &mut PlaybackSession, pos: PointerPos) {
        let mut drag = std::mem::take(&mut self.drag);
        let keep = match &mut drag {
            DragState::Idle => true,
            DragState::DraggingPlayhead => {
                self.scrub_to(session, pos.x);
                true
            }
            DragState::MovingKeyframeOrClip {
                origin_x,
                anchor,
                items,
            } => self.apply_move(project, *origin_x, *anchor, items, pos),
            DragState::ResizingStart {
                origin_x,
                item,
                span,
            } => {
                let raw = self.viewport.delta_time(pos.x - *origin_x);
                let (start, end) =
                    resize_start(*span, raw, project.min_clip_duration(), self.snap_interval());
                commit_span(project, *item, start, end)
            }
            DragState::ResizingEnd {
                origin_x,
                item,
                span,
            } => {
                let raw = self.viewport.delta_time(pos.x - *origin_x);
                let (start, end) =
                    resize_end(*span, raw, project.min_clip_duration(), self.snap_interval());
                commit_span(project, *item, start, end)
            }
            DragState::Panning {
                origin_x,
                origin_scroll,
            } => {
                let content = self.content_duration(project, session);
                self.viewport
                    .set_scroll(*origin_scroll - (pos.x - *origin_x), content);
                true
            }
            DragState::MarqueeSelecting {
                origin,
                current,
                base,
            } => {
                *current = pos;
                let lanes = self.layout.lanes_between(origin.y, current.y);
                let hits = items_in_range(
                    project,
                    &lanes,
                    self.viewport.time_at(origin.x),
                    self.viewport.time_at(current.x),
                );
                match base {
                    Some(base) => {
                        self.selection = base.clone();
                        self.selection.extend(hits);
                    }
                    None => self.selection.replace(hits),
                }
                true
            }
        };
        self.drag = if keep { drag } else { DragState::Idle };
    }

    /// Shifts every moved item by the shared clamped delta. Returns whether
    /// the drag can continue.
    fn apply_move(
        &self,
        project: &mut Project,
        origin_x: f64,
        anchor: ItemRef,
        items: &[(ItemRef, ItemSpan)],
        pos: PointerPos,
    ) -> bool {
        let Some(anchor_start) = items
            .iter()
            .find(|(item, _)| *item == anchor)
            .map(|(_, span)| span.start)
        else {
            return false;
        };
        let raw = self.viewport.delta_time(pos.x - origin_x);
        let delta = move_delta(items, anchor_start, raw, self.snap_interval());
        let moves: Vec<(ItemRef, ItemSpan)> = items
            .iter()
            .map(|(item, span)| (*item, span.shifted(delta)))
            .collect();
        // Landing on an untouched keyframe would replace it; hold the
        // previous position instead.
        if project.collides(&moves) {
            return true;
        }
        match project.move_items(&moves) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "moved item disappeared, ending drag");
                false
            }
        }
    }
}

fn commit_span(project: &mut Project, item: ItemRef, start: f64, end: f64) -> bool {
    match project.set_span(item, start, end) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "resized item disappeared, ending drag");
            false
        }
    }
}
