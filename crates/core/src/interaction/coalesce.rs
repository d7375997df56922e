use super::PointerPos;

/// Collapses pointer moves arriving between two frames into one update.
///
/// Raw events only record the latest position. The frame callback takes it
/// and applies it once, so at most one drag update runs per frame.
#[derive(Debug, Clone, Default)]
pub struct MoveCoalescer {
    pending: Option<PointerPos>,
    superseded: u64,
}

impl MoveCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `pos`. Returns `true` when no update was pending, i.e. the
    /// caller has to request a frame.
    pub fn push(&mut self, pos: PointerPos) -> bool {
        let request = self.pending.is_none();
        if !request {
            self.superseded += 1;
        }
        self.pending = Some(pos);
        request
    }

    /// Latest position since the last frame, if any.
    pub fn take(&mut self) -> Option<PointerPos> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the pending update.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Number of positions overwritten before they were applied.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
