use crate::track::{ItemId, TrackKind};

/// Result alias that carries the custom [`EditorError`] type.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Common error type for the core crate.
///
/// Out-of-range edits are clamped and malformed numeric fields are coerced,
/// so nothing on the per-frame query path returns one of these. They surface
/// from lookups, audio track management and project I/O.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A caller supplied an argument the engine cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The referenced keyframe or clip does not exist on the track.
    #[error("no {kind} item with id {id}")]
    UnknownItem { kind: TrackKind, id: ItemId },
    /// The referenced audio track does not exist.
    #[error("unknown audio track `{0}`")]
    UnknownAudioTrack(String),
    /// The audio track failed to decode and cannot be activated.
    #[error("audio track `{0}` is unusable")]
    AudioTrackUnusable(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl EditorError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for EditorError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for EditorError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
