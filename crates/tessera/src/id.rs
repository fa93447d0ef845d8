use slotmap::new_key_type;

new_key_type! {
    /// Opaque identifier for a node stored in the session arena.
    pub struct NodeId;

    /// Opaque identifier for a window registered with the session.
    pub struct WindowId;
}

/// Handle for a native top-level window, issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWindow(pub u64);

/// Identifier for a scheduled timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeoutId(pub(crate) u64);

/// Identifier for a queued idle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdleId(pub(crate) u64);
