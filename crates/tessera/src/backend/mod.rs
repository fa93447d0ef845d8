/// In-memory backend for tests and demos.
pub mod headless;

use std::{fmt::Debug, sync::Arc};

use crate::{
    error::Result,
    event::NativeEvent,
    geom::{Expanse, Point, Rect},
    id::NativeWindow,
    render::Canvas,
};

pub use headless::{HeadlessBackend, HeadlessProbe};

/// Parameters for allocating a native top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSpec {
    /// Outer position on screen.
    pub position: Point,
    /// Outer size, including decorations.
    pub size: Expanse,
    /// Window title.
    pub title: String,
}

/// A monotonic millisecond clock.
pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
}

/// Wakes a thread blocked in [`Backend::wait`]. Safe to call from any
/// thread.
pub trait Waker: Send + Sync {
    /// Wake the waiting thread. Wakeups are not counted; several calls
    /// before the wait observes them collapse into one.
    fn wake(&self);
}

/// The native windowing layer.
///
/// Resizes and moves are requests: the backend confirms them later by
/// queueing [`NativeEvent::Configure`] and [`NativeEvent::Moved`].
pub trait Backend {
    /// Allocate a native window.
    fn create_window(&mut self, spec: &NativeSpec) -> Result<NativeWindow>;

    /// Release a native window. Unknown handles are ignored.
    fn destroy_window(&mut self, win: NativeWindow);

    /// Bind a drawable surface of `size` to a window, replacing any prior one.
    fn attach_surface(&mut self, win: NativeWindow, size: Expanse) -> Result<()>;

    /// Release the window's drawable surface.
    fn release_surface(&mut self, win: NativeWindow);

    /// Request a new outer size.
    fn resize(&mut self, win: NativeWindow, size: Expanse) -> Result<()>;

    /// Request a new outer position.
    fn move_to(&mut self, win: NativeWindow, position: Point) -> Result<()>;

    /// Set position and size in one request.
    fn set_bounds(&mut self, win: NativeWindow, bounds: Rect) -> Result<()>;

    /// Grab the pointer, and the keyboard if `keyboard` is set, for `win`.
    fn grab(&mut self, win: NativeWindow, keyboard: bool) -> Result<()>;

    /// Release any grab.
    fn ungrab(&mut self);

    /// Raise the window to the top of the stacking order.
    fn raise(&mut self, win: NativeWindow);

    /// Lower the window to the bottom of the stacking order.
    fn lower(&mut self, win: NativeWindow);

    /// Set the window's opacity in `0.0..=1.0`.
    fn set_opacity(&mut self, win: NativeWindow, opacity: f32);

    /// Map the window.
    fn show(&mut self, win: NativeWindow);

    /// Hint the region of the window that is fully opaque.
    fn set_opaque_region(&mut self, win: NativeWindow, region: Rect);

    /// The drawing surface bound to a window.
    fn canvas(&mut self, win: NativeWindow) -> Result<&mut dyn Canvas>;

    /// Is an event ready without blocking?
    fn has_event(&mut self) -> bool;

    /// Take the next ready event.
    fn next_event(&mut self) -> Option<NativeEvent>;

    /// Queue an event as though the native layer had produced it.
    fn post_event(&mut self, event: NativeEvent);

    /// Block until an event is ready, a wakeup arrives, or `timeout_ms`
    /// elapses. Returns true if an event is ready.
    fn wait(&mut self, timeout_ms: Option<u64>) -> Result<bool>;

    /// The clock timeouts are measured against.
    fn clock(&self) -> Arc<dyn Clock>;

    /// A waker for [`Backend::wait`].
    fn waker(&self) -> Arc<dyn Waker>;
}
