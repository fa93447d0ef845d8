//! Windows: native binding, frame chrome, resize, minimize, and deferred
//! destruction.

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::{
    backend::NativeSpec,
    damage::DamageQueue,
    error::{Error, Result},
    geom::{Expanse, FrameRects, Insets, Point, Rect},
    id::{NativeWindow, NodeId, WindowId},
    node::{Node, NodeFlags},
    render::{Color, SubSurface},
    session::Session,
    tree,
    widget::{Widget, WindowHandler},
};

bitflags! {
    /// Per-window state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u16 {
        /// The window holds the modal grab.
        const MODAL = 1;
        /// The user may resize the window from its corner.
        const RESIZABLE = 1 << 1;
        /// A title double-click minimizes the window.
        const MINIMIZABLE = 1 << 2;
        /// Destruction has been requested.
        const DESTROYED = 1 << 3;
        /// A resize was requested and not yet confirmed.
        const PENDING_RESIZE = 1 << 4;
        /// Input to the window is dropped.
        const DISABLED = 1 << 5;
        /// Visibility and opacity have been committed to the native layer.
        const DRAWN = 1 << 6;
        /// The native layer has confirmed the current geometry.
        const CONFIGURED = 1 << 7;
        /// The window is showing only its title.
        const MINIMIZED = 1 << 8;
        /// The window carries decoration chrome.
        const FRAMED = 1 << 9;
    }
}

/// Destruction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Normal operation.
    Live,
    /// Destruction was requested while a dispatch was in progress.
    PendingDestroy,
    /// Resources have been released.
    Destroyed,
}

/// The pointer gesture in progress on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    /// No gesture.
    #[default]
    Idle,
    /// Pointer events route to the window's drag target.
    Dragging,
    /// The window follows the pointer.
    Moving {
        /// Screen pointer position at button-down.
        origin: Point,
        /// Window position at button-down.
        start: Point,
    },
    /// The window's size follows the pointer.
    Resizing {
        /// Screen pointer position at button-down.
        origin: Point,
        /// Content size at button-down.
        start: Expanse,
    },
    /// A title double-click was consumed; wait for the button to come up.
    Title,
}

/// Parameters for a new window.
pub struct WindowSpec {
    /// Content size.
    pub(crate) size: Expanse,
    /// Outer position.
    pub(crate) position: Point,
    /// Title text.
    pub(crate) title: String,
    /// Initial flags.
    pub(crate) flags: WindowFlags,
    /// Opacity committed on first draw.
    pub(crate) opacity: f32,
    /// The window this one was opened from.
    pub(crate) creator: Option<WindowId>,
    /// Window callbacks.
    pub(crate) handler: Option<Box<dyn WindowHandler>>,
    /// Widget for the content root.
    pub(crate) widget: Option<Box<dyn Widget>>,
    /// Content root background.
    pub(crate) background: Option<Color>,
}

impl WindowSpec {
    /// A framed, resizable, minimizable window with `size` content.
    pub fn new(size: impl Into<Expanse>) -> Self {
        Self {
            size: size.into(),
            position: Point::zero(),
            title: String::new(),
            flags: WindowFlags::FRAMED | WindowFlags::RESIZABLE | WindowFlags::MINIMIZABLE,
            opacity: 1.0,
            creator: None,
            handler: None,
            widget: None,
            background: None,
        }
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the outer position.
    pub fn at(mut self, position: impl Into<Point>) -> Self {
        self.position = position.into();
        self
    }

    /// Toggle decoration chrome.
    pub fn framed(mut self, on: bool) -> Self {
        self.flags.set(WindowFlags::FRAMED, on);
        self
    }

    /// Toggle corner resizing.
    pub fn resizable(mut self, on: bool) -> Self {
        self.flags.set(WindowFlags::RESIZABLE, on);
        self
    }

    /// Toggle title double-click minimizing.
    pub fn minimizable(mut self, on: bool) -> Self {
        self.flags.set(WindowFlags::MINIMIZABLE, on);
        self
    }

    /// Set the opacity, clamped to `0.0..=1.0`.
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Record the window this one is opened from.
    pub fn creator(mut self, creator: WindowId) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Attach window callbacks.
    pub fn handler(mut self, handler: impl WindowHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Attach a widget to the content root.
    pub fn widget(mut self, widget: impl Into<Box<dyn Widget>>) -> Self {
        self.widget = Some(widget.into());
        self
    }

    /// Fill the content root with a flat color.
    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

/// A native top-level window and the node tree rooted in it.
pub struct Window {
    /// Native handle.
    pub(crate) native: NativeWindow,
    /// Content root.
    pub(crate) root: NodeId,
    /// Content size.
    pub(crate) size: Expanse,
    /// Outer position on screen.
    pub(crate) position: Point,
    /// Opacity committed on first draw.
    pub(crate) opacity: f32,
    /// Title text.
    pub(crate) title: String,
    /// State bits.
    pub(crate) flags: WindowFlags,
    /// Pending repaints.
    pub(crate) damage: DamageQueue,
    /// Node holding keyboard focus.
    pub(crate) focused: Option<NodeId>,
    /// Node under the pointer.
    pub(crate) entered: Option<NodeId>,
    /// Node receiving every pointer event of the current drag.
    pub(crate) drag: Option<NodeId>,
    /// The window this one was opened from.
    pub(crate) creator: Option<WindowId>,
    /// Decoration insets; zero when unframed.
    pub(crate) frame: Insets,
    /// Pointer gesture in progress.
    pub(crate) gesture: Gesture,
    /// Window callbacks. Taken out while being called.
    pub(crate) handler: Option<Box<dyn WindowHandler>>,
    /// Destruction state.
    pub(crate) lifecycle: Lifecycle,
    /// Number of dispatches in progress for this window.
    pub(crate) guard: u32,
    /// Content size to restore when un-minimizing.
    pub(crate) restore: Option<Expanse>,
    /// Chrome must be repainted on the next flush.
    pub(crate) chrome_dirty: bool,
    /// The window has native keyboard focus.
    pub(crate) active: bool,
}

impl Window {
    /// Native handle.
    pub fn native(&self) -> NativeWindow {
        self.native
    }

    /// Content root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Content size.
    pub fn size(&self) -> Expanse {
        self.size
    }

    /// Outer size.
    pub fn outer_size(&self) -> Expanse {
        self.frame.wrap(self.size)
    }

    /// Outer position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Title text.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// State bits.
    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    /// Pending repaints.
    pub fn damage(&self) -> &DamageQueue {
        &self.damage
    }

    /// Focused node.
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Node under the pointer.
    pub fn entered(&self) -> Option<NodeId> {
        self.entered
    }

    /// Current drag target.
    pub fn drag(&self) -> Option<NodeId> {
        self.drag
    }

    /// The window this one was opened from.
    pub fn creator(&self) -> Option<WindowId> {
        self.creator
    }

    /// Decoration insets.
    pub fn frame(&self) -> Insets {
        self.frame
    }

    /// Pointer gesture in progress.
    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Destruction state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Content rectangle in outer window coordinates.
    pub fn content_rect(&self) -> Rect {
        Rect::at(self.frame.origin(), self.size)
    }

    /// Outer rectangle at the origin.
    pub(crate) fn outer_rect(&self) -> Rect {
        self.outer_size().rect()
    }

    /// Convert an outer window position to content coordinates.
    pub(crate) fn to_content(&self, p: Point) -> Point {
        p - self.frame.origin()
    }

    /// Is the window accepting input?
    pub(crate) fn accepts_input(&self) -> bool {
        !self
            .flags
            .intersects(WindowFlags::DESTROYED | WindowFlags::DISABLED)
    }

    /// Width of the title text in pixels.
    pub(crate) fn title_width(&self, glyph: u32) -> u32 {
        let chars = u32::try_from(self.title.chars().count()).unwrap_or(u32::MAX);
        chars.saturating_mul(glyph)
    }

    /// Area covered by the title text, in outer coordinates.
    pub(crate) fn title_rect(&self, glyph: u32) -> Rect {
        let avail = self.outer_size().w.saturating_sub(self.frame.horizontal());
        Rect::new(
            self.frame.origin().x,
            0,
            self.title_width(glyph).min(avail),
            self.frame.top,
        )
    }

    /// The resize grip, in outer coordinates.
    pub(crate) fn corner_rect(&self, corner: u32) -> Rect {
        let outer = self.outer_rect();
        let w = corner.min(outer.w);
        let h = corner.min(outer.h);
        Rect::new(
            outer.right().saturating_sub(i32::try_from(w).unwrap_or(i32::MAX)),
            outer.bottom().saturating_sub(i32::try_from(h).unwrap_or(i32::MAX)),
            w,
            h,
        )
    }
}

/// Allocate a native window and its content root.
pub(crate) fn create(s: &mut Session, spec: WindowSpec) -> Result<WindowId> {
    let size = spec.size.non_empty()?;
    if let Some(c) = spec.creator
        && !s.windows.contains_key(c)
    {
        return Err(Error::InvalidArgument("creator window is gone".into()));
    }
    let damage = DamageQueue::new(s.config.damage_capacity)?;
    let frame = if spec.flags.contains(WindowFlags::FRAMED) {
        s.config.theme.insets
    } else {
        Insets::zero()
    };
    let outer = frame.wrap(size);

    let native = s.backend.create_window(&NativeSpec {
        position: spec.position,
        size: outer,
        title: spec.title.clone(),
    })?;
    if let Err(e) = s.backend.attach_surface(native, outer) {
        s.backend.destroy_window(native);
        return Err(e);
    }
    s.backend
        .set_opaque_region(native, Rect::at(frame.origin(), size));

    let nodes = &mut s.nodes;
    let id = s.windows.insert_with_key(|wid| {
        let mut node = Node::new(wid, size.rect(), spec.widget);
        node.flags = NodeFlags::VISIBLE;
        node.surface = SubSurface::root(frame.origin(), size);
        node.background = spec.background;
        let root = nodes.insert(node);
        Window {
            native,
            root,
            size,
            position: spec.position,
            opacity: spec.opacity,
            title: spec.title,
            flags: spec.flags | WindowFlags::CONFIGURED,
            damage,
            focused: None,
            entered: None,
            drag: None,
            creator: spec.creator,
            frame,
            gesture: Gesture::Idle,
            handler: spec.handler,
            lifecycle: Lifecycle::Live,
            guard: 0,
            restore: None,
            chrome_dirty: true,
            active: false,
        }
    });
    s.natives.insert(native, id);
    s.order.push(id);
    if let Some(root) = s.windows.get(id).map(|w| w.root) {
        s.request_update(root, None);
    }
    debug!("window {id:?} created: native {}, {}x{}", native.0, size.w, size.h);
    Ok(id)
}

/// Look up a window that has not been destroyed.
pub(crate) fn live(s: &Session, w: WindowId) -> Result<&Window> {
    match s.windows.get(w) {
        Some(win) if !win.flags.contains(WindowFlags::DESTROYED) => Ok(win),
        _ => Err(Error::InvalidArgument(format!("window {w:?} is not live"))),
    }
}

/// Mutable form of [`live`].
pub(crate) fn live_mut(s: &mut Session, w: WindowId) -> Result<&mut Window> {
    match s.windows.get_mut(w) {
        Some(win) if !win.flags.contains(WindowFlags::DESTROYED) => Ok(win),
        _ => Err(Error::InvalidArgument(format!("window {w:?} is not live"))),
    }
}

/// Request a new content size. The change takes effect when the native layer
/// confirms it.
pub(crate) fn resize(s: &mut Session, w: WindowId, size: Expanse) -> Result<()> {
    request_geometry(s, w, None, size)
}

/// Request a new outer position and content size in one native call.
pub(crate) fn set_bounds(s: &mut Session, w: WindowId, position: Point, size: Expanse) -> Result<()> {
    request_geometry(s, w, Some(position), size)
}

/// Mark a resize pending, discard queued damage, and ask the native layer for
/// the new geometry. The flags are rolled back if the request fails.
fn request_geometry(
    s: &mut Session,
    w: WindowId,
    position: Option<Point>,
    size: Expanse,
) -> Result<()> {
    let size = size.non_empty()?;
    let win = live_mut(s, w)?;
    let prior = win.flags;
    win.flags.insert(WindowFlags::PENDING_RESIZE);
    win.flags.remove(WindowFlags::DRAWN | WindowFlags::CONFIGURED);
    win.damage.clear();
    let (native, outer) = (win.native, win.frame.wrap(size));
    trace!("window {w:?}: resize requested to {}x{}", size.w, size.h);
    let requested = match position {
        Some(p) => s.backend.set_bounds(native, Rect::at(p, outer)),
        None => s.backend.resize(native, outer),
    };
    if let Err(e) = requested {
        if let Some(win) = s.windows.get_mut(w) {
            win.flags = prior;
        }
        return Err(e);
    }
    Ok(())
}

/// Apply a size confirmed by the native layer.
pub(crate) fn configure(s: &mut Session, w: WindowId, outer: Expanse) -> Result<()> {
    let Ok(win) = live_mut(s, w) else {
        return Ok(());
    };
    let inner = win.frame.inner(outer);
    let size = Expanse::new(inner.w.max(1), inner.h.max(1));
    win.flags.remove(WindowFlags::PENDING_RESIZE);
    win.flags.insert(WindowFlags::CONFIGURED);
    win.size = size;
    win.chrome_dirty = true;
    let (native, root, origin, full) = (win.native, win.root, win.frame.origin(), win.frame.wrap(size));
    debug!("window {w:?}: resize confirmed at {}x{}", size.w, size.h);

    s.backend.set_opaque_region(native, Rect::at(origin, size));
    s.backend.attach_surface(native, full)?;
    if let Some(node) = s.nodes.get_mut(root) {
        node.rect = size.rect();
        node.surface = SubSurface::root(origin, size);
    }
    tree::recarve(s, root);
    s.request_update(root, None);
    s.with_handler(w, |h, s| h.on_resize(s, w, size))?;
    Ok(())
}

/// Request a new outer position.
pub(crate) fn move_to(s: &mut Session, w: WindowId, position: Point) -> Result<()> {
    let native = live(s, w)?.native;
    s.backend.move_to(native, position)
}

/// Minimize to the title, or restore the cached size.
pub(crate) fn toggle_minimize(s: &mut Session, w: WindowId) -> Result<()> {
    let glyph = s.config.theme.glyph_width;
    let win = live_mut(s, w)?;
    if !win.flags.contains(WindowFlags::MINIMIZABLE) {
        return Err(Error::InvalidArgument(format!(
            "window {w:?} is not minimizable"
        )));
    }
    let (prior, prior_restore) = (win.flags, win.restore);
    let old_outer = win.outer_size();
    let target = if win.flags.contains(WindowFlags::MINIMIZED) {
        win.flags.remove(WindowFlags::MINIMIZED);
        win.restore.take().unwrap_or(win.size)
    } else {
        win.restore = Some(win.size);
        win.flags.insert(WindowFlags::MINIMIZED);
        Expanse::new(win.title_width(glyph).max(1), 1)
    };
    let new_outer = win.frame.wrap(target);
    let dx = (i64::from(old_outer.w) - i64::from(new_outer.w)) / 2;
    let dx = i32::try_from(dx).unwrap_or(0);
    let position = Point::new(win.position.x.saturating_add(dx), win.position.y);
    debug!(
        "window {w:?}: {} to {}x{}",
        if win.flags.contains(WindowFlags::MINIMIZED) {
            "minimize"
        } else {
            "restore"
        },
        target.w,
        target.h
    );
    let requested = if position == win.position {
        resize(s, w, target)
    } else {
        set_bounds(s, w, position, target)
    };
    if requested.is_err()
        && let Some(win) = s.windows.get_mut(w)
    {
        win.flags = prior;
        win.restore = prior_restore;
    }
    requested
}

/// Request destruction. Deferred while a dispatch for the window is running.
pub(crate) fn destroy(s: &mut Session, w: WindowId) {
    let Some(win) = s.windows.get_mut(w) else {
        return;
    };
    if win.flags.contains(WindowFlags::DESTROYED) {
        return;
    }
    win.flags.insert(WindowFlags::DESTROYED);
    win.damage.clear();
    if win.guard > 0 {
        win.lifecycle = Lifecycle::PendingDestroy;
        debug!("window {w:?}: destroy deferred");
        return;
    }
    finalize(s, w);
}

/// Release every resource held by a window and deregister it.
pub(crate) fn finalize(s: &mut Session, w: WindowId) {
    let Some(win) = s.windows.get_mut(w) else {
        return;
    };
    win.lifecycle = Lifecycle::Destroyed;
    let (native, root) = (win.native, win.root);
    debug!("window {w:?}: destroyed");

    if s.modal == Some(w) {
        s.clear_modal(w);
    } else if s.grabbed == Some(w) {
        s.release_grab(w);
    }
    if s.pointer.window == Some(w) {
        s.pointer.window = None;
    }
    if let Some(mut h) = s.windows.get_mut(w).and_then(|win| win.handler.take()) {
        h.on_destroy(s, w);
    }
    tree::destroy_subtree(s, root);
    s.backend.release_surface(native);
    s.backend.destroy_window(native);
    s.natives.remove(&native);
    s.order.retain(|o| *o != w);
    s.windows.remove(w);
}

/// Paint the frame and title in outer coordinates.
pub(crate) fn paint_chrome(s: &mut Session, w: WindowId) -> Result<()> {
    let theme = &s.config.theme;
    let Some(win) = s.windows.get_mut(w) else {
        return Ok(());
    };
    win.chrome_dirty = false;
    if !win.flags.contains(WindowFlags::FRAMED) || win.frame.is_zero() {
        return Ok(());
    }
    let rects = FrameRects::new(win.outer_rect(), win.frame);
    let color = if win.active {
        theme.focused_frame_color
    } else {
        theme.frame_color
    };
    let title = win.title.clone();
    let at = Point::new(win.frame.origin().x, 0);
    let native = win.native;
    let (title_color, top) = (theme.title_color, rects.top);

    let canvas = s.backend.canvas(native)?;
    for r in rects.edges() {
        canvas.fill(r, color);
    }
    if !title.is_empty() {
        canvas.text(at, &title, title_color, top);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder() {
        let spec = WindowSpec::new((10, 10))
            .title("x")
            .resizable(false)
            .opacity(3.0);
        assert!(!spec.flags.contains(WindowFlags::RESIZABLE));
        assert!(spec.flags.contains(WindowFlags::FRAMED));
        assert_eq!(spec.opacity, 1.0);
    }
}
