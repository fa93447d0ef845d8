use std::collections::HashMap;

use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::{
    backend::Backend,
    config::Config,
    damage,
    error::{Error, Result},
    event::Buttons,
    event_loop::LoopHandle,
    geom::{Expanse, Point, Rect},
    id::{NativeWindow, NodeId, WindowId},
    node::{Node, NodeFlags},
    render::Color,
    router, tree,
    widget::{Context, Widget, WindowHandler},
    window::{self, Lifecycle, Window, WindowFlags, WindowSpec},
};

/// What the session remembers about the pointer.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Pointer {
    /// Window the pointer is in.
    pub(crate) window: Option<WindowId>,
    /// Last position, in that window's outer coordinates.
    pub(crate) pos: Point,
    /// Last screen position.
    pub(crate) root: Point,
    /// Buttons held.
    pub(crate) buttons: Buttons,
    /// A motion event arrived since the last pointer revalidation.
    pub(crate) moved: bool,
    /// Window and time of the last primary click on a title.
    pub(crate) title_click: Option<(WindowId, u64)>,
}

/// All UI state: the node arena, the window registry, modal and grab state,
/// and the native backend.
///
/// A session is owned by an [`EventLoop`](crate::EventLoop) and is only
/// touched from the loop's thread; widgets and handlers reach it through
/// their callbacks.
pub struct Session {
    /// Node arena.
    pub(crate) nodes: SlotMap<NodeId, Node>,
    /// Window arena.
    pub(crate) windows: SlotMap<WindowId, Window>,
    /// Live windows in creation order.
    pub(crate) order: Vec<WindowId>,
    /// Native handle lookup.
    pub(crate) natives: HashMap<NativeWindow, WindowId>,
    /// The window holding the modal grab.
    pub(crate) modal: Option<WindowId>,
    /// The window holding the native grab.
    pub(crate) grabbed: Option<WindowId>,
    /// Pointer cache.
    pub(crate) pointer: Pointer,
    /// Native layer.
    pub(crate) backend: Box<dyn Backend>,
    /// Settings.
    pub(crate) config: Config,
    /// Scheduling handle for the owning loop.
    pub(crate) handle: LoopHandle,
}

impl Session {
    /// Construct an empty session.
    pub(crate) fn new(backend: Box<dyn Backend>, config: Config, handle: LoopHandle) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            windows: SlotMap::with_key(),
            order: Vec::new(),
            natives: HashMap::new(),
            modal: None,
            grabbed: None,
            pointer: Pointer::default(),
            backend,
            config,
            handle,
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A handle for scheduling timeouts and idle callbacks.
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// The native backend.
    pub fn backend(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    // Windows

    /// Create a window and its content root.
    pub fn create_window(&mut self, spec: WindowSpec) -> Result<WindowId> {
        window::create(self, spec)
    }

    /// Request a new content size; it applies once the native layer confirms.
    pub fn resize_window(&mut self, w: WindowId, size: impl Into<Expanse>) -> Result<()> {
        window::resize(self, w, size.into())
    }

    /// Request a new outer position and content size together.
    pub fn set_window_bounds(
        &mut self,
        w: WindowId,
        position: impl Into<Point>,
        size: impl Into<Expanse>,
    ) -> Result<()> {
        window::set_bounds(self, w, position.into(), size.into())
    }

    /// Request a new outer position.
    pub fn move_window(&mut self, w: WindowId, position: impl Into<Point>) -> Result<()> {
        window::move_to(self, w, position.into())
    }

    /// Raise a window to the top of the stack.
    pub fn raise_window(&mut self, w: WindowId) -> Result<()> {
        let native = window::live(self, w)?.native;
        self.backend.raise(native);
        Ok(())
    }

    /// Lower a window to the bottom of the stack.
    pub fn lower_window(&mut self, w: WindowId) -> Result<()> {
        let native = window::live(self, w)?.native;
        self.backend.lower(native);
        Ok(())
    }

    /// Set a window's opacity. Before the first draw it is only recorded.
    pub fn set_opacity(&mut self, w: WindowId, opacity: f32) -> Result<()> {
        let win = window::live_mut(self, w)?;
        win.opacity = opacity.clamp(0.0, 1.0);
        if win.flags.contains(WindowFlags::DRAWN) {
            let (native, opacity) = (win.native, win.opacity);
            self.backend.set_opacity(native, opacity);
        }
        Ok(())
    }

    /// Change a window's title and repaint its chrome.
    pub fn set_title(&mut self, w: WindowId, title: impl Into<String>) -> Result<()> {
        let win = window::live_mut(self, w)?;
        win.title = title.into();
        win.chrome_dirty = true;
        Ok(())
    }

    /// Drop or accept input for a window.
    pub fn set_disabled(&mut self, w: WindowId, disabled: bool) -> Result<()> {
        window::live_mut(self, w)?
            .flags
            .set(WindowFlags::DISABLED, disabled);
        Ok(())
    }

    /// Minimize a window to its title, or restore it.
    pub fn toggle_minimize(&mut self, w: WindowId) -> Result<()> {
        window::toggle_minimize(self, w)
    }

    /// Destroy a window. Repeated calls are no-ops; while a dispatch for the
    /// window is in progress, the work is deferred until it unwinds.
    pub fn destroy_window(&mut self, w: WindowId) {
        window::destroy(self, w);
    }

    /// Destroy every window, newest first.
    pub fn destroy_all(&mut self) {
        for w in self.order.clone().into_iter().rev() {
            window::destroy(self, w);
        }
    }

    /// Make a window modal, or release its modal grab.
    pub fn set_modal(&mut self, w: WindowId, modal: bool) -> Result<()> {
        window::live(self, w)?;
        if modal {
            router::set_modal(self, w)
        } else {
            self.clear_modal(w);
            Ok(())
        }
    }

    /// The current modal window.
    pub fn modal(&self) -> Option<WindowId> {
        self.modal
    }

    /// The window holding the native grab.
    pub fn grabbed(&self) -> Option<WindowId> {
        self.grabbed
    }

    /// Look up a window.
    pub fn window(&self, w: WindowId) -> Option<&Window> {
        self.windows.get(w)
    }

    /// Windows in creation order.
    pub fn windows(&self) -> &[WindowId] {
        &self.order
    }

    /// Map a native handle to its window.
    pub fn window_for(&self, native: NativeWindow) -> Option<WindowId> {
        self.natives.get(&native).copied()
    }

    /// The content root of a window.
    pub fn root(&self, w: WindowId) -> Option<NodeId> {
        self.windows.get(w).map(|w| w.root)
    }

    // Nodes

    /// Create a node as the last child of `parent`.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        rect: Rect,
        widget: Option<Box<dyn Widget>>,
    ) -> Result<NodeId> {
        tree::create(self, parent, rect, widget)
    }

    /// Attach a detached node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        tree::add_child(self, parent, child)
    }

    /// Detach a child. Fails with `NotFound`, changing nothing, if `child` is
    /// not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        tree::remove_child(self, parent, child)
    }

    /// Detach and destroy a node and its subtree.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<()> {
        tree::destroy(self, id)
    }

    /// Move and resize a node.
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<()> {
        tree::set_rect(self, id, rect)
    }

    /// Show or hide a node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        tree::set_visible(self, id, visible)
    }

    /// Replace a node's flags, except `FOCUSED`.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<()> {
        tree::set_flags(self, id, flags)
    }

    /// Set or clear a node's background.
    pub fn set_background(&mut self, id: NodeId, color: Option<Color>) -> Result<()> {
        tree::set_background(self, id, color)
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// A node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// A node's children in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[][..], |n| n.children.as_slice())
    }

    /// The window a node belongs to. Detached nodes keep the window they were
    /// created in.
    pub fn window_of(&self, id: NodeId) -> Option<WindowId> {
        self.nodes.get(id).map(|n| n.window)
    }

    /// Translate a point in a node's local coordinates to window content
    /// coordinates.
    pub fn to_window(&self, id: NodeId, p: Point) -> Option<Point> {
        tree::origin(self, id).map(|o| o + p)
    }

    /// Is `a` a strict ancestor of `b`?
    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        tree::is_ancestor(self, a, b)
    }

    /// Deepest visible node at a point in window content coordinates.
    pub fn hit_test(&self, w: WindowId, p: Point) -> Option<NodeId> {
        router::hit_test(self, w, p)
    }

    /// Move keyboard focus within a window.
    pub fn set_focus(&mut self, w: WindowId, id: NodeId) -> Result<()> {
        router::set_focus(self, w, id)
    }

    /// Cancel a window's drag in progress and release its pointer grab.
    pub fn release_drag(&mut self, w: WindowId) -> Result<()> {
        router::release_drag(self, w)
    }

    // Damage

    /// Queue a repaint of `region` in `id`'s local coordinates, or of the
    /// whole node.
    pub fn request_update(&mut self, id: NodeId, region: Option<Rect>) {
        damage::request_update(self, id, region);
    }

    /// Redraw every window with pending damage.
    pub fn flush(&mut self) -> Result<()> {
        damage::flush(self)
    }

    /// Re-run enter/leave against the cached pointer if it has not moved
    /// since the last check.
    pub fn recheck_pointer(&mut self) -> Result<()> {
        router::recheck_pointer(self)
    }

    // Callbacks

    /// Call a node's widget with a context, the widget lifted out of its slot
    /// for the duration. Returns `None` if the node has no widget.
    pub(crate) fn with_widget<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn Widget, &mut Context) -> Result<R>,
    ) -> Result<Option<R>> {
        let Some(mut widget) = self.nodes.get_mut(id).and_then(|n| n.widget.take()) else {
            return Ok(None);
        };
        let out = f(widget.as_mut(), &mut Context::new(self, id));
        match self.nodes.get_mut(id) {
            Some(n) if n.widget.is_none() => n.widget = Some(widget),
            Some(_) => {}
            None => widget.destroy(&mut Context::new(self, id)),
        }
        out.map(Some)
    }

    /// Call a window's handler, lifted out of its slot for the duration.
    pub(crate) fn with_handler<R>(
        &mut self,
        w: WindowId,
        f: impl FnOnce(&mut dyn WindowHandler, &mut Self) -> Result<R>,
    ) -> Result<Option<R>> {
        let Some(mut h) = self.windows.get_mut(w).and_then(|w| w.handler.take()) else {
            return Ok(None);
        };
        let out = f(h.as_mut(), self);
        if let Some(win) = self.windows.get_mut(w)
            && win.handler.is_none()
        {
            win.handler = Some(h);
        }
        out.map(Some)
    }

    /// Note that a dispatch for `w` is starting.
    pub(crate) fn enter_dispatch(&mut self, w: WindowId) {
        if let Some(win) = self.windows.get_mut(w) {
            win.guard += 1;
        }
    }

    /// Note that a dispatch for `w` has finished, and complete a deferred
    /// destroy if this was the last one.
    pub(crate) fn leave_dispatch(&mut self, w: WindowId) {
        let Some(win) = self.windows.get_mut(w) else {
            return;
        };
        win.guard = win.guard.saturating_sub(1);
        if win.guard == 0 && win.lifecycle == Lifecycle::PendingDestroy {
            window::finalize(self, w);
        }
    }

    /// Grab the pointer, and the keyboard if asked, for `w`.
    pub(crate) fn grab(&mut self, w: WindowId, keyboard: bool) -> Result<()> {
        let native = self
            .windows
            .get(w)
            .map(|w| w.native)
            .ok_or_else(|| Error::NotFound(format!("window {w:?}")))?;
        self.backend.grab(native, keyboard)?;
        debug!("grab: {w:?} keyboard={keyboard}");
        self.grabbed = Some(w);
        Ok(())
    }

    /// Release a gesture grab held by `w`, handing the grab back to the modal
    /// window if there is one.
    pub(crate) fn release_grab(&mut self, w: WindowId) {
        if self.grabbed != Some(w) || self.modal == Some(w) {
            return;
        }
        self.backend.ungrab();
        self.grabbed = None;
        debug!("ungrab: {w:?}");
        if let Some(m) = self.modal
            && let Err(e) = self.grab(m, true)
        {
            warn!("could not restore modal grab for {m:?}: {e}");
        }
    }

    /// Clear `w`'s modal state and hand the modal grab on.
    pub(crate) fn clear_modal(&mut self, w: WindowId) {
        router::clear_modal(self, w);
    }
}
