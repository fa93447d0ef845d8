//! Widget and window capability traits, and the context handed to them.

use std::any::{Any, type_name};

use crate::{
    error::Result,
    event::{Button, Buttons, KeyEvent, WheelEvent},
    event_loop::LoopHandle,
    geom::{Expanse, Point, Rect},
    id::{NodeId, WindowId},
    render::Render,
    session::Session,
};

/// The result of a key or wheel handler.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EventOutcome {
    /// The event was processed and propagation stops.
    Handle,
    /// The event was processed without a state change and propagation stops.
    Consume,
    /// The event was not handled and will bubble up the tree.
    Ignore,
}

impl EventOutcome {
    /// Should the event keep bubbling?
    pub fn is_ignored(self) -> bool {
        self == Self::Ignore
    }
}

/// Widgets are the behavior attached to nodes. Every method has a default,
/// so a widget only implements the capabilities it has.
///
/// Pointer positions are in the receiving node's local coordinates.
pub trait Widget: Any {
    /// Draw this widget's own content within `region` (local coordinates).
    /// `cleared` is true when the node's background was just filled.
    fn draw(&mut self, _r: &mut Render, _region: Rect, _cleared: bool) -> Result<()> {
        Ok(())
    }

    /// Draw over the top of the node's children.
    fn draw_after(&mut self, _r: &mut Render, _region: Rect) -> Result<()> {
        Ok(())
    }

    /// Called once when the node is destroyed, parents before children.
    fn destroy(&mut self, _ctx: &mut Context) {}

    /// The node gained keyboard focus.
    fn on_focus_in(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// The node lost keyboard focus.
    fn on_focus_out(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// The pointer entered the node.
    fn on_enter(&mut self, _ctx: &mut Context, _pos: Point) -> Result<()> {
        Ok(())
    }

    /// The pointer left the node.
    fn on_leave(&mut self, _ctx: &mut Context, _pos: Point) -> Result<()> {
        Ok(())
    }

    /// The pointer moved over the node, or anywhere while the node is the
    /// drag target.
    fn on_motion(&mut self, _ctx: &mut Context, _pos: Point, _buttons: Buttons) -> Result<()> {
        Ok(())
    }

    /// A pointer button was pressed.
    fn on_button_down(&mut self, _ctx: &mut Context, _pos: Point, _button: Button) -> Result<()> {
        Ok(())
    }

    /// A pointer button was released.
    fn on_button_up(&mut self, _ctx: &mut Context, _pos: Point, _button: Button) -> Result<()> {
        Ok(())
    }

    /// A key was pressed while the node or a descendant held focus.
    fn on_key_down(&mut self, _ctx: &mut Context, _key: &KeyEvent) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// A key was released while the node or a descendant held focus.
    fn on_key_up(&mut self, _ctx: &mut Context, _key: &KeyEvent) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// The scroll wheel moved over the node.
    fn on_wheel(&mut self, _ctx: &mut Context, _wheel: &WheelEvent) -> Result<EventOutcome> {
        Ok(EventOutcome::Ignore)
    }

    /// Short type name, used in dumps and logs.
    fn name(&self) -> &'static str {
        let name = type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Convert widgets into boxed trait objects.
impl<W> From<W> for Box<dyn Widget>
where
    W: Widget + 'static,
{
    fn from(widget: W) -> Self {
        Box::new(widget)
    }
}

/// Window-level callbacks. Every method has a default.
pub trait WindowHandler {
    /// The window's outer position changed.
    fn on_move(&mut self, _s: &mut Session, _w: WindowId, _position: Point) -> Result<()> {
        Ok(())
    }

    /// A resize was confirmed. `size` is the new content size.
    fn on_resize(&mut self, _s: &mut Session, _w: WindowId, _size: Expanse) -> Result<()> {
        Ok(())
    }

    /// The user asked to close the window. Returning true destroys it.
    fn on_close(&mut self, _s: &mut Session, _w: WindowId) -> Result<bool> {
        Ok(true)
    }

    /// The window is being destroyed. Its node tree is still intact.
    fn on_destroy(&mut self, _s: &mut Session, _w: WindowId) {}

    /// The window gained keyboard focus.
    fn on_focus_in(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        Ok(())
    }

    /// The window lost keyboard focus.
    fn on_focus_out(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        Ok(())
    }

    /// The pointer entered the window.
    fn on_enter(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        Ok(())
    }

    /// The pointer left the window.
    fn on_leave(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        Ok(())
    }

    /// A node was added to the window's tree.
    fn on_box_added(&mut self, _s: &mut Session, _w: WindowId, _node: NodeId) -> Result<()> {
        Ok(())
    }

    /// A node is about to be detached from the window's tree.
    fn on_box_to_be_removed(
        &mut self,
        _s: &mut Session,
        _w: WindowId,
        _node: NodeId,
    ) -> Result<()> {
        Ok(())
    }
}

/// Access to the session from inside a widget callback.
pub struct Context<'a> {
    /// The session.
    session: &'a mut Session,
    /// The node whose widget is being called.
    node: NodeId,
}

impl<'a> Context<'a> {
    /// Construct a context for `node`.
    pub(crate) fn new(session: &'a mut Session, node: NodeId) -> Self {
        Self { session, node }
    }

    /// The node whose widget is being called.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// The node's window. `None` once the node has been destroyed.
    pub fn window_id(&self) -> Option<WindowId> {
        self.session.window_of(self.node)
    }

    /// The node's rect in parent coordinates.
    pub fn rect(&self) -> Option<Rect> {
        self.session.node(self.node).map(|n| n.rect())
    }

    /// The full session.
    pub fn session(&mut self) -> &mut Session {
        self.session
    }

    /// A handle for scheduling timeouts and idle callbacks.
    pub fn handle(&self) -> LoopHandle {
        self.session.handle()
    }

    /// Queue a repaint of `region` (local coordinates), or the whole node.
    pub fn request_update(&mut self, region: Option<Rect>) {
        self.session.request_update(self.node, region);
    }

    /// Move keyboard focus to this node.
    pub fn focus(&mut self) -> Result<()> {
        let Some(window) = self.window_id() else {
            return Ok(());
        };
        self.session.set_focus(window, self.node)
    }
}
