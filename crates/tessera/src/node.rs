use bitflags::bitflags;

use crate::{
    geom::{Point, Rect},
    id::{NodeId, WindowId},
    render::{Color, SubSurface},
    widget::Widget,
};

bitflags! {
    /// Per-node state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node and its subtree are drawn and hit-tested.
        const VISIBLE = 1;
        /// The node receives pointer input.
        const ACTIVE = 1 << 1;
        /// The node holds keyboard focus in its window.
        const FOCUSED = 1 << 2;
        /// Hit-testing stops at this node; descendants never receive the
        /// pointer directly.
        const CATCH_ALL = 1 << 3;
        /// The node takes keyboard focus when clicked.
        const HANDLES_KEYS = 1 << 4;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::ACTIVE
    }
}

/// Core node data stored in the session arena.
pub struct Node {
    /// Widget behavior and state. Taken out while the widget is being called.
    pub(crate) widget: Option<Box<dyn Widget>>,

    /// Parent in the arena tree.
    pub(crate) parent: Option<NodeId>,
    /// Children in insertion order.
    pub(crate) children: Vec<NodeId>,
    /// Owning window.
    pub(crate) window: WindowId,

    /// Outer rect relative to the parent's origin.
    pub(crate) rect: Rect,
    /// State bits.
    pub(crate) flags: NodeFlags,
    /// Drawable region carved from the parent surface.
    pub(crate) surface: SubSurface,
    /// Flat fill drawn before the widget.
    pub(crate) background: Option<Color>,
}

impl Node {
    /// Construct a detached node.
    pub(crate) fn new(window: WindowId, rect: Rect, widget: Option<Box<dyn Widget>>) -> Self {
        Self {
            widget,
            parent: None,
            children: Vec::new(),
            window,
            rect,
            flags: NodeFlags::default(),
            surface: SubSurface::detached(),
            background: None,
        }
    }

    /// Return the node's parent, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Return the node's children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Return the window that owns this node.
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Return the node's rect in parent coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Return the node's flags.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Return the node's carved surface.
    pub fn surface(&self) -> SubSurface {
        self.surface
    }

    /// Return the node's background color.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Is the node itself flagged visible? Ancestors are not consulted.
    pub fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// Does a point in parent coordinates fall inside this node?
    pub fn contains(&self, p: Point) -> bool {
        self.rect.contains(p)
    }

    /// The widget's short name, or `node` for a bare node.
    pub fn name(&self) -> &'static str {
        self.widget.as_ref().map_or("node", |w| w.name())
    }
}
