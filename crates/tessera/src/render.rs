//! Clipped drawing surfaces and the recursive draw walk.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::{
    error::Result,
    geom::{Expanse, Point, Rect},
    id::NodeId,
    node::{Node, NodeFlags},
};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    #[serde(default = "opaque")]
    pub a: u8,
}

/// Default alpha for deserialized colors.
fn opaque() -> u8 {
    u8::MAX
}

impl Color {
    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Drawing primitives exposed by a native surface. All coordinates are in
/// outer window space; callers are responsible for clipping fills.
pub trait Canvas {
    /// Fill a rectangle with a flat color.
    fn fill(&mut self, rect: Rect, color: Color);

    /// Draw a run of text with its top-left at `at`, clipped to `clip`.
    fn text(&mut self, at: Point, text: &str, color: Color, clip: Rect);
}

/// A node's drawable region, carved from its parent's surface.
///
/// `origin` is where the node's local (0, 0) lands in outer window space;
/// `clip` is the part of the window the node may touch. A child's clip is
/// always contained in its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubSurface {
    /// Window-space location of the node's local origin.
    pub origin: Point,
    /// Window-space clip rectangle.
    pub clip: Rect,
}

impl SubSurface {
    /// The allocation root for a window's content node.
    pub fn root(origin: Point, size: Expanse) -> Self {
        Self {
            origin,
            clip: Rect::at(origin, size),
        }
    }

    /// A surface for a node outside any window tree. It clips everything.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Carve a child surface for a node at `rect` in this surface's
    /// coordinates.
    pub fn carve(&self, rect: Rect) -> Self {
        let origin = self.origin + rect.tl();
        let clip = Rect::at(origin, rect.size())
            .intersect(&self.clip)
            .unwrap_or_else(|| Rect::at(origin, Expanse::default()));
        Self { origin, clip }
    }

    /// True if nothing drawn through this surface can be visible.
    pub fn is_clipped(&self) -> bool {
        self.clip.is_empty()
    }
}

/// A renderer bound to one node: coordinates are node-local, and everything
/// is clipped to the region being redrawn.
pub struct Render<'a> {
    /// Destination surface.
    canvas: &'a mut dyn Canvas,
    /// Window-space location of local (0, 0).
    origin: Point,
    /// Window-space clip.
    clip: Rect,
}

impl<'a> Render<'a> {
    /// Construct a renderer. `clip` is in window space.
    pub fn new(canvas: &'a mut dyn Canvas, origin: Point, clip: Rect) -> Self {
        Self {
            canvas,
            origin,
            clip,
        }
    }

    /// The clip rectangle in local coordinates.
    pub fn clip(&self) -> Rect {
        self.clip.translate(-self.origin)
    }

    /// Fill a local rectangle. Parts outside the clip are dropped.
    pub fn fill(&mut self, rect: Rect, color: Color) {
        if let Some(r) = rect.translate(self.origin).intersect(&self.clip) {
            self.canvas.fill(r, color);
        }
    }

    /// Draw text at a local position.
    pub fn text(&mut self, at: Point, text: &str, color: Color) {
        if !self.clip.is_empty() && !text.is_empty() {
            self.canvas.text(at + self.origin, text, color, self.clip);
        }
    }
}

/// Redraw `region` (in `id`'s local coordinates) of a subtree, depth-first.
///
/// Invisible nodes and regions that miss the node short-circuit. The
/// background is filled first, then the widget draws, then each child in
/// insertion order, then the widget's after-draw hook.
pub(crate) fn draw_tree(
    nodes: &mut SlotMap<NodeId, Node>,
    canvas: &mut dyn Canvas,
    id: NodeId,
    region: Rect,
) -> Result<()> {
    let Some(node) = nodes.get(id) else {
        return Ok(());
    };
    if !node.flags.contains(NodeFlags::VISIBLE) {
        return Ok(());
    }
    let Some(region) = region.intersect(&node.rect.at_origin()) else {
        return Ok(());
    };
    let surface = node.surface;
    let Some(clip) = region.translate(surface.origin).intersect(&surface.clip) else {
        return Ok(());
    };
    let background = node.background;
    let children = node.children.clone();

    {
        let mut render = Render::new(canvas, surface.origin, clip);
        if let Some(color) = background {
            render.fill(region, color);
        }
        if let Some(widget) = nodes.get_mut(id).and_then(|n| n.widget.as_mut()) {
            widget.draw(&mut render, region, background.is_some())?;
        }
    }

    for child in children {
        let Some(offset) = nodes.get(child).map(|n| n.rect.tl()) else {
            continue;
        };
        draw_tree(nodes, canvas, child, region.translate(-offset))?;
    }

    if let Some(widget) = nodes.get_mut(id).and_then(|n| n.widget.as_mut()) {
        let mut render = Render::new(canvas, surface.origin, clip);
        widget.draw_after(&mut render, region)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Fills(Vec<Rect>);

    impl Canvas for Fills {
        fn fill(&mut self, rect: Rect, _color: Color) {
            self.0.push(rect);
        }

        fn text(&mut self, _at: Point, _text: &str, _color: Color, _clip: Rect) {}
    }

    #[test]
    fn carve_clips_to_parent() {
        let root = SubSurface::root(Point::new(2, 20), Expanse::new(100, 50));
        let child = root.carve(Rect::new(90, 40, 20, 20));
        assert_eq!(child.origin, Point::new(92, 60));
        assert_eq!(child.clip, Rect::new(92, 60, 10, 10));

        let outside = root.carve(Rect::new(200, 0, 5, 5));
        assert!(outside.is_clipped());
        let nested = outside.carve(Rect::new(0, 0, 5, 5));
        assert!(nested.is_clipped());
    }

    #[test]
    fn render_translates_and_clips() {
        let mut fills = Fills::default();
        let mut r = Render::new(&mut fills, Point::new(10, 10), Rect::new(10, 10, 5, 5));
        r.fill(Rect::new(0, 0, 100, 100), Color::rgb(0, 0, 0));
        r.fill(Rect::new(6, 6, 2, 2), Color::rgb(0, 0, 0));
        assert_eq!(r.clip(), Rect::new(0, 0, 5, 5));
        assert_eq!(fills.0, vec![Rect::new(10, 10, 5, 5)]);
    }
}
