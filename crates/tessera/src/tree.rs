//! Node tree structure: creation, splicing, destruction, and surface carving.

use tracing::trace;

use crate::{
    error::{Error, Result},
    geom::{Point, Rect},
    id::{NodeId, WindowId},
    node::{Node, NodeFlags},
    render::{Color, SubSurface},
    session::Session,
    widget::{Context, Widget},
    window::{Gesture, WindowFlags},
};

/// Fetch a node or fail with `NotFound`.
fn get(s: &Session, id: NodeId) -> Result<&Node> {
    s.nodes
        .get(id)
        .ok_or_else(|| Error::NotFound(format!("node {id:?}")))
}

/// Is `id` the content root of some window?
fn is_root(s: &Session, id: NodeId) -> bool {
    s.windows.values().any(|w| w.root == id)
}

/// Create a node as the last child of `parent`.
pub(crate) fn create(
    s: &mut Session,
    parent: NodeId,
    rect: Rect,
    widget: Option<Box<dyn Widget>>,
) -> Result<NodeId> {
    rect.size().non_empty()?;
    let p = get(s, parent)?;
    let (window, surface) = (p.window, p.surface.carve(rect));
    let mut node = Node::new(window, rect, widget);
    node.parent = Some(parent);
    node.surface = surface;
    let id = s.nodes.insert(node);
    if let Some(p) = s.nodes.get_mut(parent) {
        p.children.push(id);
    }
    trace!("node {id:?} created under {parent:?}");
    s.request_update(id, None);
    s.with_handler(window, |h, s| h.on_box_added(s, window, id))?;
    Ok(id)
}

/// Attach a detached subtree as the last child of `parent`.
pub(crate) fn add_child(s: &mut Session, parent: NodeId, child: NodeId) -> Result<()> {
    let window = get(s, parent)?.window;
    let c = get(s, child)?;
    if c.parent.is_some() || is_root(s, child) {
        return Err(Error::InvalidArgument(format!(
            "node {child:?} is already attached"
        )));
    }
    if is_ancestor(s, child, parent) {
        return Err(Error::InvalidArgument(format!(
            "attaching {child:?} under {parent:?} would create a cycle"
        )));
    }
    if let Some(p) = s.nodes.get_mut(parent) {
        p.children.push(child);
    }
    if let Some(c) = s.nodes.get_mut(child) {
        c.parent = Some(parent);
    }
    for id in preorder(s, child) {
        if let Some(n) = s.nodes.get_mut(id) {
            n.window = window;
        }
    }
    recarve(s, parent);
    s.request_update(child, None);
    s.with_handler(window, |h, s| h.on_box_added(s, window, child))?;
    Ok(())
}

/// Detach `child` from `parent`. The subtree survives, detached.
pub(crate) fn remove_child(s: &mut Session, parent: NodeId, child: NodeId) -> Result<()> {
    let p = get(s, parent)?;
    if !p.children.contains(&child) {
        return Err(Error::NotFound(format!(
            "{child:?} is not a child of {parent:?}"
        )));
    }
    let window = p.window;
    s.with_handler(window, |h, s| h.on_box_to_be_removed(s, window, child))?;
    purge(s, window, child)?;

    if let Some(rect) = s.nodes.get(child).map(|n| n.rect) {
        s.request_update(parent, Some(rect));
    }

    if let Some(p) = s.nodes.get_mut(parent) {
        p.children.retain(|c| *c != child);
    }
    if let Some(c) = s.nodes.get_mut(child) {
        c.parent = None;
    }
    for id in preorder(s, child) {
        if let Some(n) = s.nodes.get_mut(id) {
            n.surface = SubSurface::detached();
        }
    }
    trace!("node {child:?} removed from {parent:?}");
    Ok(())
}

/// Drop every window reference into the subtree at `top`. Focus moves to the
/// window root first, since that is the only step that can fail. A window
/// already marked destroyed gets no focus callbacks.
fn purge(s: &mut Session, window: WindowId, top: NodeId) -> Result<()> {
    let Some(win) = s.windows.get(window) else {
        return Ok(());
    };
    let (focused, entered, drag, root) = (win.focused, win.entered, win.drag, win.root);
    let destroyed = win.flags.contains(WindowFlags::DESTROYED);
    let inside = |s: &Session, n: Option<NodeId>| n.is_some_and(|n| is_ancestor_or_self(s, top, n));

    if inside(s, focused) {
        if destroyed {
            if let Some(n) = focused.and_then(|f| s.nodes.get_mut(f)) {
                n.flags.remove(NodeFlags::FOCUSED);
            }
            if let Some(n) = s.nodes.get_mut(root) {
                n.flags.insert(NodeFlags::FOCUSED);
            }
            if let Some(win) = s.windows.get_mut(window) {
                win.focused = Some(root);
            }
        } else {
            s.set_focus(window, root)?;
        }
    }
    if inside(s, entered)
        && let Some(win) = s.windows.get_mut(window)
    {
        win.entered = None;
    }
    if inside(s, drag) {
        if let Some(win) = s.windows.get_mut(window) {
            win.drag = None;
            win.gesture = Gesture::Idle;
        }
        s.release_grab(window);
    }
    Ok(())
}

/// Destroy a node and everything under it.
pub(crate) fn destroy(s: &mut Session, id: NodeId) -> Result<()> {
    if is_root(s, id) {
        return Err(Error::InvalidArgument(format!(
            "{id:?} is a window root; destroy the window instead"
        )));
    }
    let n = get(s, id)?;
    let (parent, window) = (n.parent, n.window);
    match parent {
        Some(parent) => remove_child(s, parent, id)?,
        None => purge(s, window, id)?,
    }
    destroy_subtree(s, id);
    Ok(())
}

/// Destroy a detached subtree top-down, then free it.
pub(crate) fn destroy_subtree(s: &mut Session, top: NodeId) {
    let order = preorder(s, top);
    for id in &order {
        let Some(mut widget) = s.nodes.get_mut(*id).and_then(|n| n.widget.take()) else {
            continue;
        };
        widget.destroy(&mut Context::new(s, *id));
    }
    for id in order {
        s.nodes.remove(id);
    }
    trace!("subtree {top:?} destroyed");
}

/// Nodes of a subtree, parents before children.
pub(crate) fn preorder(s: &Session, top: NodeId) -> Vec<NodeId> {
    let mut out = vec![];
    let mut stack = vec![top];
    while let Some(id) = stack.pop() {
        let Some(n) = s.nodes.get(id) else {
            continue;
        };
        out.push(id);
        stack.extend(n.children.iter().rev());
    }
    out
}

/// Re-derive the surfaces of every descendant of `top` from `top`'s surface.
pub(crate) fn recarve(s: &mut Session, top: NodeId) {
    let mut stack = vec![top];
    while let Some(id) = stack.pop() {
        let Some(n) = s.nodes.get(id) else {
            continue;
        };
        let (surface, children) = (n.surface, n.children.clone());
        for c in children {
            if let Some(child) = s.nodes.get_mut(c) {
                child.surface = surface.carve(child.rect);
                stack.push(c);
            }
        }
    }
}

/// Is `a` a strict ancestor of `b`?
pub(crate) fn is_ancestor(s: &Session, a: NodeId, b: NodeId) -> bool {
    let mut cur = s.nodes.get(b).and_then(|n| n.parent);
    while let Some(id) = cur {
        if id == a {
            return true;
        }
        cur = s.nodes.get(id).and_then(|n| n.parent);
    }
    false
}

/// Is `a` equal to `b` or one of its ancestors?
fn is_ancestor_or_self(s: &Session, a: NodeId, b: NodeId) -> bool {
    a == b || is_ancestor(s, a, b)
}

/// Offset of a node's local origin from its top-most ancestor's origin.
pub(crate) fn origin(s: &Session, id: NodeId) -> Option<Point> {
    let mut n = s.nodes.get(id)?;
    let mut p = n.rect.tl();
    while let Some(parent) = n.parent {
        n = s.nodes.get(parent)?;
        p = p + n.rect.tl();
    }
    Some(p)
}

/// Move and resize a node.
pub(crate) fn set_rect(s: &mut Session, id: NodeId, rect: Rect) -> Result<()> {
    rect.size().non_empty()?;
    if is_root(s, id) {
        return Err(Error::InvalidArgument(
            "a window root follows the window size".into(),
        ));
    }
    let n = get(s, id)?;
    let (old, parent) = (n.rect, n.parent);
    if let Some(p) = parent {
        s.request_update(p, Some(old));
    }
    let surface = parent
        .and_then(|p| s.nodes.get(p))
        .map(|p| p.surface.carve(rect));
    if let Some(n) = s.nodes.get_mut(id) {
        n.rect = rect;
        n.surface = surface.unwrap_or_else(SubSurface::detached);
    }
    recarve(s, id);
    s.request_update(id, None);
    Ok(())
}

/// Replace a node's flags. `FOCUSED` is owned by the focus machinery and is
/// left as it was.
pub(crate) fn set_flags(s: &mut Session, id: NodeId, flags: NodeFlags) -> Result<()> {
    let n = get(s, id)?;
    let (was, rect, parent) = (n.flags, n.rect, n.parent);
    let flags = (flags - NodeFlags::FOCUSED) | (was & NodeFlags::FOCUSED);
    if was == flags {
        return Ok(());
    }
    let hiding = was.contains(NodeFlags::VISIBLE) && !flags.contains(NodeFlags::VISIBLE);
    if hiding {
        match parent {
            Some(p) => s.request_update(p, Some(rect)),
            None => s.request_update(id, None),
        }
    }
    if let Some(n) = s.nodes.get_mut(id) {
        n.flags = flags;
    }
    if !hiding {
        s.request_update(id, None);
    }
    Ok(())
}

/// Show or hide a node.
pub(crate) fn set_visible(s: &mut Session, id: NodeId, visible: bool) -> Result<()> {
    let mut flags = get(s, id)?.flags;
    flags.set(NodeFlags::VISIBLE, visible);
    set_flags(s, id, flags)
}

/// Set or clear a node's background fill.
pub(crate) fn set_background(s: &mut Session, id: NodeId, color: Option<Color>) -> Result<()> {
    let n = s
        .nodes
        .get_mut(id)
        .ok_or_else(|| Error::NotFound(format!("node {id:?}")))?;
    if n.background != color {
        n.background = color;
        s.request_update(id, None);
    }
    Ok(())
}
