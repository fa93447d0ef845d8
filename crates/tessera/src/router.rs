//! Routes native events to windows and nodes: hit-testing, enter/leave,
//! focus, drag targets, chrome gestures, and the modal stack.

use std::mem;

use scopeguard::guard;
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    event::{Button, KeyEvent, NativeEvent, WheelEvent},
    geom::{Expanse, Point, Rect},
    id::{NodeId, WindowId},
    node::NodeFlags,
    session::Session,
    tree,
    widget::EventOutcome,
    window::{self, Gesture, WindowFlags},
};

/// Route one native event. Input for unknown, destroyed, or disabled windows
/// and input outside the modal window's family is dropped.
pub(crate) fn dispatch(s: &mut Session, event: NativeEvent) -> Result<()> {
    let Some(native) = event.window() else {
        return Ok(());
    };
    let Some(w) = s.window_for(native) else {
        trace!("dropping event for unknown native window {}", native.0);
        return Ok(());
    };
    if event.is_input() {
        let accepts = s.windows.get(w).is_some_and(|win| win.accepts_input());
        if !accepts || !in_modal_family(s, w) {
            warn!("input for {w:?} dropped");
            return Ok(());
        }
    }
    s.enter_dispatch(w);
    let mut s = guard(s, move |s| s.leave_dispatch(w));
    route(&mut s, w, event)
}

/// Route an event known to belong to `w`.
fn route(s: &mut Session, w: WindowId, event: NativeEvent) -> Result<()> {
    trace!("route {w:?}: {event:?}");
    match event {
        NativeEvent::Motion { pos, root, .. } => motion(s, w, pos, root),
        NativeEvent::ButtonDown {
            pos,
            root,
            button,
            time,
            ..
        } => button_down(s, w, pos, root, button, time),
        NativeEvent::ButtonUp {
            pos, root, button, ..
        } => button_up(s, w, pos, root, button),
        NativeEvent::KeyDown { key, .. } => key_event(s, w, &key, true),
        NativeEvent::KeyUp { key, .. } => key_event(s, w, &key, false),
        NativeEvent::Wheel { pos, delta, .. } => wheel(s, w, pos, delta),
        NativeEvent::Enter { pos, root, .. } => {
            set_pointer(s, w, pos, root);
            s.with_handler(w, |h, s| h.on_enter(s, w))?;
            update_enter(s, w, pos)
        }
        NativeEvent::Leave { .. } => leave(s, w),
        NativeEvent::FocusIn { .. } => window_focus(s, w, true),
        NativeEvent::FocusOut { .. } => window_focus(s, w, false),
        NativeEvent::Configure { size, .. } => window::configure(s, w, size),
        NativeEvent::Moved { position, .. } => {
            let Ok(win) = window::live_mut(s, w) else {
                return Ok(());
            };
            win.position = position;
            s.with_handler(w, |h, s| h.on_move(s, w, position))?;
            Ok(())
        }
        NativeEvent::Expose { rect, .. } => expose(s, w, rect),
        NativeEvent::Close { .. } => {
            let close = s.with_handler(w, |h, s| h.on_close(s, w))?;
            if close.unwrap_or(true) {
                s.destroy_window(w);
            }
            Ok(())
        }
        NativeEvent::Wakeup => Ok(()),
    }
}

/// Is `w` the modal window or opened, directly or not, from it?
fn in_modal_family(s: &Session, w: WindowId) -> bool {
    let Some(modal) = s.modal else {
        return true;
    };
    let mut cur = Some(w);
    while let Some(c) = cur {
        if c == modal {
            return true;
        }
        cur = s.windows.get(c).and_then(|win| win.creator);
    }
    false
}

/// Deepest visible node under `p` (window content coordinates). Children
/// are searched topmost first; `CATCH_ALL` stops the descent.
pub(crate) fn hit_test(s: &Session, w: WindowId, p: Point) -> Option<NodeId> {
    let root = s.windows.get(w)?.root;
    hit(s, root, p)
}

/// Hit-test the subtree at `id`, with `p` in `id`'s parent coordinates.
fn hit(s: &Session, id: NodeId, p: Point) -> Option<NodeId> {
    let n = s.nodes.get(id)?;
    if !n.flags.contains(NodeFlags::VISIBLE) || !n.rect.contains(p) {
        return None;
    }
    if n.flags.contains(NodeFlags::CATCH_ALL) {
        return Some(id);
    }
    let local = p - n.rect.tl();
    n.children
        .iter()
        .rev()
        .find_map(|c| hit(s, *c, local))
        .or(Some(id))
}

/// Nearest node at or above `id` that accepts pointer input.
fn interactive(s: &Session, id: NodeId) -> Option<NodeId> {
    let mut cur = Some(id);
    while let Some(c) = cur {
        let n = s.nodes.get(c)?;
        if n.flags.contains(NodeFlags::ACTIVE) {
            return Some(c);
        }
        cur = n.parent;
    }
    None
}

/// The interactive node under an outer window position.
fn target_at(s: &Session, w: WindowId, pos: Point) -> Option<NodeId> {
    let win = s.windows.get(w)?;
    let p = win.to_content(pos);
    if !win.size.rect().contains(p) {
        return None;
    }
    hit_test(s, w, p).and_then(|h| interactive(s, h))
}

/// Convert an outer window position to `id`'s local coordinates.
fn local(s: &Session, w: WindowId, id: NodeId, pos: Point) -> Point {
    let content = s
        .windows
        .get(w)
        .map_or(pos, |win| win.to_content(pos));
    content - tree::origin(s, id).unwrap_or_default()
}

/// Record the pointer position.
fn set_pointer(s: &mut Session, w: WindowId, pos: Point, root: Point) {
    s.pointer.window = Some(w);
    s.pointer.pos = pos;
    s.pointer.root = root;
}

/// Deliver Leave to the old entered node and Enter to the new one, unless a
/// gesture owns the pointer.
fn update_enter(s: &mut Session, w: WindowId, pos: Point) -> Result<()> {
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    if win.drag.is_some() || win.gesture != Gesture::Idle {
        return Ok(());
    }
    let old = win.entered;
    let new = target_at(s, w, pos);
    if old == new {
        return Ok(());
    }
    if let Some(win) = s.windows.get_mut(w) {
        win.entered = new;
    }
    if let Some(o) = old {
        let p = local(s, w, o, pos);
        s.with_widget(o, |wd, ctx| wd.on_leave(ctx, p))?;
    }
    if let Some(n) = new {
        let p = local(s, w, n, pos);
        s.with_widget(n, |wd, ctx| wd.on_enter(ctx, p))?;
    }
    Ok(())
}

/// Revalidate enter/leave against the cached pointer if no motion arrived
/// since the last check. Tree changes can move nodes under a still pointer.
pub(crate) fn recheck_pointer(s: &mut Session) -> Result<()> {
    if mem::take(&mut s.pointer.moved) {
        return Ok(());
    }
    let Some(w) = s.pointer.window else {
        return Ok(());
    };
    if !s.windows.get(w).is_some_and(|win| win.accepts_input()) {
        return Ok(());
    }
    let pos = s.pointer.pos;
    update_enter(s, w, pos)
}

/// Pointer motion.
fn motion(s: &mut Session, w: WindowId, pos: Point, root: Point) -> Result<()> {
    set_pointer(s, w, pos, root);
    s.pointer.moved = true;
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    let (gesture, size, drag) = (win.gesture, win.size, win.drag);
    match gesture {
        Gesture::Moving { origin, start } => {
            let delta = root - origin;
            window::move_to(s, w, start + delta)
        }
        Gesture::Resizing { origin, start } => {
            let delta = root - origin;
            let next = Expanse::new(grow(start.w, delta.x), grow(start.h, delta.y));
            if next != size {
                window::resize(s, w, next)?;
            }
            Ok(())
        }
        Gesture::Title => Ok(()),
        Gesture::Idle | Gesture::Dragging => {
            let buttons = s.pointer.buttons;
            if let Some(d) = drag {
                let p = local(s, w, d, pos);
                s.with_widget(d, |wd, ctx| wd.on_motion(ctx, p, buttons))?;
                return Ok(());
            }
            update_enter(s, w, pos)?;
            if let Some(e) = s.windows.get(w).and_then(|win| win.entered) {
                let p = local(s, w, e, pos);
                s.with_widget(e, |wd, ctx| wd.on_motion(ctx, p, buttons))?;
            }
            Ok(())
        }
    }
}

/// Apply a signed pointer delta to a dimension, keeping it positive.
fn grow(v: u32, by: i32) -> u32 {
    let n = i64::from(v) + i64::from(by);
    u32::try_from(n.max(1)).unwrap_or(u32::MAX)
}

/// A pointer button went down.
fn button_down(
    s: &mut Session,
    w: WindowId,
    pos: Point,
    root: Point,
    button: Button,
    time: u64,
) -> Result<()> {
    set_pointer(s, w, pos, root);
    s.pointer.buttons |= button.mask();
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    if let Some(d) = win.drag {
        let p = local(s, w, d, pos);
        s.with_widget(d, |wd, ctx| wd.on_button_down(ctx, p, button))?;
        return Ok(());
    }
    if win.gesture != Gesture::Idle {
        return Ok(());
    }

    if let Some(t) = target_at(s, w, pos) {
        if button == Button::Primary {
            if let Some(win) = s.windows.get_mut(w) {
                win.drag = Some(t);
                win.gesture = Gesture::Dragging;
            }
            if s.modal != Some(w) {
                s.grab(w, false)?;
            }
            if s.nodes
                .get(t)
                .is_some_and(|n| n.flags.contains(NodeFlags::HANDLES_KEYS))
            {
                set_focus(s, w, t)?;
            }
        }
        let p = local(s, w, t, pos);
        s.with_widget(t, |wd, ctx| wd.on_button_down(ctx, p, button))?;
        return Ok(());
    }
    chrome_down(s, w, pos, root, button, time)
}

/// A button went down on a window's chrome or background.
fn chrome_down(
    s: &mut Session,
    w: WindowId,
    pos: Point,
    root: Point,
    button: Button,
    time: u64,
) -> Result<()> {
    let (corner, glyph, double) = (
        s.config.resize_corner,
        s.config.theme.glyph_width,
        s.config.double_click_ms,
    );
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    if !win.flags.contains(WindowFlags::FRAMED) || win.flags.contains(WindowFlags::MODAL) {
        return Ok(());
    }
    if !win.outer_rect().contains(pos) {
        if button == Button::Secondary {
            debug!("window {w:?}: lowered");
            s.lower_window(w)?;
        }
        return Ok(());
    }
    if button != Button::Primary {
        return Ok(());
    }

    let gesture = if win.flags.contains(WindowFlags::RESIZABLE)
        && !win.flags.contains(WindowFlags::MINIMIZED)
        && win.corner_rect(corner).contains(pos)
    {
        Gesture::Resizing {
            origin: root,
            start: win.size,
        }
    } else if win.flags.contains(WindowFlags::MINIMIZABLE) && win.title_rect(glyph).contains(pos)
    {
        match s.pointer.title_click.take() {
            Some((cw, t)) if cw == w && time.saturating_sub(t) <= double => Gesture::Title,
            _ => {
                s.pointer.title_click = Some((w, time));
                Gesture::Moving {
                    origin: root,
                    start: win.position,
                }
            }
        }
    } else {
        Gesture::Moving {
            origin: root,
            start: win.position,
        }
    };

    debug!("window {w:?}: gesture {gesture:?}");
    if let Some(win) = s.windows.get_mut(w) {
        win.gesture = gesture;
    }
    s.grab(w, false)?;
    match gesture {
        Gesture::Title => window::toggle_minimize(s, w),
        Gesture::Moving { .. } => s.raise_window(w),
        _ => Ok(()),
    }
}

/// A pointer button came up.
fn button_up(s: &mut Session, w: WindowId, pos: Point, root: Point, button: Button) -> Result<()> {
    set_pointer(s, w, pos, root);
    s.pointer.buttons.remove(button.mask());
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    let (drag, gesture) = (win.drag, win.gesture);
    match drag {
        Some(d) => {
            let p = local(s, w, d, pos);
            s.with_widget(d, |wd, ctx| wd.on_button_up(ctx, p, button))?;
        }
        None if gesture == Gesture::Idle => {
            if let Some(t) = target_at(s, w, pos) {
                let p = local(s, w, t, pos);
                s.with_widget(t, |wd, ctx| wd.on_button_up(ctx, p, button))?;
            }
        }
        None => {}
    }
    if s.pointer.buttons.is_empty() && gesture != Gesture::Idle {
        if let Some(win) = s.windows.get_mut(w) {
            win.drag = None;
            win.gesture = Gesture::Idle;
        }
        s.release_grab(w);
        update_enter(s, w, pos)?;
    }
    Ok(())
}

/// Deliver a key to the focused node, bubbling to ancestors while ignored.
fn key_event(s: &mut Session, w: WindowId, key: &KeyEvent, down: bool) -> Result<()> {
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    let mut cur = Some(win.focused.unwrap_or(win.root));
    while let Some(id) = cur {
        let outcome = s.with_widget(id, |wd, ctx| {
            if down {
                wd.on_key_down(ctx, key)
            } else {
                wd.on_key_up(ctx, key)
            }
        })?;
        if outcome.is_some_and(|o| !o.is_ignored()) {
            break;
        }
        cur = s.parent(id);
    }
    Ok(())
}

/// Deliver a wheel event to the node under the pointer, bubbling while
/// ignored.
fn wheel(s: &mut Session, w: WindowId, pos: Point, delta: Point) -> Result<()> {
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    let p = win.to_content(pos);
    let mut cur = hit_test(s, w, p);
    while let Some(id) = cur {
        let event = WheelEvent {
            pos: local(s, w, id, pos),
            delta,
        };
        let outcome = s.with_widget(id, |wd, ctx| wd.on_wheel(ctx, &event))?;
        if outcome.is_some_and(|o| o != EventOutcome::Ignore) {
            break;
        }
        cur = s.parent(id);
    }
    Ok(())
}

/// The pointer left the window.
fn leave(s: &mut Session, w: WindowId) -> Result<()> {
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    if win.drag.is_none()
        && win.gesture == Gesture::Idle
        && let Some(old) = win.entered
    {
        if let Some(win) = s.windows.get_mut(w) {
            win.entered = None;
        }
        let p = local(s, w, old, s.pointer.pos);
        s.with_widget(old, |wd, ctx| wd.on_leave(ctx, p))?;
    }
    if s.pointer.window == Some(w) {
        s.pointer.window = None;
    }
    s.with_handler(w, |h, s| h.on_leave(s, w))?;
    Ok(())
}

/// The window gained or lost native keyboard focus.
fn window_focus(s: &mut Session, w: WindowId, focused: bool) -> Result<()> {
    let Ok(win) = window::live_mut(s, w) else {
        return Ok(());
    };
    win.active = focused;
    win.chrome_dirty = true;
    if focused {
        s.with_handler(w, |h, s| h.on_focus_in(s, w))?;
    } else {
        s.with_handler(w, |h, s| h.on_focus_out(s, w))?;
    }
    Ok(())
}

/// Part of the window needs repainting.
fn expose(s: &mut Session, w: WindowId, rect: Rect) -> Result<()> {
    let Ok(win) = window::live_mut(s, w) else {
        return Ok(());
    };
    if !win.content_rect().contains_rect(&rect) {
        win.chrome_dirty = true;
    }
    let (root, content) = (win.root, rect.translate(-win.frame.origin()));
    s.request_update(root, Some(content));
    Ok(())
}

/// Move keyboard focus within `w`, delivering FocusOut before FocusIn.
pub(crate) fn set_focus(s: &mut Session, w: WindowId, id: NodeId) -> Result<()> {
    let root = window::live(s, w)?.root;
    if id != root && !tree::is_ancestor(s, root, id) {
        return Err(Error::InvalidArgument(format!(
            "{id:?} is not in window {w:?}"
        )));
    }
    let win = window::live_mut(s, w)?;
    let old = win.focused;
    if old == Some(id) {
        return Ok(());
    }
    win.focused = Some(id);
    if let Some(o) = old {
        if let Some(n) = s.nodes.get_mut(o) {
            n.flags.remove(NodeFlags::FOCUSED);
        }
        s.with_widget(o, |wd, ctx| wd.on_focus_out(ctx))?;
    }
    if let Some(n) = s.nodes.get_mut(id) {
        n.flags.insert(NodeFlags::FOCUSED);
    }
    s.with_widget(id, |wd, ctx| wd.on_focus_in(ctx))?;
    trace!("focus {w:?}: {old:?} -> {id:?}");
    Ok(())
}

/// Cancel `w`'s drag in progress, if any, releasing the pointer grab unless
/// the window holds the modal grab.
pub(crate) fn release_drag(s: &mut Session, w: WindowId) -> Result<()> {
    let win = window::live_mut(s, w)?;
    let Some(d) = win.drag.take() else {
        return Ok(());
    };
    if win.gesture == Gesture::Dragging {
        win.gesture = Gesture::Idle;
    }
    debug!("window {w:?}: drag on {d:?} released");
    s.release_grab(w);
    Ok(())
}

/// Make `w` modal: grab pointer and keyboard, and take over any drag in
/// progress on another window.
pub(crate) fn set_modal(s: &mut Session, w: WindowId) -> Result<()> {
    s.grab(w, true)?;
    if let Some(win) = s.windows.get_mut(w) {
        win.flags.insert(WindowFlags::MODAL);
    }
    s.modal = Some(w);
    debug!("modal: {w:?}");

    let dragging = s.order.iter().copied().find(|o| {
        *o != w
            && s
                .windows
                .get(*o)
                .is_some_and(|win| win.drag.is_some())
    });
    let Some(other) = dragging else {
        return Ok(());
    };
    if s.pointer.buttons.is_empty() {
        return Ok(());
    }
    if let Some(win) = s.windows.get_mut(other) {
        win.drag = None;
        win.gesture = Gesture::Idle;
    }
    let Some(win) = s.windows.get(w) else {
        return Ok(());
    };
    let pos = s.pointer.root - win.position;
    if let Some(t) = target_at(s, w, pos) {
        if let Some(win) = s.windows.get_mut(w) {
            win.drag = Some(t);
            win.gesture = Gesture::Dragging;
        }
        debug!("modal {w:?} inherits drag from {other:?} at {t:?}");
    }
    Ok(())
}

/// Drop `w`'s modal state. The modal grab passes to the creator if it is
/// still modal, else to the newest still-modal window, else is released.
pub(crate) fn clear_modal(s: &mut Session, w: WindowId) {
    let creator = s.windows.get_mut(w).and_then(|win| {
        win.flags.remove(WindowFlags::MODAL);
        win.creator
    });
    if s.modal != Some(w) {
        return;
    }
    let still_modal = |s: &Session, c: WindowId| {
        s.windows.get(c).is_some_and(|win| {
            win.flags.contains(WindowFlags::MODAL) && !win.flags.contains(WindowFlags::DESTROYED)
        })
    };
    let next = creator
        .filter(|c| still_modal(s, *c))
        .or_else(|| s.order.iter().rev().copied().find(|c| still_modal(s, *c)));
    s.modal = next;
    match next {
        Some(m) => {
            debug!("modal: {w:?} -> {m:?}");
            if let Err(e) = s.grab(m, true) {
                warn!("could not restore modal grab for {m:?}: {e}");
            }
        }
        None => {
            debug!("modal: {w:?} cleared");
            s.backend.ungrab();
            s.grabbed = None;
        }
    }
}
