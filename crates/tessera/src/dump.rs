use std::io::Write;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::{
    error::{Error, Result},
    id::{NodeId, WindowId},
    node::NodeFlags,
    session::Session,
};

/// Render every window and its node tree as colored text. This is a debug
/// function.
pub fn dump(s: &Session) -> Result<String> {
    render(|buf| {
        for w in s.windows() {
            dump_window_into(buf, s, *w)?;
        }
        Ok(())
    })
}

/// Render one window and its node tree.
pub fn dump_window(s: &Session, w: WindowId) -> Result<String> {
    render(|buf| dump_window_into(buf, s, w))
}

/// Render a node subtree, which need not be attached to a window.
pub fn dump_node(s: &Session, id: NodeId) -> Result<String> {
    render(|buf| dump_node_into(buf, s, id, 0, None))
}

/// Same as [`dump`], without color escapes.
pub fn dump_plain(s: &Session) -> Result<String> {
    let mut buf = Buffer::no_color();
    for w in s.windows() {
        dump_window_into(&mut buf, s, *w)?;
    }
    Ok(String::from_utf8_lossy(buf.as_slice()).into_owned())
}

/// Run `f` over an ANSI buffer and return the text.
fn render(f: impl FnOnce(&mut Buffer) -> Result<()>) -> Result<String> {
    let mut buf = Buffer::ansi();
    f(&mut buf)?;
    Ok(String::from_utf8_lossy(buf.as_slice()).into_owned())
}

/// Write `text` in `color`.
fn colored(buf: &mut Buffer, color: Color, bold: bool, text: &str) -> Result<()> {
    buf.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(buf, "{text}")?;
    buf.reset()?;
    Ok(())
}

/// Emit a window header line followed by its tree.
fn dump_window_into(buf: &mut Buffer, s: &Session, w: WindowId) -> Result<()> {
    let win = s
        .window(w)
        .ok_or_else(|| Error::NotFound(format!("window {w:?}")))?;
    colored(buf, Color::Magenta, true, &format!("{w:?}"))?;
    write!(
        buf,
        " {:?} \"{}\" {}x{} at {},{}",
        win.native(),
        win.title(),
        win.size().w,
        win.size().h,
        win.position().x,
        win.position().y
    )?;
    if s.modal() == Some(w) {
        colored(buf, Color::Red, false, " MODAL")?;
    }
    if s.grabbed() == Some(w) {
        colored(buf, Color::Red, false, " GRAB")?;
    }
    let pending = win.damage().len();
    if pending > 0 {
        write!(buf, " damage={pending}")?;
    }
    writeln!(buf)?;
    dump_node_into(buf, s, win.root(), 1, win.focused())
}

/// Walk a node subtree and emit one line per node.
fn dump_node_into(
    buf: &mut Buffer,
    s: &Session,
    id: NodeId,
    level: usize,
    focus: Option<NodeId>,
) -> Result<()> {
    let node = s
        .node(id)
        .ok_or_else(|| Error::NotFound(format!("node {id:?}")))?;
    let indent = "    ".repeat(level);
    write!(buf, "{indent}")?;
    colored(buf, Color::Cyan, true, &format!("{id:?}"))?;

    let r = node.rect();
    write!(buf, " {} ({},{} {}x{})", node.name(), r.x, r.y, r.w, r.h)?;

    let flags = node.flags();
    let mut indicators = vec![];
    if focus == Some(id) {
        indicators.push("FOCUSED");
    }
    if !flags.contains(NodeFlags::VISIBLE) {
        indicators.push("hidden");
    }
    if !flags.contains(NodeFlags::ACTIVE) {
        indicators.push("inactive");
    }
    if flags.contains(NodeFlags::CATCH_ALL) {
        indicators.push("catch-all");
    }
    if node.surface().is_clipped() {
        indicators.push("clipped");
    }
    if !indicators.is_empty() {
        write!(buf, " ")?;
        colored(buf, Color::Yellow, false, &format!("[{}]", indicators.join(", ")))?;
    }
    writeln!(buf)?;

    for child in node.children() {
        dump_node_into(buf, s, *child, level + 1, focus)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::HeadlessBackend, config::Config, event_loop::EventLoop, geom::Rect,
        window::WindowSpec,
    };

    #[test]
    fn dumps_tree_with_markers() -> Result<()> {
        let mut l = EventLoop::new(HeadlessBackend::new(), Config::default())?;
        let s = l.session_mut();
        let w = s.create_window(WindowSpec::new((100, 50)).title("main"))?;
        let root = s.root(w).ok_or_else(|| Error::NotFound("root".into()))?;
        let child = s.create_node(root, Rect::new(1, 2, 3, 4), None)?;
        s.set_visible(child, false)?;
        s.set_focus(w, child)?;

        let out = dump_plain(s)?;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"main\" 100x50"));
        assert!(lines[2].starts_with("        "));
        assert!(lines[2].contains("(1,2 3x4)"));
        assert!(lines[2].contains("FOCUSED"));
        assert!(lines[2].contains("hidden"));

        assert!(dump(s)?.contains("\u{1b}["));
        assert!(dump_node(s, child)?.contains("3x4"));
        assert!(dump_window(s, w)?.contains("main"));
        Ok(())
    }
}
