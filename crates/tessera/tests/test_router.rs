//! Input routing: focus, enter/leave, drag targets, and bubbling.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tessera::{
        Button, Buttons, KeyEvent, NodeFlags, NodeId, Result, WheelEvent, Widget, WindowId,
        WindowSpec,
        geom::{Point, Rect},
        testing::{Harness, Log, Recorder, Seen},
    };

    /// An unframed 200x100 window.
    fn setup() -> Result<(Harness, Log, WindowId, NodeId)> {
        let log = Log::new();
        let mut h = Harness::new()?;
        let w = h.window(
            WindowSpec::new((200, 100))
                .framed(false)
                .widget(Recorder::new("root", &log)),
        )?;
        let root = h.root(w)?;
        Ok((h, log, w, root))
    }

    fn boxed(r: Recorder) -> Option<Box<dyn Widget>> {
        Some(r.into())
    }

    /// Events other than draws, as (label, event) pairs.
    fn events(log: &Log) -> Vec<(String, Seen)> {
        log.events()
    }

    #[test]
    fn focus_out_precedes_focus_in() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        let a = s.create_node(root, Rect::new(0, 0, 10, 10), boxed(Recorder::new("a", &log)))?;
        let b = s.create_node(root, Rect::new(20, 0, 10, 10), boxed(Recorder::new("b", &log)))?;
        s.set_focus(w, a)?;
        log.clear();

        s.set_focus(w, b)?;
        assert_eq!(
            events(&log),
            vec![("a".into(), Seen::FocusOut), ("b".into(), Seen::FocusIn)]
        );
        assert_eq!(s.window(w).and_then(|win| win.focused()), Some(b));

        log.clear();
        s.set_focus(w, b)?;
        assert!(events(&log).is_empty());
        Ok(())
    }

    #[test]
    fn focus_rejects_foreign_nodes() -> Result<()> {
        let (mut h, _log, w, _root) = setup()?;
        let other = h.window(WindowSpec::new((10, 10)))?;
        let foreign = h.root(other)?;
        assert!(h.session().set_focus(w, foreign).is_err());
        Ok(())
    }

    #[test]
    fn click_focuses_key_handlers() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        s.create_node(root, Rect::new(0, 0, 10, 10), boxed(Recorder::new("plain", &log)))?;
        let input = s.create_node(root, Rect::new(20, 0, 10, 10), boxed(Recorder::new("input", &log)))?;
        s.set_flags(input, NodeFlags::default() | NodeFlags::HANDLES_KEYS)?;

        h.click(w, (5, 5))?;
        assert_eq!(h.session().window(w).and_then(|win| win.focused()), None);
        h.click(w, (25, 5))?;
        assert_eq!(h.session().window(w).and_then(|win| win.focused()), Some(input));
        assert!(log.of("input").contains(&Seen::FocusIn));
        assert!(!log.of("plain").contains(&Seen::FocusIn));
        Ok(())
    }

    #[test]
    fn drag_routes_every_event_to_the_pressed_node() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        s.create_node(root, Rect::new(10, 10, 20, 20), boxed(Recorder::new("x", &log)))?;
        s.create_node(root, Rect::new(100, 10, 20, 20), boxed(Recorder::new("y", &log)))?;
        let native = h.native(w)?;

        h.enter(w, (15, 15))?;
        log.clear();
        h.button_down(w, (15, 15), Button::Primary)?;
        assert_eq!(h.probe.grab(), Some((native, false)));

        let path = [(50, 50), (110, 15), (300, 300), (-40, 2)];
        for p in path {
            h.motion(w, p)?;
        }
        h.button_up(w, (110, 15), Button::Primary)?;

        let pointer: Vec<_> = log
            .of("x")
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    Seen::ButtonDown(..) | Seen::Motion(..) | Seen::ButtonUp(..)
                )
            })
            .collect();
        assert_eq!(pointer.len(), path.len() + 2);
        assert_eq!(pointer[0], Seen::ButtonDown(Point::new(5, 5), Button::Primary));
        assert_eq!(
            pointer[2],
            Seen::Motion(Point::new(100, 5), Buttons::PRIMARY)
        );
        assert_eq!(
            pointer[path.len() + 1],
            Seen::ButtonUp(Point::new(100, 5), Button::Primary)
        );
        assert!(
            log.of("y")
                .iter()
                .all(|e| e.is_draw() || matches!(e, Seen::Enter(_) | Seen::Leave(_)))
        );
        assert_eq!(h.probe.grab(), None);
        assert_eq!(h.session().grabbed(), None);

        // Once the drag ends, the node under the pointer is entered.
        let tail = events(&log);
        let n = tail.len();
        assert_eq!(
            tail[n - 2..],
            [
                ("x".to_string(), Seen::Leave(Point::new(100, 5))),
                ("y".to_string(), Seen::Enter(Point::new(10, 5))),
            ]
        );
        Ok(())
    }

    #[test]
    fn released_drag_stops_routing_to_the_pressed_node() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        s.create_node(root, Rect::new(10, 10, 20, 20), boxed(Recorder::new("x", &log)))?;
        s.create_node(root, Rect::new(100, 10, 20, 20), boxed(Recorder::new("y", &log)))?;
        let native = h.native(w)?;

        h.enter(w, (15, 15))?;
        h.button_down(w, (15, 15), Button::Primary)?;
        assert_eq!(h.probe.grab(), Some((native, false)));

        h.session().release_drag(w)?;
        assert_eq!(h.session().window(w).and_then(|win| win.drag()), None);
        assert_eq!(h.probe.grab(), None);
        h.session().release_drag(w)?;

        log.clear();
        h.motion(w, (110, 15))?;
        assert!(!log.of("x").iter().any(|e| matches!(e, Seen::Motion(..))));
        assert!(log.of("y").contains(&Seen::Enter(Point::new(10, 5))));
        h.button_up(w, (110, 15), Button::Primary)?;

        // A modal window keeps its grab when its drag is cancelled.
        h.session().set_modal(w, true)?;
        h.button_down(w, (110, 15), Button::Primary)?;
        assert!(h.session().window(w).and_then(|win| win.drag()).is_some());
        h.session().release_drag(w)?;
        assert_eq!(h.session().window(w).and_then(|win| win.drag()), None);
        assert_eq!(h.probe.grab(), Some((native, true)));
        Ok(())
    }

    #[test]
    fn enter_and_leave_follow_the_pointer() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        s.create_node(root, Rect::new(0, 0, 50, 50), boxed(Recorder::new("a", &log)))?;
        let b = s.create_node(root, Rect::new(50, 0, 50, 50), boxed(Recorder::new("b", &log)))?;
        log.clear();

        h.motion(w, (10, 10))?;
        h.motion(w, (60, 10))?;
        let moves: Vec<_> = events(&log)
            .into_iter()
            .filter(|(_, e)| !matches!(e, Seen::Motion(..)))
            .collect();
        assert_eq!(
            moves,
            vec![
                ("a".to_string(), Seen::Enter(Point::new(10, 10))),
                ("a".to_string(), Seen::Leave(Point::new(60, 10))),
                ("b".to_string(), Seen::Enter(Point::new(10, 10))),
            ]
        );
        assert_eq!(h.session().window(w).and_then(|win| win.entered()), Some(b));

        // A still pointer is revalidated against tree changes.
        log.clear();
        h.session().set_visible(b, false)?;
        h.settle()?;
        assert_eq!(events(&log), vec![("b".to_string(), Seen::Leave(Point::new(10, 10)))]);
        assert_eq!(h.session().window(w).and_then(|win| win.entered()), None);

        h.session().set_visible(b, true)?;
        h.settle()?;
        assert_eq!(h.session().window(w).and_then(|win| win.entered()), Some(b));
        log.clear();
        h.leave(w)?;
        assert_eq!(events(&log), vec![("b".to_string(), Seen::Leave(Point::new(10, 10)))]);
        Ok(())
    }

    #[test]
    fn keys_bubble_until_handled() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        let panel = s.create_node(
            root,
            Rect::new(0, 0, 100, 100),
            boxed(Recorder::new("panel", &log).handles_keys()),
        )?;
        let leaf = s.create_node(panel, Rect::new(0, 0, 10, 10), boxed(Recorder::new("leaf", &log)))?;
        s.set_focus(w, leaf)?;
        log.clear();

        h.key(w, 'q')?;
        let k = KeyEvent::from('q');
        assert_eq!(
            events(&log),
            vec![
                ("leaf".to_string(), Seen::KeyDown(k)),
                ("panel".to_string(), Seen::KeyDown(k)),
                ("leaf".to_string(), Seen::KeyUp(k)),
                ("panel".to_string(), Seen::KeyUp(k)),
            ]
        );
        Ok(())
    }

    #[test]
    fn unfocused_keys_go_to_the_root() -> Result<()> {
        let (mut h, log, w, _root) = setup()?;
        log.clear();
        h.key(w, 'z')?;
        assert_eq!(log.of("root"), vec![Seen::KeyDown('z'.into()), Seen::KeyUp('z'.into())]);
        Ok(())
    }

    #[test]
    fn wheel_bubbles_from_the_node_under_the_pointer() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        let panel = s.create_node(
            root,
            Rect::new(20, 20, 60, 60),
            boxed(Recorder::new("panel", &log).handles_wheel()),
        )?;
        s.create_node(panel, Rect::new(10, 10, 10, 10), boxed(Recorder::new("leaf", &log)))?;
        log.clear();

        h.wheel(w, (35, 35), (0, 3))?;
        assert_eq!(
            events(&log),
            vec![
                (
                    "leaf".to_string(),
                    Seen::Wheel(WheelEvent {
                        pos: Point::new(5, 5),
                        delta: Point::new(0, 3),
                    })
                ),
                (
                    "panel".to_string(),
                    Seen::Wheel(WheelEvent {
                        pos: Point::new(15, 15),
                        delta: Point::new(0, 3),
                    })
                ),
            ]
        );
        Ok(())
    }

    #[test]
    fn disabled_windows_drop_input() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        h.session()
            .create_node(root, Rect::new(0, 0, 50, 50), boxed(Recorder::new("a", &log)))?;
        h.session().set_disabled(w, true)?;
        log.clear();

        h.click(w, (5, 5))?;
        h.key(w, 'a')?;
        assert!(events(&log).is_empty());
        assert_eq!(h.probe.grab(), None);

        h.session().set_disabled(w, false)?;
        h.click(w, (5, 5))?;
        assert!(log.of("a").contains(&Seen::ButtonDown(Point::new(5, 5), Button::Primary)));
        Ok(())
    }

    #[test]
    fn inactive_nodes_pass_clicks_to_their_parent() -> Result<()> {
        let (mut h, log, w, root) = setup()?;
        let s = h.session();
        let panel = s.create_node(root, Rect::new(0, 0, 50, 50), boxed(Recorder::new("panel", &log)))?;
        let label = s.create_node(panel, Rect::new(0, 0, 10, 10), boxed(Recorder::new("label", &log)))?;
        s.set_flags(label, NodeFlags::VISIBLE)?;
        log.clear();

        h.click(w, (5, 5))?;
        assert!(log.of("label").is_empty());
        assert!(log.of("panel").contains(&Seen::ButtonDown(Point::new(5, 5), Button::Primary)));
        Ok(())
    }
}
