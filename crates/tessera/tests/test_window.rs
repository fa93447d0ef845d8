//! Window lifecycle: geometry requests, minimize, chrome gestures, and
//! destruction.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use tessera::{
        Button, Context, Error, Gesture, Lifecycle, Result, Widget, WindowFlags, WindowId, WindowSpec,
        backend::headless::Call,
        geom::{Expanse, Point, Rect},
        testing::{Harness, Log, Recorder, Seen, WindowRecorder},
    };

    /// Destroys its own window when pressed, noting the lifecycle it sees.
    struct Closer {
        /// Lifecycle observed right after the destroy request.
        seen: Arc<Mutex<Vec<Option<Lifecycle>>>>,
    }

    impl Widget for Closer {
        fn on_button_down(&mut self, ctx: &mut Context, _pos: Point, _button: Button) -> Result<()> {
            let Some(w) = ctx.window_id() else {
                return Ok(());
            };
            ctx.session().destroy_window(w);
            let state = ctx.session().window(w).map(|win| win.lifecycle());
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(state);
            }
            Ok(())
        }
    }

    fn flags(h: &mut Harness, w: WindowId) -> Result<WindowFlags> {
        h.session()
            .window(w)
            .map(|win| win.flags())
            .ok_or_else(|| Error::NotFound("window".into()))
    }

    fn geometry(h: &mut Harness, w: WindowId) -> Result<(Point, Expanse)> {
        h.session()
            .window(w)
            .map(|win| (win.position(), win.size()))
            .ok_or_else(|| Error::NotFound("window".into()))
    }

    #[test]
    fn resize_applies_on_confirmation() -> Result<()> {
        let log = Log::new();
        let mut h = Harness::new()?;
        let w = h.window(WindowSpec::new((100, 50)).handler(WindowRecorder::new("w", &log)))?;
        let native = h.native(w)?;
        h.probe.clear_calls();

        h.session().resize_window(w, (120, 60))?;
        let f = flags(&mut h, w)?;
        assert!(f.contains(WindowFlags::PENDING_RESIZE));
        assert!(!f.contains(WindowFlags::CONFIGURED));
        assert_eq!(geometry(&mut h, w)?.1, Expanse::new(100, 50));
        assert!(
            h.probe
                .calls()
                .contains(&Call::Resize(native, Expanse::new(124, 82)))
        );

        h.settle()?;
        let f = flags(&mut h, w)?;
        assert!(!f.contains(WindowFlags::PENDING_RESIZE));
        assert!(f.contains(WindowFlags::CONFIGURED));
        assert_eq!(geometry(&mut h, w)?.1, Expanse::new(120, 60));
        assert_eq!(log.of("w"), vec![Seen::Resized(Expanse::new(120, 60))]);

        assert!(h.session().resize_window(w, (0, 10)).is_err());
        assert!(!flags(&mut h, w)?.contains(WindowFlags::PENDING_RESIZE));
        Ok(())
    }

    #[test]
    fn minimize_recentres_on_the_title() -> Result<()> {
        let mut h = Harness::new()?;
        let w = h.window(WindowSpec::new((100, 50)).title("hello").at((100, 100)))?;
        let native = h.native(w)?;
        h.probe.clear_calls();

        h.session().toggle_minimize(w)?;
        // Five glyphs of eight pixels, inside a 2px frame with a 20px title.
        assert!(
            h.probe
                .calls()
                .contains(&Call::SetBounds(native, Rect::new(130, 100, 44, 23)))
        );
        h.settle()?;
        assert!(flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        assert_eq!(
            geometry(&mut h, w)?,
            (Point::new(130, 100), Expanse::new(40, 1))
        );

        h.session().toggle_minimize(w)?;
        h.settle()?;
        assert!(!flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        assert_eq!(
            geometry(&mut h, w)?,
            (Point::new(100, 100), Expanse::new(100, 50))
        );

        let fixed = h.window(WindowSpec::new((10, 10)).minimizable(false))?;
        assert!(matches!(
            h.session().toggle_minimize(fixed),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn refused_minimize_rolls_back() -> Result<()> {
        let mut h = Harness::new()?;
        let w = h.window(WindowSpec::new((100, 50)).title("hello").at((100, 100)))?;

        h.probe.fail_next_geometry();
        assert!(matches!(h.session().toggle_minimize(w), Err(Error::Backend(_))));
        let f = flags(&mut h, w)?;
        assert!(!f.contains(WindowFlags::MINIMIZED));
        assert!(!f.contains(WindowFlags::PENDING_RESIZE));
        assert_eq!(
            geometry(&mut h, w)?,
            (Point::new(100, 100), Expanse::new(100, 50))
        );

        h.session().toggle_minimize(w)?;
        h.settle()?;
        h.probe.fail_next_geometry();
        assert!(h.session().toggle_minimize(w).is_err());
        assert!(flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));

        // The cached size survives the refused restore.
        h.session().toggle_minimize(w)?;
        h.settle()?;
        assert!(!flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        assert_eq!(
            geometry(&mut h, w)?,
            (Point::new(100, 100), Expanse::new(100, 50))
        );
        Ok(())
    }

    #[test]
    fn failed_creation_leaves_nothing_behind() -> Result<()> {
        let mut h = Harness::new()?;
        h.probe.fail_next_window();
        assert!(matches!(
            h.session().create_window(WindowSpec::new((10, 10))),
            Err(Error::ResourceFailure(_))
        ));
        h.probe.fail_next_surface();
        assert!(matches!(
            h.session().create_window(WindowSpec::new((10, 10))),
            Err(Error::ResourceFailure(_))
        ));
        assert_eq!(h.probe.window_count(), 0);
        assert!(h.session().windows().is_empty());

        assert!(matches!(
            h.session().create_window(WindowSpec::new((0, 10))),
            Err(Error::InvalidArea { w: 0, h: 10 })
        ));
        h.window(WindowSpec::new((10, 10)))?;
        assert_eq!(h.probe.window_count(), 1);
        Ok(())
    }

    #[test]
    fn close_can_be_refused() -> Result<()> {
        let log = Log::new();
        let mut h = Harness::new()?;
        let stubborn = h.window(
            WindowSpec::new((10, 10)).handler(WindowRecorder::new("stubborn", &log).refuse_close()),
        )?;
        let willing = h.window(WindowSpec::new((10, 10)).handler(WindowRecorder::new("willing", &log)))?;
        let native = h.native(willing)?;

        h.close(stubborn)?;
        assert_eq!(log.of("stubborn"), vec![Seen::CloseRequested]);
        assert!(h.session().window(stubborn).is_some());

        h.close(willing)?;
        assert_eq!(
            log.of("willing"),
            vec![Seen::CloseRequested, Seen::WindowDestroyed]
        );
        assert!(h.session().window(willing).is_none());
        assert!(h.probe.calls().contains(&Call::DestroyWindow(native)));
        assert_eq!(h.session().windows(), &[stubborn]);
        Ok(())
    }

    #[test]
    fn destroy_inside_a_callback_is_deferred() -> Result<()> {
        let log = Log::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new()?;
        let w = h.window(
            WindowSpec::new((100, 100))
                .framed(false)
                .handler(WindowRecorder::new("w", &log)),
        )?;
        let root = h.root(w)?;
        let s = h.session();
        let closer = s.create_node(
            root,
            Rect::new(0, 0, 50, 50),
            Some(Closer { seen: seen.clone() }.into()),
        )?;
        s.create_node(closer, Rect::new(0, 0, 10, 10), Some(Recorder::new("child", &log).into()))?;
        h.settle()?;
        let native = h.native(w)?;
        log.clear();

        h.button_down(w, (20, 20), Button::Primary)?;
        let observed = seen.lock().map(|v| v.clone()).unwrap_or_default();
        assert_eq!(observed, vec![Some(Lifecycle::PendingDestroy)]);
        assert!(h.session().window(w).is_none());
        assert!(h.session().node(closer).is_none());
        assert_eq!(h.session().window_for(native), None);
        assert_eq!(h.probe.grab(), None);
        assert_eq!(h.probe.window_count(), 0);
        let events = log.events();
        assert_eq!(
            events,
            vec![
                ("w".to_string(), Seen::WindowDestroyed),
                ("child".to_string(), Seen::Destroy),
            ]
        );

        // Repeated destroys are no-ops.
        h.session().destroy_window(w);
        assert_eq!(h.probe.window_count(), 0);
        Ok(())
    }

    #[test]
    fn background_drag_moves_and_raises() -> Result<()> {
        let log = Log::new();
        let mut h = Harness::new()?;
        let w = h.window(
            WindowSpec::new((100, 50))
                .at((100, 100))
                .handler(WindowRecorder::new("w", &log)),
        )?;
        let other = h.window(WindowSpec::new((10, 10)))?;
        let (native, other_native) = (h.native(w)?, h.native(other)?);
        assert_eq!(h.probe.stacking(), vec![native, other_native]);

        h.button_down_outer(w, (50, 5), Button::Primary)?;
        assert_eq!(h.probe.stacking(), vec![other_native, native]);
        assert_eq!(h.probe.grab(), Some((native, false)));
        h.motion_outer(w, (60, 15))?;
        assert_eq!(geometry(&mut h, w)?.0, Point::new(110, 110));
        assert!(log.of("w").contains(&Seen::Moved(Point::new(110, 110))));

        h.button_up_outer(w, (50, 5), Button::Primary)?;
        assert_eq!(h.probe.grab(), None);
        assert_eq!(
            h.session().window(w).map(|win| win.gesture()),
            Some(Gesture::Idle)
        );
        Ok(())
    }

    #[test]
    fn corner_drag_resizes() -> Result<()> {
        let log = Log::new();
        let mut h = Harness::new()?;
        let w = h.window(WindowSpec::new((100, 50)).handler(WindowRecorder::new("w", &log)))?;

        h.button_down_outer(w, (100, 68), Button::Primary)?;
        h.motion_outer(w, (110, 78))?;
        assert_eq!(geometry(&mut h, w)?.1, Expanse::new(110, 60));
        h.motion_outer(w, (0, 0))?;
        assert_eq!(geometry(&mut h, w)?.1, Expanse::new(1, 1));
        h.button_up_outer(w, (0, 0), Button::Primary)?;
        assert!(log.of("w").contains(&Seen::Resized(Expanse::new(110, 60))));

        let fixed = h.window(WindowSpec::new((100, 50)).resizable(false).at((300, 0)))?;
        h.button_down_outer(fixed, (100, 68), Button::Primary)?;
        h.motion_outer(fixed, (110, 78))?;
        h.button_up_outer(fixed, (110, 78), Button::Primary)?;
        assert_eq!(
            geometry(&mut h, fixed)?,
            (Point::new(310, 10), Expanse::new(100, 50))
        );
        Ok(())
    }

    #[test]
    fn title_double_click_toggles_minimize() -> Result<()> {
        let mut h = Harness::new()?;
        let w = h.window(WindowSpec::new((100, 50)).title("hello").at((100, 100)))?;

        let double = |h: &mut Harness| -> Result<()> {
            for _ in 0..2 {
                h.button_down_outer(w, (10, 5), Button::Primary)?;
                h.button_up_outer(w, (10, 5), Button::Primary)?;
            }
            Ok(())
        };

        double(&mut h)?;
        assert!(flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        assert_eq!(geometry(&mut h, w)?.1, Expanse::new(40, 1));

        double(&mut h)?;
        assert!(!flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        assert_eq!(
            geometry(&mut h, w)?,
            (Point::new(100, 100), Expanse::new(100, 50))
        );

        // Clicks further apart than the double-click interval only move.
        h.button_down_outer(w, (10, 5), Button::Primary)?;
        h.button_up_outer(w, (10, 5), Button::Primary)?;
        h.advance(500)?;
        h.button_down_outer(w, (10, 5), Button::Primary)?;
        h.button_up_outer(w, (10, 5), Button::Primary)?;
        assert!(!flags(&mut h, w)?.contains(WindowFlags::MINIMIZED));
        Ok(())
    }

    #[test]
    fn secondary_click_outside_lowers() -> Result<()> {
        let mut h = Harness::new()?;
        let a = h.window(WindowSpec::new((10, 10)))?;
        let b = h.window(WindowSpec::new((10, 10)))?;
        let (na, nb) = (h.native(a)?, h.native(b)?);

        h.button_down_outer(b, (-5, -5), Button::Secondary)?;
        h.button_up_outer(b, (-5, -5), Button::Secondary)?;
        assert_eq!(h.probe.stacking(), vec![nb, na]);

        // Unframed windows have no chrome gestures.
        let bare = h.window(WindowSpec::new((10, 10)).framed(false))?;
        let nbare = h.native(bare)?;
        h.button_down_outer(bare, (-5, -5), Button::Secondary)?;
        assert_eq!(h.probe.stacking(), vec![nb, na, nbare]);
        Ok(())
    }
}
