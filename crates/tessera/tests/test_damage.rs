//! Damage scheduling through a live session.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tessera::{
        Config, Error, FlushPolicy, NodeId, Result, Step, WindowFlags, WindowId, WindowSpec,
        backend::headless::Call,
        geom::{Point, Rect},
        testing::{Harness, Log, Recorder},
    };

    /// A settled, unframed 200x100 window whose root records draws.
    fn setup(config: Config) -> Result<(Harness, Log, WindowId, NodeId)> {
        let log = Log::new();
        let mut h = Harness::with_config(config)?;
        let w = h.window(
            WindowSpec::new((200, 100))
                .framed(false)
                .widget(Recorder::new("root", &log)),
        )?;
        let root = h.root(w)?;
        log.clear();
        Ok((h, log, w, root))
    }

    fn pending(h: &mut Harness, w: WindowId) -> Result<Vec<Rect>> {
        h.session()
            .window(w)
            .map(|win| win.damage().regions())
            .ok_or_else(|| Error::NotFound("window".into()))
    }

    #[test]
    fn child_update_lands_in_window_space() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let child = h.session().create_node(root, Rect::new(10, 10, 50, 20), None)?;
        h.settle()?;
        assert!(pending(&mut h, w)?.is_empty());

        h.session().request_update(child, None);
        let regions = pending(&mut h, w)?;
        assert_eq!(regions, vec![Rect::new(10, 10, 50, 20)]);
        assert_eq!(regions[0].tl(), Point::new(10, 10));
        assert_eq!(regions[0].last(), Some(Point::new(59, 29)));
        Ok(())
    }

    #[test]
    fn nested_updates_clip_to_every_ancestor() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let s = h.session();
        let panel = s.create_node(root, Rect::new(150, 50, 100, 100), None)?;
        let inner = s.create_node(panel, Rect::new(10, 10, 100, 100), None)?;
        h.settle()?;

        h.session().request_update(inner, None);
        assert_eq!(pending(&mut h, w)?, vec![Rect::new(160, 60, 40, 40)]);
        Ok(())
    }

    #[test]
    fn overlapping_updates_coalesce() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let s = h.session();
        s.request_update(root, Some(Rect::new(0, 0, 20, 20)));
        s.request_update(root, Some(Rect::new(10, 10, 20, 20)));
        assert_eq!(pending(&mut h, w)?, vec![Rect::new(0, 0, 30, 30)]);
        Ok(())
    }

    #[test]
    fn out_of_bounds_update_is_dropped() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let s = h.session();
        s.request_update(root, Some(Rect::new(500, 500, 10, 10)));
        s.request_update(root, Some(Rect::new(-20, 0, 10, 10)));
        let off = s.create_node(root, Rect::new(300, 0, 10, 10), None)?;
        s.request_update(off, None);
        assert!(pending(&mut h, w)?.is_empty());
        Ok(())
    }

    #[test]
    fn hidden_ancestor_suppresses_updates() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let s = h.session();
        let panel = s.create_node(root, Rect::new(0, 0, 50, 50), None)?;
        let leaf = s.create_node(panel, Rect::new(0, 0, 5, 5), None)?;
        s.set_visible(panel, false)?;
        h.settle()?;

        h.session().request_update(leaf, None);
        assert!(pending(&mut h, w)?.is_empty());
        Ok(())
    }

    #[test]
    fn capacity_bounds_queue_and_flush_covers_union() -> Result<()> {
        let config = Config {
            damage_capacity: 3,
            ..Config::default()
        };
        let (mut h, log, w, root) = setup(config)?;
        for i in 0..10 {
            h.session()
                .request_update(root, Some(Rect::new(i * 20, i * 10 % 100, 5, 5)));
            assert!(pending(&mut h, w)?.len() <= 3);
        }
        h.settle()?;
        assert!(pending(&mut h, w)?.is_empty());
        assert_eq!(log.draws("root"), vec![Rect::new(0, 0, 185, 95)]);
        Ok(())
    }

    #[test]
    fn individual_policy_draws_each_region() -> Result<()> {
        let config = Config {
            flush_policy: FlushPolicy::Individual,
            ..Config::default()
        };
        let (mut h, log, _w, root) = setup(config)?;
        let s = h.session();
        s.request_update(root, Some(Rect::new(0, 0, 5, 5)));
        s.request_update(root, Some(Rect::new(50, 50, 5, 5)));
        h.settle()?;
        assert_eq!(
            log.draws("root"),
            vec![Rect::new(0, 0, 5, 5), Rect::new(50, 50, 5, 5)]
        );
        Ok(())
    }

    #[test]
    fn resize_discards_damage_until_confirmed() -> Result<()> {
        let (mut h, _log, w, root) = setup(Config::default())?;
        let s = h.session();
        for x in [0, 50, 100] {
            s.request_update(root, Some(Rect::new(x, 0, 5, 5)));
        }
        assert_eq!(pending(&mut h, w)?.len(), 3);

        h.session().resize_window(w, (300, 150))?;
        assert!(pending(&mut h, w)?.is_empty());
        h.session().request_update(root, Some(Rect::new(0, 0, 5, 5)));
        assert!(pending(&mut h, w)?.is_empty());

        // One iteration applies the confirmation without flushing.
        assert_eq!(h.event_loop.poll()?, Step::Dispatched);
        assert_eq!(pending(&mut h, w)?, vec![Rect::new(0, 0, 300, 150)]);

        h.settle()?;
        h.session().request_update(root, Some(Rect::new(250, 120, 5, 5)));
        assert_eq!(pending(&mut h, w)?, vec![Rect::new(250, 120, 5, 5)]);
        Ok(())
    }

    #[test]
    fn first_flush_commits_visibility_once() -> Result<()> {
        let mut h = Harness::new()?;
        let w = h.session().create_window(WindowSpec::new((20, 20)).opacity(0.5))?;
        let native = h.native(w)?;
        h.settle()?;
        let root = h.root(w)?;
        h.session().request_update(root, None);
        h.settle()?;
        let calls = h.probe.calls();
        let shows = calls.iter().filter(|c| **c == Call::Show(native)).count();
        assert_eq!(shows, 1);
        assert!(calls.contains(&Call::SetOpacity(native, 0.5)));
        Ok(())
    }

    #[test]
    fn flush_without_damage_commits_nothing() -> Result<()> {
        let mut h = Harness::new()?;
        let w = h.session().create_window(WindowSpec::new((20, 20)))?;
        let native = h.native(w)?;
        if let Some(win) = h.session().window(w) {
            win.damage().clear();
        }
        h.settle()?;
        let drawn = |h: &mut Harness| {
            h.session()
                .window(w)
                .is_some_and(|win| win.flags().contains(WindowFlags::DRAWN))
        };
        assert!(!drawn(&mut h));
        assert!(!h.probe.calls().contains(&Call::Show(native)));

        let root = h.root(w)?;
        h.session().request_update(root, None);
        h.settle()?;
        assert!(drawn(&mut h));
        assert!(h.probe.calls().contains(&Call::Show(native)));
        Ok(())
    }
}
