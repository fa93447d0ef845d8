use crate::{
    backend::{HeadlessBackend, HeadlessProbe},
    config::Config,
    error::{Error, Result},
    event::{Button, KeyEvent, NativeEvent},
    event_loop::{EventLoop, Step},
    geom::{Point, Rect},
    id::{NativeWindow, NodeId, WindowId},
    session::Session,
    window::WindowSpec,
};

/// Iterations `settle` allows before giving up.
const SETTLE_LIMIT: usize = 10_000;

/// An event loop over a headless backend on a manual clock. Tests post
/// native events through the helpers, which settle the loop afterwards, and
/// inspect the result through the session and the probe.
///
/// Positions passed to the helpers are window content coordinates; they are
/// translated to the outer coordinates the native layer reports.
pub struct Harness {
    /// The loop under test.
    pub event_loop: EventLoop,
    /// Inspects the backend.
    pub probe: HeadlessProbe,
}

impl Harness {
    /// A harness with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// A harness with a custom configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let backend = HeadlessBackend::new();
        let probe = backend.probe();
        Ok(Self {
            event_loop: EventLoop::new(backend, config)?,
            probe,
        })
    }

    /// The session.
    pub fn session(&mut self) -> &mut Session {
        self.event_loop.session_mut()
    }

    /// Create a window and settle, so it is drawn and shown.
    pub fn window(&mut self, spec: WindowSpec) -> Result<WindowId> {
        let w = self.session().create_window(spec)?;
        self.settle()?;
        Ok(w)
    }

    /// A window's native handle.
    pub fn native(&self, w: WindowId) -> Result<NativeWindow> {
        self.event_loop
            .session()
            .window(w)
            .map(|win| win.native())
            .ok_or_else(|| Error::NotFound(format!("window {w:?}")))
    }

    /// A window's content root.
    pub fn root(&self, w: WindowId) -> Result<NodeId> {
        self.event_loop
            .session()
            .root(w)
            .ok_or_else(|| Error::NotFound(format!("window {w:?}")))
    }

    /// Translate a content point to outer window and screen coordinates.
    fn locate(&self, w: WindowId, p: Point) -> Result<(NativeWindow, Point, Point)> {
        let win = self
            .event_loop
            .session()
            .window(w)
            .ok_or_else(|| Error::NotFound(format!("window {w:?}")))?;
        let pos = p + win.frame().origin();
        Ok((win.native(), pos, pos + win.position()))
    }

    /// Poll until nothing is ready. Returns the number of iterations that did
    /// work.
    pub fn settle(&mut self) -> Result<usize> {
        for n in 0..SETTLE_LIMIT {
            if let Step::NoData | Step::Stopped | Step::Exited = self.event_loop.poll()? {
                return Ok(n);
            }
        }
        Err(Error::Backend("event loop did not settle".into()))
    }

    /// Post a native event and settle.
    pub fn post(&mut self, event: NativeEvent) -> Result<()> {
        self.probe.post(event);
        self.settle().map(drop)
    }

    /// Advance the clock and settle.
    pub fn advance(&mut self, ms: u64) -> Result<()> {
        self.probe.advance(ms);
        self.settle().map(drop)
    }

    /// Move the pointer into a window.
    pub fn enter(&mut self, w: WindowId, p: impl Into<Point>) -> Result<()> {
        let (window, pos, root) = self.locate(w, p.into())?;
        self.post(NativeEvent::Enter { window, pos, root })
    }

    /// Move the pointer out of a window.
    pub fn leave(&mut self, w: WindowId) -> Result<()> {
        let window = self.native(w)?;
        self.post(NativeEvent::Leave { window })
    }

    /// Move the pointer within a window.
    pub fn motion(&mut self, w: WindowId, p: impl Into<Point>) -> Result<()> {
        let (window, pos, root) = self.locate(w, p.into())?;
        self.post(NativeEvent::Motion { window, pos, root })
    }

    /// Motion in raw outer window coordinates, for exercising chrome.
    pub fn motion_outer(&mut self, w: WindowId, pos: impl Into<Point>) -> Result<()> {
        let window = self.native(w)?;
        let pos = pos.into();
        let root = pos + self.window_position(w)?;
        self.post(NativeEvent::Motion { window, pos, root })
    }

    /// Press a button.
    pub fn button_down(&mut self, w: WindowId, p: impl Into<Point>, button: Button) -> Result<()> {
        let (window, pos, root) = self.locate(w, p.into())?;
        self.press(window, pos, root, button)
    }

    /// Press a button at raw outer window coordinates.
    pub fn button_down_outer(
        &mut self,
        w: WindowId,
        pos: impl Into<Point>,
        button: Button,
    ) -> Result<()> {
        let window = self.native(w)?;
        let pos = pos.into();
        let root = pos + self.window_position(w)?;
        self.press(window, pos, root, button)
    }

    /// Post a stamped button press.
    fn press(&mut self, window: NativeWindow, pos: Point, root: Point, button: Button) -> Result<()> {
        let time = self.event_loop.handle().now();
        self.post(NativeEvent::ButtonDown {
            window,
            pos,
            root,
            button,
            time,
        })
    }

    /// Release a button.
    pub fn button_up(&mut self, w: WindowId, p: impl Into<Point>, button: Button) -> Result<()> {
        let (window, pos, root) = self.locate(w, p.into())?;
        self.post(NativeEvent::ButtonUp {
            window,
            pos,
            root,
            button,
        })
    }

    /// Release a button at raw outer window coordinates.
    pub fn button_up_outer(
        &mut self,
        w: WindowId,
        pos: impl Into<Point>,
        button: Button,
    ) -> Result<()> {
        let window = self.native(w)?;
        let pos = pos.into();
        let root = pos + self.window_position(w)?;
        self.post(NativeEvent::ButtonUp {
            window,
            pos,
            root,
            button,
        })
    }

    /// Press and release the primary button.
    pub fn click(&mut self, w: WindowId, p: impl Into<Point>) -> Result<()> {
        let p = p.into();
        self.button_down(w, p, Button::Primary)?;
        self.button_up(w, p, Button::Primary)
    }

    /// Press and release a key.
    pub fn key(&mut self, w: WindowId, key: impl Into<KeyEvent>) -> Result<()> {
        let window = self.native(w)?;
        let key = key.into();
        self.post(NativeEvent::KeyDown { window, key })?;
        self.post(NativeEvent::KeyUp { window, key })
    }

    /// Scroll the wheel.
    pub fn wheel(&mut self, w: WindowId, p: impl Into<Point>, delta: impl Into<Point>) -> Result<()> {
        let (window, pos, _) = self.locate(w, p.into())?;
        self.post(NativeEvent::Wheel {
            window,
            pos,
            delta: delta.into(),
        })
    }

    /// Give a window native focus.
    pub fn focus_in(&mut self, w: WindowId) -> Result<()> {
        let window = self.native(w)?;
        self.post(NativeEvent::FocusIn { window })
    }

    /// Ask to close a window.
    pub fn close(&mut self, w: WindowId) -> Result<()> {
        let window = self.native(w)?;
        self.post(NativeEvent::Close { window })
    }

    /// Expose part of a window, in outer coordinates.
    pub fn expose(&mut self, w: WindowId, rect: Rect) -> Result<()> {
        let window = self.native(w)?;
        self.post(NativeEvent::Expose { window, rect })
    }

    /// A window's screen position.
    fn window_position(&self, w: WindowId) -> Result<Point> {
        self.event_loop
            .session()
            .window(w)
            .map(|win| win.position())
            .ok_or_else(|| Error::NotFound(format!("window {w:?}")))
    }
}
