use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tracing::trace;

use super::{Backend, Clock, NativeSpec, Waker};
use crate::{
    error::{Error, Result},
    event::NativeEvent,
    geom::{Expanse, Point, Rect},
    id::NativeWindow,
    render::{Canvas, Color},
};

/// A native call recorded by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// A window was created.
    CreateWindow(NativeWindow),
    /// A window was destroyed.
    DestroyWindow(NativeWindow),
    /// A surface was bound.
    AttachSurface(NativeWindow, Expanse),
    /// A surface was released.
    ReleaseSurface(NativeWindow),
    /// A resize was requested.
    Resize(NativeWindow, Expanse),
    /// A move was requested.
    MoveTo(NativeWindow, Point),
    /// Bounds were set.
    SetBounds(NativeWindow, Rect),
    /// A grab was taken; the flag records keyboard grabs.
    Grab(NativeWindow, bool),
    /// All grabs were released.
    Ungrab,
    /// A window was raised.
    Raise(NativeWindow),
    /// A window was lowered.
    Lower(NativeWindow),
    /// Opacity was set.
    SetOpacity(NativeWindow, f32),
    /// A window was mapped.
    Show(NativeWindow),
    /// An opaque region was hinted.
    SetOpaqueRegion(NativeWindow, Rect),
}

/// What the headless layer knows about one native window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    /// Outer position and size.
    pub bounds: Rect,
    /// Window title.
    pub title: String,
    /// Bound surface size.
    pub surface: Option<Expanse>,
    /// Last opaque region hint.
    pub opaque: Option<Rect>,
    /// Opacity.
    pub opacity: f32,
    /// Has the window been mapped?
    pub shown: bool,
}

/// A single recorded fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Target window.
    pub window: NativeWindow,
    /// Filled area in outer window coordinates.
    pub rect: Rect,
    /// Fill color.
    pub color: Color,
}

/// Everything the backend has been asked to do.
#[derive(Debug, Default)]
struct Recording {
    /// Native calls in order.
    calls: Vec<Call>,
    /// Live windows.
    windows: BTreeMap<NativeWindow, WindowState>,
    /// Stacking order, bottom first.
    stacking: Vec<NativeWindow>,
    /// Current grab holder and whether the keyboard is grabbed too.
    grab: Option<(NativeWindow, bool)>,
    /// Fills since the last clear.
    fills: Vec<Fill>,
    /// Text runs since the last clear.
    texts: Vec<(NativeWindow, String)>,
    /// Make the next window allocation fail.
    fail_create: bool,
    /// Make the next surface allocation fail.
    fail_surface: bool,
    /// Make the next resize or bounds change fail.
    fail_geometry: bool,
}

/// Pending native events.
#[derive(Debug, Default)]
struct Queue {
    /// Events in arrival order.
    events: VecDeque<NativeEvent>,
    /// Set by a waker; cleared when a wait returns.
    woken: bool,
}

/// State shared between the backend, its probes, and its wakers.
#[derive(Debug, Default)]
struct Shared {
    /// Call log and window state.
    rec: Mutex<Recording>,
    /// Event queue.
    queue: Mutex<Queue>,
    /// Signalled when the queue changes or a wakeup arrives.
    ready: Condvar,
}

impl Shared {
    /// Lock the recording, ignoring poison.
    fn rec(&self) -> MutexGuard<'_, Recording> {
        self.rec.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the queue, ignoring poison.
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an event and wake any waiter.
    fn post(&self, event: NativeEvent) {
        self.queue().events.push_back(event);
        self.ready.notify_all();
    }
}

/// A clock driven by the test. It only moves when told to, or when a timed
/// wait finds nothing to do.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in milliseconds.
    now: AtomicU64,
}

impl ManualClock {
    /// Move the clock forward.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute value. Moving backwards is allowed, which
    /// lets tests simulate a wall-clock step.
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A clock backed by [`Instant`].
#[derive(Debug)]
pub struct SystemClock {
    /// Time zero.
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Waker for a headless backend.
struct HeadlessWaker {
    /// Shared queue.
    shared: Arc<Shared>,
}

impl Waker for HeadlessWaker {
    fn wake(&self) {
        self.shared.queue().woken = true;
        self.shared.ready.notify_all();
    }
}

/// Drawing surface for one headless window; fills go to the shared log.
struct HeadlessCanvas {
    /// Owning window.
    window: NativeWindow,
    /// Shared log.
    shared: Arc<Shared>,
}

impl Canvas for HeadlessCanvas {
    fn fill(&mut self, rect: Rect, color: Color) {
        self.shared.rec().fills.push(Fill {
            window: self.window,
            rect,
            color,
        });
    }

    fn text(&mut self, _at: Point, text: &str, _color: Color, _clip: Rect) {
        self.shared.rec().texts.push((self.window, text.to_string()));
    }
}

/// An in-memory backend. It records every native call, confirms resizes and
/// moves by queueing events, and can run on a manual clock.
pub struct HeadlessBackend {
    /// State shared with probes and wakers.
    shared: Arc<Shared>,
    /// Clock handed to the event loop.
    clock: Arc<dyn Clock>,
    /// The same clock, when it is manual.
    manual: Option<Arc<ManualClock>>,
    /// Surfaces by window.
    canvases: HashMap<NativeWindow, HeadlessCanvas>,
    /// Next native handle.
    next_id: u64,
}

impl HeadlessBackend {
    /// A backend on a manual clock starting at zero.
    pub fn new() -> Self {
        let manual = Arc::new(ManualClock::default());
        Self {
            shared: Arc::default(),
            clock: manual.clone(),
            manual: Some(manual),
            canvases: HashMap::new(),
            next_id: 1,
        }
    }

    /// A backend that waits in real time.
    pub fn realtime() -> Self {
        Self {
            shared: Arc::default(),
            clock: Arc::new(SystemClock::default()),
            manual: None,
            canvases: HashMap::new(),
            next_id: 1,
        }
    }

    /// A handle for inspecting and driving this backend from tests.
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            shared: self.shared.clone(),
            manual: self.manual.clone(),
        }
    }

    /// Record a call.
    fn record(&self, call: Call) {
        trace!("headless: {call:?}");
        self.shared.rec().calls.push(call);
    }

    /// Apply `f` to a live window's state.
    fn with_window(&self, win: NativeWindow, f: impl FnOnce(&mut WindowState)) -> Result<()> {
        let mut rec = self.shared.rec();
        let state = rec
            .windows
            .get_mut(&win)
            .ok_or_else(|| Error::Backend(format!("unknown native window {}", win.0)))?;
        f(state);
        Ok(())
    }

    /// Consume an injected geometry failure.
    fn check_geometry(&self) -> Result<()> {
        let mut rec = self.shared.rec();
        if rec.fail_geometry {
            rec.fail_geometry = false;
            return Err(Error::Backend("geometry request refused".into()));
        }
        Ok(())
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for HeadlessBackend {
    fn create_window(&mut self, spec: &NativeSpec) -> Result<NativeWindow> {
        {
            let mut rec = self.shared.rec();
            if rec.fail_create {
                rec.fail_create = false;
                return Err(Error::ResourceFailure("window allocation failed".into()));
            }
        }
        let win = NativeWindow(self.next_id);
        self.next_id += 1;
        {
            let mut rec = self.shared.rec();
            rec.windows.insert(
                win,
                WindowState {
                    bounds: Rect::at(spec.position, spec.size),
                    title: spec.title.clone(),
                    surface: None,
                    opaque: None,
                    opacity: 1.0,
                    shown: false,
                },
            );
            rec.stacking.push(win);
        }
        self.record(Call::CreateWindow(win));
        Ok(win)
    }

    fn destroy_window(&mut self, win: NativeWindow) {
        self.canvases.remove(&win);
        let mut rec = self.shared.rec();
        if rec.windows.remove(&win).is_none() {
            return;
        }
        rec.stacking.retain(|w| *w != win);
        if rec.grab.is_some_and(|(w, _)| w == win) {
            rec.grab = None;
        }
        rec.calls.push(Call::DestroyWindow(win));
    }

    fn attach_surface(&mut self, win: NativeWindow, size: Expanse) -> Result<()> {
        {
            let mut rec = self.shared.rec();
            if rec.fail_surface {
                rec.fail_surface = false;
                return Err(Error::ResourceFailure("surface allocation failed".into()));
            }
        }
        self.with_window(win, |s| s.surface = Some(size))?;
        self.canvases.insert(
            win,
            HeadlessCanvas {
                window: win,
                shared: self.shared.clone(),
            },
        );
        self.record(Call::AttachSurface(win, size));
        Ok(())
    }

    fn release_surface(&mut self, win: NativeWindow) {
        if self.canvases.remove(&win).is_some()
            && self.with_window(win, |s| s.surface = None).is_ok()
        {
            self.record(Call::ReleaseSurface(win));
        }
    }

    fn resize(&mut self, win: NativeWindow, size: Expanse) -> Result<()> {
        self.check_geometry()?;
        self.with_window(win, |s| s.bounds = Rect::at(s.bounds.tl(), size))?;
        self.record(Call::Resize(win, size));
        self.shared.post(NativeEvent::Configure { window: win, size });
        Ok(())
    }

    fn move_to(&mut self, win: NativeWindow, position: Point) -> Result<()> {
        self.with_window(win, |s| s.bounds = Rect::at(position, s.bounds.size()))?;
        self.record(Call::MoveTo(win, position));
        self.shared.post(NativeEvent::Moved {
            window: win,
            position,
        });
        Ok(())
    }

    fn set_bounds(&mut self, win: NativeWindow, bounds: Rect) -> Result<()> {
        self.check_geometry()?;
        self.with_window(win, |s| s.bounds = bounds)?;
        self.record(Call::SetBounds(win, bounds));
        self.shared.post(NativeEvent::Moved {
            window: win,
            position: bounds.tl(),
        });
        self.shared.post(NativeEvent::Configure {
            window: win,
            size: bounds.size(),
        });
        Ok(())
    }

    fn grab(&mut self, win: NativeWindow, keyboard: bool) -> Result<()> {
        {
            let mut rec = self.shared.rec();
            if !rec.windows.contains_key(&win) {
                return Err(Error::Backend(format!("cannot grab for window {}", win.0)));
            }
            rec.grab = Some((win, keyboard));
        }
        self.record(Call::Grab(win, keyboard));
        Ok(())
    }

    fn ungrab(&mut self) {
        self.shared.rec().grab = None;
        self.record(Call::Ungrab);
    }

    fn raise(&mut self, win: NativeWindow) {
        {
            let mut rec = self.shared.rec();
            if !rec.windows.contains_key(&win) {
                return;
            }
            rec.stacking.retain(|w| *w != win);
            rec.stacking.push(win);
        }
        self.record(Call::Raise(win));
    }

    fn lower(&mut self, win: NativeWindow) {
        {
            let mut rec = self.shared.rec();
            if !rec.windows.contains_key(&win) {
                return;
            }
            rec.stacking.retain(|w| *w != win);
            rec.stacking.insert(0, win);
        }
        self.record(Call::Lower(win));
    }

    fn set_opacity(&mut self, win: NativeWindow, opacity: f32) {
        if self.with_window(win, |s| s.opacity = opacity).is_ok() {
            self.record(Call::SetOpacity(win, opacity));
        }
    }

    fn show(&mut self, win: NativeWindow) {
        if self.with_window(win, |s| s.shown = true).is_ok() {
            self.record(Call::Show(win));
        }
    }

    fn set_opaque_region(&mut self, win: NativeWindow, region: Rect) {
        if self.with_window(win, |s| s.opaque = Some(region)).is_ok() {
            self.record(Call::SetOpaqueRegion(win, region));
        }
    }

    fn canvas(&mut self, win: NativeWindow) -> Result<&mut dyn Canvas> {
        self.canvases
            .get_mut(&win)
            .map(|c| c as &mut dyn Canvas)
            .ok_or_else(|| Error::Backend(format!("no surface bound to window {}", win.0)))
    }

    fn has_event(&mut self) -> bool {
        !self.shared.queue().events.is_empty()
    }

    fn next_event(&mut self) -> Option<NativeEvent> {
        self.shared.queue().events.pop_front()
    }

    fn post_event(&mut self, event: NativeEvent) {
        self.shared.post(event);
    }

    fn wait(&mut self, timeout_ms: Option<u64>) -> Result<bool> {
        let mut q = self.shared.queue();
        if q.events.is_empty() && !q.woken {
            match (timeout_ms, &self.manual) {
                (Some(ms), Some(clock)) => clock.advance(ms),
                (Some(ms), None) => {
                    let deadline = Instant::now() + Duration::from_millis(ms);
                    while q.events.is_empty() && !q.woken {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        q = self
                            .shared
                            .ready
                            .wait_timeout(q, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                    }
                }
                (None, _) => {
                    while q.events.is_empty() && !q.woken {
                        q = self
                            .shared
                            .ready
                            .wait(q)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                }
            }
        }
        q.woken = false;
        Ok(!q.events.is_empty())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn waker(&self) -> Arc<dyn Waker> {
        Arc::new(HeadlessWaker {
            shared: self.shared.clone(),
        })
    }
}

/// Inspects and drives a [`HeadlessBackend`] after it has been handed to an
/// event loop. Cheap to clone, and usable from any thread.
#[derive(Clone)]
pub struct HeadlessProbe {
    /// Shared state.
    shared: Arc<Shared>,
    /// The manual clock, if the backend has one.
    manual: Option<Arc<ManualClock>>,
}

impl HeadlessProbe {
    /// Queue a native event.
    pub fn post(&self, event: NativeEvent) {
        self.shared.post(event);
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.shared.queue().events.len()
    }

    /// Advance the manual clock. A no-op on a realtime backend.
    pub fn advance(&self, ms: u64) {
        if let Some(c) = &self.manual {
            c.advance(ms);
        }
    }

    /// Set the manual clock. A no-op on a realtime backend.
    pub fn set_time(&self, ms: u64) {
        if let Some(c) = &self.manual {
            c.set(ms);
        }
    }

    /// The native calls recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.shared.rec().calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.shared.rec().calls.clear();
    }

    /// Fills recorded for a window.
    pub fn fills(&self, win: NativeWindow) -> Vec<Fill> {
        self.shared
            .rec()
            .fills
            .iter()
            .filter(|f| f.window == win)
            .copied()
            .collect()
    }

    /// Text runs recorded for a window.
    pub fn texts(&self, win: NativeWindow) -> Vec<String> {
        self.shared
            .rec()
            .texts
            .iter()
            .filter(|(w, _)| *w == win)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Forget recorded fills and text.
    pub fn clear_fills(&self) {
        let mut rec = self.shared.rec();
        rec.fills.clear();
        rec.texts.clear();
    }

    /// The current grab, if any.
    pub fn grab(&self) -> Option<(NativeWindow, bool)> {
        self.shared.rec().grab
    }

    /// Stacking order, bottom first.
    pub fn stacking(&self) -> Vec<NativeWindow> {
        self.shared.rec().stacking.clone()
    }

    /// State of a live native window.
    pub fn window(&self, win: NativeWindow) -> Option<WindowState> {
        self.shared.rec().windows.get(&win).cloned()
    }

    /// Number of live native windows.
    pub fn window_count(&self) -> usize {
        self.shared.rec().windows.len()
    }

    /// Make the next window allocation fail.
    pub fn fail_next_window(&self) {
        self.shared.rec().fail_create = true;
    }

    /// Make the next surface allocation fail.
    pub fn fail_next_surface(&self) {
        self.shared.rec().fail_surface = true;
    }

    /// Make the next resize or bounds change fail.
    pub fn fail_next_geometry(&self) {
        self.shared.rec().fail_geometry = true;
    }
}
