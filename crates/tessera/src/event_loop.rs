use std::{
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use scopeguard::guard;
use tracing::{debug, trace, warn};

use crate::{
    backend::{Backend, Clock, Waker},
    config::Config,
    error::Result,
    event::NativeEvent,
    id::{IdleId, TimeoutId, WindowId},
    router,
    session::Session,
    timer::{Callback, Due, Idle, IdleQueue, TimeoutQueue},
    window::{self, Lifecycle},
};

/// A pre-dispatch hook. Returning an error vetoes routing of the event.
pub type EventFilter = dyn FnMut(&mut Session, &NativeEvent) -> Result<()>;

/// Lock a mutex, ignoring poison.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the loop and its handles.
struct LoopShared {
    /// Pending timeouts.
    timeouts: Mutex<TimeoutQueue>,
    /// Pending idle callbacks.
    idle: Mutex<IdleQueue>,
    /// Set by `exit`; checked at the top of every iteration.
    dead: AtomicBool,
    /// Wakes the backend wait.
    waker: Arc<dyn Waker>,
    /// Deadline clock.
    clock: Arc<dyn Clock>,
}

/// A cloneable, thread-safe handle for scheduling work on an event loop and
/// for stopping it.
#[derive(Clone)]
pub struct LoopHandle {
    /// Shared state.
    shared: Arc<LoopShared>,
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("dead", &self.is_dead())
            .field("timeouts", &lock(&self.shared.timeouts).len())
            .field("idle", &lock(&self.shared.idle).len())
            .finish()
    }
}

impl LoopHandle {
    /// Construct a handle over a backend's clock and waker.
    fn new(clock: Arc<dyn Clock>, waker: Arc<dyn Waker>) -> Self {
        Self {
            shared: Arc::new(LoopShared {
                timeouts: Mutex::new(TimeoutQueue::default()),
                idle: Mutex::new(IdleQueue::default()),
                dead: AtomicBool::new(false),
                waker,
                clock,
            }),
        }
    }

    /// The loop clock, in milliseconds.
    pub fn now(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    /// Schedule `delay_ms` from now.
    fn schedule(&self, delay_ms: u64, callback: Option<Callback>) -> TimeoutId {
        let deadline = self.now().saturating_add(delay_ms);
        let id = lock(&self.shared.timeouts).add(deadline, callback);
        trace!("timeout {id:?} at {deadline}");
        self.shared.waker.wake();
        id
    }

    /// Run `f` on the loop thread once `delay_ms` have passed.
    pub fn add_timeout(
        &self,
        delay_ms: u64,
        f: impl FnOnce(&mut Session) -> Result<()> + Send + 'static,
    ) -> TimeoutId {
        self.schedule(delay_ms, Some(Box::new(f)))
    }

    /// Stop the loop once `delay_ms` have passed.
    pub fn add_stop(&self, delay_ms: u64) -> TimeoutId {
        self.schedule(delay_ms, None)
    }

    /// Cancel a timeout. Returns false if it already fired or never existed.
    pub fn remove_timeout(&self, id: TimeoutId) -> bool {
        lock(&self.shared.timeouts).remove(id)
    }

    /// Run `f` on the loop thread when nothing else is pending.
    pub fn add_idle(
        &self,
        f: impl FnOnce(&mut Session) -> Result<()> + Send + 'static,
    ) -> IdleId {
        let id = lock(&self.shared.idle).add(Some(Box::new(f)));
        self.shared.waker.wake();
        id
    }

    /// Stop the loop the next time it finds nothing but idle work queued
    /// ahead of this request. The request is used up when it fires.
    pub fn set_exit_on_idle(&self, on: bool) {
        debug!("loop: exit on idle {}", if on { "enabled" } else { "disabled" });
        lock(&self.shared.idle).set_stop(on);
        self.shared.waker.wake();
    }

    /// Cancel an idle callback.
    pub fn remove_idle(&self, id: IdleId) -> bool {
        lock(&self.shared.idle).remove(id)
    }

    /// Shift every pending deadline by `delta_ms`, keeping their order.
    pub fn rebase(&self, delta_ms: i64) {
        lock(&self.shared.timeouts).rebase(delta_ms);
        self.shared.waker.wake();
    }

    /// Ask the loop to stop at the start of its next iteration, waking it if
    /// it is blocked.
    pub fn exit(&self) {
        debug!("loop: exit requested");
        self.shared.dead.store(true, Ordering::SeqCst);
        self.shared.waker.wake();
    }

    /// Has `exit` been called?
    pub fn is_dead(&self) -> bool {
        self.shared.dead.load(Ordering::SeqCst)
    }

    /// Number of pending timeouts.
    pub fn pending_timeouts(&self) -> usize {
        lock(&self.shared.timeouts).len()
    }

    /// Number of queued idle callbacks.
    pub fn pending_idle(&self) -> usize {
        lock(&self.shared.idle).len()
    }

    /// The earliest pending deadline.
    fn next_deadline(&self) -> Option<u64> {
        lock(&self.shared.timeouts).next_deadline()
    }

    /// Take the earliest timeout due at `now`. The lock is released before
    /// the caller runs it.
    fn pop_due(&self, now: u64) -> Option<Due> {
        lock(&self.shared.timeouts).pop_due(now)
    }

    /// Take the oldest idle entry.
    fn pop_idle(&self) -> Option<Idle> {
        lock(&self.shared.idle).pop()
    }
}

/// How an iteration behaves when nothing is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block on the backend until an event, a wakeup, or the next deadline.
    Block,
    /// Return [`Step::NoData`] immediately.
    Poll,
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Routed one native event.
    Dispatched,
    /// Ran one timeout callback.
    Timeout,
    /// Ran one idle callback.
    Idle,
    /// Blocked on the backend and woke up.
    Waited,
    /// Nothing was ready and the caller asked not to block.
    NoData,
    /// A stop sentinel fired.
    Stopped,
    /// `exit` was called.
    Exited,
}

/// The single-threaded loop multiplexing native events, timeouts, and idle
/// callbacks over a [`Session`].
pub struct EventLoop {
    /// UI state.
    session: Session,
    /// Scheduling handle shared with the session.
    handle: LoopHandle,
    /// Clock time of the last periodic flush.
    last_flush: Option<u64>,
    /// Pre-dispatch hook.
    filter: Option<Box<EventFilter>>,
}

impl EventLoop {
    /// Construct a loop over a backend. The configuration is validated first.
    pub fn new(backend: impl Backend + 'static, config: Config) -> Result<Self> {
        config.validate()?;
        let handle = LoopHandle::new(backend.clock(), backend.waker());
        let session = Session::new(Box::new(backend), config, handle.clone());
        Ok(Self {
            session,
            handle,
            last_flush: None,
            filter: None,
        })
    }

    /// The UI state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The UI state, mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// A handle for scheduling work and stopping the loop.
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Install a hook run before every native event is routed. An `Err`
    /// vetoes routing of that event and is logged.
    pub fn set_event_filter(
        &mut self,
        f: impl FnMut(&mut Session, &NativeEvent) -> Result<()> + 'static,
    ) {
        self.filter = Some(Box::new(f));
    }

    /// Remove the event filter.
    pub fn clear_event_filter(&mut self) {
        self.filter = None;
    }

    /// Revalidate the pointer and redraw pending damage.
    fn flush(&mut self, now: u64) -> Result<()> {
        self.session.recheck_pointer()?;
        self.session.flush()?;
        self.last_flush = Some(now);
        Ok(())
    }

    /// Route one event through the filter and the router.
    fn dispatch(&mut self, event: NativeEvent) -> Result<()> {
        if let Some(filter) = self.filter.as_mut()
            && let Err(e) = filter(&mut self.session, &event)
        {
            warn!("event vetoed by filter: {e}");
            return Ok(());
        }
        router::dispatch(&mut self.session, event)
    }

    /// Run one iteration. At most one event, timeout, or idle callback is
    /// processed.
    pub fn iterate(&mut self, wait: Wait) -> Result<Step> {
        if self.handle.is_dead() {
            return Ok(Step::Exited);
        }
        let now = self.handle.now();
        let interval = self.session.config.min_flush_interval_ms;
        if self
            .last_flush
            .is_none_or(|t| now.saturating_sub(t) >= interval)
        {
            self.flush(now)?;
        }

        if self.session.backend.has_event()
            && let Some(event) = self.session.backend.next_event()
        {
            trace!("loop: event {event:?}");
            self.dispatch(event)?;
            return Ok(Step::Dispatched);
        }

        self.flush(now)?;
        match self.handle.pop_due(now) {
            Some(Due::Callback(id, cb)) => {
                trace!("loop: timeout {id:?}");
                cb(&mut self.session)?;
                return Ok(Step::Timeout);
            }
            Some(Due::Stop(id)) => {
                debug!("loop: stop sentinel {id:?}");
                return Ok(Step::Stopped);
            }
            None => {}
        }
        match self.handle.pop_idle() {
            Some(Idle::Callback(id, cb)) => {
                trace!("loop: idle {id:?}");
                cb(&mut self.session)?;
                return Ok(Step::Idle);
            }
            Some(Idle::Stop(id)) => {
                debug!("loop: idle stop {id:?}");
                return Ok(Step::Stopped);
            }
            None => {}
        }

        match wait {
            Wait::Poll => Ok(Step::NoData),
            Wait::Block => {
                let timeout = self
                    .handle
                    .next_deadline()
                    .map(|d| d.saturating_sub(self.handle.now()));
                self.session.backend.wait(timeout)?;
                Ok(Step::Waited)
            }
        }
    }

    /// One non-blocking iteration.
    pub fn poll(&mut self) -> Result<Step> {
        self.iterate(Wait::Poll)
    }

    /// Iterate until `exit` is called, a stop sentinel fires, or the last
    /// window goes away.
    pub fn run(&mut self) -> Result<()> {
        let mut had_windows = !self.session.order.is_empty();
        loop {
            if let Step::Stopped | Step::Exited = self.iterate(Wait::Block)? {
                return Ok(());
            }
            let empty = self.session.order.is_empty();
            if empty && had_windows {
                debug!("loop: last window gone");
                return Ok(());
            }
            had_windows |= !empty;
        }
    }

    /// Iterate while `w` stays live, holding its dispatch guard so a
    /// callback destroying the window defers until the loop unwinds. Also
    /// ends on `exit` or a stop sentinel. With `timeout_ms`, a stop sentinel
    /// is queued on entry and withdrawn on return if it has not fired.
    pub fn run_window(&mut self, w: WindowId, timeout_ms: Option<u64>) -> Result<()> {
        window::live(&self.session, w)?;
        let handle = self.handle.clone();
        let stop = timeout_ms.map(|ms| handle.add_stop(ms));
        self.session.enter_dispatch(w);
        let mut this = guard(self, move |l| {
            if let Some(id) = stop
                && handle.remove_timeout(id)
            {
                trace!("loop: stop {id:?} withdrawn");
            }
            l.session.leave_dispatch(w);
        });
        loop {
            let live = this
                .session
                .windows
                .get(w)
                .is_some_and(|win| win.lifecycle == Lifecycle::Live);
            if !live {
                return Ok(());
            }
            if let Step::Stopped | Step::Exited = this.iterate(Wait::Block)? {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::Duration,
    };

    use super::*;
    use crate::{
        backend::{HeadlessBackend, HeadlessProbe},
        window::WindowSpec,
    };

    fn event_loop() -> Result<(EventLoop, HeadlessProbe)> {
        let backend = HeadlessBackend::new();
        let probe = backend.probe();
        Ok((EventLoop::new(backend, Config::default())?, probe))
    }

    #[test]
    fn timeouts_fire_in_deadline_order() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let log = Arc::new(Mutex::new(vec![]));
        let mut ids = vec![];
        for (delay, tag) in [(20, "t1"), (10, "t2"), (30, "t3")] {
            let log = log.clone();
            ids.push(h.add_timeout(delay, move |_| {
                log.lock().unwrap().push(tag);
                Ok(())
            }));
        }
        assert!(h.remove_timeout(ids[0]));
        assert!(!h.remove_timeout(ids[0]));
        h.add_stop(40);
        l.run()?;
        assert_eq!(*log.lock().unwrap(), vec!["t2", "t3"]);
        assert!(h.now() >= 40);
        Ok(())
    }

    #[test]
    fn idle_runs_after_due_timeouts() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let log = Arc::new(Mutex::new(vec![]));
        let (a, b) = (log.clone(), log.clone());
        h.add_idle(move |_| {
            a.lock().unwrap().push("idle");
            Ok(())
        });
        h.add_timeout(0, move |_| {
            b.lock().unwrap().push("timeout");
            Ok(())
        });
        assert_eq!(l.poll()?, Step::Timeout);
        assert_eq!(l.poll()?, Step::Idle);
        assert_eq!(l.poll()?, Step::NoData);
        assert_eq!(*log.lock().unwrap(), vec!["timeout", "idle"]);
        Ok(())
    }

    #[test]
    fn exit_is_checked_first() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        h.add_idle(|_| Ok(()));
        h.exit();
        assert_eq!(l.poll()?, Step::Exited);
        assert_eq!(h.pending_idle(), 1);
        l.run()?;
        Ok(())
    }

    #[test]
    fn exit_from_another_thread_wakes_a_blocked_loop() -> Result<()> {
        let backend = HeadlessBackend::realtime();
        let mut l = EventLoop::new(backend, Config::default())?;
        let h = l.handle();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            h.exit();
        });
        l.run()?;
        t.join().unwrap();
        Ok(())
    }

    #[test]
    fn rebase_keeps_order() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let log = Arc::new(Mutex::new(vec![]));
        for (delay, tag) in [(100, "a"), (200, "b")] {
            let log = log.clone();
            h.add_timeout(delay, move |_| {
                log.lock().unwrap().push(tag);
                Ok(())
            });
        }
        h.rebase(-100);
        assert_eq!(l.poll()?, Step::Timeout);
        assert_eq!(l.poll()?, Step::NoData);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        Ok(())
    }

    #[test]
    fn exit_on_idle_stops_after_queued_work() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let log = Arc::new(Mutex::new(vec![]));
        let a = log.clone();
        h.add_idle(move |_| {
            a.lock().unwrap().push("idle");
            Ok(())
        });
        h.set_exit_on_idle(true);
        h.add_stop(1_000);
        l.run()?;
        assert_eq!(*log.lock().unwrap(), vec!["idle"]);
        assert_eq!(h.pending_idle(), 0);
        assert!(h.now() < 1_000);
        assert!(!h.is_dead());

        h.set_exit_on_idle(true);
        h.set_exit_on_idle(false);
        assert_eq!(h.pending_idle(), 0);
        assert_eq!(l.poll()?, Step::NoData);
        Ok(())
    }

    #[test]
    fn run_window_timeout_is_withdrawn() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let w = l.session_mut().create_window(WindowSpec::new((10, 10)))?;
        l.run_window(w, Some(50))?;
        assert!(h.now() >= 50);
        assert_eq!(h.pending_timeouts(), 0);

        h.add_timeout(10, move |s| {
            s.destroy_window(w);
            Ok(())
        });
        l.run_window(w, Some(500))?;
        assert!(h.now() < 500);
        assert_eq!(h.pending_timeouts(), 0);
        Ok(())
    }

    #[test]
    fn run_ends_with_the_last_window() -> Result<()> {
        let (mut l, _probe) = event_loop()?;
        let h = l.handle();
        let (a, b) = {
            let s = l.session_mut();
            (
                s.create_window(WindowSpec::new((10, 10)))?,
                s.create_window(WindowSpec::new((10, 10)))?,
            )
        };
        h.add_timeout(10, move |s| {
            s.destroy_window(a);
            Ok(())
        });
        h.add_timeout(20, move |s| {
            s.destroy_window(b);
            Ok(())
        });
        let stop = h.add_stop(1_000);
        l.run()?;
        assert!(l.session().windows().is_empty());
        assert!(h.now() < 1_000);
        assert!(h.remove_timeout(stop));
        Ok(())
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = Config {
            damage_capacity: 0,
            ..Config::default()
        };
        assert!(EventLoop::new(HeadlessBackend::new(), config).is_err());
    }
}
