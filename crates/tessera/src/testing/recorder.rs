use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    error::Result,
    event::{Button, Buttons, KeyEvent, WheelEvent},
    geom::{Expanse, Point, Rect},
    id::{NodeId, WindowId},
    render::{Color, Render},
    session::Session,
    widget::{Context, EventOutcome, Widget, WindowHandler},
};

/// One observed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    /// `Widget::draw`.
    Draw {
        /// Region in local coordinates.
        region: Rect,
        /// Whether the background was filled first.
        cleared: bool,
    },
    /// `Widget::draw_after`.
    DrawAfter(Rect),
    /// `Widget::destroy`.
    Destroy,
    /// `Widget::on_focus_in`.
    FocusIn,
    /// `Widget::on_focus_out`.
    FocusOut,
    /// `Widget::on_enter`.
    Enter(Point),
    /// `Widget::on_leave`.
    Leave(Point),
    /// `Widget::on_motion`.
    Motion(Point, Buttons),
    /// `Widget::on_button_down`.
    ButtonDown(Point, Button),
    /// `Widget::on_button_up`.
    ButtonUp(Point, Button),
    /// `Widget::on_key_down`.
    KeyDown(KeyEvent),
    /// `Widget::on_key_up`.
    KeyUp(KeyEvent),
    /// `Widget::on_wheel`.
    Wheel(WheelEvent),
    /// `WindowHandler::on_move`.
    Moved(Point),
    /// `WindowHandler::on_resize`.
    Resized(Expanse),
    /// `WindowHandler::on_close`.
    CloseRequested,
    /// `WindowHandler::on_destroy`.
    WindowDestroyed,
    /// `WindowHandler::on_focus_in`.
    WindowFocusIn,
    /// `WindowHandler::on_focus_out`.
    WindowFocusOut,
    /// `WindowHandler::on_enter`.
    WindowEnter,
    /// `WindowHandler::on_leave`.
    WindowLeave,
    /// `WindowHandler::on_box_added`.
    BoxAdded(NodeId),
    /// `WindowHandler::on_box_to_be_removed`.
    BoxRemoved(NodeId),
}

impl Seen {
    /// Is this a draw callback?
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawAfter(_))
    }
}

/// A shared, labelled callback log.
#[derive(Debug, Clone, Default)]
pub struct Log {
    /// Entries in call order.
    entries: Arc<Mutex<Vec<(String, Seen)>>>,
}

impl Log {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entries, ignoring poison.
    fn lock(&self) -> MutexGuard<'_, Vec<(String, Seen)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    pub fn push(&self, label: &str, seen: Seen) {
        self.lock().push((label.to_string(), seen));
    }

    /// Every entry in call order.
    pub fn entries(&self) -> Vec<(String, Seen)> {
        self.lock().clone()
    }

    /// Every entry except draws.
    pub fn events(&self) -> Vec<(String, Seen)> {
        self.lock()
            .iter()
            .filter(|(_, s)| !s.is_draw())
            .cloned()
            .collect()
    }

    /// Entries logged under `label`.
    pub fn of(&self, label: &str) -> Vec<Seen> {
        self.lock()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Draw regions logged under `label`.
    pub fn draws(&self, label: &str) -> Vec<Rect> {
        self.of(label)
            .into_iter()
            .filter_map(|s| match s {
                Seen::Draw { region, .. } => Some(region),
                _ => None,
            })
            .collect()
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A widget that logs every callback it receives.
#[derive(Debug, Clone)]
pub struct Recorder {
    /// Log label.
    label: String,
    /// Destination.
    log: Log,
    /// Returned from key handlers.
    keys: EventOutcome,
    /// Returned from the wheel handler.
    wheel: EventOutcome,
    /// Painted over the draw region.
    fill: Option<Color>,
}

impl Recorder {
    /// A recorder that ignores keys and wheel events.
    pub fn new(label: impl Into<String>, log: &Log) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            keys: EventOutcome::Ignore,
            wheel: EventOutcome::Ignore,
            fill: None,
        }
    }

    /// Handle keys instead of letting them bubble.
    pub fn handles_keys(mut self) -> Self {
        self.keys = EventOutcome::Handle;
        self
    }

    /// Handle wheel events instead of letting them bubble.
    pub fn handles_wheel(mut self) -> Self {
        self.wheel = EventOutcome::Handle;
        self
    }

    /// Paint the draw region with `color`.
    pub fn fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    /// Log `seen`.
    fn push(&self, seen: Seen) {
        self.log.push(&self.label, seen);
    }
}

impl Widget for Recorder {
    fn draw(&mut self, r: &mut Render, region: Rect, cleared: bool) -> Result<()> {
        self.push(Seen::Draw { region, cleared });
        if let Some(c) = self.fill {
            r.fill(region, c);
        }
        Ok(())
    }

    fn draw_after(&mut self, _r: &mut Render, region: Rect) -> Result<()> {
        self.push(Seen::DrawAfter(region));
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut Context) {
        self.push(Seen::Destroy);
    }

    fn on_focus_in(&mut self, _ctx: &mut Context) -> Result<()> {
        self.push(Seen::FocusIn);
        Ok(())
    }

    fn on_focus_out(&mut self, _ctx: &mut Context) -> Result<()> {
        self.push(Seen::FocusOut);
        Ok(())
    }

    fn on_enter(&mut self, _ctx: &mut Context, pos: Point) -> Result<()> {
        self.push(Seen::Enter(pos));
        Ok(())
    }

    fn on_leave(&mut self, _ctx: &mut Context, pos: Point) -> Result<()> {
        self.push(Seen::Leave(pos));
        Ok(())
    }

    fn on_motion(&mut self, _ctx: &mut Context, pos: Point, buttons: Buttons) -> Result<()> {
        self.push(Seen::Motion(pos, buttons));
        Ok(())
    }

    fn on_button_down(&mut self, _ctx: &mut Context, pos: Point, button: Button) -> Result<()> {
        self.push(Seen::ButtonDown(pos, button));
        Ok(())
    }

    fn on_button_up(&mut self, _ctx: &mut Context, pos: Point, button: Button) -> Result<()> {
        self.push(Seen::ButtonUp(pos, button));
        Ok(())
    }

    fn on_key_down(&mut self, _ctx: &mut Context, key: &KeyEvent) -> Result<EventOutcome> {
        self.push(Seen::KeyDown(*key));
        Ok(self.keys)
    }

    fn on_key_up(&mut self, _ctx: &mut Context, key: &KeyEvent) -> Result<EventOutcome> {
        self.push(Seen::KeyUp(*key));
        Ok(self.keys)
    }

    fn on_wheel(&mut self, _ctx: &mut Context, wheel: &WheelEvent) -> Result<EventOutcome> {
        self.push(Seen::Wheel(*wheel));
        Ok(self.wheel)
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// A window handler that logs every callback it receives.
#[derive(Debug, Clone)]
pub struct WindowRecorder {
    /// Log label.
    label: String,
    /// Destination.
    log: Log,
    /// Returned from `on_close`.
    allow_close: bool,
}

impl WindowRecorder {
    /// A handler that allows close requests.
    pub fn new(label: impl Into<String>, log: &Log) -> Self {
        Self {
            label: label.into(),
            log: log.clone(),
            allow_close: true,
        }
    }

    /// Refuse close requests.
    pub fn refuse_close(mut self) -> Self {
        self.allow_close = false;
        self
    }

    /// Log `seen`.
    fn push(&self, seen: Seen) {
        self.log.push(&self.label, seen);
    }
}

impl WindowHandler for WindowRecorder {
    fn on_move(&mut self, _s: &mut Session, _w: WindowId, position: Point) -> Result<()> {
        self.push(Seen::Moved(position));
        Ok(())
    }

    fn on_resize(&mut self, _s: &mut Session, _w: WindowId, size: Expanse) -> Result<()> {
        self.push(Seen::Resized(size));
        Ok(())
    }

    fn on_close(&mut self, _s: &mut Session, _w: WindowId) -> Result<bool> {
        self.push(Seen::CloseRequested);
        Ok(self.allow_close)
    }

    fn on_destroy(&mut self, _s: &mut Session, _w: WindowId) {
        self.push(Seen::WindowDestroyed);
    }

    fn on_focus_in(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        self.push(Seen::WindowFocusIn);
        Ok(())
    }

    fn on_focus_out(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        self.push(Seen::WindowFocusOut);
        Ok(())
    }

    fn on_enter(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        self.push(Seen::WindowEnter);
        Ok(())
    }

    fn on_leave(&mut self, _s: &mut Session, _w: WindowId) -> Result<()> {
        self.push(Seen::WindowLeave);
        Ok(())
    }

    fn on_box_added(&mut self, _s: &mut Session, _w: WindowId, node: NodeId) -> Result<()> {
        self.push(Seen::BoxAdded(node));
        Ok(())
    }

    fn on_box_to_be_removed(&mut self, _s: &mut Session, _w: WindowId, node: NodeId) -> Result<()> {
        self.push(Seen::BoxRemoved(node));
        Ok(())
    }
}
