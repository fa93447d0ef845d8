//! A window of clickable swatches with a modal close confirmation.

use tracing::{debug, info};

use tessera::{
    Button, Color, Context, Error, EventOutcome, KeyCode, KeyEvent, NodeFlags, NodeId, Render, Result,
    Session, Widget, WindowHandler, WindowId, WindowSpec,
    geom::{Point, Rect},
};

/// Colors a swatch cycles through.
pub const PALETTE: [Color; 4] = [
    Color::rgb(0xc0, 0x39, 0x2b),
    Color::rgb(0x27, 0xae, 0x60),
    Color::rgb(0x29, 0x80, 0xb9),
    Color::rgb(0xf3, 0x9c, 0x12),
];

/// Highlight painted over a hovered swatch.
const HOVER: Color = Color::rgb(0xff, 0xff, 0xff);

/// Side of one swatch.
pub const CELL: u32 = 40;

/// Gap between swatches.
pub const GAP: u32 = 4;

/// A colored box. Clicking it, or pressing space while it is focused,
/// advances its color.
#[derive(Debug, Default)]
pub struct Swatch {
    /// Index into [`PALETTE`].
    index: usize,
    /// Is the pointer over the swatch?
    hovered: bool,
    /// Was the primary button pressed on the swatch?
    pressed: bool,
}

impl Swatch {
    /// A swatch starting at palette entry `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index: index % PALETTE.len(),
            ..Self::default()
        }
    }

    /// The current color.
    pub fn color(&self) -> Color {
        PALETTE[self.index]
    }

    /// Move to the next color and repaint.
    fn advance(&mut self, ctx: &mut Context) {
        self.index = (self.index + 1) % PALETTE.len();
        debug!("swatch {:?}: color {}", ctx.node_id(), self.index);
        ctx.request_update(None);
    }
}

impl Widget for Swatch {
    fn draw(&mut self, r: &mut Render, region: Rect, _cleared: bool) -> Result<()> {
        r.fill(region, self.color());
        if self.hovered {
            r.fill(Rect::new(0, 0, CELL, 2), HOVER);
        }
        Ok(())
    }

    fn on_enter(&mut self, ctx: &mut Context, _pos: Point) -> Result<()> {
        self.hovered = true;
        ctx.request_update(Some(Rect::new(0, 0, CELL, 2)));
        Ok(())
    }

    fn on_leave(&mut self, ctx: &mut Context, _pos: Point) -> Result<()> {
        self.hovered = false;
        self.pressed = false;
        ctx.request_update(Some(Rect::new(0, 0, CELL, 2)));
        Ok(())
    }

    fn on_button_down(&mut self, _ctx: &mut Context, _pos: Point, button: Button) -> Result<()> {
        self.pressed = button == Button::Primary;
        Ok(())
    }

    fn on_button_up(&mut self, ctx: &mut Context, pos: Point, button: Button) -> Result<()> {
        let inside = ctx.rect().is_some_and(|r| r.at_origin().contains(pos));
        if self.pressed && button == Button::Primary && inside {
            self.advance(ctx);
        }
        self.pressed = false;
        Ok(())
    }

    fn on_key_down(&mut self, ctx: &mut Context, key: &KeyEvent) -> Result<EventOutcome> {
        if key.key == KeyCode::Char(' ') {
            self.advance(ctx);
            return Ok(EventOutcome::Handle);
        }
        Ok(EventOutcome::Ignore)
    }

    fn name(&self) -> &'static str {
        "swatch"
    }
}

/// The panel holding the swatches. Tab moves focus to the next swatch.
#[derive(Debug, Default)]
pub struct Grid;

impl Widget for Grid {
    fn on_key_down(&mut self, ctx: &mut Context, key: &KeyEvent) -> Result<EventOutcome> {
        if key.key != KeyCode::Tab {
            return Ok(EventOutcome::Ignore);
        }
        let Some(w) = ctx.window_id() else {
            return Ok(EventOutcome::Ignore);
        };
        let grid = ctx.node_id();
        let s = ctx.session();
        let cells = s.children(grid).to_vec();
        if cells.is_empty() {
            return Ok(EventOutcome::Consume);
        }
        let current = s.window(w).and_then(|win| win.focused());
        let next = current
            .and_then(|f| cells.iter().position(|c| *c == f))
            .map_or(0, |i| (i + 1) % cells.len());
        s.set_focus(w, cells[next])?;
        Ok(EventOutcome::Handle)
    }

    fn name(&self) -> &'static str {
        "grid"
    }
}

/// A dialog button. Accepting destroys the window the dialog guards.
#[derive(Debug)]
pub struct DialogButton {
    /// The guarded window.
    owner: WindowId,
    /// Does this button confirm the close?
    accept: bool,
}

impl Widget for DialogButton {
    fn draw(&mut self, r: &mut Render, region: Rect, _cleared: bool) -> Result<()> {
        let color = if self.accept { PALETTE[1] } else { PALETTE[0] };
        r.fill(region, color);
        r.text(
            Point::new(2, 2),
            if self.accept { "yes" } else { "no" },
            HOVER,
        );
        Ok(())
    }

    fn on_button_up(&mut self, ctx: &mut Context, _pos: Point, button: Button) -> Result<()> {
        if button != Button::Primary {
            return Ok(());
        }
        let Some(dialog) = ctx.window_id() else {
            return Ok(());
        };
        let s = ctx.session();
        s.destroy_window(dialog);
        if self.accept {
            info!("close confirmed for {:?}", self.owner);
            s.destroy_window(self.owner);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dialog-button"
    }
}

/// Handler for the gym window: a close request opens a modal confirmation
/// instead of closing straight away.
#[derive(Debug, Default)]
pub struct GymWindow {
    /// The open confirmation dialog.
    dialog: Option<WindowId>,
}

impl WindowHandler for GymWindow {
    fn on_close(&mut self, s: &mut Session, w: WindowId) -> Result<bool> {
        if let Some(d) = self.dialog
            && s.window(d).is_some()
        {
            return Ok(false);
        }
        self.dialog = Some(confirm(s, w)?);
        Ok(false)
    }

    fn on_destroy(&mut self, s: &mut Session, _w: WindowId) {
        if let Some(d) = self.dialog.take() {
            s.destroy_window(d);
        }
    }
}

/// Open a modal dialog asking whether to close `owner`.
pub fn confirm(s: &mut Session, owner: WindowId) -> Result<WindowId> {
    let position = s.window(owner).map(|w| w.position()).unwrap_or_default();
    let dialog = s.create_window(
        WindowSpec::new((2 * CELL + 3 * GAP, CELL + 2 * GAP))
            .title("close?")
            .at(position + Point::new(20, 20))
            .resizable(false)
            .minimizable(false)
            .creator(owner),
    )?;
    let root = s
        .root(dialog)
        .ok_or_else(|| Error::NotFound("dialog root".into()))?;
    for (i, accept) in [(0, true), (1, false)] {
        let x = (GAP + i * (CELL + GAP)) as i32;
        s.create_node(
            root,
            Rect::new(x, GAP as i32, CELL, CELL),
            Some(DialogButton { owner, accept }.into()),
        )?;
    }
    s.set_modal(dialog, true)?;
    Ok(dialog)
}

/// Handles to the pieces of a built gym.
#[derive(Debug, Clone)]
pub struct BoxGym {
    /// The gym window.
    pub window: WindowId,
    /// The panel holding the swatches.
    pub grid: NodeId,
    /// Swatches in row-major order.
    pub swatches: Vec<NodeId>,
}

impl BoxGym {
    /// Build a gym window with a `cols` by `rows` grid of swatches.
    pub fn build(s: &mut Session, cols: u32, rows: u32) -> Result<Self> {
        let size = (
            cols.max(1) * (CELL + GAP) + GAP,
            rows.max(1) * (CELL + GAP) + GAP,
        );
        let window = s.create_window(
            WindowSpec::new(size)
                .title("boxgym")
                .at((40, 40))
                .handler(GymWindow::default())
                .background(Color::rgb(0x20, 0x20, 0x20)),
        )?;
        let root = s
            .root(window)
            .ok_or_else(|| Error::NotFound("gym root".into()))?;
        let grid = s.create_node(root, Rect::new(0, 0, size.0, size.1), Some(Grid.into()))?;
        let mut swatches = Vec::new();
        for y in 0..rows.max(1) {
            for x in 0..cols.max(1) {
                let at = Point::new(
                    (GAP + x * (CELL + GAP)) as i32,
                    (GAP + y * (CELL + GAP)) as i32,
                );
                let n = swatches.len();
                let id = s.create_node(
                    grid,
                    Rect::new(at.x, at.y, CELL, CELL),
                    Some(Swatch::new(n).into()),
                )?;
                s.set_flags(id, NodeFlags::default() | NodeFlags::HANDLES_KEYS)?;
                swatches.push(id);
            }
        }
        info!("boxgym: {} swatches", swatches.len());
        Ok(Self {
            window,
            grid,
            swatches,
        })
    }

    /// Content-space center of swatch `i`.
    pub fn center(&self, s: &Session, i: usize) -> Option<Point> {
        let id = *self.swatches.get(i)?;
        let half = (CELL / 2) as i32;
        s.to_window(id, Point::new(half, half))
    }
}
