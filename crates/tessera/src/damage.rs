//! Per-window damage queues.

use std::{
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{Error, Result},
    geom::Rect,
    id::NodeId,
    node::NodeFlags,
    render::draw_tree,
    session::Session,
    window::{self, WindowFlags},
};

/// How a flush turns queued regions into draw passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// One draw pass over the bounding union of everything queued.
    #[default]
    Union,
    /// One draw pass per queued region.
    Individual,
}

/// A bounded set of rectangles awaiting repaint, in window content
/// coordinates.
///
/// Overlapping regions are merged on insert. When the queue is full, every
/// pending region collapses into its bounding union before the new region is
/// added, so the queue never holds more than `capacity` entries.
#[derive(Debug)]
pub struct DamageQueue {
    /// Maximum number of distinct regions.
    capacity: usize,
    /// Pending regions.
    regions: Mutex<Vec<Rect>>,
}

impl DamageQueue {
    /// Construct an empty queue. A zero capacity is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument(
                "damage capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            regions: Mutex::new(Vec::with_capacity(capacity)),
        })
    }

    /// Lock the region list, ignoring poison.
    fn lock(&self) -> MutexGuard<'_, Vec<Rect>> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The maximum number of distinct regions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue a region. Empty regions are ignored.
    pub fn push(&self, r: Rect) {
        if r.is_empty() {
            return;
        }
        let mut regions = self.lock();
        if let Some(existing) = regions.iter_mut().find(|e| e.intersects(&r)) {
            *existing = existing.union(&r);
            trace!("damage: merged into {existing:?}");
            return;
        }
        if regions.len() >= self.capacity {
            let all = regions
                .drain(..)
                .fold(Rect::zero(), |acc, e| acc.union(&e));
            trace!("damage: queue full, collapsed to {all:?}");
            if all.intersects(&r) || self.capacity == 1 {
                regions.push(all.union(&r));
                return;
            }
            regions.push(all);
        }
        regions.push(r);
    }

    /// Take every pending region, leaving the queue empty.
    pub fn drain(&self) -> Vec<Rect> {
        mem::take(&mut *self.lock())
    }

    /// Discard every pending region.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of pending regions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A copy of the pending regions.
    pub fn regions(&self) -> Vec<Rect> {
        self.lock().clone()
    }
}

/// Split drained damage into draw passes under `policy`.
pub(crate) fn passes(regions: Vec<Rect>, policy: FlushPolicy) -> Vec<Rect> {
    match policy {
        FlushPolicy::Individual => regions,
        FlushPolicy::Union => {
            let all = regions.iter().fold(Rect::zero(), |acc, r| acc.union(r));
            if all.is_empty() { vec![] } else { vec![all] }
        }
    }
}

/// Clip `region` against `id` and each of its ancestors, and queue what is
/// left on the owning window in content coordinates.
pub(crate) fn request_update(s: &Session, id: NodeId, region: Option<Rect>) {
    let Some(node) = s.nodes.get(id) else {
        return;
    };
    let window = node.window;
    let mut r = region.unwrap_or_else(|| node.rect.at_origin());
    let mut cur = id;
    loop {
        let Some(n) = s.nodes.get(cur) else {
            return;
        };
        if !n.flags.contains(NodeFlags::VISIBLE) {
            return;
        }
        let Some(clipped) = r.intersect(&n.rect.at_origin()) else {
            return;
        };
        match n.parent {
            Some(p) => {
                r = clipped.translate(n.rect.tl());
                cur = p;
            }
            None => {
                r = clipped;
                break;
            }
        }
    }
    let Some(win) = s.windows.get(window) else {
        return;
    };
    if win.root != cur
        || win
            .flags
            .intersects(WindowFlags::DESTROYED | WindowFlags::PENDING_RESIZE)
    {
        return;
    }
    trace!("damage: {window:?} {r:?}");
    win.damage.push(r);
}

/// Redraw pending damage and chrome for every live window, in creation order.
pub(crate) fn flush(s: &mut Session) -> Result<()> {
    let policy = s.config.flush_policy;
    for w in s.order.clone() {
        let Some(win) = s.windows.get(w) else {
            continue;
        };
        if win
            .flags
            .intersects(WindowFlags::DESTROYED | WindowFlags::PENDING_RESIZE)
        {
            continue;
        }
        let chrome = win.chrome_dirty;
        let regions = passes(win.damage.drain(), policy);
        let (native, root, drawn) = (win.native, win.root, win.flags.contains(WindowFlags::DRAWN));
        if chrome {
            window::paint_chrome(s, w)?;
        }
        if regions.is_empty() {
            continue;
        }
        let canvas = s.backend.canvas(native)?;
        for r in regions {
            draw_tree(&mut s.nodes, canvas, root, r)?;
        }
        if !drawn && let Some(win) = s.windows.get_mut(w) {
            win.flags.insert(WindowFlags::DRAWN);
            let opacity = win.opacity;
            s.backend.set_opacity(native, opacity);
            s.backend.show(native);
        }
    }
    Ok(())
}
