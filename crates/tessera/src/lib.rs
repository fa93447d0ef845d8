//! Tessera: a retained-mode widget toolkit core.
//!
//! A tessera session holds a tree of rectangular nodes rooted at native
//! top-level windows. Each node draws into a sub-surface clipped to its
//! parent, repaints are queued as bounded per-window damage, and native
//! input is routed to nodes with focus, enter/leave, drag grabs, window
//! chrome gestures, and a modal stack. A single [`EventLoop`] multiplexes
//! native events with timeout and idle callbacks.
//!
//! # Quick Start
//!
//! - [`EventLoop`] - owns a [`Session`] and a [`Backend`]
//! - [`Session`] - windows, nodes, focus, modal state, and damage
//! - [`Widget`] - the behavior attached to a node
//! - [`WindowHandler`] - window-level callbacks

#![warn(missing_docs)]

/// Geometry primitives.
pub use tessera_geom as geom;

/// The native windowing contract and the headless backend.
pub mod backend;
/// Toolkit settings.
pub mod config;
/// Per-window damage queues and flushing.
pub mod damage;
/// Debug dumps of the window and node trees.
pub mod dump;
/// Error types.
pub mod error;
/// Native events.
pub mod event;
/// The event loop and its scheduling handle.
pub mod event_loop;
/// Arena and native identifiers.
pub mod id;
/// Node storage.
pub mod node;
/// Drawing surfaces.
pub mod render;
/// Event routing.
mod router;
/// UI state.
pub mod session;
/// Test helpers.
#[cfg(any(test, feature = "testing"))]
pub mod testing;
/// Timeout and idle queues.
pub mod timer;
/// Node tree operations.
mod tree;
/// Widget and window callback traits.
pub mod widget;
/// Windows and their chrome.
pub mod window;

pub use backend::{Backend, HeadlessBackend, HeadlessProbe};
pub use config::{Config, Theme};
pub use damage::{DamageQueue, FlushPolicy};
pub use error::{Error, Result};
pub use event::{Button, Buttons, KeyCode, KeyEvent, Mods, NativeEvent, WheelEvent};
pub use event_loop::{EventLoop, LoopHandle, Step, Wait};
pub use id::{IdleId, NativeWindow, NodeId, TimeoutId, WindowId};
pub use node::{Node, NodeFlags};
pub use render::{Canvas, Color, Render, SubSurface};
pub use session::Session;
pub use widget::{Context, EventOutcome, Widget, WindowHandler};
pub use window::{Gesture, Lifecycle, Window, WindowFlags, WindowSpec};
