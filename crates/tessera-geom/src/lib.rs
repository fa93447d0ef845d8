//! Geometry primitives used across tessera.

#![warn(missing_docs)]

/// Error types for geometry operations.
mod error;
/// Width/height size type.
mod expanse;
/// Decoration insets and frame pieces.
mod insets;
/// Point helpers.
mod point;
/// Rectangle operations.
mod rect;

pub use error::{Error, Result};
pub use expanse::Expanse;
pub use insets::{FrameRects, Insets};
pub use point::Point;
pub use rect::Rect;
