//! Window + event loop.
//!
//! Owns the `winit` event loop and window and redraws the renderer on every
//! redraw request.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
