//! Seam for the renderer that turns a parameter state into pixels.

use crate::state::ParameterState;

/// Consumer of committed parameter states.
///
/// The runtime calls [`Renderer::render`] after every change of the current
/// state. Implementations must not block for long; the runtime loop waits.
pub trait Renderer: Send {
    /// Renders `state`.
    fn render(&mut self, state: &ParameterState);
}
