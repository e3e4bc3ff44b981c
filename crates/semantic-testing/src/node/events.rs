/*! Synthetic event dispatch. Fire-and-forget: listeners run before return. */

use super::NodeHandle;
use crate::types::{EventKind, SemanticResult};

fn dispatch<H: NodeHandle + ?Sized>(
  handle: &H,
  kind: EventKind,
  value: Option<&str>,
) -> SemanticResult<()> {
  let node = handle.require(kind.name())?;
  handle.document().dispatch_event(node, kind, value)
}

/// Event capability.
///
/// Errors: `NotFound` on an absent node, `StaleReference` on a detached one.
/// Pointer events on disabled form controls are swallowed and return `Ok`.
pub trait Events: NodeHandle {
  /// Dispatch any event kind on the node.
  fn fire(&self, kind: EventKind) -> SemanticResult<()> {
    dispatch(self, kind, None)
  }

  /// Dispatch `click`.
  fn click(&self) -> SemanticResult<()> {
    self.fire(EventKind::Click)
  }

  /// Dispatch `dblclick`.
  fn double_click(&self) -> SemanticResult<()> {
    self.fire(EventKind::DoubleClick)
  }

  /// Does not bubble.
  fn focus(&self) -> SemanticResult<()> {
    self.fire(EventKind::Focus)
  }

  /// Does not bubble.
  fn blur(&self) -> SemanticResult<()> {
    self.fire(EventKind::Blur)
  }

  /// Dispatch `submit`.
  fn submit(&self) -> SemanticResult<()> {
    self.fire(EventKind::Submit)
  }

  /// Dispatch `keydown`.
  fn key_down(&self) -> SemanticResult<()> {
    self.fire(EventKind::KeyDown)
  }

  /// Dispatch `keyup`.
  fn key_up(&self) -> SemanticResult<()> {
    self.fire(EventKind::KeyUp)
  }

  /// Dispatch `mouseover`.
  fn mouse_over(&self) -> SemanticResult<()> {
    self.fire(EventKind::MouseOver)
  }

  /// Dispatch `mouseout`.
  fn mouse_out(&self) -> SemanticResult<()> {
    self.fire(EventKind::MouseOut)
  }

  /// Set the control's value, then dispatch `input`.
  fn input(&self, value: &str) -> SemanticResult<()> {
    dispatch(self, EventKind::Input, Some(value))
  }

  /// Set the control's value, then dispatch `change`.
  fn change(&self, value: &str) -> SemanticResult<()> {
    dispatch(self, EventKind::Change, Some(value))
  }
}
