/*! Synthetic interaction events. */

use super::NodeId;
use serde::{Deserialize, Serialize};

/// Interaction event types that can be dispatched on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  /// Swallowed by disabled controls, like every pointer press.
  Click,
  /// Dispatched as `dblclick`.
  #[serde(rename = "dblclick")]
  DoubleClick,
  /// Button press.
  MouseDown,
  /// Button release.
  MouseUp,
  /// Hover start. Reaches disabled controls.
  MouseOver,
  /// Pointer hover end.
  MouseOut,
  /// Does not bubble.
  Focus,
  /// Does not bubble.
  Blur,
  /// Carries the new value.
  Input,
  /// Carries the new value.
  Change,
  /// Form submission.
  Submit,
  /// Key press.
  KeyDown,
  /// Key release.
  KeyUp,
}

impl EventKind {
  /// All known event kinds.
  pub const ALL: &'static [Self] = &[
    Self::Click,
    Self::DoubleClick,
    Self::MouseDown,
    Self::MouseUp,
    Self::MouseOver,
    Self::MouseOut,
    Self::Focus,
    Self::Blur,
    Self::Input,
    Self::Change,
    Self::Submit,
    Self::KeyDown,
    Self::KeyUp,
  ];

  /// DOM event type name.
  pub const fn name(self) -> &'static str {
    match self {
      Self::Click => "click",
      Self::DoubleClick => "dblclick",
      Self::MouseDown => "mousedown",
      Self::MouseUp => "mouseup",
      Self::MouseOver => "mouseover",
      Self::MouseOut => "mouseout",
      Self::Focus => "focus",
      Self::Blur => "blur",
      Self::Input => "input",
      Self::Change => "change",
      Self::Submit => "submit",
      Self::KeyDown => "keydown",
      Self::KeyUp => "keyup",
    }
  }

  /// Does this event propagate to ancestors after the target?
  pub const fn bubbles(self) -> bool {
    !matches!(self, Self::Focus | Self::Blur)
  }

  /// Pointer events are swallowed by disabled form controls.
  pub const fn is_pointer(self) -> bool {
    matches!(
      self,
      Self::Click | Self::DoubleClick | Self::MouseDown | Self::MouseUp
    )
  }
}

impl std::fmt::Display for EventKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// An event as seen by a listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomEvent {
  /// Event type.
  pub kind: EventKind,
  /// Node the event was dispatched on.
  pub target: NodeId,
  /// Node whose listener is currently running (differs from `target` while bubbling).
  pub current_target: NodeId,
  /// Value carried by `input`/`change` events.
  pub value: Option<String>,
}
