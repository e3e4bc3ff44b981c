/*! Serializable views of a subtree, used by tree dumps. */

use super::NodeId;
use serde::Serialize;

/// A point-in-time copy of a node and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
  /// An element and its children.
  Element {
    /// Source node.
    id: NodeId,
    /// Lowercased tag.
    tag: String,
    /// Name/value pairs, in source order.
    attributes: Vec<(String, String)>,
    /// Child snapshots, in order.
    children: Vec<NodeSnapshot>,
    /// True when children were cut off by a depth limit.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
  },
  /// A text node.
  Text {
    /// Source node.
    id: NodeId,
    /// The text data.
    text: String,
  },
}

impl NodeSnapshot {
  /// The snapshotted node.
  pub const fn id(&self) -> NodeId {
    match self {
      Self::Element { id, .. } | Self::Text { id, .. } => *id,
    }
  }
}

/// Output format for `log_tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeFormat {
  /// Indented markup, one node per line.
  #[default]
  Markup,
  /// Pretty-printed JSON of the [`NodeSnapshot`].
  Json,
}
