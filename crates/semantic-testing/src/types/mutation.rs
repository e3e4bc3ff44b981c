/*!
Mutation records and batches.

One batch is delivered per document write (or per `Document::batch` scope).
Records keep the path from their target to the root *as it was when the
mutation happened*, so a wait can decide whether a batch touched a node even
after that node has been moved or detached.
*/

use super::NodeId;
use serde::Serialize;

/// What kind of change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
  /// Children were added to or removed from the target.
  ChildList,
  /// An attribute of the target changed.
  Attributes,
  /// The data of a text node changed.
  CharacterData,
}

/// A single change to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
  /// What changed.
  pub kind: MutationKind,
  /// Node the change happened on.
  pub target: NodeId,
  /// `target` followed by its ancestors, captured at mutation time.
  pub path: Vec<NodeId>,
  /// Children inserted, for `ChildList`.
  pub added_nodes: Vec<NodeId>,
  /// Children detached, for `ChildList`.
  pub removed_nodes: Vec<NodeId>,
  /// Changed attribute, for `Attributes`.
  pub attribute_name: Option<String>,
  /// Previous attribute value or text data.
  pub old_value: Option<String>,
}

impl MutationRecord {
  /// Did this change happen on `node` or inside its subtree?
  pub fn touches(&self, node: NodeId) -> bool {
    self.path.contains(&node)
  }
}

/// Records delivered together by one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationBatch {
  /// In the order the changes happened.
  pub records: Vec<MutationRecord>,
}

impl MutationBatch {
  /// Number of records.
  pub fn len(&self) -> usize {
    self.records.len()
  }

  /// No records at all.
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Does any record in this batch touch `node` or its subtree?
  pub fn touches(&self, node: NodeId) -> bool {
    self.records.iter().any(|r| r.touches(node))
  }

  /// Was `node` itself (by identity) removed from its parent in this batch?
  pub fn removed(&self, node: NodeId) -> bool {
    self.removed_nodes().any(|id| id == node)
  }

  /// All added nodes, in record order.
  pub fn added_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.records.iter().flat_map(|r| r.added_nodes.iter().copied())
  }

  /// All removed nodes, in record order.
  pub fn removed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
    self
      .records
      .iter()
      .flat_map(|r| r.removed_nodes.iter().copied())
  }
}
