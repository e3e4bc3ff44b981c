/*!
Tree relationship management.

Single source of truth for parent-child relationships in the document.
All mutations go through methods that maintain bidirectional link invariants.

## Invariants

1. **Single parent**: Each node has at most ONE parent at a time.
2. **Bidirectional consistency**: If `parent_of[child] = parent`, then
   `children_of[parent]` contains `child`, and vice versa.
3. **Detach keeps the subtree**: Detaching a node only cuts the link to its
   parent. Its own descendants stay linked, so a detached node can still be
   read (and re-inserted) as a whole.
*/

use crate::types::NodeId;
use std::collections::HashMap;

pub(crate) struct NodeTree {
  parent_of: HashMap<NodeId, NodeId>,
  children_of: HashMap<NodeId, Vec<NodeId>>,
}

impl NodeTree {
  pub(super) fn new() -> Self {
    Self {
      parent_of: HashMap::new(),
      children_of: HashMap::new(),
    }
  }

  /// Get parent of a node.
  pub(super) fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.parent_of.get(&id).copied()
  }

  /// Get children of a node (empty slice if none).
  pub(super) fn children(&self, id: NodeId) -> &[NodeId] {
    self.children_of.get(&id).map_or(&[], Vec::as_slice)
  }

  /// Iterate `id` and then each of its ancestors, nearest first.
  pub(super) fn path(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(id), move |current| self.parent(*current))
  }

  /// Is `ancestor` equal to `id` or one of its ancestors?
  pub(super) fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
    self.path(id).any(|n| n == ancestor)
  }

  /// Topmost ancestor of `id` (itself if unparented).
  pub(super) fn root_of(&self, id: NodeId) -> NodeId {
    self.path(id).last().unwrap_or(id)
  }

  /// Insert `child` under `parent` before `reference`, or at the end.
  ///
  /// The child must be unparented; callers detach it first.
  pub(super) fn insert_child(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
    debug_assert!(
      self.parent_of.get(&child).is_none(),
      "insert_child: child {child} already has parent {:?}",
      self.parent_of.get(&child)
    );
    self.parent_of.insert(child, parent);
    let siblings = self.children_of.entry(parent).or_default();
    let index = reference
      .and_then(|r| siblings.iter().position(|&s| s == r))
      .unwrap_or(siblings.len());
    siblings.insert(index, child);
  }

  /// Cut the link between `child` and its parent.
  /// Returns the former parent, if there was one.
  pub(super) fn detach(&mut self, child: NodeId) -> Option<NodeId> {
    let parent = self.parent_of.remove(&child)?;
    if let Some(siblings) = self.children_of.get_mut(&parent) {
      siblings.retain(|&s| s != child);
    }
    Some(parent)
  }

  /// Detach every child of `parent`. Returns them in their previous order.
  pub(super) fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
    let children = self.children_of.remove(&parent).unwrap_or_default();
    for child in &children {
      self.parent_of.remove(child);
    }
    children
  }

  /// All descendants of `root` in document (pre-)order, excluding `root`.
  /// Iterative to avoid stack overflow on deep trees.
  pub(super) fn descendants(&self, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
      out.push(id);
      stack.extend(self.children(id).iter().rev().copied());
    }

    out
  }
}
