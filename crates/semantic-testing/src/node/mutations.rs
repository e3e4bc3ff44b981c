/*! Mutation waits. See `observation` for the subscription lifecycle. */

use super::NodeHandle;
use crate::observation::{MutationWait, Trigger};

/// Mutation-wait capability.
///
/// Each call subscribes immediately, so mutations made between creating the
/// wait and awaiting it are not missed.
pub trait Mutations: NodeHandle {
  /// Resolves after the next batch that touches this node or its subtree.
  fn will_change(&self) -> MutationWait {
    let trigger = self
      .node_id()
      .map_or(Trigger::Unresolvable("will_change"), Trigger::Change);
    MutationWait::new(self.document(), trigger)
  }

  /// Resolves after the next batch by re-running the document's last query.
  fn will_render(&self) -> MutationWait {
    MutationWait::new(self.document(), Trigger::Render)
  }

  /// Resolves once this exact node is removed from its parent.
  fn will_disappear(&self) -> MutationWait {
    let trigger = self
      .node_id()
      .map_or(Trigger::Unresolvable("will_disappear"), Trigger::Disappear);
    MutationWait::new(self.document(), trigger)
  }
}
