/*! Branded ID types for type-safe node references. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Node identifier.
///
/// Ids are unique across every document in the process and never reused, so
/// comparing two nodes for identity is comparing their ids.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
pub struct NodeId(pub u32);

/// Global counter for `NodeId` generation. Starts at 1 (0 could be confused with "null").
static NODE_COUNTER: AtomicU32 = AtomicU32::new(1);

impl NodeId {
  /// Generate a new unique `NodeId`.
  pub(crate) fn next() -> Self {
    Self(NODE_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Event listener registration, used to remove a listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
pub struct ListenerId(pub u64);

static LISTENER_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
  pub(crate) fn next() -> Self {
    Self(LISTENER_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}
