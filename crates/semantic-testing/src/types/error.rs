/*! Error types for semantic queries and tree operations. */

use super::NodeId;
use std::time::Duration;

/// Errors that can occur while querying, interacting with, or observing the tree.
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
  /// A capability was used on the result of a query that matched nothing.
  #[error("{operation}: no node matched the query")]
  NotFound {
    /// The capability that was called.
    operation: &'static str,
  },

  /// `unmount` on a root that is no longer attached.
  #[error("Cannot unmount a node that is not rendered: {0}")]
  AlreadyUnmounted(NodeId),

  /// The node was detached from the document and has not been re-resolved.
  #[error("{operation}: node {node} is no longer attached to the document")]
  StaleReference {
    /// The capability that was called.
    operation: &'static str,
    /// The detached node.
    node: NodeId,
  },

  /// The id belongs to no node in this document.
  #[error("Unknown node: {0}")]
  UnknownNode(NodeId),

  /// An insertion that would break the tree.
  #[error("Cannot insert node {child} into {parent}: {reason}")]
  HierarchyRequest {
    /// Intended parent.
    parent: NodeId,
    /// Node being inserted.
    child: NodeId,
    /// Which rule was broken.
    reason: &'static str,
  },

  /// A pattern target failed to compile.
  #[error("Invalid pattern: {0}")]
  InvalidPattern(#[from] regex::Error),

  /// Markup fragment could not be parsed.
  #[error("Invalid markup at byte {position}: {reason}")]
  InvalidMarkup {
    /// Byte offset into the fragment.
    position: usize,
    /// Parser diagnosis.
    reason: String,
  },

  /// Selector string could not be parsed.
  #[error("Invalid selector '{selector}': {reason}")]
  InvalidSelector {
    /// The selector as given.
    selector: String,
    /// Parser diagnosis.
    reason: String,
  },

  /// JSON tree dump failed.
  #[error("Failed to serialize tree: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A wait bounded with `with_deadline` saw no matching mutation in time.
  #[error("{operation}: no matching mutation within {deadline:?}")]
  DeadlineElapsed {
    /// The wait that timed out.
    operation: &'static str,
    /// The bound it was given.
    deadline: Duration,
  },
}

/// Result type for semantic operations.
pub type SemanticResult<T> = Result<T, SemanticError>;
