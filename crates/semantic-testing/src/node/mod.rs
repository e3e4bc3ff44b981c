/*!
Node capability composition.

A raw `NodeId` becomes useful once capabilities are mixed in. Each capability
is a trait with provided methods over `NodeHandle`, so any node type that can
name its document and node gets the whole capability for free:

| Capability  | `SemanticNode` | `ComposedNode` | `MountedNode` |
|-------------|----------------|----------------|---------------|
| `Events`    | yes            | yes            | yes           |
| `Helpers`   | yes            | yes            | yes           |
| `Mutations` | yes            | yes            | yes           |
| `Queries`   | no             | yes            | yes           |

Query results are `SemanticNode`s, which leave out queries. `compose` and
`SemanticNode::with_queries` produce a `ComposedNode` that can run queries
scoped to its own subtree. A node wrapping no node is the "absent" result of
a query that matched nothing; capability calls on it return `NotFound`
instead of failing at resolution time.
*/

mod events;
mod helpers;
mod mutations;
mod queries;

pub use events::Events;
pub use helpers::Helpers;
pub use mutations::Mutations;
pub use queries::Queries;

use crate::dom::Document;
use crate::types::{NodeId, SemanticError, SemanticResult};

/// Accessor every capability is built on.
pub trait NodeHandle {
  /// The document the node lives in.
  fn document(&self) -> &Document;

  /// `None` for the absent result of an unmatched query.
  fn node_id(&self) -> Option<NodeId>;

  /// The node, or `NotFound` naming the attempted operation.
  fn require(&self, operation: &'static str) -> SemanticResult<NodeId> {
    self.node_id().ok_or(SemanticError::NotFound { operation })
  }
}

/// A node equipped with events, helpers and mutation waits.
#[derive(Clone)]
pub struct SemanticNode {
  document: Document,
  node: Option<NodeId>,
}

impl SemanticNode {
  pub(crate) fn from_parts(document: &Document, node: Option<NodeId>) -> Self {
    Self {
      document: document.clone(),
      node,
    }
  }

  pub(crate) fn present(document: &Document, node: NodeId) -> Self {
    Self::from_parts(document, Some(node))
  }

  /// The result of a query that matched nothing.
  pub fn absent(document: &Document) -> Self {
    Self::from_parts(document, None)
  }

  /// The same node with queries scoped to its subtree. An absent node stays
  /// absent, and its queries match nothing.
  pub fn with_queries(&self) -> ComposedNode {
    ComposedNode { inner: self.clone() }
  }
}

impl std::fmt::Debug for SemanticNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SemanticNode")
      .field("node", &self.node)
      .finish_non_exhaustive()
  }
}

impl PartialEq for SemanticNode {
  fn eq(&self, other: &Self) -> bool {
    self.node == other.node && self.document.ptr_eq(&other.document)
  }
}

impl NodeHandle for SemanticNode {
  fn document(&self) -> &Document {
    &self.document
  }

  fn node_id(&self) -> Option<NodeId> {
    self.node
  }
}

impl Events for SemanticNode {}
impl Helpers for SemanticNode {}
impl Mutations for SemanticNode {}

/// Wrap a raw node with every capability, queries included.
pub fn compose(document: &Document, node: NodeId) -> ComposedNode {
  SemanticNode::present(document, node).with_queries()
}

/// A node with all four capabilities. Queries are scoped to its subtree.
#[derive(Clone, PartialEq)]
pub struct ComposedNode {
  inner: SemanticNode,
}

impl ComposedNode {
  /// The same node without query capabilities.
  pub const fn as_semantic(&self) -> &SemanticNode {
    &self.inner
  }
}

impl From<ComposedNode> for SemanticNode {
  fn from(node: ComposedNode) -> Self {
    node.inner
  }
}

impl std::fmt::Debug for ComposedNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ComposedNode")
      .field("node", &self.inner.node)
      .finish_non_exhaustive()
  }
}

impl NodeHandle for ComposedNode {
  fn document(&self) -> &Document {
    &self.inner.document
  }

  fn node_id(&self) -> Option<NodeId> {
    self.inner.node
  }
}

impl Events for ComposedNode {}
impl Helpers for ComposedNode {}
impl Mutations for ComposedNode {}
impl Queries for ComposedNode {}

/// The root of a mounted render. Adds scoped queries and `unmount`.
#[derive(Clone, PartialEq)]
pub struct MountedNode {
  inner: SemanticNode,
  root: NodeId,
}

impl MountedNode {
  pub(crate) fn new(document: &Document, root: NodeId) -> Self {
    Self {
      inner: SemanticNode::present(document, root),
      root,
    }
  }

  /// The mount root.
  pub const fn root(&self) -> NodeId {
    self.root
  }

  /// The same node without query capabilities.
  pub const fn as_semantic(&self) -> &SemanticNode {
    &self.inner
  }

  /// Tear down the render and detach the root.
  /// `AlreadyUnmounted` if the root is no longer attached.
  pub fn unmount(&self) -> SemanticResult<()> {
    self.inner.document.unmount(self.root)
  }
}

impl std::fmt::Debug for MountedNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MountedNode")
      .field("root", &self.root)
      .finish_non_exhaustive()
  }
}

impl NodeHandle for MountedNode {
  fn document(&self) -> &Document {
    &self.inner.document
  }

  fn node_id(&self) -> Option<NodeId> {
    Some(self.root)
  }
}

impl Events for MountedNode {}
impl Helpers for MountedNode {}
impl Mutations for MountedNode {}
impl Queries for MountedNode {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::matchers::TextMatcher;

  #[test]
  fn absent_node_reports_not_found() {
    let document = Document::new();
    let absent = SemanticNode::absent(&document);
    assert!(matches!(
      absent.require("click"),
      Err(SemanticError::NotFound { operation: "click" })
    ));
    assert!(matches!(absent.text(), Err(SemanticError::NotFound { .. })));
    assert!(matches!(absent.click(), Err(SemanticError::NotFound { .. })));
    assert_eq!(absent.raw_node(), None);
  }

  #[test]
  fn composed_nodes_compare_by_identity() {
    let document = Document::new();
    let other = Document::new();
    let body = document.body();
    assert_eq!(compose(&document, body), compose(&document, body));
    assert_ne!(compose(&document, body), compose(&other, body));
    assert_ne!(compose(&document, body).as_semantic(), &SemanticNode::absent(&document));
  }

  #[test]
  fn composed_nodes_query_their_own_subtree() {
    let document = Document::new();
    let app = document
      .mount(r#"<p>a</p><ul data-test="list"><li>a</li><li>b</li></ul>"#)
      .unwrap();

    let list = app.get_by_data_test("list").with_queries();
    assert_eq!(list.get_all_by_text("a").len(), 1);
    assert_eq!(list.get_by_text("a").tag_name().unwrap(), "li");
    assert_eq!(list.get_all_by_text(TextMatcher::pattern("^[ab]$").unwrap()).len(), 2);

    let raw = list.raw_node().unwrap();
    assert_eq!(compose(&document, raw).get_by_text("b").text().unwrap(), "b");
  }

  #[test]
  fn absent_composed_node_finds_nothing() {
    let document = Document::new();
    let app = document.mount("<p>a</p>").unwrap();
    let missing = app.get_by_data_test("nope").with_queries();
    assert!(missing.get_by_text("a").raw_node().is_none());
    assert!(missing.get_all_by_text("a").is_empty());
  }
}
