/*!
In-memory document - the tree the queries, events and waits run against.

`Document` owns node storage, event listeners, the last-query slot and the
mount records of one test session. Clone is cheap (Arc bump) - share freely
across threads and with listeners.

# Module Structure

- `mod.rs` - Document, builder, public tree API
- `registry.rs` - node storage with private fields, mutation recording, delivery
- `tree.rs` - `NodeTree` for parent/child relationships
- `events.rs` - listeners and synchronous dispatch
- `markup.rs` - fragment parser and pretty printer
- `selector.rs` - candidate selectors

# Example

```
use semantic_testing::Document;

let document = Document::new();
let nodes = document
  .set_inner_markup(document.body(), r#"<p data-test="greeting">Hello</p>"#)
  .unwrap();

assert_eq!(document.text_content(nodes[0]), "Hello");
assert_eq!(document.attribute(nodes[0], "data-test").as_deref(), Some("greeting"));
```
*/

mod events;
mod markup;
mod registry;
mod selector;
mod tree;

pub use events::Listener;
pub use selector::{AttributeSelector, Selector};

pub(crate) use markup::render_markup;
pub(crate) use registry::Registry;

use crate::config::Config;
use crate::mount::MountRecord;
use crate::query::LastQuery;
use crate::types::{MutationBatch, NodeId, NodeSnapshot, SemanticResult};
use async_broadcast::Receiver;
use events::Listeners;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

struct Shared {
  state: RwLock<Registry>,
  listeners: RwLock<Listeners>,
  last_query: LastQuery,
  mounts: Mutex<Vec<MountRecord>>,
  config: Config,
}

/// A document tree plus everything scoped to one test session.
#[derive(Clone)]
pub struct Document {
  shared: Arc<Shared>,
}

impl std::fmt::Debug for Document {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Document")
      .field("body", &self.body())
      .finish_non_exhaustive()
  }
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

/// Builder for configuring a Document.
///
/// # Example
///
/// ```
/// use semantic_testing::Document;
///
/// let document = Document::builder()
///   .mutation_channel_capacity(16)
///   .log_tree_max_depth(Some(3))
///   .build();
/// assert_eq!(document.config().log_tree_max_depth, Some(3));
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct DocumentBuilder {
  config: Config,
}

impl DocumentBuilder {
  /// Replace the whole configuration.
  pub const fn config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  /// Batches buffered per subscription before the oldest is dropped. Default: 1024.
  pub const fn mutation_channel_capacity(mut self, capacity: usize) -> Self {
    self.config.mutation_channel_capacity = capacity;
    self
  }

  /// Spaces per nesting level in markup tree dumps. Default: 2.
  pub const fn tree_indent(mut self, indent: usize) -> Self {
    self.config.tree_indent = indent;
    self
  }

  /// Depth after which tree dumps elide children. Default: unlimited.
  pub const fn log_tree_max_depth(mut self, depth: Option<usize>) -> Self {
    self.config.log_tree_max_depth = depth;
    self
  }

  /// Finish configuration and create the document.
  pub fn build(self) -> Document {
    Document::with_config(self.config)
  }
}

/// Non-owning handle, held by stored queries so they do not keep the
/// document alive.
#[derive(Clone)]
pub(crate) struct WeakDocument(Weak<Shared>);

impl WeakDocument {
  pub(crate) fn upgrade(&self) -> Option<Document> {
    self.0.upgrade().map(|shared| Document { shared })
  }
}

impl Document {
  /// Create an empty document with default configuration.
  pub fn new() -> Self {
    Self::builder().build()
  }

  /// Start configuring a document.
  pub fn builder() -> DocumentBuilder {
    DocumentBuilder::default()
  }

  fn with_config(config: Config) -> Self {
    Self {
      shared: Arc::new(Shared {
        state: RwLock::new(Registry::new(&config)),
        listeners: RwLock::new(Listeners::default()),
        last_query: LastQuery::default(),
        mounts: Mutex::new(Vec::new()),
        config,
      }),
    }
  }

  /// The configuration this document was built with.
  pub fn config(&self) -> &Config {
    &self.shared.config
  }

  /// Do both handles refer to the same document?
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.shared, &other.shared)
  }

  pub(crate) fn downgrade(&self) -> WeakDocument {
    WeakDocument(Arc::downgrade(&self.shared))
  }

  /// The slot holding the most recent query resolved against this document.
  pub fn last_query(&self) -> &LastQuery {
    &self.shared.last_query
  }

  pub(crate) fn mounts(&self) -> &Mutex<Vec<MountRecord>> {
    &self.shared.mounts
  }

  /// Read state. Never run listeners or queries inside the closure.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
    f(&self.shared.state.read())
  }

  /// Write state, then deliver whatever was recorded as one batch
  /// (unless a `batch` scope is open).
  #[inline]
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
    let mut state = self.shared.state.write();
    let result = f(&mut state);
    state.flush();
    result
  }

  /// Run `f` with mutation delivery deferred; everything it records is
  /// delivered as a single batch when the outermost scope ends.
  pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
    struct Scope<'a>(&'a Document);

    impl Drop for Scope<'_> {
      fn drop(&mut self) {
        self.0.write(Registry::end_batch);
      }
    }

    self.write(Registry::begin_batch);
    let _scope = Scope(self);
    f(self)
  }

  // ==========================================================================
  // Structure
  // ==========================================================================

  /// The body element. Nodes are attached when the body is their root.
  pub fn body(&self) -> NodeId {
    self.read(Registry::body)
  }

  /// Create a detached element.
  pub fn create_element(&self, tag: &str) -> NodeId {
    self.write(|s| s.create_element(tag))
  }

  /// Create a detached text node.
  pub fn create_text_node(&self, text: &str) -> NodeId {
    self.write(|s| s.create_text(text))
  }

  /// Parse markup into detached nodes. Returns the top-level nodes.
  pub fn parse_fragment(&self, markup: &str) -> SemanticResult<Vec<NodeId>> {
    let forest = markup::parse_fragment(markup)?;
    Ok(self.write(|s| s.build_fragment(forest)))
  }

  /// Replace the children of `node` with parsed markup, as one mutation.
  pub fn set_inner_markup(&self, node: NodeId, markup: &str) -> SemanticResult<Vec<NodeId>> {
    let forest = markup::parse_fragment(markup)?;
    self.write(|s| {
      let roots = s.build_fragment(forest);
      s.replace_children(node, roots.clone())?;
      Ok(roots)
    })
  }

  /// Insert `child` as the last child of `parent`, moving it if attached elsewhere.
  pub fn append_child(&self, parent: NodeId, child: NodeId) -> SemanticResult<()> {
    self.write(|s| s.insert_before(parent, child, None))
  }

  /// Insert `child` before `reference` (or last, with `None`). Moves `child`
  /// if it already has a parent.
  pub fn insert_before(
    &self,
    parent: NodeId,
    child: NodeId,
    reference: Option<NodeId>,
  ) -> SemanticResult<()> {
    self.write(|s| s.insert_before(parent, child, reference))
  }

  /// Detach `node` from its parent. Returns false if it had none.
  pub fn remove(&self, node: NodeId) -> SemanticResult<bool> {
    self.write(|s| s.remove(node))
  }

  /// Detach every child of `parent` and insert `children` in order.
  pub fn replace_children(&self, parent: NodeId, children: Vec<NodeId>) -> SemanticResult<()> {
    self.write(|s| s.replace_children(parent, children))
  }

  /// Replace the node's children with one text node (or set a text node's data).
  pub fn set_text_content(&self, node: NodeId, text: &str) -> SemanticResult<()> {
    self.write(|s| s.set_text_content(node, text))
  }

  /// Set an attribute. Names are stored lowercase.
  pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> SemanticResult<()> {
    self.write(|s| s.set_attribute(node, name, value))
  }

  /// Returns false if the attribute was not present.
  pub fn remove_attribute(&self, node: NodeId, name: &str) -> SemanticResult<bool> {
    self.write(|s| s.remove_attribute(node, name))
  }

  /// Set a form control's current value. Not a tree mutation.
  pub fn set_value(&self, node: NodeId, value: &str) -> SemanticResult<()> {
    self.write(|s| s.set_value(node, value))
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// Is the node attached (its root is the body)?
  pub fn contains(&self, node: NodeId) -> bool {
    self.read(|s| s.contains(node))
  }

  /// Parent node, `None` for detached roots.
  pub fn parent(&self, node: NodeId) -> Option<NodeId> {
    self.read(|s| s.parent(node))
  }

  /// Direct children, in order.
  pub fn children(&self, node: NodeId) -> Vec<NodeId> {
    self.read(|s| s.children(node).to_vec())
  }

  /// Lowercased tag name; `None` for text nodes.
  pub fn tag_name(&self, node: NodeId) -> Option<String> {
    self.read(|s| s.tag(node).map(str::to_owned))
  }

  /// Attribute value by name, ignoring ASCII case.
  pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
    self.read(|s| s.attribute(node, name).map(str::to_owned))
  }

  /// Concatenated text of every descendant text node.
  pub fn text_content(&self, node: NodeId) -> String {
    self.read(|s| s.text_content(node))
  }

  /// Current value of an input, textarea or select.
  pub fn value(&self, node: NodeId) -> Option<String> {
    self.read(|s| s.value(node))
  }

  /// Disabled natively, through a disabled fieldset, or via `aria-disabled`.
  pub fn is_disabled(&self, node: NodeId) -> bool {
    self.read(|s| s.is_disabled(node))
  }

  /// Descendants of `scope` matching `selector`, in document order.
  pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    self.read(|s| s.query_all(scope, selector))
  }

  /// Like `query_all`, parsing the selector first.
  pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> SemanticResult<Vec<NodeId>> {
    let selector: Selector = selector.parse()?;
    Ok(self.query_all(scope, &selector))
  }

  /// The control labelled by a `<label>` element.
  pub fn label_control(&self, label: NodeId) -> Option<NodeId> {
    self.read(|s| s.label_control(label))
  }

  /// Serializable copy of the subtree at `node`, honoring `log_tree_max_depth`.
  pub fn snapshot(&self, node: NodeId) -> Option<NodeSnapshot> {
    let max_depth = self.config().log_tree_max_depth;
    self.read(|s| s.snapshot(node, max_depth))
  }

  // ==========================================================================
  // Mutation delivery
  // ==========================================================================

  /// Receive every future `MutationBatch`. Dropping the receiver unsubscribes.
  pub fn subscribe_mutations(&self) -> Receiver<MutationBatch> {
    self.read(Registry::subscribe)
  }

  /// Number of live mutation subscriptions (pending waits included).
  pub fn active_subscriptions(&self) -> usize {
    self.read(Registry::receiver_count)
  }

  /// Close every live subscription. Pending waits resolve to `None`.
  pub(crate) fn close_subscriptions(&self) {
    self.write(Registry::reset_subscriptions);
  }
}
