/*!
Registry - the single source of truth for document nodes.

All fields are private. Mutations go through methods that maintain tree
invariants and record a `MutationRecord`. Records accumulate in `pending`
and are delivered as one `MutationBatch` when the outermost write finishes
(see `Document::write` and `Document::batch`).

Nodes are never freed. A detached node keeps its data and its own subtree
for as long as the document lives.
*/

use super::markup::MarkupNode;
use super::selector::Selector;
use super::tree::NodeTree;
use crate::config::Config;
use crate::matchers::Candidate;
use crate::types::{
  MutationBatch, MutationKind, MutationRecord, NodeId, NodeSnapshot, SemanticError, SemanticResult,
};
use async_broadcast::{InactiveReceiver, Receiver, Sender};
use std::collections::HashMap;

/// Elements that can be associated with a `<label>`.
const LABELABLE: &[&str] = &[
  "button", "input", "meter", "output", "progress", "select", "textarea",
];

/// Elements that honor the `disabled` attribute.
const FORM_CONTROLS: &[&str] = &[
  "button", "fieldset", "input", "optgroup", "option", "select", "textarea",
];

pub(crate) struct ElementData {
  pub(crate) tag: String,
  pub(crate) attributes: Vec<(String, String)>,
  /// Current form value, once set through `set_value`. Falls back to markup.
  pub(crate) value: Option<String>,
}

impl ElementData {
  fn new(tag: &str) -> Self {
    Self {
      tag: tag.to_ascii_lowercase(),
      attributes: Vec::new(),
      value: None,
    }
  }

  /// Names are stored lowercase; lookups ignore ASCII case.
  pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

pub(crate) enum NodeData {
  Element(ElementData),
  Text(String),
}

fn channel(capacity: usize) -> (Sender<MutationBatch>, InactiveReceiver<MutationBatch>) {
  let (mut tx, rx) = async_broadcast::broadcast(capacity.max(1));
  tx.set_overflow(true); // Drop oldest batches when a subscriber lags
  (tx, rx.deactivate())
}

/// Internal document state with automatic mutation recording.
pub(crate) struct Registry {
  // Mutation delivery
  mutations_tx: Sender<MutationBatch>,
  mutations_keepalive: InactiveReceiver<MutationBatch>,
  capacity: usize,

  nodes: HashMap<NodeId, NodeData>,
  tree: NodeTree,
  body: NodeId,

  // Batching
  pending: Vec<MutationRecord>,
  batch_depth: usize,
}

impl Registry {
  pub(crate) fn new(config: &Config) -> Self {
    let (mutations_tx, mutations_keepalive) = channel(config.mutation_channel_capacity);
    let body = NodeId::next();
    let mut nodes = HashMap::new();
    nodes.insert(body, NodeData::Element(ElementData::new("body")));

    Self {
      mutations_tx,
      mutations_keepalive,
      capacity: config.mutation_channel_capacity,
      nodes,
      tree: NodeTree::new(),
      body,
      pending: Vec::new(),
      batch_depth: 0,
    }
  }

  pub(crate) const fn body(&self) -> NodeId {
    self.body
  }

  // ==========================================================================
  // Creation (detached, never recorded)
  // ==========================================================================

  pub(crate) fn create_element(&mut self, tag: &str) -> NodeId {
    let id = NodeId::next();
    self.nodes.insert(id, NodeData::Element(ElementData::new(tag)));
    id
  }

  pub(crate) fn create_text(&mut self, text: &str) -> NodeId {
    let id = NodeId::next();
    self.nodes.insert(id, NodeData::Text(text.to_owned()));
    id
  }

  /// Materialize parsed markup as detached nodes. Returns the top-level ids.
  pub(crate) fn build_fragment(&mut self, forest: Vec<MarkupNode>) -> Vec<NodeId> {
    forest.into_iter().map(|node| self.build_node(node)).collect()
  }

  fn build_node(&mut self, node: MarkupNode) -> NodeId {
    match node {
      MarkupNode::Text(text) => {
        let id = NodeId::next();
        self.nodes.insert(id, NodeData::Text(text));
        id
      }
      MarkupNode::Element {
        tag,
        attributes,
        children,
      } => {
        let id = NodeId::next();
        let mut data = ElementData::new(&tag);
        data.attributes = attributes;
        self.nodes.insert(id, NodeData::Element(data));
        for child in children {
          let child_id = self.build_node(child);
          self.tree.insert_child(id, child_id, None);
        }
        id
      }
    }
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
    self.nodes.get(&id)
  }

  fn element(&self, id: NodeId) -> Option<&ElementData> {
    match self.nodes.get(&id)? {
      NodeData::Element(element) => Some(element),
      NodeData::Text(_) => None,
    }
  }

  fn element_mut(&mut self, id: NodeId) -> SemanticResult<&mut ElementData> {
    match self.nodes.get_mut(&id) {
      Some(NodeData::Element(element)) => Ok(element),
      Some(NodeData::Text(_)) | None => Err(SemanticError::UnknownNode(id)),
    }
  }

  fn require(&self, id: NodeId) -> SemanticResult<&NodeData> {
    self.nodes.get(&id).ok_or(SemanticError::UnknownNode(id))
  }

  pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.tree.parent(id)
  }

  pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
    self.tree.children(id)
  }

  /// Is the node attached to this document's body?
  pub(crate) fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(&id) && self.tree.root_of(id) == self.body
  }

  /// The node followed by its ancestors, nearest first.
  pub(crate) fn path(&self, id: NodeId) -> Vec<NodeId> {
    self.tree.path(id).collect()
  }

  pub(crate) fn tag(&self, id: NodeId) -> Option<&str> {
    self.element(id).map(|e| e.tag.as_str())
  }

  pub(crate) fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
    self.element(id)?.attribute(name)
  }

  /// Concatenated text of every descendant text node.
  pub(crate) fn text_content(&self, id: NodeId) -> String {
    match self.nodes.get(&id) {
      Some(NodeData::Text(text)) => text.clone(),
      Some(NodeData::Element(_)) => self
        .tree
        .descendants(id)
        .into_iter()
        .filter_map(|n| match self.nodes.get(&n) {
          Some(NodeData::Text(text)) => Some(text.as_str()),
          Some(NodeData::Element(_)) | None => None,
        })
        .collect(),
      None => String::new(),
    }
  }

  /// Text of the node's direct text children, whitespace-collapsed.
  pub(crate) fn own_text(&self, id: NodeId) -> String {
    if let Some(NodeData::Text(text)) = self.nodes.get(&id) {
      return collapse_whitespace(text);
    }
    let joined: String = self
      .tree
      .children(id)
      .iter()
      .filter_map(|n| match self.nodes.get(n) {
        Some(NodeData::Text(text)) => Some(text.as_str()),
        Some(NodeData::Element(_)) | None => None,
      })
      .collect::<Vec<_>>()
      .join(" ");
    collapse_whitespace(&joined)
  }

  /// Current value of a form control.
  pub(crate) fn value(&self, id: NodeId) -> Option<String> {
    let element = self.element(id)?;
    if let Some(value) = &element.value {
      return Some(value.clone());
    }

    match element.tag.as_str() {
      "input" => Some(element.attribute("value").unwrap_or_default().to_owned()),
      "textarea" => Some(self.text_content(id)),
      "option" => Some(
        element
          .attribute("value")
          .map_or_else(|| collapse_whitespace(&self.text_content(id)), str::to_owned),
      ),
      "select" => {
        let options = self.query_all(id, &Selector::tag("option"));
        let chosen = options
          .iter()
          .find(|&&o| self.attribute(o, "selected").is_some())
          .or_else(|| options.first());
        Some(chosen.and_then(|&o| self.value(o)).unwrap_or_default())
      }
      _ => element.attribute("value").map(str::to_owned),
    }
  }

  /// A form control carrying `disabled`, or inside a disabled `<fieldset>`
  /// but outside that fieldset's first `<legend>`.
  pub(crate) fn is_disabled_control(&self, id: NodeId) -> bool {
    let Some(element) = self.element(id) else {
      return false;
    };
    if !FORM_CONTROLS.contains(&element.tag.as_str()) {
      return false;
    }
    if element.attribute("disabled").is_some() {
      return true;
    }

    let mut child = id;
    while let Some(parent) = self.tree.parent(child) {
      let disabled_fieldset = self
        .element(parent)
        .is_some_and(|e| e.tag == "fieldset" && e.attribute("disabled").is_some());
      if disabled_fieldset && self.first_legend(parent) != Some(child) {
        return true;
      }
      child = parent;
    }
    false
  }

  fn first_legend(&self, fieldset: NodeId) -> Option<NodeId> {
    self
      .tree
      .children(fieldset)
      .iter()
      .copied()
      .find(|&c| self.element(c).is_some_and(|e| e.tag == "legend"))
  }

  /// Disabled natively or through `aria-disabled="true"`.
  pub(crate) fn is_disabled(&self, id: NodeId) -> bool {
    self.is_disabled_control(id) || self.attribute(id, "aria-disabled") == Some("true")
  }

  fn is_labelable(&self, id: NodeId) -> bool {
    self.element(id).is_some_and(|e| {
      LABELABLE.contains(&e.tag.as_str())
        && !(e.tag == "input" && e.attribute("type") == Some("hidden"))
    })
  }

  /// Elements under `scope` (excluding it) matching `selector`, in document order.
  pub(crate) fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    self
      .tree
      .descendants(scope)
      .into_iter()
      .filter(|&id| {
        self
          .element(id)
          .is_some_and(|e| selector.matches(&e.tag, &|name| e.attribute(name)))
      })
      .collect()
  }

  /// The control a `<label>` labels: the element named by `for` (searched in
  /// the label's own tree), else its first labelable descendant.
  pub(crate) fn label_control(&self, label: NodeId) -> Option<NodeId> {
    let element = self.element(label)?;
    if element.tag != "label" {
      return None;
    }

    if let Some(target) = element.attribute("for") {
      let root = self.tree.root_of(label);
      return std::iter::once(root)
        .chain(self.tree.descendants(root))
        .find(|&n| self.attribute(n, "id") == Some(target))
        .filter(|&n| self.is_labelable(n));
    }

    self
      .tree
      .descendants(label)
      .into_iter()
      .find(|&n| self.is_labelable(n))
  }

  pub(crate) fn view(&self, id: NodeId) -> NodeView<'_> {
    NodeView { registry: self, id }
  }

  /// Serializable copy of the subtree rooted at `id`.
  pub(crate) fn snapshot(&self, id: NodeId, max_depth: Option<usize>) -> Option<NodeSnapshot> {
    self.snapshot_at(id, 0, max_depth)
  }

  fn snapshot_at(&self, id: NodeId, depth: usize, max_depth: Option<usize>) -> Option<NodeSnapshot> {
    match self.nodes.get(&id)? {
      NodeData::Text(text) => Some(NodeSnapshot::Text {
        id,
        text: text.clone(),
      }),
      NodeData::Element(element) => {
        let child_ids = self.tree.children(id);
        let truncated = max_depth.is_some_and(|max| depth >= max) && !child_ids.is_empty();
        let children = if truncated {
          Vec::new()
        } else {
          child_ids
            .iter()
            .filter_map(|&c| self.snapshot_at(c, depth + 1, max_depth))
            .collect()
        };
        Some(NodeSnapshot::Element {
          id,
          tag: element.tag.clone(),
          attributes: element.attributes.clone(),
          children,
          truncated,
        })
      }
    }
  }

  // ==========================================================================
  // Mutations (recorded)
  // ==========================================================================

  /// Insert `child` under `parent`, before `reference` or at the end.
  /// A child that already has a parent is moved.
  pub(crate) fn insert_before(
    &mut self,
    parent: NodeId,
    child: NodeId,
    reference: Option<NodeId>,
  ) -> SemanticResult<()> {
    self.check_insertable(parent, child)?;

    let mut reference = reference;
    if let Some(r) = reference {
      if self.tree.parent(r) != Some(parent) {
        return Err(SemanticError::HierarchyRequest {
          parent,
          child,
          reason: "the reference node is not a child of the parent",
        });
      }
      if r == child {
        reference = self.next_sibling(child);
      }
    }

    self.detach_recorded(child);
    self.tree.insert_child(parent, child, reference);
    self.record_child_list(parent, vec![child], Vec::new());
    Ok(())
  }

  /// Detach `node` from its parent. Returns false if it had none.
  pub(crate) fn remove(&mut self, node: NodeId) -> SemanticResult<bool> {
    self.require(node)?;
    Ok(self.detach_recorded(node))
  }

  /// Replace every child of `parent` with `children`, as one record.
  pub(crate) fn replace_children(
    &mut self,
    parent: NodeId,
    children: Vec<NodeId>,
  ) -> SemanticResult<()> {
    for &child in &children {
      self.check_insertable(parent, child)?;
    }

    let removed = self.tree.take_children(parent);
    for &child in &children {
      self.detach_recorded(child);
      self.tree.insert_child(parent, child, None);
    }

    if !removed.is_empty() || !children.is_empty() {
      self.record_child_list(parent, children, removed);
    }
    Ok(())
  }

  /// Elements: replace all children with one text node. Text: replace the data.
  pub(crate) fn set_text_content(&mut self, node: NodeId, text: &str) -> SemanticResult<()> {
    match self.nodes.get_mut(&node) {
      None => Err(SemanticError::UnknownNode(node)),
      Some(NodeData::Text(data)) => {
        let old = std::mem::replace(data, text.to_owned());
        self.record(MutationRecord {
          kind: MutationKind::CharacterData,
          target: node,
          path: self.path(node),
          added_nodes: Vec::new(),
          removed_nodes: Vec::new(),
          attribute_name: None,
          old_value: Some(old),
        });
        Ok(())
      }
      Some(NodeData::Element(_)) => {
        let children = if text.is_empty() {
          Vec::new()
        } else {
          vec![self.create_text(text)]
        };
        self.replace_children(node, children)
      }
    }
  }

  pub(crate) fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> SemanticResult<()> {
    let name = name.to_ascii_lowercase();
    let element = self.element_mut(node)?;
    let old_value = match element.attributes.iter_mut().find(|(n, _)| *n == name) {
      Some((_, current)) => Some(std::mem::replace(current, value.to_owned())),
      None => {
        element.attributes.push((name.clone(), value.to_owned()));
        None
      }
    };
    self.record_attribute(node, name, old_value);
    Ok(())
  }

  /// Returns false if the attribute was not present.
  pub(crate) fn remove_attribute(&mut self, node: NodeId, name: &str) -> SemanticResult<bool> {
    let name = name.to_ascii_lowercase();
    let element = self.element_mut(node)?;
    let Some(index) = element.attributes.iter().position(|(n, _)| *n == name) else {
      return Ok(false);
    };
    let (_, old) = element.attributes.remove(index);
    self.record_attribute(node, name, Some(old));
    Ok(true)
  }

  /// Set a control's current value. Like the DOM `value` property this is
  /// not a tree mutation and produces no record.
  pub(crate) fn set_value(&mut self, node: NodeId, value: &str) -> SemanticResult<()> {
    self.element_mut(node)?.value = Some(value.to_owned());
    Ok(())
  }

  fn check_insertable(&self, parent: NodeId, child: NodeId) -> SemanticResult<()> {
    match self.require(parent)? {
      NodeData::Element(_) => {}
      NodeData::Text(_) => {
        return Err(SemanticError::HierarchyRequest {
          parent,
          child,
          reason: "text nodes cannot have children",
        })
      }
    }
    self.require(child)?;

    if child == self.body {
      return Err(SemanticError::HierarchyRequest {
        parent,
        child,
        reason: "the body cannot be moved",
      });
    }
    if self.tree.is_inclusive_ancestor(child, parent) {
      return Err(SemanticError::HierarchyRequest {
        parent,
        child,
        reason: "a node cannot be inserted into its own subtree",
      });
    }
    Ok(())
  }

  fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
    let parent = self.tree.parent(id)?;
    let siblings = self.tree.children(parent);
    let index = siblings.iter().position(|&s| s == id)?;
    siblings.get(index + 1).copied()
  }

  fn detach_recorded(&mut self, node: NodeId) -> bool {
    match self.tree.detach(node) {
      Some(parent) => {
        self.record_child_list(parent, Vec::new(), vec![node]);
        true
      }
      None => false,
    }
  }

  fn record_child_list(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
    self.record(MutationRecord {
      kind: MutationKind::ChildList,
      target,
      path: self.path(target),
      added_nodes: added,
      removed_nodes: removed,
      attribute_name: None,
      old_value: None,
    });
  }

  fn record_attribute(&mut self, target: NodeId, name: String, old_value: Option<String>) {
    self.record(MutationRecord {
      kind: MutationKind::Attributes,
      target,
      path: self.path(target),
      added_nodes: Vec::new(),
      removed_nodes: Vec::new(),
      attribute_name: Some(name),
      old_value,
    });
  }

  fn record(&mut self, record: MutationRecord) {
    self.pending.push(record);
  }

  // ==========================================================================
  // Batching and delivery
  // ==========================================================================

  pub(crate) fn begin_batch(&mut self) {
    self.batch_depth += 1;
  }

  pub(crate) fn end_batch(&mut self) {
    self.batch_depth = self.batch_depth.saturating_sub(1);
  }

  /// Deliver pending records as one batch, unless a batch scope is open.
  pub(crate) fn flush(&mut self) {
    if self.batch_depth > 0 || self.pending.is_empty() {
      return;
    }
    let batch = MutationBatch {
      records: std::mem::take(&mut self.pending),
    };
    self.emit(batch);
  }

  fn emit(&self, batch: MutationBatch) {
    match self.mutations_tx.try_broadcast(batch) {
      Ok(None) => {}
      Ok(Some(_dropped)) => {
        log::error!(
          "Mutation channel overflow - oldest batch dropped. \
           Consider increasing mutation_channel_capacity or settling waits sooner."
        );
      }
      Err(e) => {
        if e.is_full() {
          log::error!("Mutation channel full - batch dropped");
        }
        // Inactive: nobody is waiting, nothing to deliver.
      }
    }
  }

  pub(crate) fn subscribe(&self) -> Receiver<MutationBatch> {
    self.mutations_keepalive.activate_cloned()
  }

  pub(crate) fn receiver_count(&self) -> usize {
    self.mutations_tx.receiver_count()
  }

  /// Close every live subscription and start a fresh channel.
  /// Receivers drain what was already delivered, then see the channel closed.
  pub(crate) fn reset_subscriptions(&mut self) {
    let open = self.mutations_tx.receiver_count();
    self.mutations_tx.close();
    let (tx, keepalive) = channel(self.capacity);
    self.mutations_tx = tx;
    self.mutations_keepalive = keepalive;
    if open > 0 {
      log::debug!("Closed {open} pending mutation subscription(s)");
    }
  }
}

fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read-only view of one node, as seen by matchers.
#[derive(Clone, Copy)]
pub(crate) struct NodeView<'a> {
  registry: &'a Registry,
  id: NodeId,
}

impl Candidate for NodeView<'_> {
  fn own_text(&self) -> String {
    self.registry.own_text(self.id)
  }

  fn text_content(&self) -> String {
    self.registry.text_content(self.id)
  }

  fn attribute(&self, name: &str) -> Option<&str> {
    self.registry.attribute(self.id, name)
  }

  fn value(&self) -> Option<String> {
    self.registry.value(self.id)
  }
}
