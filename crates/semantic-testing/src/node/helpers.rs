/*!
Read-only helpers.

Helpers tolerate detached nodes: a node captured before it disappeared can
still be read once afterwards.
*/

use super::NodeHandle;
use crate::dom::render_markup;
use crate::matchers::TextMatcher;
use crate::types::{NodeId, NodeSnapshot, SemanticError, SemanticResult, TreeFormat};

/// Helper capability.
pub trait Helpers: NodeHandle {
  /// Text content of the node and all its descendants.
  fn text(&self) -> SemanticResult<String> {
    let node = self.require("text")?;
    Ok(self.document().text_content(node))
  }

  /// Current form value; `None` for elements that have none.
  fn value(&self) -> SemanticResult<Option<String>> {
    let node = self.require("value")?;
    Ok(self.document().value(node))
  }

  /// Is the node attached to the document? False for absent nodes.
  fn is_rendered(&self) -> bool {
    self
      .node_id()
      .is_some_and(|node| self.document().contains(node))
  }

  /// Disabled natively, by a fieldset, or through `aria-disabled`.
  fn is_disabled(&self) -> SemanticResult<bool> {
    let node = self.require("is_disabled")?;
    Ok(self.document().is_disabled(node))
  }

  /// Does the text content match (case-insensitive containment, or pattern)?
  fn has_text(&self, expected: impl Into<TextMatcher>) -> SemanticResult<bool> {
    let text = self.text()?;
    Ok(expected.into().matches_loosely(&text))
  }

  /// Attribute value by name, ignoring ASCII case.
  fn attribute(&self, name: &str) -> SemanticResult<Option<String>> {
    let node = self.require("attribute")?;
    Ok(self.document().attribute(node, name))
  }

  /// Lowercased tag name, `#text` for text nodes.
  fn tag_name(&self) -> SemanticResult<String> {
    let node = self.require("tag_name")?;
    Ok(
      self
        .document()
        .tag_name(node)
        .unwrap_or_else(|| "#text".to_owned()),
    )
  }

  /// The underlying node, `None` when absent.
  fn raw_node(&self) -> Option<NodeId> {
    self.node_id()
  }

  /// Serializable copy of the subtree, honoring `log_tree_max_depth`.
  fn snapshot(&self) -> SemanticResult<NodeSnapshot> {
    let node = self.require("snapshot")?;
    self
      .document()
      .snapshot(node)
      .ok_or(SemanticError::UnknownNode(node))
  }

  /// Render the subtree as indented markup, log it at info level, return it.
  fn log_tree(&self) -> SemanticResult<String> {
    self.log_tree_as(TreeFormat::Markup)
  }

  /// Like `log_tree`, in the given format.
  fn log_tree_as(&self, format: TreeFormat) -> SemanticResult<String> {
    let snapshot = self.snapshot()?;
    let tree = match format {
      TreeFormat::Markup => render_markup(&snapshot, self.document().config().tree_indent),
      TreeFormat::Json => serde_json::to_string_pretty(&snapshot)?,
    };
    log::info!("{tree}");
    Ok(tree)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Document;
  use crate::node::compose;

  fn fixture(markup: &str) -> (Document, NodeId) {
    let document = Document::builder().tree_indent(4).build();
    let root = document.set_inner_markup(document.body(), markup).unwrap()[0];
    (document, root)
  }

  #[test]
  fn reads_text_and_attributes() {
    let (document, root) = fixture(r#"<div role="status" aria-disabled="true">Saved <b>3</b> items</div>"#);
    let node = compose(&document, root);
    assert_eq!(node.text().unwrap(), "Saved 3 items");
    assert!(node.has_text("saved 3").unwrap());
    assert!(!node.has_text("deleted").unwrap());
    assert_eq!(node.attribute("role").unwrap().as_deref(), Some("status"));
    assert_eq!(node.attribute("title").unwrap(), None);
    assert_eq!(node.tag_name().unwrap(), "div");
    assert!(node.is_disabled().unwrap());
    assert_eq!(node.value().unwrap(), None);
  }

  #[test]
  fn detached_nodes_stay_readable() {
    let (document, root) = fixture("<p>bye</p>");
    let node = compose(&document, root);
    assert!(node.is_rendered());

    document.remove(root).unwrap();
    assert!(!node.is_rendered());
    assert_eq!(node.text().unwrap(), "bye");
  }

  #[test]
  fn text_nodes_have_a_pseudo_tag() {
    let (document, root) = fixture("<p>hi</p>");
    let text = document.children(root)[0];
    assert_eq!(compose(&document, text).tag_name().unwrap(), "#text");
  }

  #[test]
  fn log_tree_uses_configured_indent() {
    let (document, root) = fixture("<ul><li>a</li><li>b</li></ul>");
    let tree = compose(&document, root).log_tree().unwrap();
    assert_eq!(tree, "<ul>\n    <li>a</li>\n    <li>b</li>\n</ul>\n");
  }

  #[test]
  fn log_tree_as_json() {
    let (document, root) = fixture(r#"<a href="/x">go</a>"#);
    let json = compose(&document, root).log_tree_as(TreeFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "element");
    assert_eq!(value["tag"], "a");
    assert_eq!(value["attributes"][0][0], "href");
    assert_eq!(value["children"][0]["text"], "go");
    assert!(value.get("truncated").is_none());
  }
}
