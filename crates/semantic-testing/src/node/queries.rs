/*!
Scoped queries. Every call stores its query as the document's last query.
*/

use super::{NodeHandle, SemanticNode};
use crate::matchers::{Matcher, MatcherKind, TextMatcher};
use crate::query::{find_all, find_one};

/// Query capability, scoped to the node's descendants.
pub trait Queries: NodeHandle {
  /// First descendant matching `kind` against `target`, or the absent node.
  fn get_by(&self, kind: MatcherKind, target: impl Into<TextMatcher>) -> SemanticNode {
    match self.node_id() {
      Some(scope) => find_one(self.document(), scope, Matcher::new(kind, target)),
      None => SemanticNode::absent(self.document()),
    }
  }

  /// Every descendant matching `kind` against `target`, in document order.
  fn get_all_by(&self, kind: MatcherKind, target: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    match self.node_id() {
      Some(scope) => find_all(self.document(), scope, Matcher::new(kind, target)),
      None => Vec::new(),
    }
  }

  /// Matches the element's own text, case-insensitively.
  fn get_by_text(&self, text: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::Text, text)
  }

  /// Every element whose own text matches.
  fn get_all_by_text(&self, text: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::Text, text)
  }

  /// Matches `data-test` exactly.
  fn get_by_data_test(&self, data_test: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::DataTest, data_test)
  }

  /// Every element whose `data-test` matches.
  fn get_all_by_data_test(&self, data_test: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::DataTest, data_test)
  }

  /// Resolves the labelled control, not the label.
  fn get_by_label_text(&self, label: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::Label, label)
  }

  /// Every control labelled by a matching `<label>`.
  fn get_all_by_label_text(&self, label: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::Label, label)
  }

  /// Matches the explicit `role` attribute.
  fn get_by_role(&self, role: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::Role, role)
  }

  /// Every element whose `role` matches.
  fn get_all_by_role(&self, role: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::Role, role)
  }

  /// Matches the current value of inputs, selects and textareas.
  fn get_by_value(&self, value: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::Value, value)
  }

  /// Matches `aria-label` exactly.
  fn get_by_aria_label(&self, label: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::AriaLabel, label)
  }

  /// Every element whose `aria-label` matches.
  fn get_all_by_aria_label(&self, label: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::AriaLabel, label)
  }

  /// Matches `alt` exactly.
  fn get_by_alt_text(&self, alt: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::AltText, alt)
  }

  /// Every element whose `alt` matches.
  fn get_all_by_alt_text(&self, alt: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::AltText, alt)
  }

  /// Any attribute by name (ASCII case-insensitive), value matched exactly.
  fn get_by_attribute(&self, name: &str, value: impl Into<TextMatcher>) -> SemanticNode {
    self.get_by(MatcherKind::Attribute(name.to_owned()), value)
  }

  /// Every element whose `name` attribute matches.
  fn get_all_by_attribute(&self, name: &str, value: impl Into<TextMatcher>) -> Vec<SemanticNode> {
    self.get_all_by(MatcherKind::Attribute(name.to_owned()), value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::Document;
  use crate::node::Helpers;

  const PAGE: &str = r#"
    <form>
      <img alt="Company logo" src="/logo.png">
      <nav aria-label="Primary"><a role="link" href="/">Home</a><a role="link" href="/about">About</a></nav>
      <label for="q">Search</label><input id="q" name="q" value="rust">
      <select name="size"><option>S</option><option selected>M</option></select>
      <button type="submit" data-test="go">Go</button>
    </form>
  "#;

  fn mounted() -> crate::node::MountedNode {
    Document::new().mount(PAGE).unwrap()
  }

  #[test]
  fn queries_by_every_kind() {
    let root = mounted();
    assert_eq!(root.get_by_alt_text("Company logo").tag_name().unwrap(), "img");
    assert_eq!(root.get_by_aria_label("Primary").tag_name().unwrap(), "nav");
    assert_eq!(root.get_all_by_role("link").len(), 2);
    assert_eq!(root.get_by_role("link").text().unwrap(), "Home");
    assert_eq!(root.get_by_label_text("search").value().unwrap().as_deref(), Some("rust"));
    assert_eq!(root.get_by_value("rust").attribute("name").unwrap().as_deref(), Some("q"));
    assert_eq!(root.get_by_value("M").tag_name().unwrap(), "select");
    assert_eq!(root.get_by_data_test("go").text().unwrap(), "Go");
    assert_eq!(root.get_by_text("about").attribute("href").unwrap().as_deref(), Some("/about"));
    assert_eq!(root.get_by_attribute("Name", "size").tag_name().unwrap(), "select");
    assert_eq!(root.get_all_by_attribute("href", "/").len(), 1);
  }

  #[test]
  fn exact_attribute_matching_is_case_sensitive() {
    let root = mounted();
    assert!(root.get_by_aria_label("primary").raw_node().is_none());
    assert!(root.get_all_by_alt_text("logo").is_empty());
    assert!(root.get_all_by_data_test("GO").is_empty());
  }

  #[test]
  fn attribute_names_ignore_case() {
    let root = mounted();
    let kind = MatcherKind::Attribute("Data-Test".into());
    assert_eq!(root.get_by(kind.clone(), "go").text().unwrap(), "Go");
    assert_eq!(root.get_all_by(kind, "go").len(), 1);
    assert_eq!(root.get_by_attribute("ALT", "Company logo").tag_name().unwrap(), "img");
    assert_eq!(
      root.get_by_data_test("go").attribute("TYPE").unwrap().as_deref(),
      Some("submit")
    );
  }

  #[test]
  fn scoped_to_the_mounted_root() {
    let document = Document::new();
    let first = document.mount("<p>shared</p>").unwrap();
    let second = document.mount("<p>shared</p>").unwrap();

    let in_first = first.get_all_by_text("shared");
    assert_eq!(in_first.len(), 1);
    assert_ne!(in_first[0], second.get_by_text("shared"));
  }
}
