/*!
Matcher library - pure predicates comparing a candidate node against a target.

A target is either an exact string or a compiled pattern. How an exact string
compares depends on what is being matched:

| Kind                          | Candidate value       | Exact comparison            |
|-------------------------------|-----------------------|-----------------------------|
| `Text`                        | own (direct) text     | case-insensitive containment|
| `Label`                       | label text content    | case-insensitive containment|
| `DataTest`, `Role`, ...       | attribute value       | case-sensitive equality     |
| `Value`                       | current form value    | case-sensitive equality     |

Patterns always use `Regex::is_match`; put `(?i)` in the pattern for
case-insensitive matching. Matchers never fail: a missing attribute or value
simply does not match.
*/

use crate::dom::Selector;
use crate::types::SemanticResult;
use regex::Regex;
use std::fmt;

/// What to compare a candidate against.
#[derive(Debug, Clone)]
pub enum TextMatcher {
  /// Compared as text; see the module table.
  Exact(String),
  /// Compared with `Regex::is_match`.
  Pattern(Regex),
}

impl TextMatcher {
  /// A literal target.
  pub fn exact(text: impl Into<String>) -> Self {
    Self::Exact(text.into())
  }

  /// Compile a pattern target.
  pub fn pattern(source: &str) -> SemanticResult<Self> {
    Ok(Self::Pattern(Regex::new(source)?))
  }

  /// Case-insensitive containment, or a pattern match.
  pub fn matches_loosely(&self, candidate: &str) -> bool {
    match self {
      Self::Exact(needle) => candidate
        .to_lowercase()
        .contains(&needle.to_lowercase()),
      Self::Pattern(pattern) => pattern.is_match(candidate),
    }
  }

  /// Case-sensitive equality, or a pattern match.
  pub fn matches_exactly(&self, candidate: &str) -> bool {
    match self {
      Self::Exact(expected) => candidate == expected,
      Self::Pattern(pattern) => pattern.is_match(candidate),
    }
  }
}

impl From<&str> for TextMatcher {
  fn from(text: &str) -> Self {
    Self::exact(text)
  }
}

impl From<String> for TextMatcher {
  fn from(text: String) -> Self {
    Self::Exact(text)
  }
}

impl From<Regex> for TextMatcher {
  fn from(pattern: Regex) -> Self {
    Self::Pattern(pattern)
  }
}

impl fmt::Display for TextMatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Exact(text) => write!(f, "{text:?}"),
      Self::Pattern(pattern) => write!(f, "/{pattern}/"),
    }
  }
}

/// Which characteristic of a node is matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatcherKind {
  /// The element's own text.
  Text,
  /// The `data-test` attribute.
  DataTest,
  /// Text of a `<label>`; resolves to the labelled control.
  Label,
  /// The `role` attribute.
  Role,
  /// Current value of a form control.
  Value,
  /// The `aria-label` attribute.
  AriaLabel,
  /// The `alt` attribute.
  AltText,
  /// Any attribute, by name.
  Attribute(String),
}

impl MatcherKind {
  /// The attribute compared by attribute-valued kinds.
  pub fn attribute_name(&self) -> Option<&str> {
    match self {
      Self::DataTest => Some("data-test"),
      Self::Role => Some("role"),
      Self::AriaLabel => Some("aria-label"),
      Self::AltText => Some("alt"),
      Self::Attribute(name) => Some(name),
      Self::Text | Self::Label | Self::Value => None,
    }
  }

  /// Elements worth testing for this kind.
  pub fn selector(&self) -> Selector {
    match self {
      Self::Text => Selector::Universal,
      Self::Label => Selector::tag("label"),
      Self::Value => Selector::any_of(&["input", "select", "textarea"]),
      Self::DataTest | Self::Role | Self::AriaLabel | Self::AltText | Self::Attribute(_) => {
        Selector::attribute(self.attribute_name().unwrap_or_default())
      }
    }
  }
}

impl fmt::Display for MatcherKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text => f.write_str("text"),
      Self::Label => f.write_str("label text"),
      Self::Value => f.write_str("value"),
      Self::DataTest | Self::Role | Self::AriaLabel | Self::AltText | Self::Attribute(_) => {
        write!(f, "[{}]", self.attribute_name().unwrap_or_default())
      }
    }
  }
}

/// The parts of a node a matcher may look at.
pub trait Candidate {
  /// Text of the node's direct text children, whitespace-collapsed.
  fn own_text(&self) -> String;
  /// Text of every descendant text node.
  fn text_content(&self) -> String;
  /// Attribute value by name.
  fn attribute(&self, name: &str) -> Option<&str>;
  /// Current form value, for form controls.
  fn value(&self) -> Option<String>;
}

/// A kind paired with a target.
#[derive(Debug, Clone)]
pub struct Matcher {
  kind: MatcherKind,
  target: TextMatcher,
}

impl Matcher {
  /// Pair a kind with a target.
  pub fn new(kind: MatcherKind, target: impl Into<TextMatcher>) -> Self {
    Self {
      kind,
      target: target.into(),
    }
  }

  /// What is compared.
  pub const fn kind(&self) -> &MatcherKind {
    &self.kind
  }

  /// What it is compared against.
  pub const fn target(&self) -> &TextMatcher {
    &self.target
  }

  /// Pre-filter for candidates; see [`MatcherKind::selector`].
  pub fn selector(&self) -> Selector {
    self.kind.selector()
  }

  /// Does `candidate` satisfy this matcher?
  pub fn matches<C: Candidate + ?Sized>(&self, candidate: &C) -> bool {
    match &self.kind {
      MatcherKind::Text => self.target.matches_loosely(&candidate.own_text()),
      MatcherKind::Label => self.target.matches_loosely(&candidate.text_content()),
      MatcherKind::Value => candidate
        .value()
        .is_some_and(|value| self.target.matches_exactly(&value)),
      kind @ (MatcherKind::DataTest
      | MatcherKind::Role
      | MatcherKind::AriaLabel
      | MatcherKind::AltText
      | MatcherKind::Attribute(_)) => kind
        .attribute_name()
        .and_then(|name| candidate.attribute(name))
        .is_some_and(|value| self.target.matches_exactly(value)),
    }
  }
}

impl fmt::Display for Matcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.kind, self.target)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[derive(Default)]
  struct Fake {
    own: String,
    content: String,
    attributes: Vec<(&'static str, &'static str)>,
    value: Option<String>,
  }

  impl Candidate for Fake {
    fn own_text(&self) -> String {
      self.own.clone()
    }
    fn text_content(&self) -> String {
      self.content.clone()
    }
    fn attribute(&self, name: &str) -> Option<&str> {
      self
        .attributes
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
    }
    fn value(&self) -> Option<String> {
      self.value.clone()
    }
  }

  #[test]
  fn text_is_case_insensitive_containment() {
    let candidate = Fake {
      own: "Add To Cart".into(),
      ..Fake::default()
    };
    assert!(Matcher::new(MatcherKind::Text, "to cart").matches(&candidate));
    assert!(!Matcher::new(MatcherKind::Text, "checkout").matches(&candidate));
  }

  #[test]
  fn text_ignores_descendant_text() {
    let wrapper = Fake {
      own: String::new(),
      content: "+ 10".into(),
      ..Fake::default()
    };
    assert!(!Matcher::new(MatcherKind::Text, "+").matches(&wrapper));
    assert!(Matcher::new(MatcherKind::Label, "+").matches(&wrapper));
  }

  #[test]
  fn attributes_are_case_sensitive_and_exact() {
    let candidate = Fake {
      attributes: vec![("data-test", "products")],
      ..Fake::default()
    };
    assert!(Matcher::new(MatcherKind::DataTest, "products").matches(&candidate));
    assert!(!Matcher::new(MatcherKind::DataTest, "Products").matches(&candidate));
    assert!(!Matcher::new(MatcherKind::DataTest, "prod").matches(&candidate));
    assert!(!Matcher::new(MatcherKind::Role, "products").matches(&candidate));
    assert!(Matcher::new(MatcherKind::Attribute("data-test".into()), "products").matches(&candidate));
  }

  #[test]
  fn patterns_carry_their_own_case_sensitivity() {
    let candidate = Fake {
      own: "a disabled button".into(),
      ..Fake::default()
    };
    let insensitive = TextMatcher::pattern("(?i)A Disabled Button").unwrap();
    let sensitive = TextMatcher::pattern("A Disabled Button").unwrap();
    assert!(Matcher::new(MatcherKind::Text, insensitive).matches(&candidate));
    assert!(!Matcher::new(MatcherKind::Text, sensitive).matches(&candidate));
  }

  #[test]
  fn value_requires_a_value() {
    let empty = Fake::default();
    let filled = Fake {
      value: Some("42".into()),
      ..Fake::default()
    };
    assert!(!Matcher::new(MatcherKind::Value, "").matches(&empty));
    assert!(Matcher::new(MatcherKind::Value, "42").matches(&filled));
  }

  #[test]
  fn invalid_pattern_is_reported() {
    assert!(matches!(
      TextMatcher::pattern("(unclosed"),
      Err(crate::types::SemanticError::InvalidPattern(_))
    ));
  }

  #[test]
  fn selectors_per_kind() {
    assert_eq!(MatcherKind::Text.selector(), Selector::Universal);
    assert_eq!(MatcherKind::Label.selector(), Selector::tag("label"));
    assert_eq!(MatcherKind::AltText.selector(), Selector::attribute("alt"));
    assert_eq!(MatcherKind::Role.to_string(), "[role]");
  }

  proptest! {
    #[test]
    fn exact_text_matches_itself_in_any_case(text in "[a-zA-Z0-9 ]{1,20}") {
      let candidate = Fake { own: text.clone(), ..Fake::default() };
      prop_assert!(Matcher::new(MatcherKind::Text, text.to_uppercase()).matches(&candidate));
      prop_assert!(Matcher::new(MatcherKind::Text, text.to_lowercase()).matches(&candidate));
    }

    #[test]
    fn escaped_pattern_agrees_with_exact_attribute(value in "[a-z.*+?-]{1,12}") {
      let candidate = Fake { value: Some(value.clone()), ..Fake::default() };
      let anchored = TextMatcher::pattern(&format!("^{}$", regex::escape(&value))).unwrap();
      prop_assert!(Matcher::new(MatcherKind::Value, anchored).matches(&candidate));
      prop_assert!(Matcher::new(MatcherKind::Value, value).matches(&candidate));
    }
  }
}
