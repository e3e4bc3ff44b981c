/*!
Candidate selectors for `query_all`.

A deliberately small subset of CSS: `*`, `tag`, `[attr]`, `[attr=value]`,
compounds like `input[type="text"]`, and comma-separated lists.
*/

use crate::types::{SemanticError, SemanticResult};
use nom::{
  branch::alt,
  bytes::complete::{tag, take_till, take_while1},
  character::complete::{char, multispace0},
  combinator::{all_consuming, map, opt},
  multi::{many0, separated_list1},
  sequence::{delimited, preceded, tuple},
  IResult,
};
use std::str::FromStr;

/// Attribute condition inside a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
  /// Lowercased attribute name.
  pub name: String,
  /// None = presence only.
  pub value: Option<String>,
}

/// Selects elements by tag and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
  /// `*` - every element.
  Universal,
  /// `tag[attr][attr=value]` - all parts must hold.
  Compound {
    /// Lowercased tag, or any tag.
    tag: Option<String>,
    /// Attribute conditions; all must hold.
    attributes: Vec<AttributeSelector>,
  },
  /// `a, b` - any alternative may hold.
  List(Vec<Selector>),
}

impl Selector {
  /// Elements with this tag.
  pub fn tag(name: &str) -> Self {
    Self::Compound {
      tag: Some(name.to_ascii_lowercase()),
      attributes: Vec::new(),
    }
  }

  /// Elements carrying this attribute, whatever its value.
  pub fn attribute(name: &str) -> Self {
    Self::Compound {
      tag: None,
      attributes: vec![AttributeSelector {
        name: name.to_ascii_lowercase(),
        value: None,
      }],
    }
  }

  /// Elements with any of these tags.
  pub fn any_of(tags: &[&str]) -> Self {
    Self::List(tags.iter().map(|t| Self::tag(t)).collect())
  }

  /// Test an element given its tag and an attribute lookup.
  pub fn matches<'a>(&self, tag: &str, attribute: &dyn Fn(&str) -> Option<&'a str>) -> bool {
    match self {
      Self::Universal => true,
      Self::Compound {
        tag: wanted,
        attributes,
      } => {
        wanted.as_deref().map_or(true, |w| w == tag)
          && attributes.iter().all(|cond| match (attribute(&cond.name), &cond.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
          })
      }
      Self::List(alternatives) => alternatives.iter().any(|s| s.matches(tag, attribute)),
    }
  }
}

impl FromStr for Selector {
  type Err = SemanticError;

  fn from_str(source: &str) -> SemanticResult<Self> {
    let invalid = |reason: String| SemanticError::InvalidSelector {
      selector: source.to_owned(),
      reason,
    };

    match all_consuming(selector_list)(source.trim()) {
      Ok((_, mut alternatives)) if alternatives.len() == 1 => alternatives
        .pop()
        .ok_or_else(|| invalid("empty selector".into())),
      Ok((_, alternatives)) => Ok(Self::List(alternatives)),
      Err(e) => Err(invalid(format!("{e:?}"))),
    }
  }
}

// ============================================================================
// Nom Parser Combinators
// ============================================================================

fn is_ident_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn ident(input: &str) -> IResult<&str, String> {
  map(take_while1(is_ident_char), str::to_ascii_lowercase)(input)
}

fn attribute_value(input: &str) -> IResult<&str, String> {
  map(
    alt((
      delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
      delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
      take_while1(is_ident_char),
    )),
    str::to_owned,
  )(input)
}

fn attribute_condition(input: &str) -> IResult<&str, AttributeSelector> {
  map(
    delimited(
      tuple((char('['), multispace0)),
      tuple((
        ident,
        opt(preceded(
          tuple((multispace0, char('='), multispace0)),
          attribute_value,
        )),
      )),
      tuple((multispace0, char(']'))),
    ),
    |(name, value)| AttributeSelector { name, value },
  )(input)
}

fn compound(input: &str) -> IResult<&str, Selector> {
  alt((
    map(tag("*"), |_| Selector::Universal),
    map(
      tuple((opt(ident), many0(attribute_condition))),
      |(tag, attributes)| Selector::Compound { tag, attributes },
    ),
  ))(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<Selector>> {
  separated_list1(
    tuple((multispace0, char(','), multispace0)),
    compound,
  )(input)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn attrs<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<&'a str> {
    move |name: &str| pairs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
  }

  #[test]
  fn parses_universal() {
    assert_eq!("*".parse::<Selector>().unwrap(), Selector::Universal);
  }

  #[test]
  fn parses_tag_list() {
    let selector: Selector = "input, select,textarea".parse().unwrap();
    assert_eq!(selector, Selector::any_of(&["input", "select", "textarea"]));
  }

  #[test]
  fn parses_attribute_with_value() {
    let selector: Selector = r#"[data-test="products"]"#.parse().unwrap();
    assert!(selector.matches("span", &attrs(&[("data-test", "products")])));
    assert!(!selector.matches("span", &attrs(&[("data-test", "other")])));
    assert!(!selector.matches("span", &attrs(&[])));
  }

  #[test]
  fn compound_requires_every_part() {
    let selector: Selector = "input[type=text][name]".parse().unwrap();
    assert!(selector.matches("input", &attrs(&[("type", "text"), ("name", "q")])));
    assert!(!selector.matches("input", &attrs(&[("type", "text")])));
    assert!(!selector.matches("textarea", &attrs(&[("type", "text"), ("name", "q")])));
  }

  #[test]
  fn rejects_garbage() {
    assert!("[unterminated".parse::<Selector>().is_err());
    assert!("div >> span".parse::<Selector>().is_err());
  }
}
