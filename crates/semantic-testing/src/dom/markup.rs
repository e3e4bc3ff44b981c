/*!
Markup fragments: a small HTML-ish parser and a pretty printer.

The parser understands elements, attributes in double/single/unquoted/boolean
form, void and self-closing elements, text with entity decoding, and comments.
Whitespace-only text between tags is dropped. Tag and attribute names are
lowercased.
*/

use crate::types::{NodeSnapshot, SemanticError, SemanticResult};
use nom::{
  branch::alt,
  bytes::complete::{tag, take_till1, take_until, take_while, take_while1},
  character::complete::{alpha1, char, multispace0, multispace1},
  combinator::{all_consuming, cut, map, opt, recognize, value},
  error::{Error, ErrorKind},
  multi::many0,
  sequence::{delimited, pair, preceded, terminated, tuple},
  IResult,
};
use std::fmt::Write as _;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
  "wbr",
];

/// Parsed (not yet inserted) markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkupNode {
  Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
  },
  Text(String),
}

/// Parse a markup fragment into a forest.
pub(crate) fn parse_fragment(source: &str) -> SemanticResult<Vec<MarkupNode>> {
  match all_consuming(nodes)(source) {
    Ok((_, forest)) => Ok(forest),
    Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(SemanticError::InvalidMarkup {
      position: source.len() - e.input.len(),
      reason: describe(e.code),
    }),
    Err(nom::Err::Incomplete(_)) => Err(SemanticError::InvalidMarkup {
      position: source.len(),
      reason: "unexpected end of input".into(),
    }),
  }
}

fn describe(code: ErrorKind) -> String {
  if code == ErrorKind::Tag {
    "unclosed or mismatched element".into()
  } else if code == ErrorKind::Eof {
    "closing tag without a matching element".into()
  } else if code == ErrorKind::TakeUntil {
    "unterminated comment or quoted value".into()
  } else {
    code.description().to_owned()
  }
}

// ============================================================================
// Nom Parser Combinators
// ============================================================================

/// Sibling nodes until end of input or a closing tag.
fn nodes(mut input: &str) -> IResult<&str, Vec<MarkupNode>> {
  let mut out = Vec::new();

  loop {
    if input.is_empty() || input.starts_with("</") {
      return Ok((input, out));
    }

    if input.starts_with("<!--") {
      let (rest, ()) = comment(input)?;
      input = rest;
    } else if input.starts_with('<') {
      let (rest, node) = element(input)?;
      out.push(node);
      input = rest;
    } else {
      let (rest, raw) = text(input)?;
      if !raw.trim().is_empty() {
        out.push(MarkupNode::Text(decode_entities(raw)));
      }
      input = rest;
    }
  }
}

fn text(input: &str) -> IResult<&str, &str> {
  take_till1(|c: char| c == '<')(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
  value(
    (),
    preceded(tag("<!--"), cut(terminated(take_until("-->"), tag("-->")))),
  )(input)
}

fn name(input: &str) -> IResult<&str, String> {
  map(
    recognize(pair(
      alpha1,
      take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'),
    )),
    str::to_ascii_lowercase,
  )(input)
}

fn attribute_name(input: &str) -> IResult<&str, String> {
  map(
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '<')),
    str::to_ascii_lowercase,
  )(input)
}

fn attribute_value(input: &str) -> IResult<&str, String> {
  map(
    alt((
      delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
      delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
      take_while1(|c: char| !c.is_whitespace() && !matches!(c, '>' | '"' | '\'' | '=' | '<' | '`')),
    )),
    decode_entities,
  )(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
  map(
    pair(
      attribute_name,
      opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        cut(attribute_value),
      )),
    ),
    |(name, value)| (name, value.unwrap_or_default()),
  )(input)
}

fn element(input: &str) -> IResult<&str, MarkupNode> {
  let (input, tag_name) = preceded(char('<'), name)(input)?;
  let (input, (attributes, self_closing)) = cut(pair(
    many0(preceded(multispace1, attribute)),
    preceded(
      multispace0,
      alt((value(true, tag("/>")), value(false, char('>')))),
    ),
  ))(input)?;

  if self_closing || VOID_ELEMENTS.contains(&tag_name.as_str()) {
    let element = MarkupNode::Element {
      tag: tag_name,
      attributes,
      children: Vec::new(),
    };
    return Ok((input, element));
  }

  let (input, children) = nodes(input)?;
  let closing_at = input;
  let (input, closing) = cut(delimited(
    tag("</"),
    name,
    preceded(multispace0, char('>')),
  ))(input)
  .map_err(|_: nom::Err<Error<&str>>| nom::Err::Failure(Error::new(closing_at, ErrorKind::Tag)))?;

  if closing != tag_name {
    return Err(nom::Err::Failure(Error::new(closing_at, ErrorKind::Tag)));
  }

  Ok((
    input,
    MarkupNode::Element {
      tag: tag_name,
      attributes,
      children,
    },
  ))
}

/// Decode the handful of character references that show up in test markup.
/// Unknown references are kept verbatim.
pub(crate) fn decode_entities(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut rest = raw;

  while let Some(amp) = rest.find('&') {
    out.push_str(&rest[..amp]);
    rest = &rest[amp..];

    let decoded = rest.find(';').and_then(|semi| {
      let entity = &rest[1..semi];
      let ch = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => entity
          .strip_prefix("#x")
          .or_else(|| entity.strip_prefix("#X"))
          .and_then(|hex| u32::from_str_radix(hex, 16).ok())
          .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
          .and_then(char::from_u32),
      };
      ch.map(|c| (c, semi))
    });

    if let Some((c, semi)) = decoded {
      out.push(c);
      rest = &rest[semi + 1..];
    } else {
      out.push('&');
      rest = &rest[1..];
    }
  }

  out.push_str(rest);
  out
}

// ============================================================================
// Pretty printer
// ============================================================================

fn escape(text: &str, attribute: bool) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' if !attribute => out.push_str("&gt;"),
      '"' if attribute => out.push_str("&quot;"),
      c => out.push(c),
    }
  }
  out
}

/// Render a snapshot as indented markup. Elements whose only child is a text
/// node are printed on one line.
pub(crate) fn render_markup(snapshot: &NodeSnapshot, indent: usize) -> String {
  let mut out = String::new();
  write_node(&mut out, snapshot, indent, 0);
  out
}

fn write_node(out: &mut String, node: &NodeSnapshot, indent: usize, depth: usize) {
  let pad = " ".repeat(indent * depth);

  match node {
    NodeSnapshot::Text { text, .. } => {
      let _ = writeln!(out, "{pad}{}", escape(text, false));
    }
    NodeSnapshot::Element {
      tag,
      attributes,
      children,
      truncated,
      ..
    } => {
      let mut open = format!("<{tag}");
      for (name, value) in attributes {
        if value.is_empty() {
          let _ = write!(open, " {name}");
        } else {
          let _ = write!(open, " {name}=\"{}\"", escape(value, true));
        }
      }
      open.push('>');

      if VOID_ELEMENTS.contains(&tag.as_str()) && children.is_empty() {
        let _ = writeln!(out, "{pad}{open}");
        return;
      }

      match children.as_slice() {
        [] if *truncated => {
          let _ = writeln!(out, "{pad}{open}...</{tag}>");
        }
        [] => {
          let _ = writeln!(out, "{pad}{open}</{tag}>");
        }
        [NodeSnapshot::Text { text, .. }] => {
          let _ = writeln!(out, "{pad}{open}{}</{tag}>", escape(text, false));
        }
        many => {
          let _ = writeln!(out, "{pad}{open}");
          for child in many {
            write_node(out, child, indent, depth + 1);
          }
          let _ = writeln!(out, "{pad}</{tag}>");
        }
      }
    }
  }
}
