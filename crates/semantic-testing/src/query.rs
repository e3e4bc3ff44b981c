/*!
Query resolution engine and the last-query slot.

Every resolution builds a re-runnable `Query`, stores it in the document's
`LastQuery` slot, then runs it. `will_render` re-runs whatever is in the slot
after the next mutation, so a query made before a re-render transparently
resolves against the new node.

The slot holds one query per document: last writer wins. Two interleaved
logical queries clobber each other.
*/

use crate::dom::{Document, WeakDocument};
use crate::matchers::{Matcher, MatcherKind};
use crate::node::{NodeHandle, SemanticNode};
use crate::types::NodeId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// What a query produces.
#[derive(Debug, Clone)]
pub enum QueryResult {
  /// A single resolution; may wrap the absent sentinel.
  Single(SemanticNode),
  /// Every match, in document order.
  List(Vec<SemanticNode>),
}

impl QueryResult {
  /// The first present node, if any.
  pub fn first(self) -> Option<SemanticNode> {
    match self {
      Self::Single(node) => node.node_id().is_some().then_some(node),
      Self::List(nodes) => nodes.into_iter().next(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
  One,
  All,
}

/// A zero-argument, re-runnable query. Always re-walks the live tree.
#[derive(Clone)]
pub struct Query {
  description: Arc<str>,
  run: Arc<dyn Fn() -> QueryResult + Send + Sync>,
}

impl Query {
  /// Wrap a resolution closure.
  pub fn new<F>(description: impl Into<Arc<str>>, run: F) -> Self
  where
    F: Fn() -> QueryResult + Send + Sync + 'static,
  {
    Self {
      description: description.into(),
      run: Arc::new(run),
    }
  }

  /// Re-walk the live tree.
  pub fn run(&self) -> QueryResult {
    (self.run)()
  }

  /// Human-readable summary, for logs.
  pub fn description(&self) -> &str {
    &self.description
  }
}

impl fmt::Debug for Query {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Query")
      .field("description", &self.description)
      .finish_non_exhaustive()
  }
}

/// Single-slot registry of the most recently executed query.
#[derive(Debug, Default)]
pub struct LastQuery {
  slot: Mutex<Option<Query>>,
}

impl LastQuery {
  /// Replace the stored query.
  pub fn set(&self, query: Query) {
    *self.slot.lock() = Some(query);
  }

  /// The stored query, if any.
  pub fn get(&self) -> Option<Query> {
    self.slot.lock().clone()
  }

  /// Re-run the stored query. The slot lock is released before running.
  pub fn rerun(&self) -> Option<QueryResult> {
    let query = self.get()?;
    Some(query.run())
  }
}

/// First descendant of `scope` matching `matcher`, in document order.
/// Without a match, the absent sentinel.
pub fn find_one(document: &Document, scope: NodeId, matcher: Matcher) -> SemanticNode {
  let query = build(document, scope, matcher, Cardinality::One);
  document.last_query().set(query.clone());
  match query.run() {
    QueryResult::Single(node) => node,
    QueryResult::List(nodes) => nodes
      .into_iter()
      .next()
      .unwrap_or_else(|| SemanticNode::absent(document)),
  }
}

/// Every descendant of `scope` matching `matcher`, in document order.
pub fn find_all(document: &Document, scope: NodeId, matcher: Matcher) -> Vec<SemanticNode> {
  let query = build(document, scope, matcher, Cardinality::All);
  document.last_query().set(query.clone());
  match query.run() {
    QueryResult::Single(node) => node.node_id().map(|_| node).into_iter().collect(),
    QueryResult::List(nodes) => nodes,
  }
}

fn build(document: &Document, scope: NodeId, matcher: Matcher, cardinality: Cardinality) -> Query {
  let description = match cardinality {
    Cardinality::One => format!("one by {matcher} in {scope}"),
    Cardinality::All => format!("all by {matcher} in {scope}"),
  };
  let weak: WeakDocument = document.downgrade();

  Query::new(description, move || {
    let Some(document) = weak.upgrade() else {
      return QueryResult::List(Vec::new());
    };
    let ids = resolve(&document, scope, &matcher, cardinality);
    match cardinality {
      Cardinality::One => QueryResult::Single(SemanticNode::from_parts(&document, ids.first().copied())),
      Cardinality::All => QueryResult::List(ids.into_iter().map(|id| SemanticNode::present(&document, id)).collect()),
    }
  })
}

fn resolve(document: &Document, scope: NodeId, matcher: &Matcher, cardinality: Cardinality) -> Vec<NodeId> {
  let selector = matcher.selector();

  let ids: Vec<NodeId> = document.read(|s| {
    let mut matched = s
      .query_all(scope, &selector)
      .into_iter()
      .filter(|&id| matcher.matches(&s.view(id)));

    let hits: Vec<NodeId> = match cardinality {
      Cardinality::One => matched.next().into_iter().collect(),
      Cardinality::All => matched.collect(),
    };

    // Label queries resolve the control the label is for.
    if *matcher.kind() == MatcherKind::Label {
      hits.into_iter().filter_map(|label| s.label_control(label)).collect()
    } else {
      hits
    }
  });

  log::debug!("Query {matcher} in {scope}: {} match(es)", ids.len());
  ids
}
