/*!
Mutation observation - futures that resolve when the tree changes.

## Lifecycle

```text
created ──subscribe──▶ Subscribed ──matching batch / closed / cancel──▶ Settled
```

- A wait subscribes to the document's mutation channel when it is created,
  so batches delivered before the first poll are buffered, not missed.
- It unsubscribes exactly once: when it settles, is cancelled, hits its
  deadline, or is dropped. `Document::active_subscriptions` reflects this.
- Waits never reject. Without a deadline they wait as long as it takes;
  `Document::cleanup` closes the channel and pending waits resolve `None`.

## Usage

```
use semantic_testing::prelude::*;

# #[tokio::main(flavor = "current_thread")]
# async fn main() -> Result<(), SemanticError> {

let document = Document::new();
let app = document.mount(r#"<button>+</button><span data-test="count">1</span>"#)?;
let count = app.get_by_data_test("count");

let changed = count.will_change();
document.set_text_content(count.raw_node().unwrap(), "2")?;

let count = changed.await.unwrap();
assert_eq!(count.text()?, "2");
assert_eq!(document.active_subscriptions(), 0);
# Ok(())
# }
```
*/

use crate::dom::Document;
use crate::node::SemanticNode;
use crate::query::QueryResult;
use crate::types::{MutationBatch, NodeId, SemanticError, SemanticResult};
use async_broadcast::{Receiver, RecvError, TryRecvError};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

/// What a wait is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
  /// A batch touching this node or its subtree.
  Change(NodeId),
  /// Any batch; resolved by re-running the last query.
  Render,
  /// A batch removing exactly this node.
  Disappear(NodeId),
  /// Waiting on an absent node. Settles immediately to `None`.
  Unresolvable(&'static str),
}

impl Trigger {
  const fn operation(self) -> &'static str {
    match self {
      Self::Change(_) => "will_change",
      Self::Render => "will_render",
      Self::Disappear(_) => "will_disappear",
      Self::Unresolvable(operation) => operation,
    }
  }

  fn is_satisfied_by(self, batch: &MutationBatch) -> bool {
    match self {
      Self::Change(node) => batch.touches(node),
      Self::Render => !batch.is_empty(),
      Self::Disappear(node) => batch.removed(node),
      Self::Unresolvable(_) => false,
    }
  }
}

enum WaitState {
  Subscribed(Receiver<MutationBatch>),
  Settled,
}

enum Step {
  Continue,
  Done(Option<SemanticNode>),
}

/// A pending mutation wait. Await it, poll it with `try_settle`, bound it
/// with `with_deadline`, or `cancel` it.
#[must_use = "a wait does nothing unless awaited"]
pub struct MutationWait {
  document: Document,
  trigger: Trigger,
  state: WaitState,
}

impl std::fmt::Debug for MutationWait {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MutationWait")
      .field("trigger", &self.trigger)
      .field("settled", &self.is_settled())
      .finish_non_exhaustive()
  }
}

impl MutationWait {
  pub(crate) fn new(document: &Document, trigger: Trigger) -> Self {
    let state = if let Trigger::Unresolvable(operation) = trigger {
      log::warn!("{operation} on a node that was not found; resolving to None");
      WaitState::Settled
    } else {
      log::debug!("{}: subscribed", trigger.operation());
      WaitState::Subscribed(document.subscribe_mutations())
    };

    Self {
      document: document.clone(),
      trigger,
      state,
    }
  }

  /// Settled, cancelled or timed out.
  pub const fn is_settled(&self) -> bool {
    matches!(self.state, WaitState::Settled)
  }

  /// Unsubscribe without resolving. Later polls yield `None`.
  pub fn cancel(&mut self) {
    if !self.is_settled() {
      log::debug!("{}: cancelled", self.trigger.operation());
      self.unsubscribe();
    }
  }

  /// Wait for a matching batch.
  pub async fn settle(&mut self) -> Option<SemanticNode> {
    loop {
      let WaitState::Subscribed(receiver) = &mut self.state else {
        return None;
      };
      let step = match receiver.recv().await {
        Ok(batch) => self.on_batch(&batch),
        Err(RecvError::Overflowed(missed)) => self.on_overflow(missed),
        Err(RecvError::Closed) => self.on_closed(),
      };
      if let Step::Done(result) = step {
        return result;
      }
    }
  }

  /// Drain already-delivered batches without blocking.
  pub fn try_settle(&mut self) -> Poll<Option<SemanticNode>> {
    loop {
      let WaitState::Subscribed(receiver) = &mut self.state else {
        return Poll::Ready(None);
      };
      let step = match receiver.try_recv() {
        Ok(batch) => self.on_batch(&batch),
        Err(TryRecvError::Empty) => return Poll::Pending,
        Err(TryRecvError::Overflowed(missed)) => self.on_overflow(missed),
        Err(TryRecvError::Closed) => self.on_closed(),
      };
      if let Step::Done(result) = step {
        return Poll::Ready(result);
      }
    }
  }

  /// Like awaiting the wait, but gives up after `deadline` with
  /// `DeadlineElapsed`. Needs a tokio runtime with the time driver.
  pub async fn with_deadline(mut self, deadline: Duration) -> SemanticResult<Option<SemanticNode>> {
    if let Ok(result) = tokio::time::timeout(deadline, self.settle()).await {
      Ok(result)
    } else {
      let operation = self.trigger.operation();
      log::debug!("{operation}: deadline of {deadline:?} elapsed");
      self.cancel();
      Err(SemanticError::DeadlineElapsed {
        operation,
        deadline,
      })
    }
  }

  fn on_batch(&mut self, batch: &MutationBatch) -> Step {
    if self.trigger.is_satisfied_by(batch) {
      Step::Done(self.finish())
    } else {
      Step::Continue
    }
  }

  fn on_overflow(&mut self, missed: u64) -> Step {
    log::warn!(
      "{}: fell behind, {missed} mutation batch(es) dropped",
      self.trigger.operation()
    );
    // Something changed, which is all a render wait needs to know.
    if self.trigger == Trigger::Render {
      Step::Done(self.finish())
    } else {
      Step::Continue
    }
  }

  fn on_closed(&mut self) -> Step {
    log::debug!("{}: subscription closed", self.trigger.operation());
    self.unsubscribe();
    Step::Done(None)
  }

  /// Unsubscribe, then derive the resolved node.
  fn finish(&mut self) -> Option<SemanticNode> {
    self.unsubscribe();
    log::debug!("{}: settled", self.trigger.operation());

    match self.trigger {
      Trigger::Change(node) | Trigger::Disappear(node) => Some(SemanticNode::present(&self.document, node)),
      Trigger::Render => self
        .document
        .last_query()
        .rerun()
        .and_then(QueryResult::first),
      Trigger::Unresolvable(_) => None,
    }
  }

  fn unsubscribe(&mut self) {
    // Dropping the receiver is the unsubscription.
    self.state = WaitState::Settled;
  }
}

impl IntoFuture for MutationWait {
  type Output = Option<SemanticNode>;
  type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

  fn into_future(mut self) -> Self::IntoFuture {
    Box::pin(async move { self.settle().await })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::compose;
  use crate::node::{Helpers, Mutations, Queries};
  use crate::query::find_one;
  use crate::matchers::{Matcher, MatcherKind};

  fn document_with(markup: &str) -> (Document, Vec<NodeId>) {
    let document = Document::new();
    let nodes = document.set_inner_markup(document.body(), markup).unwrap();
    (document, nodes)
  }

  #[tokio::test]
  async fn will_change_resolves_once_after_touching_batch() {
    let (document, nodes) = document_with("<p>a</p><p>b</p>");
    let (first, second) = (nodes[0], nodes[1]);
    let mut wait = compose(&document, first).will_change();
    assert_eq!(document.active_subscriptions(), 1);

    document.set_text_content(second, "B").unwrap();
    assert!(wait.try_settle().is_pending());

    document.set_attribute(first, "class", "x").unwrap();
    let resolved = wait.settle().await.unwrap();
    assert_eq!(resolved.raw_node(), Some(first));
    assert!(wait.is_settled());
    assert_eq!(document.active_subscriptions(), 0);

    // Settled waits stay settled.
    document.set_attribute(first, "class", "y").unwrap();
    assert!(wait.settle().await.is_none());
  }

  #[tokio::test]
  async fn will_change_sees_descendant_mutations() {
    let (document, nodes) = document_with("<div><ul><li>1</li></ul></div>");
    let wait = compose(&document, nodes[0]).will_change();

    let li = document.query_selector_all(nodes[0], "li").unwrap()[0];
    document.set_text_content(li, "2").unwrap();

    let div = wait.await.unwrap();
    assert_eq!(div.text().unwrap(), "2");
  }

  #[tokio::test]
  async fn will_disappear_only_for_the_exact_node() {
    let (document, nodes) = document_with("<p>stay</p><p>go</p>");
    let (sibling, target) = (nodes[0], nodes[1]);
    let mut wait = compose(&document, target).will_disappear();

    document.remove(sibling).unwrap();
    assert!(wait.try_settle().is_pending());

    document.remove(target).unwrap();
    let gone = wait.await.unwrap();
    assert!(!gone.is_rendered());
    assert_eq!(gone.text().unwrap(), "go");
  }

  #[tokio::test]
  async fn will_disappear_ignores_ancestor_removal() {
    let (document, nodes) = document_with("<div><span>inner</span></div>");
    let span = document.children(nodes[0])[0];
    let mut wait = compose(&document, span).will_disappear();

    document.remove(nodes[0]).unwrap();
    assert!(wait.try_settle().is_pending());
    wait.cancel();
    assert_eq!(document.active_subscriptions(), 0);
  }

  #[tokio::test]
  async fn will_render_reruns_the_last_query() {
    let document = Document::new();
    let app = document.mount("<span data-test=total>1</span>").unwrap();
    let before = app.get_by_data_test("total");

    let wait = before.will_render();
    document
      .set_inner_markup(app.root(), "<span data-test=total>2</span>")
      .unwrap();

    let after = wait.await.unwrap();
    assert_ne!(after.raw_node(), before.raw_node());
    assert_eq!(after.text().unwrap(), "2");
  }

  #[tokio::test]
  async fn will_render_waits_for_something_to_appear() {
    let document = Document::new();
    let app = document.mount("<div></div>").unwrap();
    let missing = app.get_by_role("alert");
    assert_eq!(missing.raw_node(), None);

    let wait = missing.will_render();
    document
      .set_inner_markup(app.root(), r#"<p role="alert">Saved</p>"#)
      .unwrap();
    assert_eq!(wait.await.unwrap().text().unwrap(), "Saved");
  }

  #[tokio::test]
  async fn will_render_without_a_match_is_none() {
    let (document, nodes) = document_with("<p>x</p>");
    find_one(&document, document.body(), Matcher::new(MatcherKind::Role, "dialog"));
    let wait = compose(&document, nodes[0]).will_render();
    document.set_text_content(nodes[0], "y").unwrap();
    assert!(wait.await.is_none());
  }

  #[tokio::test]
  async fn cleanup_resolves_pending_waits_to_none() {
    let (document, nodes) = document_with("<p>x</p>");
    let wait = compose(&document, nodes[0]).will_change();
    let render = compose(&document, nodes[0]).will_render();
    assert_eq!(document.active_subscriptions(), 2);

    document.cleanup();
    assert_eq!(document.active_subscriptions(), 0);
    assert!(wait.await.is_none());
    assert!(render.await.is_none());
  }

  #[tokio::test]
  async fn deadline_elapses_and_unsubscribes() {
    let (document, nodes) = document_with("<p>x</p>");
    let wait = compose(&document, nodes[0]).will_disappear();

    let result = wait.with_deadline(Duration::from_millis(10)).await;
    assert!(matches!(
      result,
      Err(SemanticError::DeadlineElapsed { operation: "will_disappear", .. })
    ));
    assert_eq!(document.active_subscriptions(), 0);
  }

  #[tokio::test]
  async fn deadline_not_needed_when_already_delivered() {
    let (document, nodes) = document_with("<p>x</p>");
    let wait = compose(&document, nodes[0]).will_change();
    document.set_text_content(nodes[0], "y").unwrap();

    let node = wait
      .with_deadline(Duration::from_secs(5))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(node.text().unwrap(), "y");
  }

  #[tokio::test]
  async fn absent_nodes_resolve_immediately() {
    let document = Document::new();
    let absent = SemanticNode::absent(&document);
    let wait = absent.will_change();
    assert!(wait.is_settled());
    assert_eq!(document.active_subscriptions(), 0);
    assert!(wait.await.is_none());
    assert!(absent.will_disappear().await.is_none());
  }

  #[test]
  fn dropping_a_wait_unsubscribes() {
    let (document, nodes) = document_with("<p>x</p>");
    let wait = compose(&document, nodes[0]).will_change();
    assert_eq!(document.active_subscriptions(), 1);
    drop(wait);
    assert_eq!(document.active_subscriptions(), 0);
  }

  #[test]
  fn overflow_skips_to_newer_batches() {
    let document = Document::builder().mutation_channel_capacity(1).build();
    let nodes = document
      .set_inner_markup(document.body(), "<p>a</p><p>b</p>")
      .unwrap();
    let mut wait = compose(&document, nodes[0]).will_change();

    document.set_text_content(nodes[1], "B").unwrap();
    document.set_text_content(nodes[0], "A").unwrap();

    match wait.try_settle() {
      Poll::Ready(Some(node)) => assert_eq!(node.raw_node(), Some(nodes[0])),
      other => panic!("expected the newest batch to resolve the wait, got {other:?}"),
    }
  }
}
