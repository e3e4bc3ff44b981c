/*!
Event listeners and synchronous dispatch.

Dispatch computes the propagation path up front (target, then ancestors for
bubbling kinds), then calls listeners one node at a time. No lock is held
while a listener runs, so listeners are free to mutate the document.
*/

use super::Document;
use crate::types::{DomEvent, EventKind, ListenerId, NodeId, SemanticError, SemanticResult};
use std::sync::Arc;

/// Callback invoked for every event reaching the node it was registered on.
pub type Listener = Arc<dyn Fn(&Document, &DomEvent) + Send + Sync>;

struct Registration {
  id: ListenerId,
  node: NodeId,
  kind: EventKind,
  listener: Listener,
}

#[derive(Default)]
pub(crate) struct Listeners {
  registrations: Vec<Registration>,
}

impl Listeners {
  fn add(&mut self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId {
    let id = ListenerId::next();
    self.registrations.push(Registration {
      id,
      node,
      kind,
      listener,
    });
    id
  }

  fn remove(&mut self, id: ListenerId) -> bool {
    let before = self.registrations.len();
    self.registrations.retain(|r| r.id != id);
    self.registrations.len() != before
  }

  /// Listeners for `node` and `kind`, in registration order.
  fn matching(&self, node: NodeId, kind: EventKind) -> Vec<Listener> {
    self
      .registrations
      .iter()
      .filter(|r| r.node == node && r.kind == kind)
      .map(|r| Arc::clone(&r.listener))
      .collect()
  }
}

impl Document {
  /// Register `listener` for `kind` events reaching `node`.
  pub fn add_event_listener<F>(&self, node: NodeId, kind: EventKind, listener: F) -> ListenerId
  where
    F: Fn(&Document, &DomEvent) + Send + Sync + 'static,
  {
    self.shared.listeners.write().add(node, kind, Arc::new(listener))
  }

  /// Returns false if the listener was already removed.
  pub fn remove_event_listener(&self, id: ListenerId) -> bool {
    self.shared.listeners.write().remove(id)
  }

  /// Number of registered listeners, attached or not.
  pub fn listener_count(&self) -> usize {
    self.shared.listeners.read().registrations.len()
  }

  /// Drop listeners registered on nodes no longer attached to the body.
  /// Returns how many were dropped.
  pub(crate) fn prune_listeners(&self) -> usize {
    let mut listeners = self.shared.listeners.write();
    let before = listeners.registrations.len();
    self.read(|s| listeners.registrations.retain(|r| s.contains(r.node)));
    before - listeners.registrations.len()
  }

  /// Dispatch a synthetic event at `target`.
  ///
  /// - The target must be attached, otherwise `StaleReference`.
  /// - Pointer events on a disabled form control are swallowed.
  /// - With `value`, the control's current value is set before dispatch.
  pub fn dispatch_event(
    &self,
    target: NodeId,
    kind: EventKind,
    value: Option<&str>,
  ) -> SemanticResult<()> {
    let (path, swallowed) = self.read(|s| {
      if s.node(target).is_none() {
        return Err(SemanticError::UnknownNode(target));
      }
      if !s.contains(target) {
        return Err(SemanticError::StaleReference {
          operation: kind.name(),
          node: target,
        });
      }
      let path = if kind.bubbles() {
        s.path(target)
      } else {
        vec![target]
      };
      Ok((path, kind.is_pointer() && s.is_disabled_control(target)))
    })?;

    if swallowed {
      log::warn!("Ignoring {kind} on disabled control {target}");
      return Ok(());
    }

    if let Some(value) = value {
      self.write(|s| s.set_value(target, value))?;
    }

    log::debug!("Dispatching {kind} on {target}");

    for current_target in path {
      let listeners = self.shared.listeners.read().matching(current_target, kind);
      if listeners.is_empty() {
        continue;
      }
      let event = DomEvent {
        kind,
        target,
        current_target,
        value: value.map(str::to_owned),
      };
      for listener in listeners {
        listener(self, &event);
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::dom::Document;
  use crate::types::{EventKind, SemanticError};
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[test]
  fn test_bubbles_from_target_to_ancestors() {
    let document = Document::new();
    let nodes = document
      .set_inner_markup(document.body(), "<div><button>go</button></div>")
      .unwrap();
    let div = nodes[0];
    let button = document.children(div)[0];

    let seen = Arc::new(Mutex::new(Vec::new()));
    for node in [button, div, document.body()] {
      let seen = Arc::clone(&seen);
      document.add_event_listener(node, EventKind::Click, move |_, event| {
        seen.lock().push((event.current_target, event.target));
      });
    }

    document.dispatch_event(button, EventKind::Click, None).unwrap();
    assert_eq!(
      *seen.lock(),
      vec![(button, button), (div, button), (document.body(), button)]
    );
  }

  #[test]
  fn test_focus_does_not_bubble() {
    let document = Document::new();
    let input = document
      .set_inner_markup(document.body(), "<input>")
      .unwrap()[0];

    let count = Arc::new(Mutex::new(0));
    let body_count = Arc::clone(&count);
    document.add_event_listener(document.body(), EventKind::Focus, move |_, _| {
      *body_count.lock() += 1;
    });

    document.dispatch_event(input, EventKind::Focus, None).unwrap();
    assert_eq!(*count.lock(), 0);
  }

  #[test]
  fn test_disabled_control_swallows_clicks() {
    let document = Document::new();
    let button = document
      .set_inner_markup(document.body(), "<button disabled>no</button>")
      .unwrap()[0];

    let clicked = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&clicked);
    document.add_event_listener(button, EventKind::Click, move |_, _| *flag.lock() = true);

    document.dispatch_event(button, EventKind::Click, None).unwrap();
    assert!(!*clicked.lock());
  }

  #[test]
  fn test_value_is_set_before_listeners_run() {
    let document = Document::new();
    let input = document
      .set_inner_markup(document.body(), "<input value=old>")
      .unwrap()[0];

    let observed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&observed);
    document.add_event_listener(input, EventKind::Input, move |doc, event| {
      *slot.lock() = doc.value(event.target);
    });

    document
      .dispatch_event(input, EventKind::Input, Some("new"))
      .unwrap();
    assert_eq!(observed.lock().as_deref(), Some("new"));
  }

  #[test]
  fn test_detached_target_is_stale() {
    let document = Document::new();
    let div = document
      .set_inner_markup(document.body(), "<div></div>")
      .unwrap()[0];
    document.remove(div).unwrap();

    assert!(matches!(
      document.dispatch_event(div, EventKind::Click, None),
      Err(SemanticError::StaleReference { node, .. }) if node == div
    ));
  }

  #[test]
  fn test_listener_can_mutate_and_be_removed() {
    let document = Document::new();
    let nodes = document
      .set_inner_markup(document.body(), "<button>+</button><span>10</span>")
      .unwrap();
    let (button, span) = (nodes[0], nodes[1]);

    let id = document.add_event_listener(button, EventKind::Click, move |doc, _| {
      doc.set_text_content(span, "11").unwrap();
    });
    document.dispatch_event(button, EventKind::Click, None).unwrap();
    assert_eq!(document.text_content(span), "11");

    assert!(document.remove_event_listener(id));
    assert!(!document.remove_event_listener(id));
  }

  #[test]
  fn test_prune_drops_detached_listeners() {
    let document = Document::new();
    let nodes = document
      .set_inner_markup(document.body(), "<div><button>x</button></div><p>kept</p>")
      .unwrap();
    let button = document.children(nodes[0])[0];
    document.add_event_listener(button, EventKind::Click, |_, _| {});
    document.add_event_listener(nodes[1], EventKind::Click, |_, _| {});
    document.add_event_listener(document.body(), EventKind::Click, |_, _| {});

    assert_eq!(document.prune_listeners(), 0);
    document.remove(nodes[0]).unwrap();
    assert_eq!(document.prune_listeners(), 1);
    assert_eq!(document.listener_count(), 2);
  }

  #[test]
  fn test_disabled_fieldset_swallows_clicks() {
    let document = Document::new();
    let nodes = document
      .set_inner_markup(
        document.body(),
        "<fieldset disabled><div><button>no</button></div></fieldset>",
      )
      .unwrap();
    let button = document.query_selector_all(nodes[0], "button").unwrap()[0];

    let clicked = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&clicked);
    document.add_event_listener(button, EventKind::Click, move |_, _| *flag.lock() = true);

    document.dispatch_event(button, EventKind::Click, None).unwrap();
    assert!(!*clicked.lock());
    assert!(document.is_disabled(button));
  }
}
