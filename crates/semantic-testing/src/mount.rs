/*!
Mount harness - the contract with whatever renders into the document.

`Document::mount` attaches a fresh `<div>` root under the body and asks a
`Renderer` to fill it. `unmount` runs the renderer's teardown hook and detaches
the root. `cleanup` does that for every root still mounted and closes all
pending mutation subscriptions, leaving the document ready for the next test.
*/

use crate::dom::Document;
use crate::node::MountedNode;
use crate::types::{NodeId, SemanticError, SemanticResult};
use std::sync::Arc;

/// Something that can render into a mount root.
pub trait Renderer: Send + Sync + 'static {
  /// Populate `root`. The root is already attached.
  fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()>;

  /// Release whatever `render` set up. Called before the root is detached.
  fn teardown(&self, _document: &Document, _root: NodeId) -> SemanticResult<()> {
    Ok(())
  }
}

/// Static markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(pub String);

impl Renderer for Markup {
  fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()> {
    document.set_inner_markup(root, &self.0).map(drop)
  }
}

impl Renderer for &'static str {
  fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()> {
    document.set_inner_markup(root, self).map(drop)
  }
}

impl Renderer for String {
  fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()> {
    document.set_inner_markup(root, self).map(drop)
  }
}

/// A closure renderer with no teardown.
pub struct RenderFn<F>(pub F);

impl<F> Renderer for RenderFn<F>
where
  F: Fn(&Document, NodeId) -> SemanticResult<()> + Send + Sync + 'static,
{
  fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()> {
    (self.0)(document, root)
  }
}

impl<F> std::fmt::Debug for RenderFn<F> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RenderFn").finish_non_exhaustive()
  }
}

/// A root mounted through `Document::mount`.
pub(crate) struct MountRecord {
  root: NodeId,
  renderer: Arc<dyn Renderer>,
}

impl Document {
  /// Attach a new root under the body and render into it.
  ///
  /// If rendering fails the root is detached again and the error returned.
  pub fn mount(&self, renderer: impl Renderer) -> SemanticResult<MountedNode> {
    let renderer: Arc<dyn Renderer> = Arc::new(renderer);
    let root = self.create_element("div");
    self.append_child(self.body(), root)?;

    if let Err(e) = renderer.render(self, root) {
      log::warn!("Render into {root} failed: {e}");
      self.remove(root)?;
      return Err(e);
    }

    self.mounts().lock().push(MountRecord { root, renderer });
    log::debug!("Mounted root {root}");
    Ok(MountedNode::new(self, root))
  }

  /// Tear down and detach a root. `AlreadyUnmounted` if it is no longer
  /// attached.
  pub fn unmount(&self, root: NodeId) -> SemanticResult<()> {
    if !self.contains(root) {
      return Err(SemanticError::AlreadyUnmounted(root));
    }

    let renderer = self
      .mounts()
      .lock()
      .iter()
      .find(|record| record.root == root)
      .map(|record| Arc::clone(&record.renderer));
    if let Some(renderer) = renderer {
      renderer.teardown(self, root)?;
    }

    self.remove(root)?;
    self.mounts().lock().retain(|record| record.root != root);
    log::debug!("Unmounted root {root}");
    Ok(())
  }

  /// Roots mounted and not yet unmounted, in mount order.
  pub fn mounted_roots(&self) -> Vec<NodeId> {
    self.mounts().lock().iter().map(|record| record.root).collect()
  }

  /// Reset between tests: unmount every still-attached root, drop listeners
  /// left on detached nodes, then close all pending mutation subscriptions
  /// (their waits resolve `None`).
  pub fn cleanup(&self) {
    let records = std::mem::take(&mut *self.mounts().lock());

    for record in records {
      if !self.contains(record.root) {
        continue;
      }
      if let Err(e) = record.renderer.teardown(self, record.root) {
        log::warn!("Teardown of {} failed during cleanup: {e}", record.root);
      }
      if let Err(e) = self.remove(record.root) {
        log::warn!("Detaching {} failed during cleanup: {e}", record.root);
      }
    }

    let pruned = self.prune_listeners();
    if pruned > 0 {
      log::debug!("Dropped {pruned} listener(s) on detached nodes");
    }

    self.close_subscriptions();
    log::debug!("Document cleaned up");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::{Helpers, Queries};
  use crate::types::EventKind;
  use parking_lot::Mutex;

  struct Tracked {
    log: Arc<Mutex<Vec<String>>>,
  }

  impl Renderer for Tracked {
    fn render(&self, document: &Document, root: NodeId) -> SemanticResult<()> {
      self.log.lock().push(format!("render {root}"));
      document.set_inner_markup(root, "<p>tracked</p>").map(drop)
    }

    fn teardown(&self, _document: &Document, root: NodeId) -> SemanticResult<()> {
      self.log.lock().push(format!("teardown {root}"));
      Ok(())
    }
  }

  #[test]
  fn mount_attaches_a_root_under_body() {
    let document = Document::new();
    let app = document.mount(Markup("<p>hi</p>".into())).unwrap();
    assert_eq!(document.parent(app.root()), Some(document.body()));
    assert_eq!(app.tag_name().unwrap(), "div");
    assert_eq!(app.get_by_text("hi").text().unwrap(), "hi");
    assert_eq!(document.mounted_roots(), vec![app.root()]);
  }

  #[test]
  fn double_unmount_is_an_error() {
    let document = Document::new();
    let app = document.mount("<p>x</p>").unwrap();

    app.unmount().unwrap();
    assert!(!app.is_rendered());
    assert!(document.mounted_roots().is_empty());

    let err = app.unmount().unwrap_err();
    assert!(matches!(err, SemanticError::AlreadyUnmounted(root) if root == app.root()));
    assert_eq!(
      err.to_string(),
      format!("Cannot unmount a node that is not rendered: {}", app.root())
    );
  }

  #[test]
  fn unmount_calls_teardown_before_detaching() {
    let document = Document::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = document
      .mount(Tracked {
        log: Arc::clone(&log),
      })
      .unwrap();
    app.unmount().unwrap();

    let root = app.root();
    assert_eq!(
      *log.lock(),
      vec![format!("render {root}"), format!("teardown {root}")]
    );
  }

  #[test]
  fn failed_render_leaves_nothing_mounted() {
    let document = Document::new();
    let result = document.mount(String::from("<div>"));
    assert!(matches!(result, Err(SemanticError::InvalidMarkup { .. })));
    assert!(document.children(document.body()).is_empty());
    assert!(document.mounted_roots().is_empty());
  }

  #[test]
  fn cleanup_unmounts_everything() {
    let document = Document::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = document.mount("<p>1</p>").unwrap();
    let second = document
      .mount(Tracked {
        log: Arc::clone(&log),
      })
      .unwrap();
    let third = document
      .mount(RenderFn(|doc: &Document, root: NodeId| {
        doc.set_attribute(root, "id", "third")
      }))
      .unwrap();
    first.unmount().unwrap();

    document.cleanup();
    assert!(!second.is_rendered());
    assert!(!third.is_rendered());
    assert!(document.mounted_roots().is_empty());
    assert_eq!(log.lock().len(), 2);
  }

  #[test]
  fn cleanup_drops_listeners_on_unmounted_roots() {
    let document = Document::new();
    let app = document.mount("<button>+</button>").unwrap();
    let button = app.get_by_text("+").raw_node().unwrap();
    document.add_event_listener(button, EventKind::Click, |_, _| {});
    document.add_event_listener(app.root(), EventKind::Click, |_, _| {});
    document.add_event_listener(document.body(), EventKind::Click, |_, _| {});
    assert_eq!(document.listener_count(), 3);

    document.cleanup();
    assert_eq!(document.listener_count(), 1);
    document.dispatch_event(document.body(), EventKind::Click, None).unwrap();
  }
}
