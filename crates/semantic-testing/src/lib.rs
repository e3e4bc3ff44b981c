/*!
Semantic Testing - query a rendered UI tree the way a user sees it.

Locate nodes by visible text, label, role, data markers or current value
instead of structural selectors, interact with them through synthetic events,
and await future tree changes without polling.

```
use semantic_testing::prelude::*;

let document = Document::new();
let app = document.mount(r#"
  <label for="name">Name</label><input id="name">
  <button data-test="save" disabled>Save</button>
"#)?;

let name = app.get_by_label_text("name");
name.input("Ada")?;
assert_eq!(name.value()?.as_deref(), Some("Ada"));

let save = app.get_by_data_test("save");
assert!(save.is_disabled()?);

// Nothing matched: the node is absent, and using it says so.
let missing = app.get_by_role("dialog");
assert!(!missing.is_rendered());
assert!(matches!(missing.click(), Err(SemanticError::NotFound { .. })));

app.unmount()?;
assert!(matches!(app.unmount(), Err(SemanticError::AlreadyUnmounted(_))));
# Ok::<(), SemanticError>(())
```

Waiting for changes (see [`MutationWait`]):

```ignore
let count = app.get_by_data_test("count");
let changed = count.will_change();   // subscribes now
app.get_by_text("+").click()?;       // mutation is buffered
let count = changed.await.unwrap();  // resolves with the same node
```
*/

mod config;
mod dom;
mod matchers;
mod mount;
mod node;
mod observation;
mod query;

mod types;
pub use types::*;

pub use crate::config::Config;
pub use crate::dom::{AttributeSelector, Document, DocumentBuilder, Listener, Selector};
pub use crate::matchers::{Candidate, Matcher, MatcherKind, TextMatcher};
pub use crate::mount::{Markup, RenderFn, Renderer};
pub use crate::node::{
  compose, ComposedNode, Events, Helpers, MountedNode, Mutations, NodeHandle, Queries,
  SemanticNode,
};
pub use crate::observation::MutationWait;
pub use crate::query::{find_all, find_one, LastQuery, Query, QueryResult};

/// Everything a test usually needs, capability traits included.
pub mod prelude {
  pub use crate::{
    ComposedNode, Document, Events, Helpers, MountedNode, Mutations, NodeHandle, Queries, SemanticError,
    SemanticNode, SemanticResult, TextMatcher,
  };
}
