/*!
Configuration for a document session.

All values have sensible defaults. Create a custom config to override:

```
use semantic_testing::{Config, Document};

let document = Document::builder()
  .mutation_channel_capacity(64)
  .tree_indent(4)
  .build();

assert_eq!(document.config().tree_indent, 4);
assert_eq!(Config::default().mutation_channel_capacity, 1024);
```
*/

/// Document configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Capacity of the mutation broadcast channel.
  /// A wait that falls further behind than this loses the oldest batches.
  /// Default: 1024 batches.
  pub mutation_channel_capacity: usize,

  /// Spaces per nesting level in markup tree dumps.
  /// Default: 2.
  pub tree_indent: usize,

  /// Maximum depth printed by `log_tree`. None = whole subtree.
  /// Default: None.
  pub log_tree_max_depth: Option<usize>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      mutation_channel_capacity: 1024,
      tree_indent: 2,
      log_tree_max_depth: None,
    }
  }
}

impl Config {
  /// Create a new config with default values.
  pub fn new() -> Self {
    Self::default()
  }
}
