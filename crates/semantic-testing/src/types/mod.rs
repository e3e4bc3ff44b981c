/*! Core types shared by the document, the query engine and the waits. */

#![allow(missing_docs)]

mod error;
mod event;
mod ids;
mod mutation;
mod snapshot;

pub use error::{SemanticError, SemanticResult};
pub use event::{DomEvent, EventKind};
pub use ids::{ListenerId, NodeId};
pub use mutation::{MutationBatch, MutationKind, MutationRecord};
pub use snapshot::{NodeSnapshot, TreeFormat};
