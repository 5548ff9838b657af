//! Core types and collaborator traits for the Delve simulation engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Delve workspace:
//! grid positions and directions, entity identifiers, and the
//! fire-and-forget collaborator traits (event sink, audio sink,
//! world observer) through which the core talks to the outside.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod id;
pub mod position;
pub mod sink;

pub use id::EntityId;
pub use position::{Direction, Position};
pub use sink::{AudioSink, CountingObserver, EventSink, NullSink, WorldObserver};
