//! Draft/produce engine for immutable snapshots with cycle support.
//!
//! `chisel-state` lets a caller describe an update to an immutable
//! [`Snapshot`] with ordinary mutation calls against a temporary [`Draft`]
//! view, then yields a new immutable snapshot reflecting those mutations.
//! The original snapshot is never touched, including when it contains
//! circular references, which snapshots represent natively through their
//! arena-backed value graph.
//!
//! # Core Concepts
//!
//! - **Snapshot**: an immutable value graph; frozen by construction
//! - **Draft**: a mutable view over a private working copy, alive for one
//!   [`produce`] call
//! - **Recipe**: a caller-supplied procedure that mutates the draft
//! - **Finalize**: converting the mutated working copy into a fresh frozen
//!   snapshot, preserving cycles and shared nodes
//!
//! # Quick Start
//!
//! ```
//! use chisel_state::{produce, Snapshot};
//! use serde_json::json;
//!
//! let state = Snapshot::from_value(&json!({"count": 0, "tags": []}));
//!
//! let next = produce(&state, |d| {
//!     d.increment("count", 1)?;
//!     d.get_draft("tags")?.push("fresh")
//! })
//! .unwrap();
//!
//! assert_eq!(next.to_value().unwrap(), json!({"count": 1, "tags": ["fresh"]}));
//! // The original is unchanged.
//! assert_eq!(state.to_value().unwrap(), json!({"count": 0, "tags": []}));
//! ```
//!
//! # Cycles
//!
//! Aliasing one draft into another builds shared nodes and cycles, which
//! survive finalization:
//!
//! ```
//! use chisel_state::{produce, Snapshot};
//! use serde_json::json;
//!
//! let state = Snapshot::from_value(&json!({"data": {"name": "x"}}));
//! let next = produce(&state, |d| {
//!     let data = d.get_draft("data")?;
//!     data.set("name", "y")?;
//!     data.set("self", &data)
//! })
//! .unwrap();
//!
//! let data = next.root().get("data").unwrap();
//! assert_eq!(data.get("name").unwrap().as_str(), Some("y"));
//! assert!(data.get("self").unwrap().ptr_eq(&data));
//! ```
//!
//! # Batching and sharding
//!
//! [`batch_produce`] runs an ordered list of recipes against one draft with
//! a single clone and a single finalize. [`produce_sharded`] consumes an
//! external [`Sharder`] collaborator and applies `produce` once per chunk.

mod clone;
mod draft;
mod error;
mod finalize;
mod path;
mod produce;
mod shard;
mod snapshot;
mod value;

pub use draft::{Draft, DraftSource, DraftValue};
pub use error::{StateError, StateResult};
pub use path::{Path, Seg};
pub use produce::{batch_produce, produce, produce_with_report, RecipeFn};
pub use shard::{produce_sharded, KeySharder, Sharder};
pub use snapshot::{Snapshot, SnapshotRef};
pub use value::{value_type_name, Number, Scalar};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
