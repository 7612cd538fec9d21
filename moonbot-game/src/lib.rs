//! Moonbot game core
//!
//! Platform-agnostic logic for synthesizing plausible mini-game play traces
//! and packing them into the opaque payload the remote service accepts.
//! No I/O, no async, no clocks: the runner crate supplies randomness and
//! wall-clock time so everything here stays deterministic under test.

pub mod budget;
pub mod catalog;
pub mod payload;
pub mod trace;

// Re-export commonly used types
pub use budget::TicketBudget;
pub use catalog::{ItemCatalog, ItemDefinition, ItemKind};
pub use payload::{PayloadError, decode, encode, serialize};
pub use trace::{DEFAULT_WINDOW_MS, GameEvent, GameTrace, TraceError, generate};
