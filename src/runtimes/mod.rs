//! Runtime infrastructure: checkpoint persistence and its storage backends.
//!
//! The workflow engine hands the merged conversation state to a
//! [`Checkpointer`] after every node execution. Backends:
//!
//! - [`InMemoryCheckpointer`]: volatile storage for tests and development
//! - [`SqliteCheckpointer`]: durable SQLite-backed persistence
//!
//! Persisted state uses the explicit versioned schema in [`persistence`].

pub mod checkpointer;
pub mod checkpointer_sqlite;
pub mod persistence;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
pub use checkpointer_sqlite::SqliteCheckpointer;
pub use persistence::{
    decode_state, encode_state, PersistedState, PersistenceError, STATE_SCHEMA_VERSION,
};
