//! Checkpoint persistence: resumable state for partial `get_data_code` and
//! `get_data_layer` calls.
//!
//! A checkpoint is only ever taken when a call ends with a non-empty
//! partial result that the caller can resume from, and it is only ever
//! resumed when the caller's query and the client's current configuration
//! match exactly what produced it (see [`codec::check_fingerprint`]).

mod codec;
mod manager;
mod state;
mod store;

pub use manager::{AsyncCheckpointManager, CheckpointManager, DataLayerResume};
pub use state::CheckpointState;
pub use store::{AsyncCheckpointStore, BlockingStoreAdapter, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
