//! ragdb-vector
//!
//! Exact cosine-similarity vector index with pluggable storage backends,
//! directory persistence and a reader/writer-locked shared handle.
pub mod backend;
pub mod builder;
pub mod index;
pub mod persist;
pub mod store;

pub use backend::{native_available, resolve_backend, BackendKind, VectorBackend};
pub use builder::IndexBuilder;
pub use index::VectorIndex;
pub use persist::{read_manifest, read_metadata, Manifest, PersistenceError, MANIFEST_FILE, METADATA_FILE};
pub use store::SharedIndex;
