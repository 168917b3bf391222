//! Model artifacts and their storage
//!
//! - `artifact`: the fitted forest bundled with its category encoders
//! - `serializer`: checksummed binary encoding of artifacts
//! - `registry`: keyed, atomically published artifact storage

mod artifact;
mod registry;
mod serializer;

pub use artifact::{ArtifactMetadata, ModelArtifact};
pub use registry::{
    ArtifactHandle, ArtifactKey, ArtifactStore, FsArtifactStore, MemoryArtifactStore, META_FILE,
    MODEL_FILE,
};
pub use serializer::{from_bytes, to_bytes};

pub(crate) use registry::AtomicFile;
