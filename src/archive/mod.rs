//! Archive materialization: downloading resolved assets into a single gzipped tar and storing it
//! in the object store under its content-address key.

mod builder;
mod object_store;

pub use builder::{build, Archive};
pub use object_store::{ArchiveMetadata, ObjectStore};
