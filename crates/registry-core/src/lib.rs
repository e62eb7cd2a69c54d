//! Domain types and pure logic for the plugin registry: the static plugin catalogue, the
//! version resolver, the batch request/response hashing, and the records persisted by the
//! index. Nothing in this crate talks to a database, an object store, or the network — that
//! lives in the binary crate, which depends on this one for its domain types.

#[macro_use]
extern crate derive_more;

pub mod batch;
pub mod checksum;
pub mod descriptor;
pub mod records;
pub mod resolver;

pub use batch::{BatchRequest, BatchRequestPlugin, BatchResponse, BatchResponsePlugin};
pub use checksum::Checksum;
pub use descriptor::PluginDescriptor;
pub use records::{AssetRecord, PluginRecord, PluginView, ReleaseRecord};
