//! Backends, decorators, and the registry that builds storage graphs from
//! configuration. [`tilestore_core`] supplies the data model this crate
//! operates on.

pub mod backends;
mod collaborators;
pub mod handle;
mod registry;
mod storage;

pub use collaborators::{DecodedImage, ExpiryService, GrayscaleAlphaCodec, ImageCodec, InMemoryExpiryService};
pub use handle::{Handle, NullHandle, OverlayHandle, OwnedHandle, null_handle};
pub use registry::{RuntimeContext, StorageRegistry};
pub use storage::Storage;
