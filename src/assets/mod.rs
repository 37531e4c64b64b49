//! # Asset Lifecycle
//!
//! Owns the binary data flowing through the pipeline and the single generated
//! asset offered to the viewer and the download control.
//!
//! - [`BinaryHandle`] - shared byte buffer tagged with a [`ContentKind`]
//! - [`ObjectUrlRegistry`] - process-scoped object URLs resolving to handles
//! - [`AssetSlot`] - the one live [`AssetReference`], revoking its predecessor
//! - [`download`] - saves the installed asset under its suggested filename

pub mod download;
pub mod handle;
pub mod registry;
pub mod slot;

pub use handle::{BinaryHandle, ContentKind};
pub use registry::{ObjectUrlRegistry, PublicUrl};
pub use slot::{AssetReference, AssetSlot, DEFAULT_MODEL_FILENAME};
