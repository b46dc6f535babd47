//! Header metadata: the typed object graph inside MXF header partitions.
//!
//! Header metadata is a rooted graph of *sets* (the root is a Preface).
//! Each set is serialized as a local set: a KLV whose value is a sequence
//! of `(local tag, length, value)` items. A per-file primer pack maps the
//! 2-byte local tags to 16-byte item keys.
//!
//! The shape of the graph is described by a [`DataModel`]: a registry of
//! set definitions (with single-inheritance parent links) and item
//! definitions (owning set, local tag, wire type, required flag).
//! `finalize()` flattens the inheritance so an item declared on an
//! ancestor is recognized on every descendant.
//!
//! Ownership follows the strong references: the Preface owns a tree of
//! child sets, weak references are resolved through an instance-UID index,
//! and the whole graph is freed with its [`HeaderMetadata`] container.

mod avid;
mod error;
mod header;
mod model;
mod primer;
mod set;
mod value;

pub use avid::{
    decode_indirect_string, encode_indirect_string, register_avid_extensions, AvidHeaderMetadata,
};
pub use error::{Error, Result};
pub use header::{HeaderMetadata, SetId};
pub use model::{DataModel, ItemDefEntry};
pub use primer::PrimerPack;
pub use set::{MetaItem, MetadataSet};
pub use value::MetaValue;
