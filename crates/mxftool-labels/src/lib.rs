//! SMPTE universal label registry.
//!
//! This crate holds the 16-byte constants the container engine treats as
//! opaque identifiers:
//!
//! - interchange set keys and item keys ([`sets`], [`items`])
//! - essence container labels and essence element keys ([`essence`])
//! - operational pattern labels ([`op`])
//! - data definitions and descriptive metadata schemes ([`datadef`])
//! - Avid / AAF extension keys ([`avid`]) and archive extensions
//!   ([`archive`])
//!
//! [`baseline`] exposes the registry as static set/item definition tables
//! consumed by the data model in `mxftool-meta`.

pub mod archive;
pub mod avid;
pub mod baseline;
pub mod datadef;
pub mod essence;
pub mod items;
pub mod op;
pub mod sets;

/// Structural keys re-exported from the core crate.
pub use mxftool_core::keys;

pub use baseline::{baseline_item_defs, baseline_set_defs, ItemDef, SetDef, DYNAMIC_TAG};
