//! Core MXF container plumbing.
//!
//! MXF files are a flat sequence of KLV (Key-Length-Value) records over a
//! random-access byte stream:
//!
//! - Partition packs divide the file into header/body/footer regions
//! - Header metadata and index table segments live inside partitions
//! - A Random Index Pack (RIP) at the file tail lists every partition
//!
//! This crate provides the wire-level pieces: primitive value codecs, the
//! KLV stream with BER lengths and filler handling, partition packs with
//! KAG alignment, index table segments (monolithic and streamed layouts)
//! and the RIP. The typed header-metadata object graph lives in
//! `mxftool-meta`.
//!
//! Reference: SMPTE 377M (MXF file format), SMPTE 336M (KLV coding)

mod error;
mod index;
pub mod keys;
mod partition;
mod rate;
mod rip;
mod stream;
mod types;

pub use error::{Error, Result};
pub use index::{DeltaEntry, IndexEntry, IndexTableSegment};
pub use partition::{Partition, PartitionKind, PartitionStatus};
pub use rate::convert_position;
pub use rip::{RandomIndexPack, RipEntry};
pub use stream::MxfStream;
pub use types::{ItemType, ProductVersion, Rational, Timestamp, Ul, Umid, RATE_25, RATE_30_DROP, RATE_48K};

/// A KLV key is structurally a universal label.
pub type Key = Ul;

/// Size in bytes of a serialized key or label.
pub const KEY_SIZE: usize = 16;
