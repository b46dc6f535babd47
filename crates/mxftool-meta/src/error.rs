//! Error types for mxftool-meta.

use mxftool_core::Ul;
use thiserror::Error;
use uuid::Uuid;

/// Data-model and header-metadata errors.
#[derive(Debug, Error)]
#[must_use]
pub enum Error {
    #[error("data model is already finalized")]
    ModelFinalized,

    #[error("data model has not been finalized")]
    ModelNotFinalized,

    #[error("set {0} is not registered in the data model")]
    UnknownSet(Ul),

    #[error("set {set} names unregistered parent {parent}")]
    UnknownParent { set: Ul, parent: Ul },

    #[error("set {0} has a parent cycle")]
    ParentCycle(Ul),

    #[error("duplicate registration of {0}")]
    DuplicateDef(Ul),

    #[error("item definition {0} names an unregistered set")]
    ItemWithoutSet(Ul),

    #[error("local tag 0x{0:04X} is not in the primer pack")]
    UnknownLocalTag(u16),

    #[error("local tag 0x{tag:04X} already maps to {existing}")]
    TagCollision { tag: u16, existing: Ul },

    #[error("set {set} is missing required item {item}")]
    MissingRequiredItem { set: Ul, item: Ul },

    #[error("item {0} is not present in the set")]
    MissingItem(Ul),

    #[error("item {key} holds a {actual} value, expected {expected}")]
    WrongItemType {
        key: Ul,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("serialized item {key} is {len} bytes, exceeding the 16-bit item limit")]
    ItemTooLarge { key: Ul, len: usize },

    #[error("strong reference to unknown instance UID {0}")]
    UnresolvedRef(Uuid),

    #[error("header metadata block does not start with a primer pack ({0})")]
    NotHeaderMetadata(Ul),

    #[error("header metadata has no preface")]
    MissingPreface,

    #[error("malformed local set value for {0}")]
    MalformedSet(Ul),

    #[error("core error: {0}")]
    Core(#[from] mxftool_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
