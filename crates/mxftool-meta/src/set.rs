//! Metadata sets: dynamically typed bags of items keyed by item key.
//!
//! The original AAF-style class hierarchy (FileDescriptor <-
//! CDCIEssenceDescriptor, ...) is represented as one open set type plus
//! typed accessor functions keyed by item key; the data model's parent
//! chain supplies the inheritance semantics.

use mxftool_core::{ProductVersion, Rational, Timestamp, Ul, Umid};
use uuid::Uuid;

use crate::{Error, MetaValue, Result};

/// One item: key plus decoded value. Items keep their insertion order,
/// which is the order they are serialized in.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaItem {
    pub key: Ul,
    pub value: MetaValue,
}

/// One interchange set.
#[derive(Debug, Clone)]
#[must_use]
pub struct MetadataSet {
    pub key: Ul,
    pub instance_uid: Uuid,
    items: Vec<MetaItem>,
    /// Raw local-set value for sets unknown to the data model; written
    /// back verbatim.
    opaque: Option<Vec<u8>>,
    /// Original `(tag, item key)` pairs of an opaque set, re-reserved in
    /// the primer on write.
    reserved_tags: Vec<(u16, Ul)>,
}

impl MetadataSet {
    /// Fresh set with a generated instance UID.
    pub fn new(key: Ul) -> Self {
        MetadataSet {
            key,
            instance_uid: Uuid::new_v4(),
            items: Vec::new(),
            opaque: None,
            reserved_tags: Vec::new(),
        }
    }

    /// Parsed set with its instance UID and decoded items.
    pub(crate) fn from_parts(key: Ul, instance_uid: Uuid, items: Vec<MetaItem>) -> Self {
        MetadataSet {
            key,
            instance_uid,
            items,
            opaque: None,
            reserved_tags: Vec::new(),
        }
    }

    /// Set preserved verbatim because its key is unknown to the model.
    pub(crate) fn new_opaque(
        key: Ul,
        instance_uid: Uuid,
        raw: Vec<u8>,
        reserved_tags: Vec<(u16, Ul)>,
    ) -> Self {
        MetadataSet {
            key,
            instance_uid,
            items: Vec::new(),
            opaque: Some(raw),
            reserved_tags,
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    pub(crate) fn opaque_bytes(&self) -> Option<&[u8]> {
        self.opaque.as_deref()
    }

    pub(crate) fn reserved_tags(&self) -> &[(u16, Ul)] {
        &self.reserved_tags
    }

    pub fn items(&self) -> &[MetaItem] {
        &self.items
    }

    pub fn have_item(&self, key: &Ul) -> bool {
        self.items.iter().any(|item| item.key == *key)
    }

    pub fn item(&self, key: &Ul) -> Option<&MetaValue> {
        self.items
            .iter()
            .find(|item| item.key == *key)
            .map(|item| &item.value)
    }

    /// Insert or replace the item with `key`.
    pub fn set_item(&mut self, key: &Ul, value: MetaValue) {
        match self.items.iter_mut().find(|item| item.key == *key) {
            Some(item) => item.value = value,
            None => self.items.push(MetaItem { key: *key, value }),
        }
    }

    fn expect<'a, T>(
        &'a self,
        key: &Ul,
        expected: &'static str,
        get: impl Fn(&'a MetaValue) -> Option<T>,
    ) -> Result<T> {
        match self.item(key) {
            None => Err(Error::MissingItem(*key)),
            Some(value) => get(value).ok_or(Error::WrongItemType {
                key: *key,
                expected,
                actual: value.type_name(),
            }),
        }
    }

    // ---- typed getters ---------------------------------------------------

    pub fn uint8_item(&self, key: &Ul) -> Result<u8> {
        self.expect(key, "uint8", |v| match v {
            MetaValue::UInt8(x) => Some(*x),
            _ => None,
        })
    }

    pub fn uint16_item(&self, key: &Ul) -> Result<u16> {
        self.expect(key, "uint16", |v| match v {
            MetaValue::UInt16(x) => Some(*x),
            _ => None,
        })
    }

    pub fn uint32_item(&self, key: &Ul) -> Result<u32> {
        self.expect(key, "uint32", |v| match v {
            MetaValue::UInt32(x) => Some(*x),
            _ => None,
        })
    }

    pub fn int16_item(&self, key: &Ul) -> Result<i16> {
        self.expect(key, "int16", |v| match v {
            MetaValue::Int16(x) => Some(*x),
            _ => None,
        })
    }

    pub fn int32_item(&self, key: &Ul) -> Result<i32> {
        self.expect(key, "int32", |v| match v {
            MetaValue::Int32(x) => Some(*x),
            _ => None,
        })
    }

    pub fn int64_item(&self, key: &Ul) -> Result<i64> {
        self.expect(key, "int64", |v| match v {
            MetaValue::Int64(x) => Some(*x),
            _ => None,
        })
    }

    pub fn boolean_item(&self, key: &Ul) -> Result<bool> {
        self.expect(key, "boolean", |v| match v {
            MetaValue::Boolean(x) => Some(*x),
            _ => None,
        })
    }

    pub fn version_item(&self, key: &Ul) -> Result<u16> {
        self.expect(key, "version", |v| match v {
            MetaValue::Version(x) => Some(*x),
            _ => None,
        })
    }

    pub fn product_version_item(&self, key: &Ul) -> Result<ProductVersion> {
        self.expect(key, "product-version", |v| match v {
            MetaValue::ProductVersion(x) => Some(*x),
            _ => None,
        })
    }

    pub fn rational_item(&self, key: &Ul) -> Result<Rational> {
        self.expect(key, "rational", |v| match v {
            MetaValue::Rational(x) => Some(*x),
            _ => None,
        })
    }

    pub fn timestamp_item(&self, key: &Ul) -> Result<Timestamp> {
        self.expect(key, "timestamp", |v| match v {
            MetaValue::Timestamp(x) => Some(*x),
            _ => None,
        })
    }

    pub fn ul_item(&self, key: &Ul) -> Result<Ul> {
        self.expect(key, "label", |v| match v {
            MetaValue::Ul(x) => Some(*x),
            _ => None,
        })
    }

    pub fn uuid_item(&self, key: &Ul) -> Result<Uuid> {
        self.expect(key, "uuid", |v| match v {
            MetaValue::Uuid(x) => Some(*x),
            _ => None,
        })
    }

    pub fn umid_item(&self, key: &Ul) -> Result<Umid> {
        self.expect(key, "umid", |v| match v {
            MetaValue::Umid(x) => Some(*x),
            _ => None,
        })
    }

    pub fn string_item(&self, key: &Ul) -> Result<String> {
        self.expect(key, "string", |v| match v {
            MetaValue::String(x) => Some(x.clone()),
            _ => None,
        })
    }

    /// Raw bytes of a byte-block, indirect or opaque item.
    pub fn raw_bytes_item(&self, key: &Ul) -> Result<&[u8]> {
        self.expect(key, "bytes", |v| match v {
            MetaValue::Bytes(x) | MetaValue::Opaque(x) => Some(x.as_slice()),
            _ => None,
        })
    }

    /// Instance UID carried by a strong or weak reference item.
    pub fn ref_item(&self, key: &Ul) -> Result<Uuid> {
        self.expect(key, "reference", |v| match v {
            MetaValue::Ref(x) => Some(*x),
            _ => None,
        })
    }

    /// Instance UIDs of a reference array or batch item.
    pub fn ref_vec_item(&self, key: &Ul) -> Result<&[Uuid]> {
        self.expect(key, "reference-array", |v| match v {
            MetaValue::RefVec(x) => Some(x.as_slice()),
            _ => None,
        })
    }

    pub fn ul_batch_item(&self, key: &Ul) -> Result<&[Ul]> {
        self.expect(key, "label-batch", |v| match v {
            MetaValue::UlBatch(x) => Some(x.as_slice()),
            _ => None,
        })
    }

    // ---- typed setters ---------------------------------------------------

    pub fn set_uint8_item(&mut self, key: &Ul, value: u8) {
        self.set_item(key, MetaValue::UInt8(value));
    }

    pub fn set_uint16_item(&mut self, key: &Ul, value: u16) {
        self.set_item(key, MetaValue::UInt16(value));
    }

    pub fn set_uint32_item(&mut self, key: &Ul, value: u32) {
        self.set_item(key, MetaValue::UInt32(value));
    }

    pub fn set_int16_item(&mut self, key: &Ul, value: i16) {
        self.set_item(key, MetaValue::Int16(value));
    }

    pub fn set_int32_item(&mut self, key: &Ul, value: i32) {
        self.set_item(key, MetaValue::Int32(value));
    }

    pub fn set_int64_item(&mut self, key: &Ul, value: i64) {
        self.set_item(key, MetaValue::Int64(value));
    }

    pub fn set_boolean_item(&mut self, key: &Ul, value: bool) {
        self.set_item(key, MetaValue::Boolean(value));
    }

    pub fn set_version_item(&mut self, key: &Ul, value: u16) {
        self.set_item(key, MetaValue::Version(value));
    }

    pub fn set_product_version_item(&mut self, key: &Ul, value: ProductVersion) {
        self.set_item(key, MetaValue::ProductVersion(value));
    }

    pub fn set_rational_item(&mut self, key: &Ul, value: Rational) {
        self.set_item(key, MetaValue::Rational(value));
    }

    pub fn set_timestamp_item(&mut self, key: &Ul, value: Timestamp) {
        self.set_item(key, MetaValue::Timestamp(value));
    }

    pub fn set_ul_item(&mut self, key: &Ul, value: Ul) {
        self.set_item(key, MetaValue::Ul(value));
    }

    pub fn set_uuid_item(&mut self, key: &Ul, value: Uuid) {
        self.set_item(key, MetaValue::Uuid(value));
    }

    pub fn set_umid_item(&mut self, key: &Ul, value: Umid) {
        self.set_item(key, MetaValue::Umid(value));
    }

    pub fn set_string_item(&mut self, key: &Ul, value: &str) {
        self.set_item(key, MetaValue::String(value.to_owned()));
    }

    pub fn set_raw_bytes_item(&mut self, key: &Ul, value: Vec<u8>) {
        self.set_item(key, MetaValue::Bytes(value));
    }

    pub fn set_ref_item(&mut self, key: &Ul, target: Uuid) {
        self.set_item(key, MetaValue::Ref(target));
    }

    /// Append to a reference array/batch item, creating it when absent.
    pub fn append_ref_item(&mut self, key: &Ul, target: Uuid) {
        match self.items.iter_mut().find(|item| item.key == *key) {
            Some(MetaItem {
                value: MetaValue::RefVec(refs),
                ..
            }) => refs.push(target),
            Some(item) => item.value = MetaValue::RefVec(vec![target]),
            None => self.items.push(MetaItem {
                key: *key,
                value: MetaValue::RefVec(vec![target]),
            }),
        }
    }

    /// Append to a label batch item, creating it when absent.
    pub fn append_ul_item(&mut self, key: &Ul, label: Ul) {
        match self.items.iter_mut().find(|item| item.key == *key) {
            Some(MetaItem {
                value: MetaValue::UlBatch(labels),
                ..
            }) => labels.push(label),
            Some(item) => item.value = MetaValue::UlBatch(vec![label]),
            None => self.items.push(MetaItem {
                key: *key,
                value: MetaValue::UlBatch(vec![label]),
            }),
        }
    }

    /// Append to an int32 array item, creating it when absent.
    pub fn append_int32_item(&mut self, key: &Ul, value: i32) {
        match self.items.iter_mut().find(|item| item.key == *key) {
            Some(MetaItem {
                value: MetaValue::Int32Array(values),
                ..
            }) => values.push(value),
            Some(item) => item.value = MetaValue::Int32Array(vec![value]),
            None => self.items.push(MetaItem {
                key: *key,
                value: MetaValue::Int32Array(vec![value]),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_checks_kind() {
        let key = Ul([1; 16]);
        let item = Ul([2; 16]);
        let mut set = MetadataSet::new(key);
        set.set_uint32_item(&item, 7);
        assert_eq!(set.uint32_item(&item).unwrap(), 7);
        assert!(matches!(
            set.int64_item(&item),
            Err(Error::WrongItemType { .. })
        ));
        assert!(matches!(
            set.uint32_item(&Ul([3; 16])),
            Err(Error::MissingItem(_))
        ));
    }

    #[test]
    fn set_item_replaces_in_place() {
        let item = Ul([2; 16]);
        let mut set = MetadataSet::new(Ul([1; 16]));
        set.set_int64_item(&item, -1);
        set.set_int64_item(&item, 25);
        assert_eq!(set.items().len(), 1);
        assert_eq!(set.int64_item(&item).unwrap(), 25);
    }

    #[test]
    fn append_builds_arrays() {
        let item = Ul([2; 16]);
        let mut set = MetadataSet::new(Ul([1; 16]));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        set.append_ref_item(&item, a);
        set.append_ref_item(&item, b);
        assert_eq!(set.ref_vec_item(&item).unwrap(), &[a, b]);
    }
}
