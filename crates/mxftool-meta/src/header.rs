//! The header metadata container: parse, serialize and own the set graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Seek, Write};

use mxftool_core::{keys, ItemType, MxfStream, Partition, Ul, KEY_SIZE};
use mxftool_labels::items;
use tracing::debug;
use uuid::Uuid;

use crate::set::MetaItem;
use crate::{DataModel, Error, MetaValue, MetadataSet, PrimerPack, Result};

/// Handle to a set inside a [`HeaderMetadata`]; wraps the instance UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetId(pub Uuid);

/// Owns the set graph, the instance-UID index and the data model.
#[must_use]
pub struct HeaderMetadata {
    model: DataModel,
    sets: HashMap<Uuid, MetadataSet>,
    order: Vec<Uuid>,
    preface: Option<Uuid>,
}

impl HeaderMetadata {
    /// The model must be finalized.
    pub fn new(model: DataModel) -> Result<Self> {
        if !model.is_finalized() {
            return Err(Error::ModelNotFinalized);
        }
        Ok(HeaderMetadata {
            model,
            sets: HashMap::new(),
            order: Vec::new(),
            preface: None,
        })
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    /// Create a set of a registered kind and add it to the graph.
    pub fn create(&mut self, set_key: &Ul) -> Result<SetId> {
        if !self.model.is_set(set_key) {
            return Err(Error::UnknownSet(*set_key));
        }
        Ok(self.add_set(MetadataSet::new(*set_key)))
    }

    /// Add an existing set; the graph takes ownership.
    pub fn add_set(&mut self, set: MetadataSet) -> SetId {
        let uid = set.instance_uid;
        if set.key == mxftool_labels::sets::PREFACE {
            self.preface = Some(uid);
        }
        self.order.push(uid);
        self.sets.insert(uid, set);
        SetId(uid)
    }

    /// Look up a set by instance UID (weak reference resolution).
    pub fn resolve(&self, uid: &Uuid) -> Option<&MetadataSet> {
        self.sets.get(uid)
    }

    pub fn get(&self, id: SetId) -> Option<&MetadataSet> {
        self.sets.get(&id.0)
    }

    pub fn get_mut(&mut self, id: SetId) -> Option<&mut MetadataSet> {
        self.sets.get_mut(&id.0)
    }

    /// Borrow a set created by this container. Panics on a foreign id;
    /// that is a programming error, not a recoverable fault.
    pub fn set(&self, id: SetId) -> &MetadataSet {
        self.sets.get(&id.0).expect("unknown set id")
    }

    /// Mutable variant of [`HeaderMetadata::set`].
    pub fn set_mut(&mut self, id: SetId) -> &mut MetadataSet {
        self.sets.get_mut(&id.0).expect("unknown set id")
    }

    pub fn preface(&self) -> Option<SetId> {
        self.preface.map(SetId)
    }

    /// Sets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataSet> {
        self.order.iter().filter_map(|uid| self.sets.get(uid))
    }

    /// First set with the given set key.
    pub fn find(&self, set_key: &Ul) -> Option<SetId> {
        self.iter()
            .find(|set| set.key == *set_key)
            .map(|set| SetId(set.instance_uid))
    }

    /// All sets with the given set key, in insertion order.
    pub fn find_all(&self, set_key: &Ul) -> Vec<SetId> {
        self.iter()
            .filter(|set| set.key == *set_key)
            .map(|set| SetId(set.instance_uid))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    // ---- read ------------------------------------------------------------

    /// Parse the header metadata block. The primer pack KL has already
    /// been read by the caller (`key`, `llen`, `len`);
    /// `partition.header_byte_count` delimits the block.
    pub fn read<S: Read + Seek>(
        &mut self,
        stream: &mut MxfStream<S>,
        partition: &Partition,
        key: &Ul,
        llen: u8,
        len: u64,
    ) -> Result<()> {
        if !keys::is_header_metadata(key) {
            return Err(Error::NotHeaderMetadata(*key));
        }
        self.sets.clear();
        self.order.clear();
        self.preface = None;

        let primer = PrimerPack::read(stream, len)?;
        let mut consumed = KEY_SIZE as u64 + u64::from(llen) + len;

        while consumed < partition.header_byte_count {
            let (set_key, set_llen, set_len) = stream.read_kl()?;
            consumed += KEY_SIZE as u64 + u64::from(set_llen) + set_len;
            if keys::is_filler(&set_key) {
                stream.skip(set_len)?;
                continue;
            }
            let value = stream.read_vec(set_len as usize)?;
            self.parse_set(&primer, set_key, value)?;
        }

        self.check_strong_refs()?;
        if self.preface.is_none() {
            return Err(Error::MissingPreface);
        }
        debug!(sets = self.sets.len(), "read header metadata");
        Ok(())
    }

    fn parse_set(&mut self, primer: &PrimerPack, set_key: Ul, value: Vec<u8>) -> Result<()> {
        let known = self.model.is_set(&set_key);
        let mut items = Vec::new();
        let mut tag_map = Vec::new();
        let mut instance_uid = None;

        let mut pos = 0usize;
        while pos + 4 <= value.len() {
            let tag = u16::from_be_bytes([value[pos], value[pos + 1]]);
            let item_len = u16::from_be_bytes([value[pos + 2], value[pos + 3]]) as usize;
            pos += 4;
            if pos + item_len > value.len() {
                return Err(Error::MalformedSet(set_key));
            }
            let bytes = &value[pos..pos + item_len];
            pos += item_len;

            let item_key = *primer
                .key_for_tag(tag)
                .ok_or(Error::UnknownLocalTag(tag))?;
            tag_map.push((tag, item_key));

            if item_key == items::INSTANCE_UID {
                if bytes.len() != 16 {
                    return Err(Error::MalformedSet(set_key));
                }
                let mut uid = [0u8; 16];
                uid.copy_from_slice(bytes);
                instance_uid = Some(Uuid::from_bytes(uid));
                continue;
            }
            if known {
                let decoded = match self.model.item_def(&item_key) {
                    Some(def) => MetaValue::decode(&item_key, def.item_type, bytes)?,
                    None => MetaValue::Opaque(bytes.to_vec()),
                };
                items.push(MetaItem {
                    key: item_key,
                    value: decoded,
                });
            }
        }
        if pos != value.len() {
            return Err(Error::MalformedSet(set_key));
        }
        let instance_uid = instance_uid.ok_or(Error::MalformedSet(set_key))?;

        let set = if known {
            MetadataSet::from_parts(set_key, instance_uid, items)
        } else {
            // unknown set kind: keep the raw value and its tag mappings so
            // the next write round-trips
            MetadataSet::new_opaque(set_key, instance_uid, value, tag_map)
        };
        self.add_set(set);
        Ok(())
    }

    /// Every strong reference must point at a set present in the graph.
    fn check_strong_refs(&self) -> Result<()> {
        for set in self.iter() {
            if set.is_opaque() {
                continue;
            }
            for item in set.items() {
                let Some(def) = self.model.item_def(&item.key) else {
                    continue;
                };
                match (def.item_type, &item.value) {
                    (ItemType::StrongRef, MetaValue::Ref(target)) => {
                        if !self.sets.contains_key(target) {
                            return Err(Error::UnresolvedRef(*target));
                        }
                    }
                    (
                        ItemType::StrongRefArray | ItemType::StrongRefBatch,
                        MetaValue::RefVec(targets),
                    ) => {
                        for target in targets {
                            if !self.sets.contains_key(target) {
                                return Err(Error::UnresolvedRef(*target));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // ---- write -----------------------------------------------------------

    /// Serialize the graph: primer pack, then the sets with the Preface
    /// first and owners before dependents, then a position filler
    /// (`fill_to`) or KAG filler. Header markers are applied to
    /// `partition`.
    pub fn write<S: Write + Seek>(
        &self,
        stream: &mut MxfStream<S>,
        partition: &mut Partition,
        fill_to: Option<u64>,
    ) -> Result<()> {
        let preface = self.preface.ok_or(Error::MissingPreface)?;
        self.check_strong_refs()?;
        let order = self.write_order(preface);

        let mut primer = PrimerPack::new();
        for uid in &order {
            for (tag, key) in self.sets[uid].reserved_tags() {
                primer.reserve(*tag, key)?;
            }
        }
        primer.assign(&items::INSTANCE_UID, 0x3c0a)?;
        for uid in &order {
            let set = &self.sets[uid];
            if set.is_opaque() {
                continue;
            }
            for item in set.items() {
                let static_tag = self.model.item_def(&item.key).map(|d| d.tag).unwrap_or(0);
                primer.assign(&item.key, static_tag)?;
            }
        }

        let mut blobs: Vec<(Ul, Vec<u8>)> = Vec::with_capacity(order.len());
        for uid in &order {
            let set = &self.sets[uid];
            if let Some(raw) = set.opaque_bytes() {
                blobs.push((set.key, raw.to_vec()));
                continue;
            }
            for def in self.model.required_items(&set.key) {
                if def.key != items::INSTANCE_UID && !set.have_item(&def.key) {
                    return Err(Error::MissingRequiredItem {
                        set: set.key,
                        item: def.key,
                    });
                }
            }
            let mut buf = Vec::new();
            let instance_tag = primer
                .tag_for_key(&items::INSTANCE_UID)
                .expect("instance UID is always in the primer");
            buf.extend_from_slice(&instance_tag.to_be_bytes());
            buf.extend_from_slice(&16u16.to_be_bytes());
            buf.extend_from_slice(set.instance_uid.as_bytes());
            for item in set.items() {
                let tag = primer
                    .tag_for_key(&item.key)
                    .expect("all item keys were assigned");
                let mut encoded = Vec::new();
                item.value.encode(&mut encoded);
                if encoded.len() > u16::MAX as usize {
                    return Err(Error::ItemTooLarge {
                        key: item.key,
                        len: encoded.len(),
                    });
                }
                buf.extend_from_slice(&tag.to_be_bytes());
                buf.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                buf.extend_from_slice(&encoded);
            }
            blobs.push((set.key, buf));
        }

        partition.mark_header_start(stream)?;
        primer.write(stream)?;
        for (set_key, blob) in &blobs {
            stream.write_kl(set_key, blob.len() as u64)?;
            stream.write_all_bytes(blob)?;
        }
        match fill_to {
            Some(position) => stream.fill_to_position(position)?,
            None => partition.fill_to_kag(stream)?,
        }
        partition.mark_header_end(stream)?;
        debug!(
            sets = order.len(),
            header_byte_count = partition.header_byte_count,
            "wrote header metadata"
        );
        Ok(())
    }

    /// Breadth-first over strong references from the preface, then any
    /// unreached sets (opaque carry-overs) in insertion order.
    fn write_order(&self, preface: Uuid) -> Vec<Uuid> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.sets.len());
        let mut queue = VecDeque::from([preface]);
        while let Some(uid) = queue.pop_front() {
            if !visited.insert(uid) {
                continue;
            }
            let Some(set) = self.sets.get(&uid) else {
                continue;
            };
            order.push(uid);
            if set.is_opaque() {
                continue;
            }
            for item in set.items() {
                let Some(def) = self.model.item_def(&item.key) else {
                    continue;
                };
                match (def.item_type, &item.value) {
                    (ItemType::StrongRef, MetaValue::Ref(target)) => queue.push_back(*target),
                    (
                        ItemType::StrongRefArray | ItemType::StrongRefBatch,
                        MetaValue::RefVec(targets),
                    ) => queue.extend(targets.iter().copied()),
                    _ => {}
                }
            }
        }
        for uid in &self.order {
            if !visited.contains(uid) {
                order.push(*uid);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxftool_core::{PartitionKind, PartitionStatus, Timestamp};
    use mxftool_labels::{datadef, op, sets};
    use std::io::Cursor;

    fn finalized_model() -> DataModel {
        let mut model = DataModel::baseline();
        model.finalize().unwrap();
        model
    }

    fn minimal_graph() -> (HeaderMetadata, SetId) {
        let mut md = HeaderMetadata::new(finalized_model()).unwrap();
        let preface = md.create(&sets::PREFACE).unwrap();
        let content = md.create(&sets::CONTENT_STORAGE).unwrap();
        let ident = md.create(&sets::IDENTIFICATION).unwrap();
        let package = md.create(&sets::MATERIAL_PACKAGE).unwrap();

        let now = Timestamp {
            year: 2008,
            month: 6,
            day: 2,
            hour: 10,
            min: 0,
            sec: 0,
            qmsec: 0,
        };
        {
            let p = md.set_mut(preface);
            p.set_timestamp_item(&items::LAST_MODIFIED_DATE, now);
            p.set_version_item(&items::VERSION, 0x0102);
            p.set_ul_item(
                &items::OPERATIONAL_PATTERN,
                op::OP_1A_MULTI_TRACK_STREAM_INTERNAL,
            );
            p.append_ul_item(&items::ESSENCE_CONTAINERS, datadef::PICTURE);
            p.append_ul_item(&items::DM_SCHEMES, datadef::D3_PRESERVATION_SCHEME);
            p.set_ref_item(&items::CONTENT_STORAGE, content.0);
            p.append_ref_item(&items::IDENTIFICATIONS, ident.0);
        }
        {
            let c = md.set_mut(content);
            c.append_ref_item(&items::PACKAGES, package.0);
        }
        {
            let i = md.set_mut(ident);
            i.set_uuid_item(&items::THIS_GENERATION_UID, Uuid::new_v4());
            i.set_string_item(&items::COMPANY_NAME, "BBC");
            i.set_string_item(&items::PRODUCT_NAME, "mxftool");
            i.set_string_item(&items::VERSION_STRING, "0.1.0");
            i.set_uuid_item(&items::PRODUCT_UID, Uuid::new_v4());
            i.set_timestamp_item(&items::MODIFICATION_DATE, now);
        }
        {
            let p = md.set_mut(package);
            p.set_umid_item(&items::PACKAGE_UID, mxftool_core::Umid::generate());
            p.set_timestamp_item(&items::PACKAGE_CREATION_DATE, now);
            p.set_timestamp_item(&items::PACKAGE_MODIFIED_DATE, now);
            p.set_item(&items::TRACKS, MetaValue::RefVec(Vec::new()));
        }
        (md, preface)
    }

    fn write_to_buffer(md: &HeaderMetadata) -> (Vec<u8>, Partition) {
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        stream.set_min_llen(4).unwrap();
        let mut partition = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        md.write(&mut stream, &mut partition, None).unwrap();
        (stream.into_inner().into_inner(), partition)
    }

    fn read_back(bytes: &[u8], partition: &Partition) -> HeaderMetadata {
        let mut stream = MxfStream::new(Cursor::new(bytes.to_vec()));
        let (key, llen, len) = stream.read_kl().unwrap();
        let mut md = HeaderMetadata::new(finalized_model()).unwrap();
        md.read(&mut stream, partition, &key, llen, len).unwrap();
        md
    }

    #[test]
    fn graph_round_trip() {
        let (md, _) = minimal_graph();
        let (bytes, partition) = write_to_buffer(&md);
        let read = read_back(&bytes, &partition);

        assert_eq!(read.len(), md.len());
        let preface = read.preface().unwrap();
        let preface_set = read.set(preface);
        assert_eq!(preface_set.version_item(&items::VERSION).unwrap(), 0x0102);
        assert_eq!(
            preface_set
                .ul_item(&items::OPERATIONAL_PATTERN)
                .unwrap(),
            op::OP_1A_MULTI_TRACK_STREAM_INTERNAL
        );

        // references resolve to the same targets
        let content_uid = preface_set.ref_item(&items::CONTENT_STORAGE).unwrap();
        let content = read.resolve(&content_uid).unwrap();
        assert_eq!(content.key, sets::CONTENT_STORAGE);
        let packages = content.ref_vec_item(&items::PACKAGES).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(
            read.resolve(&packages[0]).unwrap().key,
            sets::MATERIAL_PACKAGE
        );
    }

    #[test]
    fn rewrite_is_equivalent() {
        let (md, _) = minimal_graph();
        let (bytes, partition) = write_to_buffer(&md);
        let read = read_back(&bytes, &partition);
        let (bytes2, partition2) = write_to_buffer(&read);
        let read2 = read_back(&bytes2, &partition2);
        assert_eq!(read2.len(), md.len());
        // byte-identical on the second pass: same graph, same order
        let (bytes3, _) = write_to_buffer(&read2);
        assert_eq!(bytes2, bytes3);
    }

    #[test]
    fn missing_required_item_is_an_error() {
        let mut md = HeaderMetadata::new(finalized_model()).unwrap();
        let preface = md.create(&sets::PREFACE).unwrap();
        md.set_mut(preface)
            .set_version_item(&items::VERSION, 0x0102);
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        let mut partition = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        assert!(matches!(
            md.write(&mut stream, &mut partition, None),
            Err(Error::MissingRequiredItem { .. })
        ));
    }

    #[test]
    fn dangling_strong_ref_is_an_error() {
        let (mut md, preface) = minimal_graph();
        md.set_mut(preface)
            .set_ref_item(&items::CONTENT_STORAGE, Uuid::new_v4());
        let mut stream = MxfStream::new(Cursor::new(Vec::new()));
        let mut partition = Partition::new(PartitionKind::Header, PartitionStatus::ClosedComplete);
        assert!(matches!(
            md.write(&mut stream, &mut partition, None),
            Err(Error::UnresolvedRef(_))
        ));
    }

    #[test]
    fn unknown_sets_survive_a_round_trip() {
        let (md, _) = minimal_graph();
        let (mut bytes, mut partition) = write_to_buffer(&md);

        // append a set with a foreign key and a foreign item tag to the
        // block, patching the primer is not needed since the tag is known
        let foreign_key = Ul([
            0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01,
            0x7f, 0x00,
        ]);
        let uid = Uuid::new_v4();
        let mut set_value = Vec::new();
        set_value.extend_from_slice(&0x3c0au16.to_be_bytes());
        set_value.extend_from_slice(&16u16.to_be_bytes());
        set_value.extend_from_slice(uid.as_bytes());
        bytes.extend_from_slice(foreign_key.as_bytes());
        bytes.push(set_value.len() as u8);
        bytes.extend_from_slice(&set_value);
        partition.header_byte_count += 16 + 1 + set_value.len() as u64;

        let read = read_back(&bytes, &partition);
        let opaque: Vec<_> = read.iter().filter(|s| s.is_opaque()).collect();
        assert_eq!(opaque.len(), 1);
        assert_eq!(opaque[0].key, foreign_key);
        assert_eq!(opaque[0].instance_uid, uid);

        // the opaque set is written back verbatim
        let (bytes2, partition2) = write_to_buffer(&read);
        let read2 = read_back(&bytes2, &partition2);
        assert!(read2.iter().any(|s| s.key == foreign_key));
    }
}
