//! Avid-compatible header metadata.
//!
//! Avid expects a MetaDictionary/Dictionary subgraph describing the set
//! and item definitions in use, and carries project attributes as
//! TaggedValue children of packages. The tagged value payloads use the
//! AAF indirect encoding: an endianness marker byte, the half-swapped
//! type label and the raw value.

use std::ops::{Deref, DerefMut};

use mxftool_core::{ItemType, Ul};
use mxftool_labels::{avid, items, sets, DYNAMIC_TAG};

use crate::value::{decode_utf16be, encode_utf16be};
use crate::{DataModel, HeaderMetadata, Result, SetId};

/// Register the Avid extension sets and items on a not-yet-finalized
/// model.
pub fn register_avid_extensions(model: &mut DataModel) -> Result<()> {
    model.register_set_def("MetaDefinition", Some(&sets::INTERCHANGE_OBJECT), &avid::META_DEFINITION)?;
    model.register_set_def("MetaDictionary", Some(&sets::INTERCHANGE_OBJECT), &avid::META_DICTIONARY)?;
    model.register_set_def("ClassDefinition", Some(&avid::META_DEFINITION), &avid::CLASS_DEFINITION)?;
    model.register_set_def("PropertyDefinition", Some(&avid::META_DEFINITION), &avid::PROPERTY_DEFINITION)?;

    model.register_item_def(
        "ClassDefinitions",
        &avid::META_DICTIONARY,
        &avid::CLASS_DEFINITIONS,
        DYNAMIC_TAG,
        ItemType::StrongRefBatch,
        true,
    )?;
    model.register_item_def(
        "Identification",
        &avid::META_DEFINITION,
        &avid::META_DEFINITION_IDENTIFICATION,
        DYNAMIC_TAG,
        ItemType::Ul,
        true,
    )?;
    model.register_item_def(
        "Name",
        &avid::META_DEFINITION,
        &avid::META_DEFINITION_NAME,
        DYNAMIC_TAG,
        ItemType::Utf16,
        true,
    )?;
    model.register_item_def(
        "ParentClass",
        &avid::CLASS_DEFINITION,
        &avid::PARENT_CLASS,
        DYNAMIC_TAG,
        ItemType::WeakRef,
        false,
    )?;
    model.register_item_def(
        "IsConcrete",
        &avid::CLASS_DEFINITION,
        &avid::IS_CONCRETE,
        DYNAMIC_TAG,
        ItemType::Boolean,
        false,
    )?;
    model.register_item_def(
        "Properties",
        &avid::CLASS_DEFINITION,
        &avid::CLASS_PROPERTIES,
        DYNAMIC_TAG,
        ItemType::StrongRefBatch,
        false,
    )?;
    model.register_item_def(
        "LocalIdentification",
        &avid::PROPERTY_DEFINITION,
        &avid::LOCAL_IDENTIFICATION,
        DYNAMIC_TAG,
        ItemType::UInt16,
        false,
    )?;
    model.register_item_def(
        "IsOptional",
        &avid::PROPERTY_DEFINITION,
        &avid::IS_OPTIONAL,
        DYNAMIC_TAG,
        ItemType::Boolean,
        false,
    )?;
    model.register_item_def(
        "Type",
        &avid::PROPERTY_DEFINITION,
        &avid::PROPERTY_TYPE,
        DYNAMIC_TAG,
        ItemType::Ul,
        false,
    )?;

    model.register_item_def("ProjectName", &sets::PREFACE, &avid::PROJECT_NAME, DYNAMIC_TAG, ItemType::Utf16, false)?;
    model.register_item_def("ProjectEditRate", &sets::PREFACE, &avid::PROJECT_EDIT_RATE, DYNAMIC_TAG, ItemType::Rational, false)?;
    model.register_item_def("MasterMobID", &sets::PREFACE, &avid::MASTER_MOB_ID, DYNAMIC_TAG, ItemType::Umid, false)?;
    model.register_item_def("EssenceFileMobID", &sets::PREFACE, &avid::ESSENCE_FILE_MOB_ID, DYNAMIC_TAG, ItemType::Umid, false)?;

    model.register_item_def("MobAttributeList", &sets::GENERIC_PACKAGE, &avid::MOB_ATTRIBUTE_LIST, DYNAMIC_TAG, ItemType::StrongRefArray, false)?;
    model.register_item_def("UserComments", &sets::GENERIC_PACKAGE, &avid::USER_COMMENTS, DYNAMIC_TAG, ItemType::StrongRefArray, false)?;
    model.register_item_def("ConvertFrameRate", &sets::GENERIC_PACKAGE, &avid::CONVERT_FRAME_RATE, DYNAMIC_TAG, ItemType::Boolean, false)?;
    model.register_item_def("AppCode", &sets::GENERIC_PACKAGE, &avid::APP_CODE, DYNAMIC_TAG, ItemType::Int32, false)?;

    model.register_item_def("ResolutionID", &sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, &avid::RESOLUTION_ID, DYNAMIC_TAG, ItemType::Int32, false)?;
    model.register_item_def("FrameSampleSize", &sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, &avid::FRAME_SAMPLE_SIZE, DYNAMIC_TAG, ItemType::Int32, false)?;
    model.register_item_def("ImageSize", &sets::GENERIC_PICTURE_ESSENCE_DESCRIPTOR, &avid::IMAGE_SIZE, DYNAMIC_TAG, ItemType::Int32, false)?;
    Ok(())
}

/// Type label carried by property definitions.
fn type_label(item_type: ItemType) -> Ul {
    if item_type == ItemType::Utf16 {
        return avid::UTF16_STRING_TYPE;
    }
    let code = match item_type {
        ItemType::UInt8 => 0x01,
        ItemType::UInt16 => 0x02,
        ItemType::UInt32 => 0x03,
        ItemType::UInt64 => 0x04,
        ItemType::Int8 => 0x05,
        ItemType::Int16 => 0x06,
        ItemType::Int32 => 0x07,
        ItemType::Int64 => 0x08,
        ItemType::Boolean => 0x09,
        ItemType::VersionType => 0x0a,
        ItemType::ProductVersion => 0x0b,
        ItemType::Rational => 0x0c,
        ItemType::Timestamp => 0x0d,
        ItemType::Ul => 0x0e,
        ItemType::Uuid => 0x0f,
        ItemType::Umid => 0x10,
        ItemType::Utf16 => unreachable!(),
        ItemType::Bytes => 0x11,
        ItemType::Indirect => 0x12,
        ItemType::StrongRef => 0x13,
        ItemType::WeakRef => 0x14,
        ItemType::StrongRefArray => 0x15,
        ItemType::StrongRefBatch => 0x16,
        ItemType::WeakRefArray => 0x17,
        ItemType::WeakRefBatch => 0x18,
        ItemType::UlBatch => 0x19,
        ItemType::Int32Array => 0x1a,
        ItemType::UInt32Array => 0x1b,
    };
    Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04, 0x01, 0x01, 0x03, 0x01, code, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ])
}

/// Encode a string as an AAF big-endian indirect value.
pub fn encode_indirect_string(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(avid::INDIRECT_PREFIX_BE.len() + value.len() * 2 + 2);
    out.extend_from_slice(&avid::INDIRECT_PREFIX_BE);
    encode_utf16be(value, &mut out);
    out
}

/// Decode an AAF indirect string value of either endianness.
pub fn decode_indirect_string(bytes: &[u8]) -> Option<String> {
    let prefix_len = avid::INDIRECT_PREFIX_BE.len();
    if bytes.len() < prefix_len {
        return None;
    }
    match bytes[0] {
        0x42 if bytes[1..prefix_len] == avid::INDIRECT_PREFIX_BE[1..] => {
            Some(decode_utf16be(&bytes[prefix_len..]))
        }
        0x4c if bytes[1..prefix_len] == avid::INDIRECT_PREFIX_LE[1..] => {
            let units: Vec<u16> = bytes[prefix_len..]
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&u| u != 0)
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        _ => None,
    }
}

/// Header metadata with the Avid additions.
#[must_use]
pub struct AvidHeaderMetadata {
    inner: HeaderMetadata,
}

impl Deref for AvidHeaderMetadata {
    type Target = HeaderMetadata;

    fn deref(&self) -> &HeaderMetadata {
        &self.inner
    }
}

impl DerefMut for AvidHeaderMetadata {
    fn deref_mut(&mut self) -> &mut HeaderMetadata {
        &mut self.inner
    }
}

impl AvidHeaderMetadata {
    /// The model must be finalized and carry the Avid extensions.
    pub fn new(model: DataModel) -> Result<Self> {
        Ok(AvidHeaderMetadata {
            inner: HeaderMetadata::new(model)?,
        })
    }

    pub fn into_inner(self) -> HeaderMetadata {
        self.inner
    }

    /// Build the MetaDictionary describing every set and item definition
    /// currently registered: one ClassDefinition per set with parent
    /// links, one PropertyDefinition per item.
    pub fn create_default_meta_dictionary(&mut self) -> Result<SetId> {
        let class_defs: Vec<(String, Ul, Option<Ul>)> = self
            .inner
            .model()
            .set_defs()
            .map(|(name, key, parent)| (name.to_owned(), *key, parent.copied()))
            .collect();
        let property_defs: Vec<_> = self
            .inner
            .model()
            .item_defs()
            .cloned()
            .collect();

        let meta_dict = self.inner.create(&avid::META_DICTIONARY)?;
        let mut class_ids = std::collections::HashMap::new();
        for (name, key, _) in &class_defs {
            let class = self.inner.create(&avid::CLASS_DEFINITION)?;
            {
                let set = self.inner.set_mut(class);
                set.set_ul_item(&avid::META_DEFINITION_IDENTIFICATION, *key);
                set.set_string_item(&avid::META_DEFINITION_NAME, name);
                set.set_boolean_item(&avid::IS_CONCRETE, true);
            }
            self.inner
                .set_mut(meta_dict)
                .append_ref_item(&avid::CLASS_DEFINITIONS, class.0);
            class_ids.insert(*key, class);
        }
        for (_, key, parent) in &class_defs {
            if let Some(parent_id) = parent.and_then(|p| class_ids.get(&p)) {
                let target = parent_id.0;
                let class = class_ids[key];
                self.inner
                    .set_mut(class)
                    .set_ref_item(&avid::PARENT_CLASS, target);
            }
        }
        for def in &property_defs {
            let Some(&class) = class_ids.get(&def.set_key) else {
                continue;
            };
            let property = self.inner.create(&avid::PROPERTY_DEFINITION)?;
            {
                let set = self.inner.set_mut(property);
                set.set_ul_item(&avid::META_DEFINITION_IDENTIFICATION, def.key);
                set.set_string_item(&avid::META_DEFINITION_NAME, &def.name);
                set.set_uint16_item(&avid::LOCAL_IDENTIFICATION, def.tag);
                set.set_boolean_item(&avid::IS_OPTIONAL, !def.required);
                set.set_ul_item(&avid::PROPERTY_TYPE, type_label(def.item_type));
            }
            self.inner
                .set_mut(class)
                .append_ref_item(&avid::CLASS_PROPERTIES, property.0);
        }
        Ok(meta_dict)
    }

    /// Build the Dictionary set and hang it off the preface.
    pub fn create_default_dictionary(&mut self, preface: SetId) -> Result<SetId> {
        let dictionary = self.inner.create(&sets::DICTIONARY)?;
        self.inner
            .set_mut(preface)
            .set_ref_item(&items::DICTIONARY, dictionary.0);
        Ok(dictionary)
    }

    /// Attach a mob attribute (e.g. the "_PJ" project attribute) to a
    /// package as a TaggedValue with an indirect string payload.
    pub fn attach_attribute(&mut self, package: SetId, name: &str, value: &str) -> Result<SetId> {
        let tagged = self.create_tagged_value(name, value)?;
        self.inner
            .set_mut(package)
            .append_ref_item(&avid::MOB_ATTRIBUTE_LIST, tagged.0);
        Ok(tagged)
    }

    /// Attach a user comment to a package.
    pub fn attach_user_comment(&mut self, package: SetId, name: &str, value: &str) -> Result<SetId> {
        let tagged = self.create_tagged_value(name, value)?;
        self.inner
            .set_mut(package)
            .append_ref_item(&avid::USER_COMMENTS, tagged.0);
        Ok(tagged)
    }

    fn create_tagged_value(&mut self, name: &str, value: &str) -> Result<SetId> {
        let tagged = self.inner.create(&sets::TAGGED_VALUE)?;
        let set = self.inner.set_mut(tagged);
        set.set_string_item(&items::TAGGED_VALUE_NAME, name);
        set.set_raw_bytes_item(&items::TAGGED_VALUE_VALUE, encode_indirect_string(value));
        Ok(tagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avid_model() -> DataModel {
        let mut model = DataModel::baseline();
        register_avid_extensions(&mut model).unwrap();
        model.finalize().unwrap();
        model
    }

    #[test]
    fn indirect_string_round_trip() {
        let encoded = encode_indirect_string("test project");
        assert_eq!(encoded[0], 0x42);
        assert_eq!(decode_indirect_string(&encoded).unwrap(), "test project");
    }

    #[test]
    fn indirect_string_rejects_foreign_payloads() {
        assert!(decode_indirect_string(b"plain").is_none());
        let mut bad = encode_indirect_string("x");
        bad[3] ^= 0xff;
        assert!(decode_indirect_string(&bad).is_none());
    }

    #[test]
    fn meta_dictionary_covers_the_model() {
        let mut md = AvidHeaderMetadata::new(avid_model()).unwrap();
        let dict = md.create_default_meta_dictionary().unwrap();
        let class_count = md.set(dict).ref_vec_item(&avid::CLASS_DEFINITIONS).unwrap().len();
        let model_sets = md.model().set_defs().count();
        assert_eq!(class_count, model_sets);
        // every class definition resolves and names its set key
        let targets: Vec<_> = md
            .set(dict)
            .ref_vec_item(&avid::CLASS_DEFINITIONS)
            .unwrap()
            .to_vec();
        for target in targets {
            let class = md.resolve(&target).unwrap();
            assert!(class.have_item(&avid::META_DEFINITION_IDENTIFICATION));
        }
    }

    #[test]
    fn attributes_attach_tagged_values() {
        let mut md = AvidHeaderMetadata::new(avid_model()).unwrap();
        let package = md.create(&sets::MATERIAL_PACKAGE).unwrap();
        md.attach_attribute(package, "_PJ", "test project").unwrap();
        md.attach_user_comment(package, "Descript", "a test project")
            .unwrap();
        let attrs = md.set(package).ref_vec_item(&avid::MOB_ATTRIBUTE_LIST).unwrap();
        assert_eq!(attrs.len(), 1);
        let tagged = md.resolve(&attrs[0]).unwrap();
        assert_eq!(
            tagged.string_item(&items::TAGGED_VALUE_NAME).unwrap(),
            "_PJ"
        );
        let raw = tagged.raw_bytes_item(&items::TAGGED_VALUE_VALUE).unwrap();
        assert_eq!(decode_indirect_string(raw).unwrap(), "test project");
    }
}
