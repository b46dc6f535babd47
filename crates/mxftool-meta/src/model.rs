//! Registry of set and item definitions.

use std::collections::HashMap;

use mxftool_core::{ItemType, Ul};
use mxftool_labels::{baseline_item_defs, baseline_set_defs};

use crate::{Error, Result};

/// A registered item definition, flattened-lookup form.
#[derive(Debug, Clone)]
pub struct ItemDefEntry {
    pub name: String,
    pub set_key: Ul,
    pub key: Ul,
    pub tag: u16,
    pub item_type: ItemType,
    pub required: bool,
}

#[derive(Debug, Clone)]
struct SetDefEntry {
    name: String,
    key: Ul,
    parent: Option<Ul>,
    /// Item indices after finalize, own items plus inherited ones.
    all_items: Vec<usize>,
}

/// The data model: set definitions with parent links plus item
/// definitions. Registration happens first, then [`DataModel::finalize`]
/// resolves inheritance and enables lookups.
#[derive(Debug, Default)]
#[must_use]
pub struct DataModel {
    sets: Vec<SetDefEntry>,
    set_index: HashMap<Ul, usize>,
    items: Vec<ItemDefEntry>,
    item_index: HashMap<Ul, usize>,
    finalized: bool,
}

impl DataModel {
    /// Empty model with no definitions.
    pub fn new() -> Self {
        DataModel::default()
    }

    /// Model seeded with the built-in SMPTE registry, not yet finalized so
    /// applications can layer extension definitions.
    pub fn baseline() -> Self {
        let mut model = DataModel::new();
        for def in baseline_set_defs() {
            model
                .register_set_def(def.name, def.parent.as_ref(), &def.key)
                .expect("baseline set registry is consistent");
        }
        for def in baseline_item_defs() {
            model
                .register_item_def(
                    def.name,
                    &def.set_key,
                    &def.key,
                    def.tag,
                    def.item_type,
                    def.required,
                )
                .expect("baseline item registry is consistent");
        }
        model
    }

    pub fn register_set_def(
        &mut self,
        name: &str,
        parent_key: Option<&Ul>,
        key: &Ul,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::ModelFinalized);
        }
        if self.set_index.contains_key(key) {
            return Err(Error::DuplicateDef(*key));
        }
        self.set_index.insert(*key, self.sets.len());
        self.sets.push(SetDefEntry {
            name: name.to_owned(),
            key: *key,
            parent: parent_key.copied(),
            all_items: Vec::new(),
        });
        Ok(())
    }

    pub fn register_item_def(
        &mut self,
        name: &str,
        set_key: &Ul,
        item_key: &Ul,
        local_tag: u16,
        item_type: ItemType,
        is_required: bool,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::ModelFinalized);
        }
        if self.item_index.contains_key(item_key) {
            return Err(Error::DuplicateDef(*item_key));
        }
        self.item_index.insert(*item_key, self.items.len());
        self.items.push(ItemDefEntry {
            name: name.to_owned(),
            set_key: *set_key,
            key: *item_key,
            tag: local_tag,
            item_type,
            required: is_required,
        });
        Ok(())
    }

    /// Resolve every set's transitive parent chain and materialize the
    /// flat per-set item lists.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::ModelFinalized);
        }
        // item definitions must name registered sets
        for item in &self.items {
            if !self.set_index.contains_key(&item.set_key) {
                return Err(Error::ItemWithoutSet(item.key));
            }
        }
        // group own items per set
        let mut own_items: HashMap<Ul, Vec<usize>> = HashMap::new();
        for (index, item) in self.items.iter().enumerate() {
            own_items.entry(item.set_key).or_default().push(index);
        }
        // flatten the ancestor chain, self first
        let max_depth = self.sets.len();
        let mut flattened: Vec<Vec<usize>> = Vec::with_capacity(self.sets.len());
        for set in &self.sets {
            let mut all = Vec::new();
            let mut current = Some(set.key);
            let mut depth = 0;
            while let Some(key) = current {
                if depth > max_depth {
                    return Err(Error::ParentCycle(set.key));
                }
                depth += 1;
                let entry = match self.set_index.get(&key) {
                    Some(&index) => &self.sets[index],
                    None => {
                        return Err(Error::UnknownParent {
                            set: set.key,
                            parent: key,
                        })
                    }
                };
                if let Some(items) = own_items.get(&key) {
                    all.extend_from_slice(items);
                }
                current = entry.parent;
            }
            flattened.push(all);
        }
        for (set, all) in self.sets.iter_mut().zip(flattened) {
            set.all_items = all;
        }
        self.finalized = true;
        Ok(())
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Is `key` a registered set?
    pub fn is_set(&self, key: &Ul) -> bool {
        self.set_index.contains_key(key)
    }

    pub fn set_name(&self, key: &Ul) -> Option<&str> {
        self.set_index.get(key).map(|&i| self.sets[i].name.as_str())
    }

    /// Definition of the item with `key`, whichever set owns it.
    pub fn item_def(&self, key: &Ul) -> Option<&ItemDefEntry> {
        self.item_index.get(key).map(|&i| &self.items[i])
    }

    /// Definition of `item_key` if it belongs to `set_key` or one of its
    /// ancestors. Requires a finalized model.
    pub fn item_def_in_set(&self, set_key: &Ul, item_key: &Ul) -> Option<&ItemDefEntry> {
        let set = self.set_index.get(set_key).map(|&i| &self.sets[i])?;
        set.all_items
            .iter()
            .map(|&i| &self.items[i])
            .find(|item| item.key == *item_key)
    }

    /// Required items of `set_key`, inherited ones included.
    pub fn required_items(&self, set_key: &Ul) -> Vec<&ItemDefEntry> {
        match self.set_index.get(set_key) {
            Some(&i) => self.sets[i]
                .all_items
                .iter()
                .map(|&j| &self.items[j])
                .filter(|item| item.required)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Registered set definitions as `(name, key, parent)` tuples, in
    /// registration order.
    pub fn set_defs(&self) -> impl Iterator<Item = (&str, &Ul, Option<&Ul>)> {
        self.sets
            .iter()
            .map(|s| (s.name.as_str(), &s.key, s.parent.as_ref()))
    }

    /// Registered item definitions in registration order.
    pub fn item_defs(&self) -> impl Iterator<Item = &ItemDefEntry> {
        self.items.iter()
    }

    /// True when `key` names `ancestor` or a transitive child of it.
    pub fn is_descendant_of(&self, key: &Ul, ancestor: &Ul) -> bool {
        let mut current = Some(*key);
        let mut depth = 0;
        while let Some(k) = current {
            if k == *ancestor {
                return true;
            }
            depth += 1;
            if depth > self.sets.len() {
                return false;
            }
            current = self
                .set_index
                .get(&k)
                .and_then(|&i| self.sets[i].parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxftool_labels::{items, sets};

    #[test]
    fn baseline_finalizes() {
        let mut model = DataModel::baseline();
        model.finalize().unwrap();
        assert!(model.is_set(&sets::PREFACE));
        assert!(!model.is_set(&Ul([0xff; 16])));
    }

    #[test]
    fn inherited_items_are_visible_on_descendants() {
        let mut model = DataModel::baseline();
        model.finalize().unwrap();
        // SampleRate is declared on FileDescriptor and inherited by CDCI
        let def = model
            .item_def_in_set(&sets::CDCI_ESSENCE_DESCRIPTOR, &items::SAMPLE_RATE)
            .unwrap();
        assert_eq!(def.tag, 0x3001);
        // but not present on unrelated sets
        assert!(model
            .item_def_in_set(&sets::SEQUENCE, &items::SAMPLE_RATE)
            .is_none());
        assert!(model.is_descendant_of(&sets::CDCI_ESSENCE_DESCRIPTOR, &sets::FILE_DESCRIPTOR));
        assert!(!model.is_descendant_of(&sets::FILE_DESCRIPTOR, &sets::CDCI_ESSENCE_DESCRIPTOR));
    }

    #[test]
    fn required_items_include_ancestors() {
        let mut model = DataModel::baseline();
        model.finalize().unwrap();
        let required = model.required_items(&sets::WAVE_AUDIO_DESCRIPTOR);
        let names: Vec<_> = required.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"BlockAlign"));
        assert!(names.contains(&"SampleRate"));
        assert!(names.contains(&"InstanceUID"));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let a = Ul([1; 16]);
        let b = Ul([2; 16]);
        let mut model = DataModel::new();
        model.register_set_def("A", Some(&b), &a).unwrap();
        model.register_set_def("B", Some(&a), &b).unwrap();
        assert!(matches!(model.finalize(), Err(Error::ParentCycle(_))));
    }

    #[test]
    fn registration_after_finalize_is_rejected() {
        let mut model = DataModel::baseline();
        model.finalize().unwrap();
        assert!(matches!(
            model.register_set_def("X", None, &Ul([3; 16])),
            Err(Error::ModelFinalized)
        ));
    }
}
