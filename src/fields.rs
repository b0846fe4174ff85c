//! Field metadata resolution with a process-wide, copy-on-write cache.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use arc_swap::ArcSwap;
use facet_core::{ConstTypeId, Field, FieldAttribute, FieldFlags, Shape};
use parking_lot::Mutex;

/// How a single struct field appears in the unstructured tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Key under which the field is stored: the declared rename, or the field
    /// name as written. Empty for inlined and excluded fields.
    pub name: String,
    /// Suppress the key when the field holds its zero value.
    pub omit_empty: bool,
    /// The field's own fields are promoted into the parent mapping.
    pub inline: bool,
    /// The field never appears in the unstructured tree.
    pub excluded: bool,
}

impl FieldInfo {
    /// Derives the metadata from a field's declaration.
    pub fn from_field(field: &Field) -> Self {
        let inline = field.flags.contains(FieldFlags::FLATTEN);
        let excluded = field.flags.contains(FieldFlags::SKIP_SERIALIZING)
            || field.attributes.contains(&FieldAttribute::Arbitrary("skip"));
        let omit_empty = field
            .attributes
            .contains(&FieldAttribute::Arbitrary("omitempty"));
        let name = if inline || excluded {
            String::new()
        } else {
            field.name.to_owned()
        };
        FieldInfo {
            name,
            omit_empty,
            inline,
            excluded,
        }
    }
}

type FieldMap = HashMap<(ConstTypeId, usize), Arc<FieldInfo>>;

/// Read-mostly cache of [`FieldInfo`] keyed by (struct type, field index).
///
/// Readers load the current snapshot atomically and look up without taking
/// any lock. A miss builds the entry, then copies the snapshot, adds the entry
/// and stores the new snapshot while holding the writer mutex. Readers never
/// see a map under construction; a reader that raced a writer simply
/// recomputes.
#[derive(Debug)]
pub struct FieldCache {
    snapshot: ArcSwap<FieldMap>,
    writer: Mutex<()>,
}

impl Default for FieldCache {
    fn default() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(FieldMap::new()),
            writer: Mutex::new(()),
        }
    }
}

static GLOBAL: LazyLock<Arc<FieldCache>> = LazyLock::new(|| Arc::new(FieldCache::new()));

impl FieldCache {
    /// Creates an empty, isolated cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use and never torn down.
    pub fn global() -> Arc<FieldCache> {
        Arc::clone(&GLOBAL)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Resolves the metadata for field `index` of the struct `shape`.
    pub fn resolve(&self, shape: &Shape, index: usize, field: &Field) -> Arc<FieldInfo> {
        let key = (shape.id, index);
        if let Some(info) = self.snapshot.load().get(&key) {
            return Arc::clone(info);
        }

        let info = Arc::new(FieldInfo::from_field(field));
        log::trace!(
            "Field cache miss for {}#{index}: {info:?}",
            shape.type_identifier
        );

        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        if let Some(existing) = current.get(&key) {
            return Arc::clone(existing);
        }
        let mut next = FieldMap::clone(&current);
        next.insert(key, Arc::clone(&info));
        self.snapshot.store(Arc::new(next));
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet::Facet;

    #[derive(Facet)]
    #[allow(dead_code)]
    struct ObjectMeta {
        #[facet(rename = "Name")]
        name: String,
        generate_name: String,
        #[facet(omitempty)]
        labels: Vec<String>,
    }

    fn fields() -> &'static [Field] {
        let facet_core::Type::User(facet_core::UserType::Struct(struct_type)) =
            &ObjectMeta::SHAPE.ty
        else {
            panic!("ObjectMeta is a struct");
        };
        struct_type.fields
    }

    #[test]
    fn names_are_taken_as_declared() {
        let names: Vec<_> = fields()
            .iter()
            .map(|field| FieldInfo::from_field(field).name)
            .collect();
        assert_eq!(names, ["Name", "generate_name", "labels"]);
    }

    #[test]
    fn published_snapshots_are_never_mutated() {
        let cache = FieldCache::new();
        let before = cache.snapshot.load_full();

        let first = cache.resolve(ObjectMeta::SHAPE, 0, &fields()[0]);
        let again = cache.resolve(ObjectMeta::SHAPE, 0, &fields()[0]);

        assert!(Arc::ptr_eq(&first, &again));
        assert!(before.is_empty());
        assert_eq!(cache.len(), 1);
    }
}
