use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide face ID counter. IDs are never reused, so two independently
/// built solids can be merged without tag collisions.
static NEXT_FACE_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates a fresh, globally unique face ID.
pub fn allocate_face_id() -> u32 {
    NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single metadata value attached to a face.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Number(f64),
    Text(String),
}

impl MetaValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered key/value annotations of one face.
pub type FaceMetadata = BTreeMap<String, MetaValue>;

/// Bijective map between face IDs and face names.
#[derive(Debug, Clone, Default)]
pub struct FaceTable {
    by_id: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl FaceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for `name`, allocating a fresh global ID if the name is new.
    pub fn ensure(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = allocate_face_id();
        self.bind(id, name);
        id
    }

    /// Binds `id` to `name`, removing any previous binding of either side.
    pub fn bind(&mut self, id: u32, name: &str) {
        if let Some(old_name) = self.by_id.remove(&id) {
            self.by_name.remove(&old_name);
        }
        if let Some(old_id) = self.by_name.remove(name) {
            self.by_id.remove(&old_id);
        }
        self.by_id.insert(id, name.to_owned());
        self.by_name.insert(name.to_owned(), id);
    }

    #[must_use]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn contains_id(&self, id: u32) -> bool {
        self.by_id.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Face names sorted alphabetically.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Iterates `(id, name)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.by_id.iter().map(|(&id, name)| (id, name.as_str()))
    }

    /// Merges `other` into `self`; entries of `other` win on collision.
    pub fn merge_from(&mut self, other: &FaceTable) {
        for (id, name) in other.iter() {
            self.bind(id, name);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_is_stable_per_name() {
        let mut table = FaceTable::new();
        let a = table.ensure("TOP");
        let b = table.ensure("TOP");
        let c = table.ensure("SIDE");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.name(a), Some("TOP"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn ids_are_unique_across_tables() {
        let mut first = FaceTable::new();
        let mut second = FaceTable::new();
        assert_ne!(first.ensure("ARC"), second.ensure("ARC"));
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut target = FaceTable::new();
        target.bind(7, "OLD");
        let mut tool = FaceTable::new();
        tool.bind(7, "NEW");
        target.merge_from(&tool);
        assert_eq!(target.name(7), Some("NEW"));
        assert_eq!(target.id("OLD"), None);
    }

    #[test]
    fn rebinding_keeps_bijection() {
        let mut table = FaceTable::new();
        table.bind(1, "A");
        table.bind(2, "A");
        assert_eq!(table.id("A"), Some(2));
        assert!(!table.contains_id(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn meta_value_conversions() {
        assert_eq!(MetaValue::from(0.5).as_number(), Some(0.5));
        assert_eq!(MetaValue::from("FRONT").as_text(), Some("FRONT"));
        assert_eq!(MetaValue::from(2.0).to_string(), "2");
    }
}
