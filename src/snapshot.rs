use serde::Serialize;
use std::collections::BTreeMap;

use crate::tag::Tag;

/// In-memory copy of the transferred tags.
///
/// A tag is either present with a value or absent. Absent means "not read,
/// do not write"; an empty string is stored as-is and is not the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSnapshot {
    fields: BTreeMap<Tag, String>,
}

impl MetadataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    pub fn set(&mut self, tag: Tag, value: impl Into<String>) {
        self.fields.insert(tag, value.into());
    }

    /// Replace the value of `tag`; `None` makes it absent.
    pub fn set_optional(&mut self, tag: Tag, value: Option<String>) {
        match value {
            Some(v) => {
                self.fields.insert(tag, v);
            }
            None => {
                self.fields.remove(&tag);
            }
        }
    }

    pub fn remove(&mut self, tag: Tag) -> Option<String> {
        self.fields.remove(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.fields.contains_key(&tag)
    }

    /// Drop every GPS tag from the snapshot.
    pub fn strip_gps(&mut self) {
        for tag in Tag::GPS {
            self.fields.remove(&tag);
        }
    }

    /// Present fields in [`Tag`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &str)> + '_ {
        self.fields.iter().map(|(tag, value)| (*tag, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
