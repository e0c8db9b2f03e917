use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ContainerProvider, ExifContainer};
use crate::error::TransferError;
use crate::tag::Tag;

#[derive(Debug, Default)]
struct MemoryStore {
    files: HashMap<PathBuf, BTreeMap<Tag, String>>,
    failing_saves: HashSet<PathBuf>,
    attribute_writes: usize,
    saves: usize,
}

/// Provider backed by an in-memory map of path → attributes.
///
/// Clones share the same store, so a test can keep one handle for inspection
/// while a [`MetadataTransfer`](crate::MetadataTransfer) owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    store: Rc<RefCell<MemoryStore>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with the given attributes, replacing any previous one.
    pub fn insert_file<'a>(
        &self,
        path: impl Into<PathBuf>,
        attributes: impl IntoIterator<Item = (Tag, &'a str)>,
    ) {
        let attributes = attributes
            .into_iter()
            .map(|(tag, value)| (tag, value.to_string()))
            .collect();
        self.store.borrow_mut().files.insert(path.into(), attributes);
    }

    /// Register a file that carries no metadata.
    pub fn insert_empty_file(&self, path: impl Into<PathBuf>) {
        self.store
            .borrow_mut()
            .files
            .insert(path.into(), BTreeMap::new());
    }

    /// Saved value of `tag` for the file at `path`.
    pub fn attribute(&self, path: impl AsRef<Path>, tag: Tag) -> Option<String> {
        self.store
            .borrow()
            .files
            .get(path.as_ref())
            .and_then(|attrs| attrs.get(&tag).cloned())
    }

    /// All saved attributes for the file at `path`.
    pub fn attributes(&self, path: impl AsRef<Path>) -> Option<BTreeMap<Tag, String>> {
        self.store.borrow().files.get(path.as_ref()).cloned()
    }

    /// Make every later save to `path` fail.
    pub fn fail_saves_to(&self, path: impl Into<PathBuf>) {
        self.store.borrow_mut().failing_saves.insert(path.into());
    }

    /// Number of `set_attribute` calls across all containers.
    pub fn attribute_writes(&self) -> usize {
        self.store.borrow().attribute_writes
    }

    /// Number of successful saves across all containers.
    pub fn saves(&self) -> usize {
        self.store.borrow().saves
    }
}

impl ContainerProvider for MemoryProvider {
    type Container = MemoryContainer;

    fn open(&self, path: &Path) -> Result<MemoryContainer, TransferError> {
        let attributes = self
            .store
            .borrow()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
                TransferError::open(path, io::Error::from(io::ErrorKind::NotFound))
            })?;

        Ok(MemoryContainer {
            path: path.to_path_buf(),
            attributes,
            store: Rc::clone(&self.store),
        })
    }
}

/// A container opened from a [`MemoryProvider`].
///
/// Holds a private copy of the attributes; [`save_attributes`] publishes it
/// back to the shared store.
///
/// [`save_attributes`]: ExifContainer::save_attributes
#[derive(Debug)]
pub struct MemoryContainer {
    path: PathBuf,
    attributes: BTreeMap<Tag, String>,
    store: Rc<RefCell<MemoryStore>>,
}

impl ExifContainer for MemoryContainer {
    fn get_attribute(&self, tag: Tag) -> Option<String> {
        self.attributes.get(&tag).cloned()
    }

    fn set_attribute(&mut self, tag: Tag, value: &str) {
        self.store.borrow_mut().attribute_writes += 1;
        self.attributes.insert(tag, value.to_string());
    }

    fn save_attributes(&mut self) -> Result<(), TransferError> {
        let mut store = self.store.borrow_mut();
        if store.failing_saves.contains(&self.path) {
            return Err(TransferError::save(
                &self.path,
                io::Error::other("no space left on device"),
            ));
        }
        store.files.insert(self.path.clone(), self.attributes.clone());
        store.saves += 1;
        Ok(())
    }
}
