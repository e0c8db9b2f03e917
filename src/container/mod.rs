//! Metadata containers the transfer reads from and writes to.
//!
//! A [`ContainerProvider`] opens a path into an [`ExifContainer`]. Two
//! providers ship with the crate:
//!
//! - [`FileProvider`]: real image files (JPEG, PNG, WebP, TIFF). The EXIF
//!   block is located with img-parts, read with nom-exif, and written back
//!   by merging little_exif-encoded tags into its directories
//! - [`MemoryProvider`]: an in-memory store of attribute maps keyed by path

mod file;
mod memory;
mod tiff;

pub use file::{FileContainer, FileProvider};
pub use memory::{MemoryContainer, MemoryProvider};

use std::path::Path;

use crate::error::TransferError;
use crate::tag::Tag;

/// String-valued access to one image's metadata.
pub trait ExifContainer {
    /// Current value of `tag`, or `None` if the container lacks it.
    fn get_attribute(&self, tag: Tag) -> Option<String>;

    /// Stage a new value for `tag`. Nothing is persisted until
    /// [`save_attributes`](Self::save_attributes).
    fn set_attribute(&mut self, tag: Tag, value: &str);

    /// Persist all staged values.
    fn save_attributes(&mut self) -> Result<(), TransferError>;
}

/// Opens containers bound to a path.
pub trait ContainerProvider {
    type Container: ExifContainer;

    fn open(&self, path: &Path) -> Result<Self::Container, TransferError>;
}
