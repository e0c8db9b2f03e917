//! # exif-transfer
//!
//! Carry camera, capture-time, GPS and authorship EXIF tags from an original
//! image onto a processed copy of it (resized, recompressed, rotated), so the
//! copy keeps the metadata the processing step threw away.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exif_transfer::MetadataTransfer;
//! use std::path::Path;
//!
//! fn main() -> Result<(), exif_transfer::TransferError> {
//!     let mut transfer = MetadataTransfer::new();
//!     transfer.open_source(Path::new("IMG_0001.jpg"))?;
//!     transfer.open_destination(Path::new("IMG_0001_small.jpg"))?;
//!     transfer.read_all();
//!
//!     // The copy was rotated upright while it was resized.
//!     println!("Rotated by {}°", transfer.decode_orientation());
//!     transfer.reset_orientation();
//!
//!     if !transfer.has_gps_data() {
//!         transfer.set_gps_coordinates(37.7749, -122.4194);
//!     }
//!
//!     transfer.write_all()
//! }
//! ```
//!
//! ## Transferred tags
//!
//! FNumber, DateTime, DateTimeOriginal, ExposureTime, Flash, FocalLength,
//! ISOSpeedRatings, Make, Model, Orientation, WhiteBalance, Software, Artist,
//! Copyright, ImageDescription, UserComment and the GPS latitude, longitude,
//! altitude, time stamp, date stamp and processing method tags. See [`Tag`].
//!
//! ## Supported Formats
//!
//! | Format | EXIF lives in | Written by |
//! |--------|---------------|------------|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 segment | APP1 replaced in place, or added after JFIF |
//! | PNG (`.png`) | eXIf chunk | eXIf chunk replaced |
//! | WebP (`.webp`) | EXIF chunk | EXIF chunk replaced |
//! | TIFF (`.tif`, `.tiff`) | the file's own IFDs | directories appended to the file |
//!
//! The block is located with img-parts and read with nom-exif. Writes encode
//! tags with little_exif and merge them into the existing IFD0, Exif and GPS
//! directories; tags that are not written keep their bytes.
//!
//! ## Modules
//!
//! - [`transfer`] — [`MetadataTransfer`], the read → adjust → write flow
//! - [`container`] — container traits, file-backed and in-memory providers
//! - [`gps`] — decimal degrees ⇄ EXIF degree/minute/second rationals
//! - [`config`] — configuration types and loading/saving
//! - [`pipeline`] — one-call file transfer, format detection, backups

pub mod config;
pub mod container;
mod error;
pub mod gps;
pub mod pipeline;
mod snapshot;
mod tag;
pub mod transfer;
pub mod value;

pub use error::TransferError;
pub use gps::GpsCoords;
pub use snapshot::MetadataSnapshot;
pub use tag::{IfdGroup, Tag, TagFormat};
pub use transfer::MetadataTransfer;
