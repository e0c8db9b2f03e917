use std::fmt;
use std::path::Path;

use crate::container::{ContainerProvider, ExifContainer, FileProvider};
use crate::error::TransferError;
use crate::gps::{self, GpsCoords};
use crate::snapshot::MetadataSnapshot;
use crate::tag::Tag;

/// EXIF orientation code for "no rotation".
pub const ORIENTATION_NORMAL: u16 = 1;
pub const ORIENTATION_ROTATE_90: u16 = 6;
pub const ORIENTATION_ROTATE_180: u16 = 3;
pub const ORIENTATION_ROTATE_270: u16 = 8;

/// Copies the fixed tag set from a source image to a destination image.
///
/// The caller sequences the steps: open the source and destination, read,
/// adjust the snapshot, write. Nothing enforces that order, but writing with
/// no destination bound is always a no-op.
///
/// ```rust,no_run
/// use exif_transfer::MetadataTransfer;
/// use std::path::Path;
///
/// # fn main() -> Result<(), exif_transfer::TransferError> {
/// let mut transfer = MetadataTransfer::new();
/// transfer.open_source(Path::new("IMG_0001.jpg"))?;
/// transfer.open_destination(Path::new("IMG_0001_small.jpg"))?;
/// transfer.read_all();
///
/// let degrees = transfer.decode_orientation();
/// // ...rotate the pixels of the copy by `degrees`...
/// transfer.reset_orientation();
///
/// transfer.write_all()?;
/// # Ok(())
/// # }
/// ```
pub struct MetadataTransfer<P: ContainerProvider = FileProvider> {
    provider: P,
    snapshot: MetadataSnapshot,
    source: Option<P::Container>,
    destination: Option<P::Container>,
}

impl<P: ContainerProvider> fmt::Debug for MetadataTransfer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataTransfer")
            .field("snapshot", &self.snapshot)
            .field("source", &self.source.is_some())
            .field("destination", &self.destination.is_some())
            .finish()
    }
}

impl MetadataTransfer<FileProvider> {
    /// Transfer between image files on disk.
    pub fn new() -> Self {
        Self::with_provider(FileProvider)
    }
}

impl Default for MetadataTransfer<FileProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ContainerProvider> MetadataTransfer<P> {
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            snapshot: MetadataSnapshot::new(),
            source: None,
            destination: None,
        }
    }

    /// Bind the image metadata is read from.
    pub fn open_source(&mut self, path: &Path) -> Result<(), TransferError> {
        self.source = Some(self.provider.open(path)?);
        log::debug!("Source: {}", path.display());
        Ok(())
    }

    /// Bind the image metadata is written to.
    pub fn open_destination(&mut self, path: &Path) -> Result<(), TransferError> {
        self.destination = Some(self.provider.open(path)?);
        log::debug!("Destination: {}", path.display());
        Ok(())
    }

    pub fn has_destination(&self) -> bool {
        self.destination.is_some()
    }

    /// Populate the snapshot from the source.
    ///
    /// Every tag is re-read; tags the source lacks become absent.
    pub fn read_all(&mut self) {
        let Some(source) = self.source.as_ref() else {
            log::debug!("read_all called with no source bound");
            return;
        };
        for tag in Tag::ALL {
            self.snapshot.set_optional(tag, source.get_attribute(tag));
        }
        log::debug!("Read {} tags from source", self.snapshot.len());
    }

    /// Write every present snapshot field to the destination and save it.
    ///
    /// Absent fields leave the destination's value alone. Returns `Ok(())`
    /// without doing anything when no destination is bound.
    pub fn write_all(&mut self) -> Result<(), TransferError> {
        let Some(destination) = self.destination.as_mut() else {
            return Ok(());
        };

        for (tag, value) in self.snapshot.iter() {
            destination.set_attribute(tag, value);
        }
        destination.save_attributes()?;

        log::debug!("Wrote {} tags to destination", self.snapshot.len());
        Ok(())
    }

    /// Clockwise rotation, in degrees, described by the stored orientation.
    ///
    /// Mirrored and unknown codes decode to 0 with a warning.
    pub fn decode_orientation(&self) -> u16 {
        let Some(raw) = self.snapshot.get(Tag::Orientation) else {
            return 0;
        };

        match raw.parse::<u16>() {
            Ok(ORIENTATION_NORMAL) => 0,
            Ok(ORIENTATION_ROTATE_90) => 90,
            Ok(ORIENTATION_ROTATE_180) => 180,
            Ok(ORIENTATION_ROTATE_270) => 270,
            Ok(code) => {
                log::warn!("Unsupported orientation code: {code}");
                0
            }
            Err(_) => {
                log::warn!("Invalid orientation value: {raw:?}");
                0
            }
        }
    }

    /// Mark the image as upright. Use after the pixels have been rotated.
    pub fn reset_orientation(&mut self) {
        self.snapshot
            .set(Tag::Orientation, ORIENTATION_NORMAL.to_string());
    }

    /// Whether both latitude and longitude are present.
    pub fn has_gps_data(&self) -> bool {
        self.snapshot.contains(Tag::GpsLatitude) && self.snapshot.contains(Tag::GpsLongitude)
    }

    /// Store decimal-degree coordinates as EXIF DMS rationals.
    ///
    /// Only the snapshot changes; the destination sees the values on the next
    /// [`write_all`](Self::write_all).
    pub fn set_gps_coordinates(&mut self, latitude: f64, longitude: f64) {
        let lat = gps::encode_latitude(latitude);
        let lon = gps::encode_longitude(longitude);

        log::debug!(
            "GPS coordinates set - Latitude: {latitude} ({} {}), Longitude: {longitude} ({} {})",
            lat.value,
            lat.reference,
            lon.value,
            lon.reference
        );

        self.snapshot.set(Tag::GpsLatitude, lat.value);
        self.snapshot.set(Tag::GpsLatitudeRef, lat.reference);
        self.snapshot.set(Tag::GpsLongitude, lon.value);
        self.snapshot.set(Tag::GpsLongitudeRef, lon.reference);
    }

    pub fn gps_latitude(&self) -> Option<&str> {
        self.snapshot.get(Tag::GpsLatitude)
    }

    pub fn gps_longitude(&self) -> Option<&str> {
        self.snapshot.get(Tag::GpsLongitude)
    }

    pub fn gps_latitude_ref(&self) -> Option<&str> {
        self.snapshot.get(Tag::GpsLatitudeRef)
    }

    pub fn gps_longitude_ref(&self) -> Option<&str> {
        self.snapshot.get(Tag::GpsLongitudeRef)
    }

    /// Stored position as signed decimal degrees, if it can be decoded.
    pub fn gps_coordinates(&self) -> Option<GpsCoords> {
        let latitude = gps::decode_dms(self.gps_latitude()?, self.gps_latitude_ref())?;
        let longitude = gps::decode_dms(self.gps_longitude()?, self.gps_longitude_ref())?;
        Some(GpsCoords {
            latitude,
            longitude,
        })
    }

    pub fn snapshot(&self) -> &MetadataSnapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut MetadataSnapshot {
        &mut self.snapshot
    }
}
