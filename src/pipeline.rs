use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::container::{ContainerProvider, FileProvider};
use crate::gps::GpsCoords;
use crate::snapshot::MetadataSnapshot;
use crate::transfer::MetadataTransfer;

/// Container format of an image file, detected from its extension.
///
/// # Example
///
/// ```rust
/// use exif_transfer::pipeline::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("photo.JPG")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("photo.heic")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageKind {
    /// JPEG — EXIF in the APP1 segment
    Jpeg,
    /// PNG — EXIF in an eXIf/zTXt chunk
    Png,
    /// WebP — EXIF chunk in RIFF
    WebP,
    /// TIFF — EXIF in the file's own IFDs
    Tiff,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }
}

/// What a single [`transfer_file`] run did.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Fields written to the destination (or that would be, in a dry run).
    pub fields: MetadataSnapshot,
    /// Rotation the source's orientation described, before any reset.
    pub orientation_degrees: u16,
    pub orientation_reset: bool,
    pub gps_stripped: bool,
    /// Position carried to the destination, if any.
    pub gps: Option<GpsCoords>,
    /// Backup of the destination made before writing.
    pub backup_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Copy metadata from `source` onto `destination` on disk.
///
/// `gps` overrides whatever position the source carried.
///
/// ```rust,no_run
/// use exif_transfer::config::Config;
/// use exif_transfer::pipeline::transfer_file;
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut config = Config::default();
/// config.transfer.reset_orientation = true;
///
/// let report = transfer_file(
///     Path::new("IMG_0001.jpg"),
///     Path::new("IMG_0001_small.jpg"),
///     &config,
///     None,
/// )?;
/// println!("Copied {} tags", report.fields.len());
/// # Ok(())
/// # }
/// ```
pub fn transfer_file(
    source: &Path,
    destination: &Path,
    config: &Config,
    gps: Option<GpsCoords>,
) -> Result<TransferReport> {
    transfer_with(FileProvider, source, destination, config, gps)
}

/// [`transfer_file`] over any container provider.
pub fn transfer_with<P: ContainerProvider>(
    provider: P,
    source: &Path,
    destination: &Path,
    config: &Config,
    gps: Option<GpsCoords>,
) -> Result<TransferReport> {
    let mut transfer = MetadataTransfer::with_provider(provider);
    transfer
        .open_source(source)
        .context("Failed to open source image")?;
    transfer
        .open_destination(destination)
        .context("Failed to open destination image")?;
    transfer.read_all();
    if transfer.snapshot().is_empty() {
        log::warn!("  No transferable EXIF tags in {}", source.display());
    } else {
        log::info!(
            "  Read {} tag(s) from {}",
            transfer.snapshot().len(),
            source.display()
        );
    }

    let orientation_degrees = transfer.decode_orientation();

    let options = &config.transfer;
    if options.strip_gps && transfer.has_gps_data() {
        log::info!("  Stripping GPS tags");
    }
    if options.strip_gps {
        transfer.snapshot_mut().strip_gps();
    }

    if let Some(coords) = gps {
        transfer.set_gps_coordinates(coords.latitude, coords.longitude);
    }

    if options.reset_orientation {
        if orientation_degrees != 0 {
            log::info!("  Resetting orientation (was rotated {orientation_degrees}°)");
        }
        transfer.reset_orientation();
    }

    let mut report = TransferReport {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        fields: transfer.snapshot().clone(),
        orientation_degrees,
        orientation_reset: options.reset_orientation,
        gps_stripped: options.strip_gps,
        gps: transfer.gps_coordinates(),
        backup_path: None,
        dry_run: config.output.dry_run,
    };

    if config.output.dry_run {
        log::info!("  DRY RUN — {} not modified", destination.display());
        return Ok(report);
    }

    if config.output.backup_originals {
        match backup_file(destination) {
            Ok(path) => report.backup_path = Some(path),
            Err(e) => log::warn!("Failed to backup {}: {e}", destination.display()),
        }
    }

    transfer
        .write_all()
        .context("Failed to write metadata to destination")?;
    log::info!(
        "  Wrote {} tag(s) to {}",
        report.fields.len(),
        destination.display()
    );

    Ok(report)
}

/// Read the transferred tag set from an image file.
pub fn read_metadata(path: &Path) -> Result<MetadataSnapshot> {
    let mut transfer = MetadataTransfer::new();
    transfer
        .open_source(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    transfer.read_all();
    Ok(transfer.snapshot().clone())
}

/// Create a backup of the file, unless one already exists.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryProvider;
    use crate::tag::Tag;
    use std::fs;
    use tempfile::TempDir;

    const SRC: &str = "in.jpg";
    const DST: &str = "out.jpg";

    fn no_backup() -> Config {
        let mut config = Config::default();
        config.output.backup_originals = false;
        config
    }

    fn provider_with_source() -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider.insert_file(
            SRC,
            [
                (Tag::Make, "Google"),
                (Tag::Model, "Pixel 8"),
                (Tag::Orientation, "6"),
                (Tag::GpsLatitude, "48/1,51/1,29000/1000"),
                (Tag::GpsLatitudeRef, "N"),
                (Tag::GpsLongitude, "2/1,17/1,40000/1000"),
                (Tag::GpsLongitudeRef, "E"),
                (Tag::GpsAltitude, "35/1"),
            ],
        );
        provider.insert_empty_file(DST);
        provider
    }

    // ── ImageKind::from_path ──────────────────────────────────────────

    #[test]
    fn image_kind_jpeg() {
        assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("photo.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("PHOTO.JPG")), Some(ImageKind::Jpeg));
    }

    #[test]
    fn image_kind_others() {
        assert_eq!(ImageKind::from_path(Path::new("image.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("image.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("scan.tif")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("scan.tiff")), Some(ImageKind::Tiff));
    }

    #[test]
    fn image_kind_unsupported() {
        assert_eq!(ImageKind::from_path(Path::new("photo.heic")), None);
        assert_eq!(ImageKind::from_path(Path::new("video.mp4")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    // ── transfer_with ────────────────────────────────────────────────

    #[test]
    fn plain_transfer_copies_everything() {
        let provider = provider_with_source();
        let report =
            transfer_with(provider.clone(), SRC.as_ref(), DST.as_ref(), &no_backup(), None)
                .unwrap();

        assert_eq!(report.fields.len(), 8);
        assert_eq!(report.orientation_degrees, 90);
        assert!(!report.orientation_reset);
        assert_eq!(provider.attribute(DST, Tag::Orientation).as_deref(), Some("6"));
        assert_eq!(provider.attribute(DST, Tag::Model).as_deref(), Some("Pixel 8"));

        let gps = report.gps.unwrap();
        assert!((gps.latitude - 48.858055).abs() < 1e-5);
        assert!((gps.longitude - 2.294444).abs() < 1e-5);
    }

    #[test]
    fn reset_orientation_after_rotation() {
        let provider = provider_with_source();
        let mut config = no_backup();
        config.transfer.reset_orientation = true;

        let report =
            transfer_with(provider.clone(), SRC.as_ref(), DST.as_ref(), &config, None).unwrap();
        assert_eq!(report.orientation_degrees, 90);
        assert!(report.orientation_reset);
        assert_eq!(provider.attribute(DST, Tag::Orientation).as_deref(), Some("1"));
    }

    #[test]
    fn strip_gps_drops_every_gps_tag() {
        let provider = provider_with_source();
        let mut config = no_backup();
        config.transfer.strip_gps = true;

        let report =
            transfer_with(provider.clone(), SRC.as_ref(), DST.as_ref(), &config, None).unwrap();
        assert!(report.gps.is_none());
        let written = provider.attributes(DST).unwrap();
        assert!(Tag::GPS.iter().all(|t| !written.contains_key(t)));
        assert_eq!(written.get(&Tag::Make).map(String::as_str), Some("Google"));
    }

    #[test]
    fn gps_override_wins() {
        let provider = provider_with_source();
        let coords = GpsCoords {
            latitude: -10.5,
            longitude: -20.25,
        };
        transfer_with(
            provider.clone(),
            SRC.as_ref(),
            DST.as_ref(),
            &no_backup(),
            Some(coords),
        )
        .unwrap();

        assert_eq!(
            provider.attribute(DST, Tag::GpsLatitude).as_deref(),
            Some("10/1,30/1,0/1000")
        );
        assert_eq!(provider.attribute(DST, Tag::GpsLatitudeRef).as_deref(), Some("S"));
        assert_eq!(provider.attribute(DST, Tag::GpsLongitudeRef).as_deref(), Some("W"));
        // Altitude is untouched by the override.
        assert_eq!(provider.attribute(DST, Tag::GpsAltitude).as_deref(), Some("35/1"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let provider = provider_with_source();
        let mut config = no_backup();
        config.output.dry_run = true;

        let report =
            transfer_with(provider.clone(), SRC.as_ref(), DST.as_ref(), &config, None).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.fields.len(), 8);
        assert_eq!(provider.saves(), 0);
        assert!(provider.attributes(DST).unwrap().is_empty());
    }

    #[test]
    fn missing_source_fails() {
        let provider = MemoryProvider::new();
        provider.insert_empty_file(DST);
        let err = transfer_with(provider, SRC.as_ref(), DST.as_ref(), &no_backup(), None)
            .unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    // ── backup_file ──────────────────────────────────────────────────

    #[test]
    fn backup_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("photo.jpg");
        fs::write(&jpg, b"original").unwrap();

        let backup = backup_file(&jpg).unwrap();
        assert_eq!(backup, dir.path().join("photo.jpg.bak"));
        assert_eq!(fs::read(&backup).unwrap(), b"original");
    }

    #[test]
    fn backup_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("photo.jpg");
        fs::write(&jpg, b"first").unwrap();
        backup_file(&jpg).unwrap();

        fs::write(&jpg, b"second").unwrap();
        let backup = backup_file(&jpg).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"first");
    }

    #[test]
    fn backup_of_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(backup_file(&dir.path().join("gone.jpg")).is_err());
    }
}
