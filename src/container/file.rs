use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::Png;
use img_parts::webp::{CHUNK_EXIF, WebP};
use img_parts::{Bytes, ImageEXIF};
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::rational::uR64;
use nom_exif::{EntryValue, Exif, ExifIter, MediaParser, MediaSource};
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use super::tiff;
use super::{ContainerProvider, ExifContainer};
use crate::error::TransferError;
use crate::pipeline::ImageKind;
use crate::tag::{IfdGroup, Tag, TagFormat};
use crate::value::{
    decode_prefixed_text, encode_text_with_prefix, format_rationals, parse_bytes,
    parse_rationals, parse_shorts, trim_text,
};

// JPEG APP1 / WebP EXIF payloads start with this before the TIFF header.
const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
// Segment length field is 16 bits and counts itself.
const MAX_JPEG_SEGMENT: usize = u16::MAX as usize - 2;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Opens image files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProvider;

impl ContainerProvider for FileProvider {
    type Container = FileContainer;

    fn open(&self, path: &Path) -> Result<FileContainer, TransferError> {
        FileContainer::open(path)
    }
}

/// Metadata of one image file.
///
/// All transferred tags are read when the file is opened. Writes are staged
/// as little_exif tags and merged into the file's existing EXIF on save.
#[derive(Debug)]
pub struct FileContainer {
    path: PathBuf,
    kind: ImageKind,
    attributes: BTreeMap<Tag, String>,
    pending: Vec<ExifTag>,
}

impl FileContainer {
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let kind = ImageKind::from_path(path).ok_or_else(|| TransferError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

        let bytes = std::fs::read(path).map_err(|e| TransferError::open(path, e))?;
        let block = extract_exif(kind, Bytes::from(bytes)).map_err(|e| TransferError::open(path, e))?;

        let attributes = match block {
            Some(block) => read_attributes(&block),
            None => {
                log::debug!("No EXIF data found in {}", path.display());
                BTreeMap::new()
            }
        };
        log::debug!(
            "Read {} of {} tags from {}",
            attributes.len(),
            Tag::ALL.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            attributes,
            pending: Vec::new(),
        })
    }
}

impl ExifContainer for FileContainer {
    fn get_attribute(&self, tag: Tag) -> Option<String> {
        self.attributes.get(&tag).cloned()
    }

    fn set_attribute(&mut self, tag: Tag, value: &str) {
        match encode_tag(tag, value) {
            Some(exif_tag) => {
                log::debug!("  {tag}: {value}");
                self.pending.retain(|t| t.as_u16() != tag.code() || t.get_group() != exif_tag.get_group());
                self.pending.push(exif_tag);
                self.attributes.insert(tag, value.to_string());
            }
            None => {
                log::warn!("Skipping {tag}: cannot encode value {value:?}");
            }
        }
    }

    fn save_attributes(&mut self) -> Result<(), TransferError> {
        if self.pending.is_empty() {
            log::debug!("No staged tags for {}", self.path.display());
            return Ok(());
        }

        let bytes = std::fs::read(&self.path).map_err(|e| TransferError::save(&self.path, e))?;
        let output = write_tags(self.kind, Bytes::from(bytes), &self.pending)
            .map_err(|e| TransferError::save(&self.path, e))?;
        std::fs::write(&self.path, output).map_err(|e| TransferError::save(&self.path, e))?;

        log::debug!(
            "Saved {} tags to {}",
            self.pending.len(),
            self.path.display()
        );
        self.pending.clear();
        Ok(())
    }
}

fn invalid_container(what: &str, e: img_parts::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("not a valid {what}: {e}"))
}

fn parse_jpeg(bytes: Bytes) -> io::Result<Jpeg> {
    Jpeg::from_bytes(bytes).map_err(|e| invalid_container("JPEG", e))
}

fn parse_png(bytes: Bytes) -> io::Result<Png> {
    Png::from_bytes(bytes).map_err(|e| invalid_container("PNG", e))
}

fn parse_webp(bytes: Bytes) -> io::Result<WebP> {
    WebP::from_bytes(bytes).map_err(|e| invalid_container("WebP", e))
}

fn is_tiff(bytes: &[u8]) -> bool {
    bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*")
}

/// WebP EXIF chunk, with or without the `Exif\0\0` prefix some writers add.
fn webp_exif(webp: &WebP) -> Option<Bytes> {
    webp.chunk_by_id(CHUNK_EXIF)?.content().data().cloned()
}

fn strip_exif_prefix(block: Bytes) -> Bytes {
    if block.starts_with(EXIF_PREFIX) {
        block.slice(EXIF_PREFIX.len()..)
    } else {
        block
    }
}

/// Pull the TIFF-structured EXIF block out of an image, checking on the way
/// that the bytes are the container the extension claims.
fn extract_exif(kind: ImageKind, bytes: Bytes) -> io::Result<Option<Bytes>> {
    let block = match kind {
        ImageKind::Jpeg => parse_jpeg(bytes)?.exif(),
        ImageKind::Png => parse_png(bytes)?.exif(),
        ImageKind::WebP => webp_exif(&parse_webp(bytes)?),
        ImageKind::Tiff => {
            if !is_tiff(&bytes) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "not a valid TIFF: bad header",
                ));
            }
            Some(bytes)
        }
    };
    Ok(block.map(strip_exif_prefix).filter(|b| !b.is_empty()))
}

/// Read every transferred tag present in an EXIF block.
///
/// A block nom-exif cannot parse reads as empty.
fn read_attributes(block: &Bytes) -> BTreeMap<Tag, String> {
    let mut attributes = BTreeMap::new();

    let mut parser = MediaParser::new();
    let iter: ExifIter = match MediaSource::seekable(Cursor::new(block.to_vec()))
        .and_then(|ms| parser.parse(ms))
    {
        Ok(iter) => iter,
        Err(e) => {
            log::debug!("Unreadable EXIF block: {e}");
            return attributes;
        }
    };
    let exif: Exif = iter.into();

    // nom-exif folds the Exif and GPS sub-IFDs into IFD0.
    for tag in Tag::ALL {
        if let Some(val) = exif.get_by_ifd_tag_code(0, tag.code()) {
            if let Some(text) = entry_to_string(tag, val) {
                attributes.insert(tag, text);
            }
        }
    }

    attributes
}

/// Render a nom-exif value in the text form used by snapshots.
fn entry_to_string(tag: Tag, val: &EntryValue) -> Option<String> {
    let join = |items: Vec<String>| items.join(",");
    let s = match val {
        EntryValue::Text(s) => trim_text(s),
        EntryValue::URational(r) => format_rationals(&[(r.0, r.1)]),
        EntryValue::URationalArray(rs) => {
            format_rationals(&rs.iter().map(|r| (r.0, r.1)).collect::<Vec<_>>())
        }
        EntryValue::IRational(r) => format!("{}/{}", r.0, r.1),
        EntryValue::U8(v) => v.to_string(),
        EntryValue::U16(v) => v.to_string(),
        EntryValue::U32(v) => v.to_string(),
        EntryValue::U16Array(vs) => join(vs.iter().map(u16::to_string).collect()),
        EntryValue::U32Array(vs) => join(vs.iter().map(u32::to_string).collect()),
        EntryValue::U8Array(bytes) | EntryValue::Undefined(bytes) => match tag.format() {
            TagFormat::EncodedText | TagFormat::Ascii => decode_prefixed_text(bytes),
            _ => join(bytes.iter().map(u8::to_string).collect()),
        },
        EntryValue::Time(t) => t.format(EXIF_DATETIME_FORMAT).to_string(),
        EntryValue::NaiveDateTime(t) => t.format(EXIF_DATETIME_FORMAT).to_string(),
        other => trim_text(&other.to_string()),
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Build the little_exif tag for a text value, or `None` if it does not fit
/// the tag's format.
///
/// Tags are built as little_exif's untyped variants so that the code, format
/// and directory are exactly ours. Its typed table has no GPS entries and
/// would read GPS codes as Interop tags.
fn encode_tag(tag: Tag, value: &str) -> Option<ExifTag> {
    let code = tag.code();
    let group = match tag.group() {
        IfdGroup::Ifd0 => ExifTagGroup::IFD0,
        IfdGroup::Exif => ExifTagGroup::ExifIFD,
        IfdGroup::Gps => ExifTagGroup::GPSIFD,
    };

    let exif_tag = match tag.format() {
        TagFormat::Ascii => ExifTag::UnknownSTRING(value.to_string(), code, group),
        TagFormat::Byte => ExifTag::UnknownINT8U(parse_bytes(value)?, code, group),
        TagFormat::Short => ExifTag::UnknownINT16U(parse_shorts(value)?, code, group),
        TagFormat::Rational => {
            let rationals = parse_rationals(value)?
                .into_iter()
                .map(|(nominator, denominator)| uR64 {
                    nominator,
                    denominator,
                })
                .collect();
            ExifTag::UnknownRATIONAL64U(rationals, code, group)
        }
        TagFormat::EncodedText => {
            ExifTag::UnknownUNDEF(encode_text_with_prefix(value), code, group)
        }
    };
    Some(exif_tag)
}

/// Merge `tags` into the image's EXIF block and re-encode the whole file.
fn write_tags(kind: ImageKind, bytes: Bytes, tags: &[ExifTag]) -> io::Result<Vec<u8>> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = parse_jpeg(bytes)?;
            let block = merge_block(jpeg.exif(), tags)?;
            if EXIF_PREFIX.len() + block.len() > MAX_JPEG_SEGMENT {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("EXIF block of {} bytes does not fit in an APP1 segment", block.len()),
                ));
            }
            replace_exif_segment(&mut jpeg, block);
            Ok(jpeg.encoder().bytes().to_vec())
        }
        ImageKind::Png => {
            let mut png = parse_png(bytes)?;
            let block = merge_block(png.exif(), tags)?;
            png.set_exif(Some(Bytes::from(block)));
            Ok(png.encoder().bytes().to_vec())
        }
        ImageKind::WebP => {
            let mut webp = parse_webp(bytes)?;
            let block = merge_block(webp_exif(&webp), tags)?;
            webp.set_exif(Some(Bytes::from(block)));
            Ok(webp.encoder().bytes().to_vec())
        }
        // The file is the block; its image data stays where it is.
        ImageKind::Tiff => tiff::merge_tags(&bytes, tags),
    }
}

/// Merge into the existing block, or into a fresh one if there is none.
///
/// An existing block that cannot be walked is an error: rebuilding it from
/// the staged tags alone would drop every tag we were not asked to write.
fn merge_block(existing: Option<Bytes>, tags: &[ExifTag]) -> io::Result<Vec<u8>> {
    match existing.map(strip_exif_prefix).filter(|b| !b.is_empty()) {
        Some(block) => tiff::merge_tags(&block, tags).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("existing EXIF block could not be merged: {e}"),
            )
        }),
        None => tiff::merge_tags(&tiff::empty_block(), tags),
    }
}

/// Put the EXIF block back where it was, or right after JFIF APP0 if the
/// JPEG had none, so EXIF stays ahead of any XMP APP1.
fn replace_exif_segment(jpeg: &mut Jpeg, block: Vec<u8>) {
    let mut contents = EXIF_PREFIX.to_vec();
    contents.extend_from_slice(&block);
    let segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));

    let existing = find_exif_segment_pos(jpeg);
    let segments = jpeg.segments_mut();
    match existing {
        Some(pos) => segments[pos] = segment,
        None => {
            let pos = usize::from(segments.first().is_some_and(|s| s.marker() == APP0));
            segments.insert(pos, segment);
        }
    }
}

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}
