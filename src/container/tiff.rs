//! Directory-level editing of a TIFF-structured EXIF block.
//!
//! Original bytes never move. Rewritten directories are appended to the end
//! of the block and the header (or IFD0, for the Exif and GPS directories)
//! is repointed at them, so offsets held by untouched entries stay valid.
//! Values are never decoded here: nom-exif reads them, little_exif encodes
//! the new ones.

use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use std::collections::BTreeMap;
use std::io;

const TIFF_MAGIC: u16 = 42;
const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;

const EXIF_IFD_POINTER: u16 = 0x8769;
const GPS_IFD_POINTER: u16 = 0x8825;
const FORMAT_LONG: u16 = 4;

/// Little-endian header followed by an empty IFD0.
pub(crate) fn empty_block() -> Vec<u8> {
    let mut block = b"II*\0".to_vec();
    block.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    block.extend_from_slice(&0u16.to_le_bytes());
    block.extend_from_slice(&0u32.to_le_bytes());
    block
}

/// Merge `tags` into `original` and return the new block.
///
/// Each tag lands in the directory its group names (IFD0, Exif or GPS). A
/// tag already present is replaced; a missing Exif or GPS directory is
/// created. Fails on a block whose header or directories cannot be walked.
pub(crate) fn merge_tags(original: &[u8], tags: &[ExifTag]) -> io::Result<Vec<u8>> {
    let block = Block::parse(original)?;
    let mut ifd0 = block.read_directory(block.u32_at(4)?)?;
    let mut out = original.to_vec();

    for (group, pointer) in [
        (ExifTagGroup::ExifIFD, EXIF_IFD_POINTER),
        (ExifTagGroup::GPSIFD, GPS_IFD_POINTER),
    ] {
        let mut staged = tags.iter().filter(|t| t.get_group() == group).peekable();
        if staged.peek().is_none() {
            continue;
        }

        let mut directory = match ifd0.entries.get(&pointer) {
            Some(Entry::Raw(raw)) => block.read_directory(block.entry_u32(raw))?,
            _ => Directory::default(),
        };
        directory.stage(staged);
        let offset = directory.append_to(&mut out, &block.endian)?;
        ifd0.entries.insert(pointer, Entry::Pointer(offset));
    }

    ifd0.stage(tags.iter().filter(|t| t.get_group() == ExifTagGroup::IFD0));
    let offset = ifd0.append_to(&mut out, &block.endian)?;
    out[4..8].copy_from_slice(&encode_u32(&block.endian, offset));

    Ok(out)
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn to_offset(pos: usize) -> io::Result<u32> {
    u32::try_from(pos).map_err(|_| invalid("EXIF block exceeds 4 GiB"))
}

fn decode_u16(endian: &Endian, b: [u8; 2]) -> u16 {
    match endian {
        Endian::Little => u16::from_le_bytes(b),
        Endian::Big => u16::from_be_bytes(b),
    }
}

fn decode_u32(endian: &Endian, b: [u8; 4]) -> u32 {
    match endian {
        Endian::Little => u32::from_le_bytes(b),
        Endian::Big => u32::from_be_bytes(b),
    }
}

fn encode_u16(endian: &Endian, v: u16) -> [u8; 2] {
    match endian {
        Endian::Little => v.to_le_bytes(),
        Endian::Big => v.to_be_bytes(),
    }
}

fn encode_u32(endian: &Endian, v: u32) -> [u8; 4] {
    match endian {
        Endian::Little => v.to_le_bytes(),
        Endian::Big => v.to_be_bytes(),
    }
}

/// Byte-order aware, bounds-checked view of the original block.
struct Block<'a> {
    data: &'a [u8],
    endian: Endian,
}

impl<'a> Block<'a> {
    fn parse(data: &'a [u8]) -> io::Result<Self> {
        let endian = match data.get(0..2) {
            Some(b"II") => Endian::Little,
            Some(b"MM") => Endian::Big,
            _ => return Err(invalid("invalid TIFF byte order")),
        };
        let block = Self { data, endian };
        if block.u16_at(2)? != TIFF_MAGIC {
            return Err(invalid("invalid TIFF magic number"));
        }
        Ok(block)
    }

    fn bytes<const N: usize>(&self, at: usize) -> io::Result<[u8; N]> {
        at.checked_add(N)
            .and_then(|end| self.data.get(at..end))
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| invalid(format!("TIFF offset {at} out of bounds")))
    }

    fn u16_at(&self, at: usize) -> io::Result<u16> {
        Ok(decode_u16(&self.endian, self.bytes(at)?))
    }

    fn u32_at(&self, at: usize) -> io::Result<u32> {
        Ok(decode_u32(&self.endian, self.bytes(at)?))
    }

    /// Value field of a raw entry read as a LONG.
    fn entry_u32(&self, raw: &[u8; ENTRY_LEN]) -> u32 {
        decode_u32(&self.endian, [raw[8], raw[9], raw[10], raw[11]])
    }

    fn read_directory<'t>(&self, offset: u32) -> io::Result<Directory<'t>> {
        let start = offset as usize;
        if start < HEADER_LEN {
            return Err(invalid(format!("directory offset {offset} inside TIFF header")));
        }
        let count = self.u16_at(start)? as usize;

        let mut entries = BTreeMap::new();
        for i in 0..count {
            let raw: [u8; ENTRY_LEN] = self.bytes(start + 2 + i * ENTRY_LEN)?;
            let tag = decode_u16(&self.endian, [raw[0], raw[1]]);
            entries.insert(tag, Entry::Raw(raw));
        }
        let next = self.u32_at(start + 2 + count * ENTRY_LEN)?;

        Ok(Directory { entries, next })
    }
}

enum Entry<'t> {
    /// Entry copied as found; any offset it holds still points into the
    /// original bytes.
    Raw([u8; ENTRY_LEN]),
    /// New value to encode.
    Staged(&'t ExifTag),
    /// Sub-directory pointer to a rewritten directory.
    Pointer(u32),
}

/// One IFD, keyed (and therefore written) in ascending tag order.
#[derive(Default)]
struct Directory<'t> {
    entries: BTreeMap<u16, Entry<'t>>,
    next: u32,
}

impl<'t> Directory<'t> {
    fn stage(&mut self, tags: impl Iterator<Item = &'t ExifTag>) {
        for tag in tags {
            self.entries.insert(tag.as_u16(), Entry::Staged(tag));
        }
    }

    /// Write the directory and the out-of-line values of its staged entries
    /// at the end of `out`. Returns the directory's offset.
    fn append_to(&self, out: &mut Vec<u8>, endian: &Endian) -> io::Result<u32> {
        // IFDs and values start on a word boundary.
        if out.len() % 2 == 1 {
            out.push(0);
        }
        let start = out.len();
        let count = u16::try_from(self.entries.len())
            .map_err(|_| invalid("too many entries for one directory"))?;

        let table_len = 2 + self.entries.len() * ENTRY_LEN + 4;
        let mut table = Vec::with_capacity(table_len);
        let mut values = Vec::new();
        table.extend_from_slice(&encode_u16(endian, count));

        for (&id, entry) in &self.entries {
            match entry {
                Entry::Raw(raw) => table.extend_from_slice(raw),
                Entry::Pointer(offset) => {
                    table.extend_from_slice(&encode_u16(endian, id));
                    table.extend_from_slice(&encode_u16(endian, FORMAT_LONG));
                    table.extend_from_slice(&encode_u32(endian, 1));
                    table.extend_from_slice(&encode_u32(endian, *offset));
                }
                Entry::Staged(tag) => {
                    let value = tag.value_as_u8_vec(endian);
                    table.extend_from_slice(&encode_u16(endian, id));
                    table.extend_from_slice(&encode_u16(endian, tag.format().as_u16()));
                    table.extend_from_slice(&encode_u32(endian, tag.number_of_components()));

                    if value.len() <= 4 {
                        let mut inline = [0u8; 4];
                        inline[..value.len()].copy_from_slice(&value);
                        table.extend_from_slice(&inline);
                    } else {
                        let offset = to_offset(start + table_len + values.len())?;
                        table.extend_from_slice(&encode_u32(endian, offset));
                        values.extend_from_slice(&value);
                        if values.len() % 2 == 1 {
                            values.push(0);
                        }
                    }
                }
            }
        }
        table.extend_from_slice(&encode_u32(endian, self.next));

        out.extend_from_slice(&table);
        out.extend_from_slice(&values);
        to_offset(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use little_exif::rational::uR64;

    fn make(value: &str) -> ExifTag {
        ExifTag::UnknownSTRING(value.to_string(), 0x010f, ExifTagGroup::IFD0)
    }

    fn model(value: &str) -> ExifTag {
        ExifTag::UnknownSTRING(value.to_string(), 0x0110, ExifTagGroup::IFD0)
    }

    fn lens_model(value: &str) -> ExifTag {
        ExifTag::UnknownSTRING(value.to_string(), 0xa434, ExifTagGroup::ExifIFD)
    }

    fn gps_latitude() -> ExifTag {
        let r = |nominator, denominator| uR64 {
            nominator,
            denominator,
        };
        ExifTag::UnknownRATIONAL64U(
            vec![r(37, 1), r(46, 1), r(29640, 1000)],
            0x0002,
            ExifTagGroup::GPSIFD,
        )
    }

    /// IFD0 of a block, plus the directory a pointer entry leads to.
    fn ifd0(data: &[u8]) -> Directory<'static> {
        let block = Block::parse(data).unwrap();
        block.read_directory(block.u32_at(4).unwrap()).unwrap()
    }

    fn sub_directory(data: &[u8], pointer: u16) -> Directory<'static> {
        let block = Block::parse(data).unwrap();
        match ifd0(data).entries.get(&pointer) {
            Some(Entry::Raw(raw)) => block.read_directory(block.entry_u32(raw)).unwrap(),
            _ => panic!("no pointer {pointer:#06x} in IFD0"),
        }
    }

    fn raw(directory: &Directory<'_>, tag: u16) -> [u8; ENTRY_LEN] {
        match directory.entries.get(&tag) {
            Some(Entry::Raw(raw)) => *raw,
            _ => panic!("no entry {tag:#06x}"),
        }
    }

    /// Text of an ASCII entry longer than four bytes.
    fn text(data: &[u8], directory: &Directory<'_>, tag: u16) -> String {
        let block = Block::parse(data).unwrap();
        let entry = raw(directory, tag);
        let count = decode_u32(&block.endian, [entry[4], entry[5], entry[6], entry[7]]) as usize;
        let offset = block.entry_u32(&entry) as usize;
        String::from_utf8(data[offset..offset + count - 1].to_vec()).unwrap()
    }

    // ── directory placement ──

    #[test]
    fn tags_land_in_their_own_directories() {
        let tags = [make("Canon"), lens_model("EF 50mm"), gps_latitude()];
        let merged = merge_tags(&empty_block(), &tags).unwrap();

        let ifd0 = ifd0(&merged);
        assert!(ifd0.entries.contains_key(&0x010f));
        assert!(ifd0.entries.contains_key(&EXIF_IFD_POINTER));
        assert!(ifd0.entries.contains_key(&GPS_IFD_POINTER));
        assert!(!ifd0.entries.contains_key(&0x0002));
        assert!(!ifd0.entries.contains_key(&0xa434));

        let exif = sub_directory(&merged, EXIF_IFD_POINTER);
        assert_eq!(text(&merged, &exif, 0xa434), "EF 50mm");

        let gps = sub_directory(&merged, GPS_IFD_POINTER);
        let lat = raw(&gps, 0x0002);
        assert_eq!(u16::from_le_bytes([lat[2], lat[3]]), 5);
        assert_eq!(u32::from_le_bytes([lat[4], lat[5], lat[6], lat[7]]), 3);
    }

    #[test]
    fn entries_are_written_in_ascending_order() {
        let tags = [model("EOS R5"), make("Canon"), gps_latitude()];
        let merged = merge_tags(&empty_block(), &tags).unwrap();

        let block = Block::parse(&merged).unwrap();
        let start = block.u32_at(4).unwrap() as usize;
        let count = block.u16_at(start).unwrap() as usize;
        let ids: Vec<u16> = (0..count)
            .map(|i| block.u16_at(start + 2 + i * ENTRY_LEN).unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids, vec![0x010f, 0x0110, GPS_IFD_POINTER]);
    }

    // ── merging ──

    #[test]
    fn untouched_entries_and_bytes_survive() {
        let original = merge_tags(&empty_block(), &[make("OldCam"), lens_model("Kit lens")]).unwrap();
        let merged = merge_tags(&original, &[model("NewModel")]).unwrap();

        assert_eq!(&merged[HEADER_LEN..original.len()], &original[HEADER_LEN..]);

        let ifd0 = ifd0(&merged);
        assert_eq!(text(&merged, &ifd0, 0x010f), "OldCam");
        assert_eq!(text(&merged, &ifd0, 0x0110), "NewModel");
        let exif = sub_directory(&merged, EXIF_IFD_POINTER);
        assert_eq!(text(&merged, &exif, 0xa434), "Kit lens");
    }

    #[test]
    fn existing_sub_directory_is_extended() {
        let original = merge_tags(&empty_block(), &[lens_model("Kit lens")]).unwrap();
        let merged = merge_tags(
            &original,
            &[ExifTag::UnknownINT16U(vec![1], 0xa403, ExifTagGroup::ExifIFD)],
        )
        .unwrap();

        let exif = sub_directory(&merged, EXIF_IFD_POINTER);
        assert_eq!(exif.entries.len(), 2);
        assert_eq!(text(&merged, &exif, 0xa434), "Kit lens");
        let wb = raw(&exif, 0xa403);
        assert_eq!(&wb[8..10], &1u16.to_le_bytes());
    }

    #[test]
    fn replacing_a_tag_keeps_one_entry() {
        let original = merge_tags(&empty_block(), &[make("OldCam")]).unwrap();
        let merged = merge_tags(&original, &[make("NewCam")]).unwrap();

        let ifd0 = ifd0(&merged);
        assert_eq!(ifd0.entries.len(), 1);
        assert_eq!(text(&merged, &ifd0, 0x010f), "NewCam");
    }

    #[test]
    fn big_endian_block_stays_big_endian() {
        let mut original = b"MM\0*".to_vec();
        original.extend_from_slice(&8u32.to_be_bytes());
        original.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

        let orientation = ExifTag::UnknownINT16U(vec![6], 0x0112, ExifTagGroup::IFD0);
        let merged = merge_tags(&original, &[orientation]).unwrap();

        assert_eq!(&merged[0..4], b"MM\0*");
        let entry = raw(&ifd0(&merged), 0x0112);
        assert_eq!(&entry[0..2], &[0x01, 0x12]);
        assert_eq!(&entry[2..4], &[0x00, 0x03]);
        assert_eq!(&entry[8..12], &[0x00, 0x06, 0x00, 0x00]);
    }

    #[test]
    fn directories_and_values_start_on_word_boundaries() {
        let mut original = empty_block();
        original.push(0xff);

        // "Sony\0" is five bytes, so the model value needs a pad byte first.
        let merged = merge_tags(&original, &[make("Sony"), model("Alpha 7")]).unwrap();
        let block = Block::parse(&merged).unwrap();
        assert_eq!(block.u32_at(4).unwrap(), 16);

        let ifd0 = ifd0(&merged);
        assert_eq!(block.entry_u32(&raw(&ifd0, 0x0110)) % 2, 0);
        assert_eq!(text(&merged, &ifd0, 0x010f), "Sony");
        assert_eq!(text(&merged, &ifd0, 0x0110), "Alpha 7");
    }

    // ── malformed input ──

    #[test]
    fn rejects_non_tiff_data() {
        assert!(merge_tags(b"not a tiff block", &[make("X")]).is_err());
        assert!(merge_tags(b"II+\0\x08\0\0\0", &[make("X")]).is_err());
        assert!(merge_tags(b"", &[make("X")]).is_err());
    }

    #[test]
    fn rejects_directory_outside_block() {
        let mut block = b"II*\0".to_vec();
        block.extend_from_slice(&0x4000u32.to_le_bytes());
        let err = merge_tags(&block, &[make("X")]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut truncated = empty_block();
        truncated[8] = 5;
        assert!(merge_tags(&truncated, &[make("X")]).is_err());
    }
}
