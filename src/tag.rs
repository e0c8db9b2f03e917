//! The fixed set of EXIF tags carried from an original image to its copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which IFD a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfdGroup {
    /// Main image directory (IFD0)
    Ifd0,
    /// Exif sub-IFD
    Exif,
    /// GPS sub-IFD
    Gps,
}

/// On-disk value format of a tag, as far as this crate needs to know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// NUL-terminated ASCII
    Ascii,
    /// Unsigned 8-bit integers
    Byte,
    /// Unsigned 16-bit integers
    Short,
    /// Unsigned rationals (u32 numerator / u32 denominator)
    Rational,
    /// UNDEFINED bytes carrying text behind an 8-byte character code
    EncodedText,
}

/// A metadata tag transferred by [`MetadataTransfer`](crate::MetadataTransfer).
///
/// Variants are ordered so that iterating a snapshot visits IFD0 first, then
/// the Exif sub-IFD, then GPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    ImageDescription,
    Make,
    Model,
    Orientation,
    Software,
    DateTime,
    Artist,
    Copyright,
    ExposureTime,
    FNumber,
    IsoSpeedRatings,
    DateTimeOriginal,
    Flash,
    FocalLength,
    UserComment,
    WhiteBalance,
    GpsLatitudeRef,
    GpsLatitude,
    GpsLongitudeRef,
    GpsLongitude,
    GpsAltitudeRef,
    GpsAltitude,
    GpsTimestamp,
    GpsProcessingMethod,
    GpsDateStamp,
}

impl Tag {
    /// Every transferred tag, in snapshot order.
    pub const ALL: [Tag; 25] = [
        Tag::ImageDescription,
        Tag::Make,
        Tag::Model,
        Tag::Orientation,
        Tag::Software,
        Tag::DateTime,
        Tag::Artist,
        Tag::Copyright,
        Tag::ExposureTime,
        Tag::FNumber,
        Tag::IsoSpeedRatings,
        Tag::DateTimeOriginal,
        Tag::Flash,
        Tag::FocalLength,
        Tag::UserComment,
        Tag::WhiteBalance,
        Tag::GpsLatitudeRef,
        Tag::GpsLatitude,
        Tag::GpsLongitudeRef,
        Tag::GpsLongitude,
        Tag::GpsAltitudeRef,
        Tag::GpsAltitude,
        Tag::GpsTimestamp,
        Tag::GpsProcessingMethod,
        Tag::GpsDateStamp,
    ];

    /// Tags that describe where the image was taken.
    pub const GPS: [Tag; 9] = [
        Tag::GpsLatitudeRef,
        Tag::GpsLatitude,
        Tag::GpsLongitudeRef,
        Tag::GpsLongitude,
        Tag::GpsAltitudeRef,
        Tag::GpsAltitude,
        Tag::GpsTimestamp,
        Tag::GpsProcessingMethod,
        Tag::GpsDateStamp,
    ];

    /// Standard EXIF tag name.
    pub fn name(self) -> &'static str {
        match self {
            Tag::ImageDescription => "ImageDescription",
            Tag::Make => "Make",
            Tag::Model => "Model",
            Tag::Orientation => "Orientation",
            Tag::Software => "Software",
            Tag::DateTime => "DateTime",
            Tag::Artist => "Artist",
            Tag::Copyright => "Copyright",
            Tag::ExposureTime => "ExposureTime",
            Tag::FNumber => "FNumber",
            Tag::IsoSpeedRatings => "ISOSpeedRatings",
            Tag::DateTimeOriginal => "DateTimeOriginal",
            Tag::Flash => "Flash",
            Tag::FocalLength => "FocalLength",
            Tag::UserComment => "UserComment",
            Tag::WhiteBalance => "WhiteBalance",
            Tag::GpsLatitudeRef => "GPSLatitudeRef",
            Tag::GpsLatitude => "GPSLatitude",
            Tag::GpsLongitudeRef => "GPSLongitudeRef",
            Tag::GpsLongitude => "GPSLongitude",
            Tag::GpsAltitudeRef => "GPSAltitudeRef",
            Tag::GpsAltitude => "GPSAltitude",
            Tag::GpsTimestamp => "GPSTimeStamp",
            Tag::GpsProcessingMethod => "GPSProcessingMethod",
            Tag::GpsDateStamp => "GPSDateStamp",
        }
    }

    /// Numeric tag id within its IFD.
    pub fn code(self) -> u16 {
        match self {
            Tag::ImageDescription => 0x010E,
            Tag::Make => 0x010F,
            Tag::Model => 0x0110,
            Tag::Orientation => 0x0112,
            Tag::Software => 0x0131,
            Tag::DateTime => 0x0132,
            Tag::Artist => 0x013B,
            Tag::Copyright => 0x8298,
            Tag::ExposureTime => 0x829A,
            Tag::FNumber => 0x829D,
            Tag::IsoSpeedRatings => 0x8827,
            Tag::DateTimeOriginal => 0x9003,
            Tag::Flash => 0x9209,
            Tag::FocalLength => 0x920A,
            Tag::UserComment => 0x9286,
            Tag::WhiteBalance => 0xA403,
            Tag::GpsLatitudeRef => 0x0001,
            Tag::GpsLatitude => 0x0002,
            Tag::GpsLongitudeRef => 0x0003,
            Tag::GpsLongitude => 0x0004,
            Tag::GpsAltitudeRef => 0x0005,
            Tag::GpsAltitude => 0x0006,
            Tag::GpsTimestamp => 0x0007,
            Tag::GpsProcessingMethod => 0x001B,
            Tag::GpsDateStamp => 0x001D,
        }
    }

    pub fn group(self) -> IfdGroup {
        match self {
            Tag::ImageDescription
            | Tag::Make
            | Tag::Model
            | Tag::Orientation
            | Tag::Software
            | Tag::DateTime
            | Tag::Artist
            | Tag::Copyright => IfdGroup::Ifd0,
            Tag::ExposureTime
            | Tag::FNumber
            | Tag::IsoSpeedRatings
            | Tag::DateTimeOriginal
            | Tag::Flash
            | Tag::FocalLength
            | Tag::UserComment
            | Tag::WhiteBalance => IfdGroup::Exif,
            _ => IfdGroup::Gps,
        }
    }

    pub fn format(self) -> TagFormat {
        match self {
            Tag::ImageDescription
            | Tag::Make
            | Tag::Model
            | Tag::Software
            | Tag::DateTime
            | Tag::Artist
            | Tag::Copyright
            | Tag::DateTimeOriginal
            | Tag::GpsLatitudeRef
            | Tag::GpsLongitudeRef
            | Tag::GpsDateStamp => TagFormat::Ascii,
            Tag::GpsAltitudeRef => TagFormat::Byte,
            Tag::Orientation | Tag::IsoSpeedRatings | Tag::Flash | Tag::WhiteBalance => {
                TagFormat::Short
            }
            Tag::ExposureTime
            | Tag::FNumber
            | Tag::FocalLength
            | Tag::GpsLatitude
            | Tag::GpsLongitude
            | Tag::GpsAltitude
            | Tag::GpsTimestamp => TagFormat::Rational,
            Tag::UserComment | Tag::GpsProcessingMethod => TagFormat::EncodedText,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_tags_are_distinct() {
        let set: HashSet<Tag> = Tag::ALL.into_iter().collect();
        assert_eq!(set.len(), Tag::ALL.len());
    }

    #[test]
    fn codes_are_unique_within_a_group() {
        let mut seen = HashSet::new();
        for tag in Tag::ALL {
            assert!(
                seen.insert((tag.group(), tag.code())),
                "duplicate code for {tag}"
            );
        }
    }

    #[test]
    fn gps_tags_live_in_gps_ifd() {
        for tag in Tag::GPS {
            assert_eq!(tag.group(), IfdGroup::Gps, "{tag}");
        }
        let gps_count = Tag::ALL
            .into_iter()
            .filter(|t| t.group() == IfdGroup::Gps)
            .count();
        assert_eq!(gps_count, Tag::GPS.len());
    }

    #[test]
    fn formats_of_well_known_tags() {
        assert_eq!(Tag::Orientation.format(), TagFormat::Short);
        assert_eq!(Tag::GpsLatitude.format(), TagFormat::Rational);
        assert_eq!(Tag::Make.format(), TagFormat::Ascii);
        assert_eq!(Tag::UserComment.format(), TagFormat::EncodedText);
        assert_eq!(Tag::GpsAltitudeRef.format(), TagFormat::Byte);
    }
}
