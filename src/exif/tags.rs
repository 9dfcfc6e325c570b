//! Tags the JPEG codec knows how to read and write.

use kamadak_exif::{Context, Rational, Tag, Value};

/// Directory a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagGroup {
    Ifd0,
    Exif,
    Gps,
}

/// On-disk value type of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// NUL-terminated ASCII.
    Ascii,
    /// Comma-separated 16-bit unsigned integers.
    Short,
    /// Comma-separated 32-bit unsigned integers.
    Long,
    /// Comma-separated `num/den` pairs.
    Rational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub name: &'static str,
    pub id: u16,
    pub group: TagGroup,
    pub format: TagFormat,
}

const fn tag(name: &'static str, id: u16, group: TagGroup, format: TagFormat) -> TagSpec {
    TagSpec { name, id, group, format }
}

pub const TAGS: &[TagSpec] = &[
    tag("ImageWidth", 0x0100, TagGroup::Ifd0, TagFormat::Long),
    tag("ImageLength", 0x0101, TagGroup::Ifd0, TagFormat::Long),
    tag("ImageDescription", 0x010E, TagGroup::Ifd0, TagFormat::Ascii),
    tag("Make", 0x010F, TagGroup::Ifd0, TagFormat::Ascii),
    tag("Model", 0x0110, TagGroup::Ifd0, TagFormat::Ascii),
    tag("Orientation", 0x0112, TagGroup::Ifd0, TagFormat::Short),
    tag("Software", 0x0131, TagGroup::Ifd0, TagFormat::Ascii),
    tag("DateTime", 0x0132, TagGroup::Ifd0, TagFormat::Ascii),
    tag("Artist", 0x013B, TagGroup::Ifd0, TagFormat::Ascii),
    tag("Copyright", 0x8298, TagGroup::Ifd0, TagFormat::Ascii),
    tag("ExposureTime", 0x829A, TagGroup::Exif, TagFormat::Rational),
    tag("FNumber", 0x829D, TagGroup::Exif, TagFormat::Rational),
    tag("ISOSpeedRatings", 0x8827, TagGroup::Exif, TagFormat::Short),
    tag("DateTimeOriginal", 0x9003, TagGroup::Exif, TagFormat::Ascii),
    tag("DateTimeDigitized", 0x9004, TagGroup::Exif, TagFormat::Ascii),
    tag("Flash", 0x9209, TagGroup::Exif, TagFormat::Short),
    tag("FocalLength", 0x920A, TagGroup::Exif, TagFormat::Rational),
    tag("WhiteBalance", 0xA403, TagGroup::Exif, TagFormat::Short),
    tag("GPSLatitudeRef", 0x0001, TagGroup::Gps, TagFormat::Ascii),
    tag("GPSLatitude", 0x0002, TagGroup::Gps, TagFormat::Rational),
    tag("GPSLongitudeRef", 0x0003, TagGroup::Gps, TagFormat::Ascii),
    tag("GPSLongitude", 0x0004, TagGroup::Gps, TagFormat::Rational),
];

/// Find a tag by its EXIF name (case-sensitive).
pub fn lookup(name: &str) -> Option<&'static TagSpec> {
    TAGS.iter().find(|spec| spec.name == name)
}

impl TagGroup {
    /// The directory context a tag number is read in.
    pub fn context(self) -> Context {
        match self {
            Self::Ifd0 => Context::Tiff,
            Self::Exif => Context::Exif,
            Self::Gps => Context::Gps,
        }
    }
}

impl TagSpec {
    pub fn tag(&self) -> Tag {
        Tag(self.group.context(), self.id)
    }
}

impl TagFormat {
    /// Parse a wire value into a typed field value.
    ///
    /// Returns `None` if the value does not fit the format.
    pub fn to_value(self, value: &str) -> Option<Value> {
        let parts = || value.split(',').map(str::trim);
        match self {
            Self::Ascii => Some(Value::Ascii(vec![value.as_bytes().to_vec()])),
            Self::Short => parts()
                .map(|part| part.parse::<u16>().ok())
                .collect::<Option<Vec<_>>>()
                .map(Value::Short),
            Self::Long => parts()
                .map(|part| part.parse::<u32>().ok())
                .collect::<Option<Vec<_>>>()
                .map(Value::Long),
            Self::Rational => parts()
                .map(|part| {
                    let (num, den) = part.split_once('/')?;
                    Some(Rational::from((
                        num.trim().parse::<u32>().ok()?,
                        den.trim().parse::<u32>().ok()?,
                    )))
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::Rational),
        }
    }
}
