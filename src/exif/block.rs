use crate::exif::{tags, IFDEntry, IFDValue};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{borrow::Cow, collections::BTreeMap};

/// The fields of one IFD, keyed by tag number. A `BTreeMap` keeps them in the ascending tag order
/// that TIFF requires when they are written back out.
pub type IfdMap = BTreeMap<u16, IFDValue>;

/// The five groups of fields that make up an Exif block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// IFD0, describing the primary image.
    Primary,
    Exif,
    Gps,
    Interop,
    /// IFD1, describing the embedded thumbnail.
    Thumbnail,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::Primary,
        Segment::Exif,
        Segment::Gps,
        Segment::Interop,
        Segment::Thumbnail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Segment::Primary => "primary",
            Segment::Exif => "exif",
            Segment::Gps => "gps",
            Segment::Interop => "interop",
            Segment::Thumbnail => "thumbnail",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A decoded Exif block. It always holds all five segments, possibly empty; the default value is
/// the empty block used for images that carry no metadata yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBlock {
    segments: [IfdMap; 5],
    thumbnail: Option<Vec<u8>>,
}

impl MetadataBlock {
    pub fn segment(&self, segment: Segment) -> &IfdMap {
        &self.segments[segment.index()]
    }

    pub fn segment_mut(&mut self, segment: Segment) -> &mut IfdMap {
        &mut self.segments[segment.index()]
    }

    pub fn get(&self, segment: Segment, tag: u16) -> Option<&IFDValue> {
        self.segment(segment).get(&tag)
    }

    /// Set a field, returning the value it replaced.
    pub fn insert(&mut self, segment: Segment, tag: u16, value: IFDValue) -> Option<IFDValue> {
        self.segment_mut(segment).insert(tag, value)
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn set_thumbnail(&mut self, thumbnail: Option<Vec<u8>>) {
        self.thumbnail = thumbnail;
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(BTreeMap::is_empty) && self.thumbnail.is_none()
    }

    /// Add parsed entries to a segment, leaving out the tags that only encode the layout of the
    /// payload. On duplicate tags the first entry wins.
    pub(crate) fn extend(&mut self, segment: Segment, entries: Vec<IFDEntry>) {
        let fields = self.segment_mut(segment);
        for entry in entries {
            if tags::is_structural(segment, entry.tag) {
                continue;
            }
            fields.entry(entry.tag).or_insert(entry.value);
        }
    }
}

struct NamedFields<'a>(Segment, &'a IfdMap);

impl Serialize for NamedFields<'_> {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let NamedFields(segment, fields) = self;
        let mut map = ser.serialize_map(Some(fields.len()))?;
        for (tag, value) in fields.iter() {
            let key = match tags::tag_name(*segment, *tag) {
                Some(name) => Cow::Borrowed(name),
                None => Cow::Owned(format!("0x{:04x}", tag)),
            };
            map.serialize_entry(&key, value)?;
        }
        map.end()
    }
}

impl Serialize for MetadataBlock {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = ser.serialize_map(Some(Segment::ALL.len() + 1))?;
        for segment in Segment::ALL.iter() {
            map.serialize_entry(segment.name(), &NamedFields(*segment, self.segment(*segment)))?;
        }
        map.serialize_entry("thumbnail_bytes", &self.thumbnail.as_ref().map(Vec::len))?;
        map.end()
    }
}
