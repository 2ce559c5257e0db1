//! Serialization of a [`MetadataBlock`] back into a TIFF-structured Exif payload.
//!
//! The payload is always written big-endian, in this order: header, IFD0, Exif IFD, GPS IFD,
//! Interop IFD, IFD1, thumbnail. Each IFD is followed by its own data area holding the values
//! that don't fit in an entry's four value bytes.

use crate::{
    error::{Error, Result},
    exif::{tags, IFDValue, MetadataBlock, Segment},
};
use std::{borrow::Cow, convert::TryFrom};

const TIFF_HEADER: &[u8] = b"MM\x00\x2a\x00\x00\x00\x08";

/// Size of the entry count, one entry, and the link to the next IFD.
const COUNT_SIZE: usize = 2;
const ENTRY_SIZE: usize = 12;
const NEXT_IFD_SIZE: usize = 4;

type Entries<'a> = Vec<(u16, Cow<'a, IFDValue>)>;

macro_rules! extend_be {
    ($out: expr, $values: expr) => {
        for x in $values.iter() {
            $out.extend_from_slice(&x.to_be_bytes());
        }
    };
}

impl IFDValue {
    /// Append the big-endian encoding of every component to `out`.
    fn write_be(&self, out: &mut Vec<u8>) {
        match self {
            IFDValue::UnsignedByte(v) | IFDValue::Undefined(v) => out.extend_from_slice(v),
            IFDValue::AsciiString(v) => {
                out.extend_from_slice(v);
                out.push(0);
            }
            IFDValue::SignedByte(v) => out.extend(v.iter().map(|&x| x as u8)),
            IFDValue::UnsignedShort(v) => extend_be!(out, v),
            IFDValue::SignedShort(v) => extend_be!(out, v),
            IFDValue::UnsignedLong(v) => extend_be!(out, v),
            IFDValue::SignedLong(v) => extend_be!(out, v),
            IFDValue::SingleFloat(v) => extend_be!(out, v),
            IFDValue::DoubleFloat(v) => extend_be!(out, v),
            IFDValue::UnsignedRational(v) => v.iter().for_each(|r| {
                out.extend_from_slice(&r.numerator.to_be_bytes());
                out.extend_from_slice(&r.denominator.to_be_bytes());
            }),
            IFDValue::SignedRational(v) => v.iter().for_each(|r| {
                out.extend_from_slice(&r.numerator.to_be_bytes());
                out.extend_from_slice(&r.denominator.to_be_bytes());
            }),
        }
    }

    fn encoded_size(&self) -> usize {
        self.n_components() * self.format().bytes_per_component()
    }
}

/// Bytes taken by a value in an IFD's data area. Values of up to four bytes are stored inline,
/// the rest are padded so that every value starts on a word boundary.
fn data_area_size(value: &IFDValue) -> usize {
    match value.encoded_size() {
        n if n <= 4 => 0,
        n => n + n % 2,
    }
}

fn ifd_size(entries: &Entries) -> usize {
    COUNT_SIZE
        + ENTRY_SIZE * entries.len()
        + NEXT_IFD_SIZE
        + entries.iter().map(|(_, v)| data_area_size(v)).sum::<usize>()
}

fn to_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::Encode(format!("{} does not fit in 32 bits", what)))
}

/// Collect the fields of a segment, leaving out any stray layout tags: those are regenerated.
fn fields(block: &MetadataBlock, segment: Segment) -> Entries<'_> {
    block
        .segment(segment)
        .iter()
        .filter(|(tag, _)| !tags::is_structural(segment, **tag))
        .map(|(tag, value)| (*tag, Cow::Borrowed(value)))
        .collect()
}

fn set_pointer(entries: &mut Entries, tag: u16, offset: u32) {
    let value = Cow::Owned(IFDValue::UnsignedLong(vec![offset]));
    match entries.iter_mut().find(|(t, _)| *t == tag) {
        Some(entry) => entry.1 = value,
        None => {
            entries.push((tag, value));
            entries.sort_by_key(|(t, _)| *t);
        }
    }
}

/// Write one IFD, starting at `offset` bytes into the payload (which must be `out.len()`).
fn write_ifd(out: &mut Vec<u8>, entries: &Entries, next_ifd: u32) -> Result<()> {
    let offset = out.len();
    let count = u16::try_from(entries.len())
        .map_err(|_| Error::Encode(format!("too many fields in one IFD ({})", entries.len())))?;

    let mut data_offset = offset + COUNT_SIZE + ENTRY_SIZE * entries.len() + NEXT_IFD_SIZE;
    let mut data_area = Vec::new();

    out.extend_from_slice(&count.to_be_bytes());
    for (tag, value) in entries.iter() {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&(value.format() as u16).to_be_bytes());
        out.extend_from_slice(&to_u32(value.n_components(), "component count")?.to_be_bytes());

        let mut encoded = Vec::with_capacity(value.encoded_size());
        value.write_be(&mut encoded);
        if encoded.len() <= 4 {
            encoded.resize(4, 0);
            out.extend_from_slice(&encoded);
        } else {
            out.extend_from_slice(&to_u32(data_offset, "value offset")?.to_be_bytes());
            if encoded.len() % 2 == 1 {
                encoded.push(0);
            }
            data_offset += encoded.len();
            data_area.extend_from_slice(&encoded);
        }
    }
    out.extend_from_slice(&next_ifd.to_be_bytes());
    out.extend_from_slice(&data_area);
    Ok(())
}

impl MetadataBlock {
    /// Serialize the block into a TIFF-structured Exif payload (without the `Exif\0\0`
    /// identifier). Sub-IFDs are only written when they hold fields; IFD1 only when it holds
    /// fields or there is a thumbnail.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut ifd0 = fields(self, Segment::Primary);
        let mut exif = fields(self, Segment::Exif);
        let gps = fields(self, Segment::Gps);
        let interop = fields(self, Segment::Interop);
        let mut ifd1 = fields(self, Segment::Thumbnail);

        let has_interop = !interop.is_empty();
        let has_exif = !exif.is_empty() || has_interop;
        let has_gps = !gps.is_empty();
        let has_ifd1 = !ifd1.is_empty() || self.thumbnail().is_some();

        // Insert placeholder pointers first so that every IFD has its final size; the values are
        // patched once the offsets are known.
        if has_exif {
            set_pointer(&mut ifd0, tags::image::EXIF_IFD_POINTER, 0);
        }
        if has_gps {
            set_pointer(&mut ifd0, tags::image::GPS_IFD_POINTER, 0);
        }
        if has_interop {
            set_pointer(&mut exif, tags::exif::INTEROPERABILITY_IFD_POINTER, 0);
        }
        if let Some(thumbnail) = self.thumbnail() {
            let length = to_u32(thumbnail.len(), "thumbnail length")?;
            set_pointer(&mut ifd1, tags::image::JPEG_INTERCHANGE_FORMAT, 0);
            set_pointer(&mut ifd1, tags::image::JPEG_INTERCHANGE_FORMAT_LENGTH, length);
        }

        let ifd0_offset = TIFF_HEADER.len();
        let exif_offset = ifd0_offset + ifd_size(&ifd0);
        let gps_offset = exif_offset + if has_exif { ifd_size(&exif) } else { 0 };
        let interop_offset = gps_offset + if has_gps { ifd_size(&gps) } else { 0 };
        let ifd1_offset = interop_offset + if has_interop { ifd_size(&interop) } else { 0 };
        let thumbnail_offset = ifd1_offset + if has_ifd1 { ifd_size(&ifd1) } else { 0 };

        if has_exif {
            let offset = to_u32(exif_offset, "Exif IFD offset")?;
            set_pointer(&mut ifd0, tags::image::EXIF_IFD_POINTER, offset);
        }
        if has_gps {
            let offset = to_u32(gps_offset, "GPS IFD offset")?;
            set_pointer(&mut ifd0, tags::image::GPS_IFD_POINTER, offset);
        }
        if has_interop {
            let offset = to_u32(interop_offset, "Interop IFD offset")?;
            set_pointer(&mut exif, tags::exif::INTEROPERABILITY_IFD_POINTER, offset);
        }
        if self.thumbnail().is_some() {
            let offset = to_u32(thumbnail_offset, "thumbnail offset")?;
            set_pointer(&mut ifd1, tags::image::JPEG_INTERCHANGE_FORMAT, offset);
        }

        let thumbnail_len = self.thumbnail().map_or(0, <[u8]>::len);
        let mut out = Vec::with_capacity(thumbnail_offset + thumbnail_len);
        out.extend_from_slice(TIFF_HEADER);

        let next = if has_ifd1 { to_u32(ifd1_offset, "IFD1 offset")? } else { 0 };
        write_ifd(&mut out, &ifd0, next)?;
        if has_exif {
            write_ifd(&mut out, &exif, 0)?;
        }
        if has_gps {
            write_ifd(&mut out, &gps, 0)?;
        }
        if has_interop {
            write_ifd(&mut out, &interop, 0)?;
        }
        if has_ifd1 {
            write_ifd(&mut out, &ifd1, 0)?;
        }
        debug_assert_eq!(out.len(), thumbnail_offset);
        if let Some(thumbnail) = self.thumbnail() {
            out.extend_from_slice(thumbnail);
        }

        Ok(out)
    }
}
