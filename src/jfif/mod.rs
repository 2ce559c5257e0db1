//! Traits and functions for dealing with JFIF data in an image.
//!
//! Only the segments in front of the first scan are parsed. The entropy-coded data from SOS
//! onwards is kept as raw bytes and written back untouched.

mod marker_codes;

pub use marker_codes::JFIFMarkerCode;

use crate::{
    error::{Error, Result},
    exif::{MetadataBlock, EXIF_HEADER},
    parse,
};
use nom::error::context;
use std::fmt;

/// Largest data section that fits behind a segment's 16-bit length field, which counts itself.
pub const MAX_SEGMENT_DATA_SIZE: usize = u16::MAX as usize - 2;

pub trait ParseableSegment {
    /// Returns `true` if we believe that this `ParseableSegment` can parse this segment of the
    /// input. Otherwise, returns `false`.
    fn can_parse_segment(i: parse::Input) -> bool
    where
        Self: Sized;

    /// Returns the segment marker for the parsed segment.
    fn marker(&self) -> JFIFMarkerCode;

    /// Returns the bytes of the segment's data section, as they are written back to the file.
    fn data(&self) -> &[u8];

    /// Returns the size (in bytes) of the JFIF segment's data section. If the segment doesn't have
    /// a data section, this function returns `None`.
    fn data_size(&self) -> Option<usize> {
        if self.marker().is_standalone() {
            None
        } else {
            Some(self.data().len())
        }
    }

    /// Returns the full size of the JFIF segment, including the size bytes and the magic bytes at
    /// the start of the segment.
    fn segment_size(&self) -> usize {
        match self.data_size() {
            None => 2,
            Some(sz) => sz + 4,
        }
    }

    /// Parse the data bytes of the JFIF segment, returning a new instance of the
    /// `ParseableSegment` implementor. `magic` contains the marker bytes for the segment, and
    /// `size` is the size of the data section.
    fn parse_data_bytes(
        i: parse::Input,
        magic: JFIFMarkerCode,
        data_size: usize,
    ) -> parse::Result<Self>
    where
        Self: Sized;

    /// Parse the JFIF segment starting from the segment marker.
    fn parse(i: parse::Input) -> parse::Result<Self>
    where
        Self: Sized,
    {
        use nom::{bytes::complete::take, combinator::verify, number::complete::be_u16};

        let (i, magic) = context("Segment magic", JFIFMarkerCode::parse)(i)?;

        let (i, data, data_size) = if magic.is_standalone() {
            (i, &i[0..0], 0)
        } else {
            // The stored size includes the two bytes that are used to store the size, so it must
            // always be >= 2.
            let mut parser = context("Data section size", verify(be_u16, |&x| x >= 2));
            let (i, data_size) = parser(i)?;
            let data_size = (data_size - 2) as usize;

            let (i, data) = context("Data section", take(data_size))(i)?;
            (i, data, data_size)
        };

        let (_, result) = context("Data section parser", |x| {
            Self::parse_data_bytes(x, magic, data_size)
        })(data)?;
        Ok((i, result))
    }

    /// Append the segment, marker and length included, to `out`.
    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.marker().is_standalone() {
            out.extend_from_slice(&self.marker().as_bytes());
            Ok(())
        } else {
            write_segment(out, self.marker(), &[self.data()])
        }
    }
}

/// Append a segment whose data section is the concatenation of `parts`.
fn write_segment(out: &mut Vec<u8>, marker: JFIFMarkerCode, parts: &[&[u8]]) -> Result<()> {
    let data_size: usize = parts.iter().map(|p| p.len()).sum();
    if data_size > MAX_SEGMENT_DATA_SIZE {
        return Err(Error::Encode(format!(
            "{:?} segment of {} bytes exceeds the JPEG limit of {} bytes",
            marker, data_size, MAX_SEGMENT_DATA_SIZE
        )));
    }

    out.extend_from_slice(&marker.as_bytes());
    out.extend_from_slice(&((data_size + 2) as u16).to_be_bytes());
    for part in parts {
        out.extend_from_slice(part);
    }
    Ok(())
}

/// A type implementing the `ParseableSegment` trait that can be used to match an arbitrary JFIF
/// segment.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownJFIFSegment {
    pub magic: JFIFMarkerCode,
    pub data: Vec<u8>,
}

impl ParseableSegment for UnknownJFIFSegment {
    fn can_parse_segment(i: parse::Input) -> bool {
        // Any segment that begins with a valid marker will do
        JFIFMarkerCode::parse(i).is_ok()
    }

    fn marker(&self) -> JFIFMarkerCode {
        self.magic
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn parse_data_bytes(
        i: parse::Input,
        magic: JFIFMarkerCode,
        data_size: usize,
    ) -> parse::Result<Self> {
        use nom::bytes::complete::take;

        let (i, data) = context("UnknownJFIFSegment data bytes", take(data_size))(i)?;
        let seg = UnknownJFIFSegment {
            magic,
            data: data.to_vec(),
        };

        Ok((i, seg))
    }
}

/// An APP1 segment carrying Exif metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifSegment {
    /// The whole data section: the `Exif\0\0` identifier followed by the TIFF payload.
    pub data: Vec<u8>,
    pub block: MetadataBlock,
}

impl ExifSegment {
    pub const MARKER: JFIFMarkerCode = JFIFMarkerCode::APPm(1);
}

impl ParseableSegment for ExifSegment {
    fn can_parse_segment(i: parse::Input) -> bool {
        use nom::{bytes::complete::tag, number::complete::be_u16, sequence::tuple};

        let marker = Self::MARKER.as_bytes();
        let result: parse::Result<_> = tuple((tag(&marker[..]), be_u16, tag(EXIF_HEADER)))(i);
        result.is_ok()
    }

    fn marker(&self) -> JFIFMarkerCode {
        Self::MARKER
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn parse_data_bytes(
        i: parse::Input,
        _magic: JFIFMarkerCode,
        _data_size: usize,
    ) -> parse::Result<Self> {
        use nom::bytes::complete::tag;

        let data = i;
        let (i, _) = context("Exif header", tag(EXIF_HEADER))(i)?;
        let (i, block) = context("Exif payload", MetadataBlock::parse)(i)?;

        Ok((
            i,
            ExifSegment {
                data: data.to_vec(),
                block,
            },
        ))
    }
}

/// An enum that wraps around different segment types that we can detect in a JPEG image.
#[derive(Clone, PartialEq)]
pub enum JFIFSegment {
    ExifSegment(ExifSegment),
    Unknown(UnknownJFIFSegment),
}

impl fmt::Debug for JFIFSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JFIFSegment::ExifSegment(_) => write!(f, "ExifSegment"),
            JFIFSegment::Unknown(seg) => write!(f, "{:?} segment", seg.magic),
        }
    }
}

impl JFIFSegment {
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        let (_, magic) = context("Segment magic", JFIFMarkerCode::parse)(i)?;

        if magic == ExifSegment::MARKER && ExifSegment::can_parse_segment(i) {
            let (i, seg) = context("JFIFSegment::ExifSegment", ExifSegment::parse)(i)?;
            Ok((i, JFIFSegment::ExifSegment(seg)))
        } else {
            let (i, seg) = context("JFIFSegment::Unknown", UnknownJFIFSegment::parse)(i)?;
            Ok((i, JFIFSegment::Unknown(seg)))
        }
    }

    pub fn data(&self) -> &dyn ParseableSegment {
        match self {
            JFIFSegment::ExifSegment(data) => data,
            JFIFSegment::Unknown(data) => data,
        }
    }
}

/// A JPEG file, split into the segments that precede the first scan and the raw remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct JPEGFile<'a> {
    pub segments: Vec<JFIFSegment>,
    /// Everything from the SOS (or EOI) marker to the end of the file.
    pub scan_data: parse::Input<'a>,
}

impl<'a> JPEGFile<'a> {
    pub fn parse(i: parse::Input<'a>) -> parse::Result<'a, Self> {
        use nom::bytes::complete::tag;

        let soi = JFIFMarkerCode::SOI.as_bytes();
        let (mut i, _) = context("Start of image", tag(&soi[..]))(i)?;

        let mut segments = Vec::new();
        loop {
            // Any marker may be preceded by 0xFF fill bytes
            while i.len() > 2 && i[0] == 0xFF && i[1] == 0xFF {
                i = &i[1..];
            }

            let (_, magic) = context("Segment magic", JFIFMarkerCode::parse)(i)?;
            if magic == JFIFMarkerCode::SOS || magic == JFIFMarkerCode::EOI {
                let end = &i[i.len()..];
                return Ok((
                    end,
                    JPEGFile {
                        segments,
                        scan_data: i,
                    },
                ));
            }

            let (next, segment) = context("JFIF segment", JFIFSegment::parse)(i)?;
            segments.push(segment);
            i = next;
        }
    }

    /// The metadata of the first Exif segment, if there is one.
    pub fn exif(&self) -> Option<&MetadataBlock> {
        self.segments.iter().find_map(|seg| match seg {
            JFIFSegment::ExifSegment(exif) => Some(&exif.block),
            JFIFSegment::Unknown(_) => None,
        })
    }

    /// Re-assemble the file with `tiff` (a TIFF-structured Exif payload) as its only Exif segment.
    /// The new segment goes right after SOI and any leading APP0 (JFIF/JFXX) segments, which
    /// decoders expect to come first.
    pub fn write_with_exif(&self, tiff: &[u8]) -> Result<Vec<u8>> {
        let size = 2
            + self.segments.iter().map(|s| s.data().segment_size()).sum::<usize>()
            + EXIF_HEADER.len()
            + tiff.len()
            + 4
            + self.scan_data.len();
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&JFIFMarkerCode::SOI.as_bytes());

        let n_app0 = self
            .segments
            .iter()
            .take_while(|s| s.data().marker() == JFIFMarkerCode::APPm(0))
            .count();
        let (app0, rest) = self.segments.split_at(n_app0);

        for segment in app0 {
            segment.data().write(&mut out)?;
        }
        write_segment(&mut out, ExifSegment::MARKER, &[EXIF_HEADER, tiff])?;
        for segment in rest {
            if let JFIFSegment::Unknown(seg) = segment {
                seg.write(&mut out)?;
            }
        }

        out.extend_from_slice(self.scan_data);
        Ok(out)
    }
}
