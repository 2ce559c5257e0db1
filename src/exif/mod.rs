//! Parsing for the Exif data structure.
//!
//! An Exif payload is a small TIFF file: a header giving the byte order, followed by a chain of
//! IFDs (Image File Directories). IFD0 describes the primary image and links to the Exif and GPS
//! sub-IFDs; the Exif sub-IFD links to the Interoperability IFD; IFD0's "next" link is IFD1,
//! which describes the embedded thumbnail. All of them are flattened into a [`MetadataBlock`].

mod block;
mod encode;
pub mod gps;
pub mod tags;

pub use block::{IfdMap, MetadataBlock, Segment};

use crate::{
    error::Error,
    impl_parse_for_enum, parse,
};
use derive_try_from_primitive::TryFromPrimitive;
use nom::{bytes::complete::take, error::context, sequence::tuple};
use serde::{ser::SerializeTuple, Serialize, Serializer};
use std::convert::TryFrom;

/// Identifier that precedes the TIFF payload inside a JPEG APP1 segment.
pub const EXIF_HEADER: &[u8] = b"Exif\x00\x00";

impl MetadataBlock {
    /// Parse a TIFF-structured Exif payload (without the `Exif\0\0` identifier).
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        let original_input = i;
        let (_, tiff_header) = context("TIFF header", TIFFHeader::parse)(i)?;
        let alignment = tiff_header.alignment;

        let ifd0_offset = tiff_header.initial_offset;
        let (_, ifd0) = IFD::parse_at(original_input, ifd0_offset, alignment, "IFD0")?;
        let mut block = MetadataBlock::default();

        if let Some(offset) = ifd0.offset_of(tags::image::EXIF_IFD_POINTER) {
            let (_, exif_ifd) = IFD::parse_at(original_input, offset, alignment, "Exif IFD")?;
            if let Some(offset) = exif_ifd.offset_of(tags::exif::INTEROPERABILITY_IFD_POINTER) {
                let (_, interop_ifd) =
                    IFD::parse_at(original_input, offset, alignment, "Interoperability IFD")?;
                block.extend(Segment::Interop, interop_ifd.entries);
            }
            block.extend(Segment::Exif, exif_ifd.entries);
        }

        if let Some(offset) = ifd0.offset_of(tags::image::GPS_IFD_POINTER) {
            let (_, gps_ifd) = IFD::parse_at(original_input, offset, alignment, "GPS IFD")?;
            block.extend(Segment::Gps, gps_ifd.entries);
        }

        if let Some(offset) = ifd0.offset_to_next {
            let (_, ifd1) = IFD::parse_at(original_input, offset, alignment, "IFD1")?;
            let start = ifd1.offset_of(tags::image::JPEG_INTERCHANGE_FORMAT);
            let length = ifd1.offset_of(tags::image::JPEG_INTERCHANGE_FORMAT_LENGTH);
            if let (Some(start), Some(length)) = (start, length) {
                let (at, _) = parse::seek(original_input, start as usize, "Thumbnail offset")?;
                let (_, thumbnail) = context("Thumbnail data", take(length as usize))(at)?;
                block.set_thumbnail(Some(thumbnail.to_vec()));
            }
            block.extend(Segment::Thumbnail, ifd1.entries);
        }

        block.extend(Segment::Primary, ifd0.entries);

        let rest = &original_input[original_input.len()..];
        Ok((rest, block))
    }

    /// Decode a TIFF-structured Exif payload, converting parse failures into a readable error.
    pub fn decode(data: &[u8]) -> crate::error::Result<Self> {
        match Self::parse(data) {
            Ok((_, block)) => Ok(block),
            Err(e) => Err(Error::Metadata(parse::pretty_error_message(data, e))),
        }
    }
}

/// TIFF header used within the Exif data structure to specify its layout.
#[derive(Debug)]
pub struct TIFFHeader {
    pub alignment: TIFFByteAlignment,
    pub initial_offset: u32,
}

impl TIFFHeader {
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        use nom::combinator::verify;

        let (i, alignment) = context("Byte alignment", TIFFByteAlignment::parse)(i)?;
        let (i, _) = context(
            "Alignment check",
            verify(|x| alignment.parse_u16(x), |&x| x == 0x002a),
        )(i)?;
        let (i, initial_offset) = context("Initial offset", |x| alignment.parse_u32(x))(i)?;

        Ok((
            i,
            TIFFHeader {
                alignment,
                initial_offset,
            },
        ))
    }
}

/// Two-byte tag representing the byte alignment for the TIFF data.
#[derive(Debug, Clone, Copy, TryFromPrimitive, PartialEq, Eq)]
#[repr(u16)]
pub enum TIFFByteAlignment {
    LittleEndian = 0x4949, // "II" = Intel-type byte alignment
    BigEndian = 0x4d4d,    // "MM" = Motorola-type byte alignment
}

macro_rules! TIFFByteAlignment_parse_numeric {
    ($fn_name: ident, $type: ident, $le_number_parser: ident, $be_number_parser: ident) => {
        impl TIFFByteAlignment {
            pub fn $fn_name<'a>(&self, i: parse::Input<'a>) -> parse::Result<'a, $type> {
                use nom::number::complete::{$be_number_parser, $le_number_parser};
                match self {
                    TIFFByteAlignment::LittleEndian => $le_number_parser(i),
                    TIFFByteAlignment::BigEndian => $be_number_parser(i),
                }
            }
        }
    };
}

impl_parse_for_enum!(TIFFByteAlignment, be_u16);
TIFFByteAlignment_parse_numeric!(parse_u8, u8, le_u8, be_u8);
TIFFByteAlignment_parse_numeric!(parse_i8, i8, le_i8, be_i8);
TIFFByteAlignment_parse_numeric!(parse_u16, u16, le_u16, be_u16);
TIFFByteAlignment_parse_numeric!(parse_i16, i16, le_i16, be_i16);
TIFFByteAlignment_parse_numeric!(parse_u32, u32, le_u32, be_u32);
TIFFByteAlignment_parse_numeric!(parse_i32, i32, le_i32, be_i32);
TIFFByteAlignment_parse_numeric!(parse_f32, f32, le_f32, be_f32);
TIFFByteAlignment_parse_numeric!(parse_f64, f64, le_f64, be_f64);

impl TIFFByteAlignment {
    pub fn parse_rational<'a>(&self, i: parse::Input<'a>) -> parse::Result<'a, Rational> {
        let (i, (numerator, denominator)) =
            tuple((|x| self.parse_u32(x), |x| self.parse_u32(x)))(i)?;
        Ok((i, Rational::new(numerator, denominator)))
    }

    pub fn parse_signed_rational<'a>(
        &self,
        i: parse::Input<'a>,
    ) -> parse::Result<'a, SignedRational> {
        let (i, (numerator, denominator)) =
            tuple((|x| self.parse_i32(x), |x| self.parse_i32(x)))(i)?;
        Ok((i, SignedRational::new(numerator, denominator)))
    }
}

/// Encapsulates an IFD (Image File Directory) in the image metadata.
#[derive(Debug)]
pub struct IFD {
    pub entries: Vec<IFDEntry>,
    pub offset_to_next: Option<u32>,
}

impl IFD {
    pub fn parse<'a>(
        i: parse::Input<'a>,
        original_input: parse::Input<'a>,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<'a, Self> {
        let (i, num_entries) = context("Number of IFD entries", |x| alignment.parse_u16(x))(i)?;
        let mut entries = Vec::new();
        let mut current_input = i;

        for _ in 0..num_entries {
            let (next_i, entry) = context("IFD entry", |i| {
                IFDEntry::parse(i, original_input, alignment)
            })(current_input)?;
            current_input = next_i;
            entries.push(entry);
        }

        let i = current_input;
        let (i, offset_to_next) = context("Offset to next IFD", |x| alignment.parse_u32(x))(i)?;
        let offset_to_next = if offset_to_next == 0 {
            None
        } else {
            Some(offset_to_next)
        };

        Ok((
            i,
            IFD {
                entries,
                offset_to_next,
            },
        ))
    }

    /// Parse the IFD located `offset` bytes into the TIFF payload.
    pub fn parse_at<'a>(
        original_input: parse::Input<'a>,
        offset: u32,
        alignment: TIFFByteAlignment,
        ctx: &'static str,
    ) -> parse::Result<'a, Self> {
        let (i, _) = parse::seek(original_input, offset as usize, ctx)?;
        context(ctx, |x| IFD::parse(x, original_input, alignment))(i)
    }

    /// Read a pointer-style entry (a single LONG or SHORT), such as the offset of a sub-IFD.
    pub fn offset_of(&self, tag: u16) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .and_then(|e| match &e.value {
                IFDValue::UnsignedLong(v) => v.first().copied(),
                IFDValue::UnsignedShort(v) => v.first().map(|&x| x as u32),
                _ => None,
            })
    }
}

/// Represents a single IFD (Image File Directory) entry
#[derive(Debug, Clone, PartialEq)]
pub struct IFDEntry {
    pub tag: u16,
    pub value: IFDValue,
}

impl IFDEntry {
    pub fn parse<'a>(
        i: parse::Input<'a>,
        original_input: parse::Input<'a>,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<'a, Self> {
        let (i, (tag, data_format, n_components)) = tuple((
            context("IFD tag", |x| alignment.parse_u16(x)),
            context("Data format", |x| IFDDataFormat::parse(x, alignment)),
            context("Number of components", |x| alignment.parse_u32(x)),
        ))(i)?;

        let content_size = data_format.bytes_per_component() as u64 * n_components as u64;
        // A size that does not fit in memory can't fit in the payload either; `take` rejects it.
        let content_size = usize::try_from(content_size).unwrap_or(usize::MAX);

        // If the total data size is <= 4 bytes, then the data is stored within the next four
        // bytes. Otherwise, an offset is stored, and we have to extract the value by visiting that
        // offset.
        let (i, data) = if content_size <= 4 {
            let (i, field) = context("IFD entry inline value", take(4usize))(i)?;
            (i, &field[..content_size])
        } else {
            let (i, offset) = context("IFD entry offset", |x| alignment.parse_u32(x))(i)?;
            let (at, _) = parse::seek(original_input, offset as usize, "IFD entry offset")?;
            let (_, data) = context("IFD entry contents", take(content_size))(at)?;
            (i, data)
        };

        let (_, value) = context("IFD entry value", |x| {
            IFDValue::parse(x, data_format, n_components, alignment)
        })(data)?;

        Ok((i, IFDEntry { tag, value }))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(u16)]
pub enum IFDDataFormat {
    UnsignedByte = 1,
    AsciiString = 2,
    UnsignedShort = 3,
    UnsignedLong = 4,
    UnsignedRational = 5,
    SignedByte = 6,
    Undefined = 7,
    SignedShort = 8,
    SignedLong = 9,
    SignedRational = 10,
    SingleFloat = 11,
    DoubleFloat = 12,
}

impl IFDDataFormat {
    pub fn parse(i: parse::Input, alignment: TIFFByteAlignment) -> parse::Result<Self> {
        use nom::{combinator::map_res, error::ErrorKind};

        let parser = map_res(
            |x| alignment.parse_u16(x),
            |x| Self::try_from(x).map_err(|_| ErrorKind::Alt),
        );
        context("IFD Data Format", parser)(i)
    }

    pub fn bytes_per_component(&self) -> usize {
        match self {
            IFDDataFormat::UnsignedByte => 1,
            IFDDataFormat::AsciiString => 1,
            IFDDataFormat::UnsignedShort => 2,
            IFDDataFormat::UnsignedLong => 4,
            IFDDataFormat::UnsignedRational => 8,
            IFDDataFormat::SignedByte => 1,
            IFDDataFormat::Undefined => 1,
            IFDDataFormat::SignedShort => 2,
            IFDDataFormat::SignedLong => 4,
            IFDDataFormat::SignedRational => 8,
            IFDDataFormat::SingleFloat => 4,
            IFDDataFormat::DoubleFloat => 8,
        }
    }
}

/// The Exif RATIONAL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Rational {
            numerator,
            denominator,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// The Exif SRATIONAL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl SignedRational {
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        SignedRational {
            numerator,
            denominator,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// The value of one IFD field. Every variant holds all of the field's components.
#[derive(Debug, Clone, PartialEq)]
pub enum IFDValue {
    UnsignedByte(Vec<u8>),
    /// Text without its terminating NUL.
    AsciiString(Vec<u8>),
    UnsignedShort(Vec<u16>),
    UnsignedLong(Vec<u32>),
    UnsignedRational(Vec<Rational>),
    SignedByte(Vec<i8>),
    Undefined(Vec<u8>),
    SignedShort(Vec<i16>),
    SignedLong(Vec<i32>),
    SignedRational(Vec<SignedRational>),
    SingleFloat(Vec<f32>),
    DoubleFloat(Vec<f64>),
}

impl IFDValue {
    pub fn ascii<T: Into<Vec<u8>>>(text: T) -> Self {
        IFDValue::AsciiString(text.into())
    }

    pub fn format(&self) -> IFDDataFormat {
        match self {
            IFDValue::UnsignedByte(_) => IFDDataFormat::UnsignedByte,
            IFDValue::AsciiString(_) => IFDDataFormat::AsciiString,
            IFDValue::UnsignedShort(_) => IFDDataFormat::UnsignedShort,
            IFDValue::UnsignedLong(_) => IFDDataFormat::UnsignedLong,
            IFDValue::UnsignedRational(_) => IFDDataFormat::UnsignedRational,
            IFDValue::SignedByte(_) => IFDDataFormat::SignedByte,
            IFDValue::Undefined(_) => IFDDataFormat::Undefined,
            IFDValue::SignedShort(_) => IFDDataFormat::SignedShort,
            IFDValue::SignedLong(_) => IFDDataFormat::SignedLong,
            IFDValue::SignedRational(_) => IFDDataFormat::SignedRational,
            IFDValue::SingleFloat(_) => IFDDataFormat::SingleFloat,
            IFDValue::DoubleFloat(_) => IFDDataFormat::DoubleFloat,
        }
    }

    /// The component count stored in the IFD entry. For ASCII this includes the NUL terminator.
    pub fn n_components(&self) -> usize {
        match self {
            IFDValue::UnsignedByte(v) => v.len(),
            IFDValue::AsciiString(v) => v.len() + 1,
            IFDValue::UnsignedShort(v) => v.len(),
            IFDValue::UnsignedLong(v) => v.len(),
            IFDValue::UnsignedRational(v) => v.len(),
            IFDValue::SignedByte(v) => v.len(),
            IFDValue::Undefined(v) => v.len(),
            IFDValue::SignedShort(v) => v.len(),
            IFDValue::SignedLong(v) => v.len(),
            IFDValue::SignedRational(v) => v.len(),
            IFDValue::SingleFloat(v) => v.len(),
            IFDValue::DoubleFloat(v) => v.len(),
        }
    }

    pub fn as_ascii(&self) -> Option<&[u8]> {
        match self {
            IFDValue::AsciiString(text) => Some(text),
            _ => None,
        }
    }

    /// Parse `n_components` values of the given format. The input must hold exactly the bytes
    /// of the value.
    pub fn parse(
        i: parse::Input,
        format: IFDDataFormat,
        n_components: u32,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<Self> {
        use nom::{combinator::map, multi::count};
        let n = n_components as usize;

        match format {
            IFDDataFormat::AsciiString => {
                // For both ASCII and UNDEFINED, n_components is the number of bytes rather than
                // a number of values.
                let (i, s) = take(n)(i)?;
                let end = s.iter().rposition(|&c| c != 0).map_or(0, |p| p + 1);
                Ok((i, IFDValue::AsciiString(s[..end].to_vec())))
            }
            IFDDataFormat::Undefined => {
                map(take(n), |s: &[u8]| IFDValue::Undefined(s.to_vec()))(i)
            }
            IFDDataFormat::UnsignedByte => {
                map(count(|x| alignment.parse_u8(x), n), IFDValue::UnsignedByte)(i)
            }
            IFDDataFormat::UnsignedShort => {
                map(count(|x| alignment.parse_u16(x), n), IFDValue::UnsignedShort)(i)
            }
            IFDDataFormat::UnsignedLong => {
                map(count(|x| alignment.parse_u32(x), n), IFDValue::UnsignedLong)(i)
            }
            IFDDataFormat::UnsignedRational => map(
                count(|x| alignment.parse_rational(x), n),
                IFDValue::UnsignedRational,
            )(i),
            IFDDataFormat::SignedByte => {
                map(count(|x| alignment.parse_i8(x), n), IFDValue::SignedByte)(i)
            }
            IFDDataFormat::SignedShort => {
                map(count(|x| alignment.parse_i16(x), n), IFDValue::SignedShort)(i)
            }
            IFDDataFormat::SignedLong => {
                map(count(|x| alignment.parse_i32(x), n), IFDValue::SignedLong)(i)
            }
            IFDDataFormat::SignedRational => map(
                count(|x| alignment.parse_signed_rational(x), n),
                IFDValue::SignedRational,
            )(i),
            IFDDataFormat::SingleFloat => {
                map(count(|x| alignment.parse_f32(x), n), IFDValue::SingleFloat)(i)
            }
            IFDDataFormat::DoubleFloat => {
                map(count(|x| alignment.parse_f64(x), n), IFDValue::DoubleFloat)(i)
            }
        }
    }
}

impl Serialize for Rational {
    fn serialize<S>(&self, ser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = ser.serialize_tuple(2)?;
        tup.serialize_element(&self.numerator)?;
        tup.serialize_element(&self.denominator)?;
        tup.end()
    }
}

impl Serialize for SignedRational {
    fn serialize<S>(&self, ser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tup = ser.serialize_tuple(2)?;
        tup.serialize_element(&self.numerator)?;
        tup.serialize_element(&self.denominator)?;
        tup.end()
    }
}

/// Single-component values are written as scalars, everything else as a sequence.
fn serialize_components<S, T>(ser: S, values: &[T]) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match values {
        [one] => one.serialize(ser),
        many => ser.collect_seq(many),
    }
}

impl Serialize for IFDValue {
    fn serialize<S>(&self, ser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            IFDValue::AsciiString(x) => ser.serialize_str(&String::from_utf8_lossy(x)),
            IFDValue::Undefined(x) => ser.serialize_bytes(x),
            IFDValue::UnsignedByte(x) => serialize_components(ser, x),
            IFDValue::UnsignedShort(x) => serialize_components(ser, x),
            IFDValue::UnsignedLong(x) => serialize_components(ser, x),
            IFDValue::UnsignedRational(x) => serialize_components(ser, x),
            IFDValue::SignedByte(x) => serialize_components(ser, x),
            IFDValue::SignedShort(x) => serialize_components(ser, x),
            IFDValue::SignedLong(x) => serialize_components(ser, x),
            IFDValue::SignedRational(x) => serialize_components(ser, x),
            IFDValue::SingleFloat(x) => serialize_components(ser, x),
            IFDValue::DoubleFloat(x) => serialize_components(ser, x),
        }
    }
}
