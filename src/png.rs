//! PNG chunk layout, and the `eXIf` chunk that carries Exif metadata.
//!
//! Chunks are kept as borrowed slices of the original file. Only `eXIf` is ever rewritten, so
//! every other chunk goes back out byte for byte, CRC included.

use crate::{
    error::{Error, Result},
    exif::{MetadataBlock, EXIF_HEADER},
    parse,
};
use nom::{
    bytes::complete::{tag, take},
    combinator::verify,
    error::context,
    number::complete::be_u32,
};

pub const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

pub const IHDR: [u8; 4] = *b"IHDR";
pub const IEND: [u8; 4] = *b"IEND";
pub const EXIF: [u8; 4] = *b"eXIf";

/// Chunk lengths are limited to 2^31 - 1 bytes.
pub const MAX_CHUNK_SIZE: usize = 0x7fff_ffff;

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xedb8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// The CRC-32 used by PNG (ISO 3309), computed over the concatenation of `parts`.
pub fn crc32(parts: &[&[u8]]) -> u32 {
    let mut c = 0xffff_ffffu32;
    for byte in parts.iter().flat_map(|p| p.iter()) {
        c = CRC_TABLE[((c ^ *byte as u32) & 0xff) as usize] ^ (c >> 8);
    }
    c ^ 0xffff_ffff
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PNGChunk<'a> {
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    pub crc: u32,
}

impl<'a> PNGChunk<'a> {
    pub fn parse(i: parse::Input<'a>) -> parse::Result<'a, Self> {
        let (i, length) = context(
            "Chunk length",
            verify(be_u32, |&n: &u32| n as usize <= MAX_CHUNK_SIZE),
        )(i)?;
        let (i, chunk_type) = context("Chunk type", take(4usize))(i)?;
        let (i, data) = context("Chunk data", take(length as usize))(i)?;
        let (i, crc) = context("Chunk CRC", be_u32)(i)?;

        let mut ty = [0u8; 4];
        ty.copy_from_slice(chunk_type);
        Ok((
            i,
            PNGChunk {
                chunk_type: ty,
                data,
                crc,
            },
        ))
    }

    pub fn is(&self, chunk_type: [u8; 4]) -> bool {
        self.chunk_type == chunk_type
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.chunk_type);
        out.extend_from_slice(self.data);
        out.extend_from_slice(&self.crc.to_be_bytes());
    }
}

/// Append a new chunk, computing its CRC.
pub fn write_chunk(out: &mut Vec<u8>, chunk_type: [u8; 4], data: &[u8]) -> Result<()> {
    if data.len() > MAX_CHUNK_SIZE {
        return Err(Error::Encode(format!(
            "{} chunk of {} bytes is too large",
            String::from_utf8_lossy(&chunk_type),
            data.len()
        )));
    }

    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&chunk_type);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(&[&chunk_type, data]).to_be_bytes());
    Ok(())
}

/// A PNG file, from the signature through the IEND chunk. Anything after IEND is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PNGFile<'a> {
    pub chunks: Vec<PNGChunk<'a>>,
    exif: Option<MetadataBlock>,
}

impl<'a> PNGFile<'a> {
    pub fn parse(i: parse::Input<'a>) -> parse::Result<'a, Self> {
        let (mut i, _) = context("PNG signature", tag(PNG_SIGNATURE))(i)?;

        let (next, ihdr) = context(
            "IHDR chunk",
            verify(PNGChunk::parse, |chunk: &PNGChunk| chunk.is(IHDR)),
        )(i)?;
        i = next;

        let mut chunks = vec![ihdr];
        let mut exif = None;
        loop {
            let (next, chunk) = context("PNG chunk", PNGChunk::parse)(i)?;
            i = next;

            if chunk.is(EXIF) && exif.is_none() {
                // The chunk should hold a bare TIFF payload, but some writers keep the identifier
                // from the JPEG APP1 segment in front of it.
                let payload = chunk.data.strip_prefix(EXIF_HEADER).unwrap_or(chunk.data);
                let (_, block) = context("eXIf chunk", MetadataBlock::parse)(payload)?;
                exif = Some(block);
            }

            chunks.push(chunk);
            if chunk.is(IEND) {
                break;
            }
        }

        Ok((&i[i.len()..], PNGFile { chunks, exif }))
    }

    /// The metadata of the first `eXIf` chunk, if there is one.
    pub fn exif(&self) -> Option<&MetadataBlock> {
        self.exif.as_ref()
    }

    /// Re-assemble the file with `tiff` (a TIFF-structured Exif payload) as its only `eXIf`
    /// chunk, placed right after IHDR so that it precedes the image data.
    pub fn write_with_exif(&self, tiff: &[u8]) -> Result<Vec<u8>> {
        let size = PNG_SIGNATURE.len()
            + self.chunks.iter().map(|c| c.data.len() + 12).sum::<usize>()
            + tiff.len()
            + 12;
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(PNG_SIGNATURE);

        let mut chunks = self.chunks.iter().filter(|c| !c.is(EXIF));
        if let Some(ihdr) = chunks.next() {
            ihdr.write(&mut out);
        }
        write_chunk(&mut out, EXIF, tiff)?;
        for chunk in chunks {
            chunk.write(&mut out);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::{crc32, write_chunk, PNGFile, EXIF, IEND, IHDR, PNG_SIGNATURE};
    use crate::{
        exif::{tags, IFDValue, MetadataBlock, Segment, EXIF_HEADER},
        parse,
    };
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn parse_png(data: &[u8]) -> PNGFile<'_> {
        match PNGFile::parse(data) {
            Ok((_, png)) => png,
            Err(e) => panic!("{}", parse::pretty_error_message(data, e)),
        }
    }

    fn block_with_software(software: &str) -> MetadataBlock {
        let mut block = MetadataBlock::default();
        block.insert(Segment::Primary, tags::image::SOFTWARE, IFDValue::ascii(software));
        block
    }

    #[test]
    fn test_crc32() {
        assert_eq!(crc32(&[b"123456789"]), 0xcbf4_3926);
        assert_eq!(crc32(&[b"IEND"]), 0xae42_6082);
        assert_eq!(crc32(&[b"IE", b"ND"]), 0xae42_6082);
    }

    #[test]
    fn test_parse_chunks() {
        let data = sample_png();
        let png = parse_png(&data);

        assert!(png.chunks[0].is(IHDR));
        assert!(png.chunks.last().unwrap().is(IEND));
        assert!(png.exif().is_none());
        for chunk in png.chunks.iter() {
            assert_eq!(chunk.crc, crc32(&[&chunk.chunk_type, chunk.data]));
        }
    }

    #[test]
    fn test_write_exif_chunk() {
        let data = sample_png();
        let png = parse_png(&data);
        let tiff = block_with_software("geostamp").encode().unwrap();

        let written = png.write_with_exif(&tiff).unwrap();
        let rewritten = parse_png(&written);

        assert!(rewritten.chunks[0].is(IHDR));
        assert!(rewritten.chunks[1].is(EXIF));
        assert_eq!(rewritten.chunks.len(), png.chunks.len() + 1);
        assert_eq!(rewritten.exif(), Some(&block_with_software("geostamp")));

        // The png crate checks chunk CRCs, so this also validates the new chunk
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));

        // Writing again replaces the chunk instead of adding a second one
        let tiff = block_with_software("again").encode().unwrap();
        let twice_data = rewritten.write_with_exif(&tiff).unwrap();
        let twice = parse_png(&twice_data);
        assert_eq!(twice.chunks.iter().filter(|c| c.is(EXIF)).count(), 1);
        assert_eq!(twice.exif(), Some(&block_with_software("again")));
    }

    #[test]
    fn test_exif_chunk_with_jpeg_identifier() {
        let data = sample_png();
        let png = parse_png(&data);

        let mut payload = EXIF_HEADER.to_vec();
        payload.extend(block_with_software("prefixed").encode().unwrap());

        let mut written = PNG_SIGNATURE.to_vec();
        png.chunks[0].write(&mut written);
        write_chunk(&mut written, EXIF, &payload).unwrap();
        for chunk in png.chunks[1..].iter() {
            chunk.write(&mut written);
        }

        assert_eq!(parse_png(&written).exif(), Some(&block_with_software("prefixed")));
    }

    #[test]
    fn test_not_a_png() {
        assert!(PNGFile::parse(b"\xff\xd8\xff\xe0").is_err());

        // Missing IEND
        let data = sample_png();
        assert!(PNGFile::parse(&data[..data.len() - 12]).is_err());

        // Malformed eXIf payload
        let png = parse_png(&data);
        let written = png.write_with_exif(b"MM\x00\x2a\x00\x00\xff\xff").unwrap();
        assert!(PNGFile::parse(&written).is_err());
    }
}
