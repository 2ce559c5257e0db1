//! The image containers that carry an Exif block, and the choice between them.

use crate::{
    error::{Error, Result},
    exif::MetadataBlock,
    jfif::JPEGFile,
    parse,
    png::PNGFile,
};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::{io::Cursor, path::Path};

/// A file format that can be parsed into a list of segments or chunks, one of which may carry
/// Exif metadata, and written back with a new Exif payload.
pub trait MetadataContainer<'a>: Sized {
    fn parse_container(i: parse::Input<'a>) -> parse::Result<'a, Self>;

    /// The decoded Exif block, if the file has one.
    fn metadata(&self) -> Option<&MetadataBlock>;

    /// The whole file, with `tiff` replacing any existing Exif payload.
    fn with_metadata(&self, tiff: &[u8]) -> Result<Vec<u8>>;
}

impl<'a> MetadataContainer<'a> for JPEGFile<'a> {
    fn parse_container(i: parse::Input<'a>) -> parse::Result<'a, Self> {
        JPEGFile::parse(i)
    }

    fn metadata(&self) -> Option<&MetadataBlock> {
        self.exif()
    }

    fn with_metadata(&self, tiff: &[u8]) -> Result<Vec<u8>> {
        self.write_with_exif(tiff)
    }
}

impl<'a> MetadataContainer<'a> for PNGFile<'a> {
    fn parse_container(i: parse::Input<'a>) -> parse::Result<'a, Self> {
        PNGFile::parse(i)
    }

    fn metadata(&self) -> Option<&MetadataBlock> {
        self.exif()
    }

    fn with_metadata(&self, tiff: &[u8]) -> Result<Vec<u8>> {
        self.write_with_exif(tiff)
    }
}

fn decode<'a, C: MetadataContainer<'a>>(data: &'a [u8]) -> Result<C> {
    match C::parse_container(data) {
        Ok((_, container)) => Ok(container),
        Err(e) => Err(Error::Metadata(parse::pretty_error_message(data, e))),
    }
}

/// The formats that metadata is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Png,
    Jpeg,
}

impl ContainerFormat {
    /// `png`, `jpg` and `jpeg`, in any case. Every other extension is left alone.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ContainerFormat::Png),
            "jpg" | "jpeg" => Some(ContainerFormat::Jpeg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Sniff the format of `data` from its magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match image::guess_format(data) {
            Ok(ImageFormat::Png) => Some(ContainerFormat::Png),
            Ok(ImageFormat::Jpeg) => Some(ContainerFormat::Jpeg),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ContainerFormat::Png => ImageFormat::Png,
            ContainerFormat::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// Decode the Exif block stored in `data`, which must be a file of this format.
    pub fn read_exif(self, data: &[u8]) -> Result<Option<MetadataBlock>> {
        let block = match self {
            ContainerFormat::Png => decode::<PNGFile>(data)?.metadata().cloned(),
            ContainerFormat::Jpeg => decode::<JPEGFile>(data)?.metadata().cloned(),
        };
        Ok(block)
    }

    /// Splice `tiff` into `data`, which must be a file of this format, as its Exif payload.
    pub fn write_exif(self, data: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
        match self {
            ContainerFormat::Png => decode::<PNGFile>(data)?.with_metadata(tiff),
            ContainerFormat::Jpeg => decode::<JPEGFile>(data)?.with_metadata(tiff),
        }
    }

    /// Re-encode a decoded image in this format, without any metadata.
    pub fn transcode(self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        match self {
            ContainerFormat::Png => image.write_to(&mut bytes, ImageFormat::Png)?,
            // The JPEG encoder has no alpha channel
            ContainerFormat::Jpeg => {
                DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut bytes, ImageFormat::Jpeg)?
            }
        }
        Ok(bytes.into_inner())
    }
}
