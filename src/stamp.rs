//! Applying a timestamp and a GPS position to a single in-memory image.

use crate::{
    container::ContainerFormat,
    error::Result,
    exif::{
        gps::{GeoCoordinate, GpsPosition},
        tags, IFDValue, MetadataBlock, Segment,
    },
    timestamp::{EXIF_DATETIME_FORMAT, EXIF_DATE_FORMAT},
};
use chrono::NaiveDateTime;
use image::DynamicImage;
use tracing::warn;

/// How a run modifies each image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampOptions {
    /// Write the date/time parsed from the file name. On by default.
    pub modify_timestamp: bool,
    /// Write this position into the GPS fields.
    pub coordinate: Option<GeoCoordinate>,
}

impl Default for StampOptions {
    fn default() -> Self {
        StampOptions {
            modify_timestamp: true,
            coordinate: None,
        }
    }
}

impl StampOptions {
    /// The GPS fields to write, if a coordinate was given. Fails when it is out of range.
    pub fn gps_position(&self) -> Result<Option<GpsPosition>> {
        self.coordinate.map(|c| c.to_gps_position()).transpose()
    }
}

/// Write the timestamp and GPS fields into `block`, leaving every other field as it was.
pub fn stamp_block(
    block: &mut MetadataBlock,
    timestamp: &NaiveDateTime,
    modify_timestamp: bool,
    gps: Option<&GpsPosition>,
) {
    if modify_timestamp {
        let datetime = IFDValue::ascii(timestamp.format(EXIF_DATETIME_FORMAT).to_string());
        block.insert(Segment::Primary, tags::image::DATE_TIME, datetime.clone());
        block.insert(Segment::Exif, tags::exif::DATE_TIME_ORIGINAL, datetime.clone());
        block.insert(Segment::Exif, tags::exif::DATE_TIME_DIGITIZED, datetime);
    }

    if let Some(gps) = gps {
        gps.write_to(block);
        if modify_timestamp {
            let date = IFDValue::ascii(timestamp.format(EXIF_DATE_FORMAT).to_string());
            block.insert(Segment::Gps, tags::gps::GPS_DATE_STAMP, date);
        }
    }
}

/// An image that decoded successfully, together with its existing metadata.
#[derive(Debug, Clone)]
pub struct DecodedImage<'a> {
    data: &'a [u8],
    image: DynamicImage,
    source: Option<ContainerFormat>,
    pub block: MetadataBlock,
}

/// Check that `data` decodes as an image and extract its Exif block. Images without one (or in a
/// format that can't carry one) get an empty block.
pub fn decode_image(data: &[u8]) -> Result<DecodedImage<'_>> {
    let image = image::load_from_memory(data)?;
    let source = ContainerFormat::detect(data);
    let block = match source {
        Some(format) => format.read_exif(data)?.unwrap_or_default(),
        None => MetadataBlock::default(),
    };

    Ok(DecodedImage {
        data,
        image,
        source,
        block,
    })
}

/// The existing metadata of an image, or an empty block if it has none.
pub fn read_block(data: &[u8]) -> Result<MetadataBlock> {
    Ok(decode_image(data)?.block)
}

impl<'a> DecodedImage<'a> {
    /// The container the bytes are actually in, which may not match the file's extension.
    pub fn source(&self) -> Option<ContainerFormat> {
        self.source
    }

    /// Produce the file in the `target` container with `tiff` as its Exif payload. When the data
    /// is already in that container only the metadata changes; otherwise the image is re-encoded.
    pub fn encode(&self, target: ContainerFormat, tiff: &[u8]) -> Result<Vec<u8>> {
        if self.source == Some(target) {
            return target.write_exif(self.data, tiff);
        }

        warn!(from = ?self.source, to = ?target, "image content doesn't match its extension, re-encoding");
        let transcoded = target.transcode(&self.image)?;
        target.write_exif(&transcoded, tiff)
    }
}

/// Stamp one image in memory. Returns `None` when `format` is `None`: the image is still decoded
/// and its metadata still checked, but there is nothing to write it to.
pub fn stamp_image(
    data: &[u8],
    format: Option<ContainerFormat>,
    timestamp: &NaiveDateTime,
    options: &StampOptions,
) -> Result<Option<Vec<u8>>> {
    let gps = options.gps_position()?;
    let mut decoded = decode_image(data)?;
    stamp_block(
        &mut decoded.block,
        timestamp,
        options.modify_timestamp,
        gps.as_ref(),
    );
    let tiff = decoded.block.encode()?;

    match format {
        Some(target) => Ok(Some(decoded.encode(target, &tiff)?)),
        None => Ok(None),
    }
}
