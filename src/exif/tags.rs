//! Tag numbers for the fields this crate reads and writes, grouped by the IFD they live in.
//!
//! Tag numbers are only unique within an IFD (0x0001 is `GPSLatitudeRef` in the GPS IFD but
//! `InteroperabilityIndex` in the Interop IFD), so every lookup goes through a [`Segment`].
//! Numbers are taken from https://www.exiftool.org/TagNames/EXIF.html and
//! https://www.exiftool.org/TagNames/GPS.html

use crate::exif::Segment;

/// Tags of IFD0 (the primary image) and IFD1 (the thumbnail).
pub mod image {
    pub const IMAGE_WIDTH: u16 = 0x0100;
    pub const IMAGE_LENGTH: u16 = 0x0101;
    pub const COMPRESSION: u16 = 0x0103;
    pub const IMAGE_DESCRIPTION: u16 = 0x010e;
    pub const MAKE: u16 = 0x010f;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const X_RESOLUTION: u16 = 0x011a;
    pub const Y_RESOLUTION: u16 = 0x011b;
    pub const RESOLUTION_UNIT: u16 = 0x0128;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATE_TIME: u16 = 0x0132;
    pub const ARTIST: u16 = 0x013b;
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
    pub const YCBCR_POSITIONING: u16 = 0x0213;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;
}

/// Tags of the Exif sub-IFD.
pub mod exif {
    pub const EXPOSURE_TIME: u16 = 0x829a;
    pub const F_NUMBER: u16 = 0x829d;
    pub const ISO_SPEED_RATINGS: u16 = 0x8827;
    pub const EXIF_VERSION: u16 = 0x9000;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
    pub const OFFSET_TIME: u16 = 0x9010;
    pub const OFFSET_TIME_ORIGINAL: u16 = 0x9011;
    pub const OFFSET_TIME_DIGITIZED: u16 = 0x9012;
    pub const FOCAL_LENGTH: u16 = 0x920a;
    pub const MAKER_NOTE: u16 = 0x927c;
    pub const USER_COMMENT: u16 = 0x9286;
    pub const SUB_SEC_TIME_ORIGINAL: u16 = 0x9291;
    pub const COLOR_SPACE: u16 = 0xa001;
    pub const PIXEL_X_DIMENSION: u16 = 0xa002;
    pub const PIXEL_Y_DIMENSION: u16 = 0xa003;
    pub const INTEROPERABILITY_IFD_POINTER: u16 = 0xa005;
    pub const LENS_MODEL: u16 = 0xa434;
}

/// Tags of the GPS sub-IFD.
pub mod gps {
    pub const GPS_VERSION_ID: u16 = 0x0000;
    pub const GPS_LATITUDE_REF: u16 = 0x0001;
    pub const GPS_LATITUDE: u16 = 0x0002;
    pub const GPS_LONGITUDE_REF: u16 = 0x0003;
    pub const GPS_LONGITUDE: u16 = 0x0004;
    pub const GPS_ALTITUDE_REF: u16 = 0x0005;
    pub const GPS_ALTITUDE: u16 = 0x0006;
    pub const GPS_TIME_STAMP: u16 = 0x0007;
    pub const GPS_MAP_DATUM: u16 = 0x0012;
    pub const GPS_DATE_STAMP: u16 = 0x001d;
}

/// Tags of the Interoperability sub-IFD.
pub mod interop {
    pub const INTEROPERABILITY_INDEX: u16 = 0x0001;
    pub const INTEROPERABILITY_VERSION: u16 = 0x0002;
}

/// Tags that only describe where other data lives in the TIFF payload. They are dropped when a
/// payload is decoded and regenerated when it is encoded.
pub fn is_structural(segment: Segment, tag: u16) -> bool {
    match segment {
        Segment::Primary => tag == image::EXIF_IFD_POINTER || tag == image::GPS_IFD_POINTER,
        Segment::Exif => tag == exif::INTEROPERABILITY_IFD_POINTER,
        Segment::Thumbnail => {
            tag == image::JPEG_INTERCHANGE_FORMAT || tag == image::JPEG_INTERCHANGE_FORMAT_LENGTH
        }
        Segment::Gps | Segment::Interop => false,
    }
}

/// Human-readable name of a tag, used when dumping a metadata block.
pub fn tag_name(segment: Segment, tag: u16) -> Option<&'static str> {
    let name = match segment {
        Segment::Primary | Segment::Thumbnail => match tag {
            image::IMAGE_WIDTH => "ImageWidth",
            image::IMAGE_LENGTH => "ImageLength",
            image::COMPRESSION => "Compression",
            image::IMAGE_DESCRIPTION => "ImageDescription",
            image::MAKE => "Make",
            image::MODEL => "Model",
            image::ORIENTATION => "Orientation",
            image::X_RESOLUTION => "XResolution",
            image::Y_RESOLUTION => "YResolution",
            image::RESOLUTION_UNIT => "ResolutionUnit",
            image::SOFTWARE => "Software",
            image::DATE_TIME => "DateTime",
            image::ARTIST => "Artist",
            image::YCBCR_POSITIONING => "YCbCrPositioning",
            image::COPYRIGHT => "Copyright",
            _ => return None,
        },
        Segment::Exif => match tag {
            exif::EXPOSURE_TIME => "ExposureTime",
            exif::F_NUMBER => "FNumber",
            exif::ISO_SPEED_RATINGS => "ISOSpeedRatings",
            exif::EXIF_VERSION => "ExifVersion",
            exif::DATE_TIME_ORIGINAL => "DateTimeOriginal",
            exif::DATE_TIME_DIGITIZED => "DateTimeDigitized",
            exif::OFFSET_TIME => "OffsetTime",
            exif::OFFSET_TIME_ORIGINAL => "OffsetTimeOriginal",
            exif::OFFSET_TIME_DIGITIZED => "OffsetTimeDigitized",
            exif::FOCAL_LENGTH => "FocalLength",
            exif::MAKER_NOTE => "MakerNote",
            exif::USER_COMMENT => "UserComment",
            exif::SUB_SEC_TIME_ORIGINAL => "SubSecTimeOriginal",
            exif::COLOR_SPACE => "ColorSpace",
            exif::PIXEL_X_DIMENSION => "PixelXDimension",
            exif::PIXEL_Y_DIMENSION => "PixelYDimension",
            exif::LENS_MODEL => "LensModel",
            _ => return None,
        },
        Segment::Gps => match tag {
            gps::GPS_VERSION_ID => "GPSVersionID",
            gps::GPS_LATITUDE_REF => "GPSLatitudeRef",
            gps::GPS_LATITUDE => "GPSLatitude",
            gps::GPS_LONGITUDE_REF => "GPSLongitudeRef",
            gps::GPS_LONGITUDE => "GPSLongitude",
            gps::GPS_ALTITUDE_REF => "GPSAltitudeRef",
            gps::GPS_ALTITUDE => "GPSAltitude",
            gps::GPS_TIME_STAMP => "GPSTimeStamp",
            gps::GPS_MAP_DATUM => "GPSMapDatum",
            gps::GPS_DATE_STAMP => "GPSDateStamp",
            _ => return None,
        },
        Segment::Interop => match tag {
            interop::INTEROPERABILITY_INDEX => "InteroperabilityIndex",
            interop::INTEROPERABILITY_VERSION => "InteroperabilityVersion",
            _ => return None,
        },
    };
    Some(name)
}
