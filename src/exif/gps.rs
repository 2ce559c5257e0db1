//! Various utilities for dealing with GPS information.

use crate::{
    error::{Error, Result},
    exif::{tags, IFDValue, MetadataBlock, Rational, Segment, SignedRational},
};
use std::str::FromStr;

/// Precision of the seconds component: four decimal digits of an arc-second.
pub const SECONDS_DENOMINATOR: u32 = 10_000;

/// Convert latitude and longitude coordinates from degrees/minutes/seconds to decimal.
pub fn degrees_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60. + seconds / 3600.
}

/// A position on Earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoCoordinate {
            latitude,
            longitude,
        }
    }

    /// Latitude must lie in (-90, 90) and longitude in (-180, 180). NaN is never valid.
    pub fn is_valid(&self) -> bool {
        (-90.0 < self.latitude && self.latitude < 90.0)
            && (-180.0 < self.longitude && self.longitude < 180.0)
    }

    /// Convert to the degrees/minutes/seconds form stored in the GPS IFD.
    pub fn to_gps_position(&self) -> Result<GpsPosition> {
        if !self.is_valid() {
            return Err(Error::CoordinateRange {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }

        Ok(GpsPosition {
            latitude_ref: if self.latitude > 0.0 { 'N' } else { 'S' },
            latitude: SexagesimalAngle::from_degrees(self.latitude),
            longitude_ref: if self.longitude > 0.0 { 'E' } else { 'W' },
            longitude: SexagesimalAngle::from_degrees(self.longitude),
        })
    }
}

impl FromStr for GeoCoordinate {
    type Err = Error;

    /// Parse the `<latitude>,<longitude>` form accepted on the command line.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Argument(format!("expected <latitude>,<longitude>, got {:?}", s));

        let mut parts = s.split(',');
        let (latitude, longitude) = match (parts.next(), parts.next(), parts.next()) {
            (Some(latitude), Some(longitude), None) => (latitude, longitude),
            _ => return Err(invalid()),
        };
        let latitude = latitude.trim().parse::<f64>().map_err(|_| invalid())?;
        let longitude = longitude.trim().parse::<f64>().map_err(|_| invalid())?;

        Ok(GeoCoordinate::new(latitude, longitude))
    }
}

/// An angle as degrees, minutes and seconds. The degrees keep the sign of the decimal value they
/// were derived from; minutes and seconds are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SexagesimalAngle {
    pub degrees: SignedRational,
    pub minutes: Rational,
    pub seconds: Rational,
}

impl SexagesimalAngle {
    pub fn from_degrees(deg: f64) -> Self {
        let d = deg.trunc();
        let md = (deg - d).abs() * 60.;
        let m = md.trunc();
        let s = (md - m) * 60.;

        let mut degrees = d as i32;
        let mut minutes = m as u32;
        let mut seconds = (s * SECONDS_DENOMINATOR as f64).round() as u32;

        // Rounding can push the seconds up to a full minute
        if seconds >= 60 * SECONDS_DENOMINATOR {
            seconds -= 60 * SECONDS_DENOMINATOR;
            minutes += 1;
        }
        if minutes >= 60 {
            minutes -= 60;
            degrees += if deg < 0.0 { -1 } else { 1 };
        }

        SexagesimalAngle {
            degrees: SignedRational::new(degrees, 1),
            minutes: Rational::new(minutes, 1),
            seconds: Rational::new(seconds, SECONDS_DENOMINATOR),
        }
    }

    /// The magnitude of the angle in decimal degrees. The hemisphere is carried separately.
    pub fn to_decimal(&self) -> f64 {
        degrees_to_decimal(
            self.degrees.to_f64().abs(),
            self.minutes.to_f64(),
            self.seconds.to_f64(),
        )
    }

    /// The GPS IFD stores angles as three unsigned rationals; the sign lives in the reference.
    pub fn to_ifd_value(&self) -> IFDValue {
        let degrees = Rational::new(self.degrees.numerator.unsigned_abs(), 1);
        IFDValue::UnsignedRational(vec![degrees, self.minutes, self.seconds])
    }
}

/// The GPS fields derived from a [`GeoCoordinate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsPosition {
    pub latitude_ref: char,
    pub latitude: SexagesimalAngle,
    pub longitude_ref: char,
    pub longitude: SexagesimalAngle,
}

impl GpsPosition {
    pub fn latitude_decimal(&self) -> f64 {
        signed(self.latitude_ref, 'S', self.latitude.to_decimal())
    }

    pub fn longitude_decimal(&self) -> f64 {
        signed(self.longitude_ref, 'W', self.longitude.to_decimal())
    }

    /// Write the position into the GPS segment: references, angles, and a fixed altitude of zero
    /// above sea level.
    pub fn write_to(&self, block: &mut MetadataBlock) {
        block.insert(Segment::Gps, tags::gps::GPS_LATITUDE_REF, reference(self.latitude_ref));
        block.insert(Segment::Gps, tags::gps::GPS_LATITUDE, self.latitude.to_ifd_value());
        block.insert(Segment::Gps, tags::gps::GPS_LONGITUDE_REF, reference(self.longitude_ref));
        block.insert(Segment::Gps, tags::gps::GPS_LONGITUDE, self.longitude.to_ifd_value());
        block.insert(Segment::Gps, tags::gps::GPS_ALTITUDE_REF, IFDValue::UnsignedByte(vec![0]));
        block.insert(
            Segment::Gps,
            tags::gps::GPS_ALTITUDE,
            IFDValue::UnsignedRational(vec![Rational::new(0, 1000)]),
        );
        block
            .segment_mut(Segment::Gps)
            .entry(tags::gps::GPS_VERSION_ID)
            .or_insert_with(|| IFDValue::UnsignedByte(vec![2, 2, 0, 0]));
    }
}

fn reference(hemisphere: char) -> IFDValue {
    IFDValue::ascii(hemisphere.to_string())
}

fn signed(hemisphere: char, negative: char, magnitude: f64) -> f64 {
    if hemisphere == negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod test {
    use super::{GeoCoordinate, SexagesimalAngle};
    use crate::{
        error::Error,
        exif::{tags, IFDValue, MetadataBlock, Rational, Segment, SignedRational},
    };

    #[test]
    fn test_negative_longitude_keeps_its_sign() {
        let position = GeoCoordinate::new(45.5, -122.675).to_gps_position().unwrap();

        assert_eq!(position.latitude_ref, 'N');
        assert_eq!(position.latitude.degrees, SignedRational::new(45, 1));
        assert_eq!(position.latitude.minutes, Rational::new(30, 1));
        assert_eq!(position.latitude.seconds, Rational::new(0, 10000));

        assert_eq!(position.longitude_ref, 'W');
        assert_eq!(position.longitude.degrees, SignedRational::new(-122, 1));
        assert_eq!(position.longitude.minutes, Rational::new(40, 1));
        assert_eq!(position.longitude.seconds, Rational::new(300_000, 10000));
    }

    #[test]
    fn test_hemisphere_references() {
        let cases = [
            ((10.0, 10.0), ('N', 'E')),
            ((-10.0, -10.0), ('S', 'W')),
            ((0.0, 0.0), ('S', 'W')),
            ((1e-9, -1e-9), ('N', 'W')),
        ];
        for ((lat, lon), (lat_ref, lon_ref)) in cases.iter() {
            let position = GeoCoordinate::new(*lat, *lon).to_gps_position().unwrap();
            assert_eq!(position.latitude_ref, *lat_ref, "latitude {}", lat);
            assert_eq!(position.longitude_ref, *lon_ref, "longitude {}", lon);
        }
    }

    #[test]
    fn test_round_trip_within_ten_thousandth_of_a_degree() {
        let mut lat = -89.9;
        while lat < 90.0 {
            let mut lon = -179.9;
            while lon < 180.0 {
                let position = GeoCoordinate::new(lat, lon).to_gps_position().unwrap();
                assert!((position.latitude_decimal() - lat).abs() < 1e-4, "{}", lat);
                assert!((position.longitude_decimal() - lon).abs() < 1e-4, "{}", lon);
                lon += 7.31;
            }
            lat += 3.17;
        }

        // Fractions of a degree south of the equator still come back negative
        let position = GeoCoordinate::new(-0.5, -0.25).to_gps_position().unwrap();
        assert!((position.latitude_decimal() + 0.5).abs() < 1e-4);
        assert!((position.longitude_decimal() + 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_seconds_that_round_to_a_minute_are_carried() {
        // 10 degrees, 59 minutes, 59.99999 seconds
        let angle = SexagesimalAngle::from_degrees(10.0 + 59.0 / 60.0 + 59.99999 / 3600.0);
        assert_eq!(angle.degrees, SignedRational::new(11, 1));
        assert_eq!(angle.minutes, Rational::new(0, 1));
        assert_eq!(angle.seconds, Rational::new(0, 10000));

        let angle = SexagesimalAngle::from_degrees(-(10.0 + 59.0 / 60.0 + 59.99999 / 3600.0));
        assert_eq!(angle.degrees, SignedRational::new(-11, 1));
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        let invalid = [
            (90.0, 0.0),
            (-90.0, 0.0),
            (0.0, 180.0),
            (0.0, -180.0),
            (120.0, 10.0),
            (f64::NAN, 0.0),
            (0.0, f64::INFINITY),
        ];
        for (lat, lon) in invalid.iter() {
            match GeoCoordinate::new(*lat, *lon).to_gps_position() {
                Err(Error::CoordinateRange { .. }) => {}
                other => panic!("({}, {}) gave {:?}", lat, lon, other),
            }
        }
    }

    #[test]
    fn test_parse_coordinate_argument() {
        let c: GeoCoordinate = "37.7749,-122.4194".parse().unwrap();
        assert_eq!(c, GeoCoordinate::new(37.7749, -122.4194));

        let c: GeoCoordinate = " -33.86 , 151.2 ".parse().unwrap();
        assert_eq!(c, GeoCoordinate::new(-33.86, 151.2));

        for bad in ["", "37.7", "1,2,3", "north,east"].iter() {
            match bad.parse::<GeoCoordinate>() {
                Err(Error::Argument(_)) => {}
                other => panic!("{:?} gave {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_write_to_block() {
        let position = GeoCoordinate::new(37.7749, -122.4194).to_gps_position().unwrap();
        let mut block = MetadataBlock::default();
        position.write_to(&mut block);

        let gps = block.segment(Segment::Gps);
        assert_eq!(gps.get(&tags::gps::GPS_LATITUDE_REF), Some(&IFDValue::ascii("N")));
        assert_eq!(gps.get(&tags::gps::GPS_LONGITUDE_REF), Some(&IFDValue::ascii("W")));
        assert_eq!(
            gps.get(&tags::gps::GPS_LONGITUDE),
            Some(&IFDValue::UnsignedRational(vec![
                Rational::new(122, 1),
                Rational::new(25, 1),
                Rational::new(98_400, 10000),
            ]))
        );
        assert_eq!(gps.get(&tags::gps::GPS_ALTITUDE_REF), Some(&IFDValue::UnsignedByte(vec![0])));
        assert_eq!(
            gps.get(&tags::gps::GPS_ALTITUDE),
            Some(&IFDValue::UnsignedRational(vec![Rational::new(0, 1000)]))
        );
        assert!(gps.get(&tags::gps::GPS_DATE_STAMP).is_none());
    }
}
