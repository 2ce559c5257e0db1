//! Defines the `JFIFMarkerCode` type, which enumerates all of the possible JFIF markers that are
//! allowed by the standard.

use crate::impl_parse_for_enum;
use std::convert::{From, TryFrom};

/// Marker codes for JFIF segments. See ISO/IEC 10918-1: 1993(E), p. 36 for more information.
///
/// Markers that come in numbered families keep the low bits of the code, e.g. `APPm(1)` is
/// 0xFFE1 and `RSTm(4)` is 0xFFD4.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JFIFMarkerCode {
    /// 0xFFC0 - 0xFFCF, except DHT, JPG and DAC: Start Of Frame, with the frame type
    SOFn(u8),
    DHT, // 0xFFC4: Define Huffman table(s)
    JPG, // 0xFFC8: Reserved for JPEG extensions
    DAC, // 0xFFCC: Define arithmetic coding conditioning(s)

    RSTm(u8), // 0xFFD0 - 0xFFD7: Restart with modulo 8 count "m"
    SOI,      // 0xFFD8: Start of image
    EOI,      // 0xFFD9: End of image
    SOS,      // 0xFFDA: Start of scan
    DQT,      // 0xFFDB: Define quantization table(s)
    DNL,      // 0xFFDC: Define number of lines
    DRI,      // 0xFFDD: Define restart interval
    DHP,      // 0xFFDE: Define hierarchical progression
    EXP,      // 0xFFDF: Expand reference component(s)
    APPm(u8), // 0xFFE0 - 0xFFEF: Reserved for application segments
    JPGm(u8), // 0xFFF0 - 0xFFFD: Reserved for JPEG extensions
    COM,      // 0xFFFE: Comment

    TEM,     // 0xFF01: For temporary private use in arithmetic coding
    RES(u8), // 0xFF02-FFBF: Reserved
}

// Define JFIFMarkerCode::parse(i: parse::Input) -> parse::Result by parsing the marker code from a
// 16-bit integer.
impl_parse_for_enum!(JFIFMarkerCode, be_u16);

impl JFIFMarkerCode {
    pub fn as_bytes(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }

    /// Markers that stand on their own, without a length field or data section.
    pub fn is_standalone(self) -> bool {
        matches!(
            self,
            JFIFMarkerCode::SOI | JFIFMarkerCode::EOI | JFIFMarkerCode::RSTm(_) | JFIFMarkerCode::TEM
        )
    }
}

impl TryFrom<u16> for JFIFMarkerCode {
    type Error = &'static str;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        if code & 0xFF00 != 0xFF00 {
            return Err("Invalid marker code (code must begin with 0xFF!)");
        }

        let low = (code & 0x00FF) as u8;
        let marker = match low {
            0x01 => JFIFMarkerCode::TEM,
            0x02..=0xBF => JFIFMarkerCode::RES(low),
            0xC4 => JFIFMarkerCode::DHT,
            0xC8 => JFIFMarkerCode::JPG,
            0xCC => JFIFMarkerCode::DAC,
            0xC0..=0xCF => JFIFMarkerCode::SOFn(low & 0x0F),
            0xD0..=0xD7 => JFIFMarkerCode::RSTm(low & 0x0F),
            0xD8 => JFIFMarkerCode::SOI,
            0xD9 => JFIFMarkerCode::EOI,
            0xDA => JFIFMarkerCode::SOS,
            0xDB => JFIFMarkerCode::DQT,
            0xDC => JFIFMarkerCode::DNL,
            0xDD => JFIFMarkerCode::DRI,
            0xDE => JFIFMarkerCode::DHP,
            0xDF => JFIFMarkerCode::EXP,
            0xE0..=0xEF => JFIFMarkerCode::APPm(low & 0x0F),
            0xF0..=0xFD => JFIFMarkerCode::JPGm(low & 0x0F),
            0xFE => JFIFMarkerCode::COM,
            // 0xFF00 is a stuffed byte and 0xFFFF a fill byte; neither one is a marker
            _ => return Err("Not a marker code (0xFF00 and 0xFFFF are reserved)"),
        };

        Ok(marker)
    }
}

impl From<JFIFMarkerCode> for u16 {
    fn from(marker: JFIFMarkerCode) -> Self {
        let low: u8 = match marker {
            JFIFMarkerCode::TEM => 0x01,
            JFIFMarkerCode::RES(code) => code,
            JFIFMarkerCode::SOFn(n) => 0xC0 | n,
            JFIFMarkerCode::DHT => 0xC4,
            JFIFMarkerCode::JPG => 0xC8,
            JFIFMarkerCode::DAC => 0xCC,
            JFIFMarkerCode::RSTm(m) => 0xD0 | m,
            JFIFMarkerCode::SOI => 0xD8,
            JFIFMarkerCode::EOI => 0xD9,
            JFIFMarkerCode::SOS => 0xDA,
            JFIFMarkerCode::DQT => 0xDB,
            JFIFMarkerCode::DNL => 0xDC,
            JFIFMarkerCode::DRI => 0xDD,
            JFIFMarkerCode::DHP => 0xDE,
            JFIFMarkerCode::EXP => 0xDF,
            JFIFMarkerCode::APPm(m) => 0xE0 | m,
            JFIFMarkerCode::JPGm(m) => 0xF0 | m,
            JFIFMarkerCode::COM => 0xFE,
        };
        0xFF00 | low as u16
    }
}
