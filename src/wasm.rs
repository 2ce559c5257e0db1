//! WebAssembly bindings for the `geostamp` crate.

use crate::{
    container::ContainerFormat,
    exif::gps::GeoCoordinate,
    stamp::{self, StampOptions},
    timestamp::{FilenameTimestampParser, TimestampParser},
};
use std::path::Path;
use wasm_bindgen::prelude::*;

fn to_js_error(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Stamp one image the way the command line does for each file in a folder. `file_name` supplies
/// both the timestamp and the output container. Returns the new file contents, or the input
/// unchanged when the extension is one that is never written.
#[wasm_bindgen]
pub fn stamp_image(
    data: &[u8],
    file_name: &str,
    modify_timestamp: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Vec<u8>, JsValue> {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let timestamp = FilenameTimestampParser.parse(&stem).map_err(to_js_error)?;

    let coordinate = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoCoordinate::new(latitude, longitude)),
        (None, None) => None,
        _ => return Err(JsValue::from_str("latitude and longitude must be given together")),
    };
    let options = StampOptions {
        modify_timestamp,
        coordinate,
    };

    let format = ContainerFormat::from_path(path);
    match stamp::stamp_image(data, format, &timestamp, &options).map_err(to_js_error)? {
        Some(output) => Ok(output),
        None => Ok(data.to_vec()),
    }
}

/// Decode an image and return its Exif metadata, grouped by IFD, as a JavaScript object.
#[wasm_bindgen]
pub fn read_metadata(data: &[u8]) -> Result<JsValue, JsValue> {
    let block = stamp::read_block(data).map_err(to_js_error)?;
    JsValue::from_serde(&block)
        .map_err(|_| JsValue::from_str("Unable to convert result to JSON!"))
}
