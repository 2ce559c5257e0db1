//! Walking a folder and stamping every image in it.

use crate::{
    container::ContainerFormat,
    error::{Error, Result},
    exif::MetadataBlock,
    stamp::{self, StampOptions},
    timestamp::TimestampParser,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, debug_span, info};

/// One file in the folder being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub path: PathBuf,
    /// File name without its extension; this is what the timestamp is parsed from.
    pub name: String,
    pub extension: Option<String>,
}

impl BatchItem {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned());

        BatchItem {
            path,
            name,
            extension,
        }
    }

    /// The container the file is written back in, or `None` if it is never written.
    pub fn format(&self) -> Option<ContainerFormat> {
        self.extension
            .as_deref()
            .and_then(ContainerFormat::from_extension)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files rewritten with new metadata.
    pub written: usize,
    /// Images that were checked but have an extension that is never written.
    pub skipped: usize,
}

/// The regular files directly inside `dir`, sorted by name. Subdirectories are ignored.
pub fn list_directory(dir: &Path) -> Result<Vec<BatchItem>> {
    let io_error = |e| Error::Io(e, dir.into());

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "not a regular file, skipping");
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(paths.into_iter().map(BatchItem::new).collect())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Io(e, path.into()))
}

/// Stamp every image in `dir`. The first error aborts the run; files before it have already been
/// rewritten, files after it are left alone.
pub fn process_directory(
    dir: &Path,
    options: &StampOptions,
    parser: &dyn TimestampParser,
) -> Result<BatchSummary> {
    // Checked before any file is touched
    let gps = options.gps_position()?;
    let mut summary = BatchSummary::default();

    for item in list_directory(dir)? {
        let path = item.path.as_path();
        let _span = debug_span!("stamp", file = %path.display()).entered();

        let timestamp = parser.parse(&item.name)?;
        let data = read_file(path)?;

        let mut decoded = stamp::decode_image(&data).map_err(|e| e.decoding(path))?;
        stamp::stamp_block(
            &mut decoded.block,
            &timestamp,
            options.modify_timestamp,
            gps.as_ref(),
        );
        let tiff = decoded.block.encode().map_err(|e| e.writing(path))?;

        match item.format() {
            Some(format) => {
                let output = decoded.encode(format, &tiff).map_err(|e| e.writing(path))?;
                fs::write(path, output).map_err(|e| Error::Io(e, path.into()))?;
                info!(%timestamp, gps = gps.is_some(), "updated {}", path.display());
                summary.written += 1;
            }
            None => {
                debug!(extension = ?item.extension, "extension is never written, leaving file as is");
                summary.skipped += 1;
            }
        }
    }

    info!(
        written = summary.written,
        skipped = summary.skipped,
        "finished {}",
        dir.display()
    );
    Ok(summary)
}

/// The metadata of one file, as printed by the dump mode.
#[derive(Debug, Clone, Serialize)]
pub struct DumpEntry {
    pub file: String,
    pub format: Option<ContainerFormat>,
    pub metadata: MetadataBlock,
}

/// Decode the metadata of every image in `dir` without modifying anything.
pub fn dump_directory(dir: &Path) -> Result<Vec<DumpEntry>> {
    let mut entries = Vec::new();
    for item in list_directory(dir)? {
        let data = read_file(&item.path)?;
        let decoded = stamp::decode_image(&data).map_err(|e| e.decoding(&item.path))?;

        entries.push(DumpEntry {
            file: item.path.display().to_string(),
            format: decoded.source(),
            metadata: decoded.block,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod test {
    use super::{dump_directory, list_directory, process_directory, BatchItem, BatchSummary};
    use crate::{
        container::ContainerFormat,
        error::Error,
        exif::{
            gps::GeoCoordinate,
            tags::{exif, gps, image as primary},
            IFDValue, MetadataBlock, Segment,
        },
        stamp::{read_block, StampOptions},
        timestamp::FilenameTimestampParser,
    };
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
    use std::{fs, io::Cursor, path::Path};

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
        }))
    }

    fn write_image(dir: &Path, name: &str, format: ContainerFormat) {
        let data = format.transcode(&sample_image()).unwrap();
        fs::write(dir.join(name), data).unwrap();
    }

    fn block_of(dir: &Path, name: &str) -> MetadataBlock {
        read_block(&fs::read(dir.join(name)).unwrap()).unwrap()
    }

    fn run(dir: &Path, options: &StampOptions) -> crate::error::Result<BatchSummary> {
        process_directory(dir, options, &FilenameTimestampParser)
    }

    #[test]
    fn test_batch_item_names() {
        let item = BatchItem::new("photos/IMG_20230615_143000.JPEG".into());
        assert_eq!(item.name, "IMG_20230615_143000");
        assert_eq!(item.extension.as_deref(), Some("JPEG"));
        assert_eq!(item.format(), Some(ContainerFormat::Jpeg));

        let item = BatchItem::new("photos/notes".into());
        assert_eq!(item.name, "notes");
        assert_eq!(item.extension, None);
        assert_eq!(item.format(), None);
    }

    #[test]
    fn test_list_directory_is_sorted_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join("a.png"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.jpg"), b"").unwrap();

        let names: Vec<_> = list_directory(dir.path())
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_timestamp_written_to_jpeg_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "20230615_143000.jpg", ContainerFormat::Jpeg);

        let summary = run(dir.path(), &StampOptions::default()).unwrap();
        assert_eq!(summary, BatchSummary { written: 1, skipped: 0 });

        let block = block_of(dir.path(), "20230615_143000.jpg");
        let expected = IFDValue::ascii("2023:06:15 14:30:00");
        assert_eq!(block.get(Segment::Primary, primary::DATE_TIME), Some(&expected));
        assert_eq!(block.get(Segment::Exif, exif::DATE_TIME_ORIGINAL), Some(&expected));
        assert_eq!(block.get(Segment::Exif, exif::DATE_TIME_DIGITIZED), Some(&expected));
        assert!(block.segment(Segment::Gps).is_empty());
    }

    #[test]
    fn test_gps_without_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let name = "20230615_143000.jpg";

        let mut existing = MetadataBlock::default();
        let old = IFDValue::ascii("2001:02:03 04:05:06");
        existing.insert(Segment::Primary, primary::DATE_TIME, old.clone());
        existing.insert(Segment::Exif, exif::DATE_TIME_ORIGINAL, old.clone());
        let jpeg = ContainerFormat::Jpeg.transcode(&sample_image()).unwrap();
        let jpeg = ContainerFormat::Jpeg
            .write_exif(&jpeg, &existing.encode().unwrap())
            .unwrap();
        fs::write(dir.path().join(name), jpeg).unwrap();

        let options = StampOptions {
            modify_timestamp: false,
            coordinate: Some(GeoCoordinate::new(37.7749, -122.4194)),
        };
        run(dir.path(), &options).unwrap();

        let block = block_of(dir.path(), name);
        assert_eq!(block.get(Segment::Primary, primary::DATE_TIME), Some(&old));
        assert_eq!(block.get(Segment::Exif, exif::DATE_TIME_ORIGINAL), Some(&old));
        assert!(block.get(Segment::Exif, exif::DATE_TIME_DIGITIZED).is_none());

        assert_eq!(block.get(Segment::Gps, gps::GPS_LATITUDE_REF), Some(&IFDValue::ascii("N")));
        assert_eq!(block.get(Segment::Gps, gps::GPS_LONGITUDE_REF), Some(&IFDValue::ascii("W")));
        assert!(block.get(Segment::Gps, gps::GPS_LATITUDE).is_some());
        assert!(block.get(Segment::Gps, gps::GPS_LONGITUDE).is_some());
        assert_eq!(
            block.get(Segment::Gps, gps::GPS_ALTITUDE_REF),
            Some(&IFDValue::UnsignedByte(vec![0]))
        );
        assert!(block.get(Segment::Gps, gps::GPS_DATE_STAMP).is_none());
    }

    #[test]
    fn test_unparseable_name_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "20230101_000000.jpg", ContainerFormat::Jpeg);
        write_image(dir.path(), "IMG_final.jpg", ContainerFormat::Jpeg);
        write_image(dir.path(), "zz_20230102_000000.jpg", ContainerFormat::Jpeg);
        let final_before = fs::read(dir.path().join("IMG_final.jpg")).unwrap();
        let later_before = fs::read(dir.path().join("zz_20230102_000000.jpg")).unwrap();

        match run(dir.path(), &StampOptions::default()) {
            Err(Error::Timestamp(name)) => assert_eq!(name, "IMG_final"),
            other => panic!("unexpected {:?}", other),
        }

        // The file before it was processed, the file itself and the ones after it weren't
        assert!(block_of(dir.path(), "20230101_000000.jpg")
            .get(Segment::Primary, primary::DATE_TIME)
            .is_some());
        assert_eq!(fs::read(dir.path().join("IMG_final.jpg")).unwrap(), final_before);
        assert_eq!(
            fs::read(dir.path().join("zz_20230102_000000.jpg")).unwrap(),
            later_before
        );
    }

    #[test]
    fn test_gif_is_decoded_but_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255])));
        let mut gif = Cursor::new(Vec::new());
        image.write_to(&mut gif, ImageFormat::Gif).unwrap();
        let gif = gif.into_inner();
        fs::write(dir.path().join("20230615_143000.gif"), &gif).unwrap();

        let summary = run(dir.path(), &StampOptions::default()).unwrap();
        assert_eq!(summary, BatchSummary { written: 0, skipped: 1 });
        assert_eq!(fs::read(dir.path().join("20230615_143000.gif")).unwrap(), gif);
    }

    #[test]
    fn test_png_and_mismatched_content() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "2023-06-15 14.30.00.png", ContainerFormat::Png);
        // A PNG hiding behind a JPEG extension
        write_image(dir.path(), "20230616_090000.jpg", ContainerFormat::Png);

        let options = StampOptions {
            modify_timestamp: true,
            coordinate: Some(GeoCoordinate::new(-33.8568, 151.2153)),
        };
        let summary = run(dir.path(), &options).unwrap();
        assert_eq!(summary.written, 2);

        let png = fs::read(dir.path().join("2023-06-15 14.30.00.png")).unwrap();
        assert_eq!(ContainerFormat::detect(&png), Some(ContainerFormat::Png));
        let block = read_block(&png).unwrap();
        assert_eq!(
            block.get(Segment::Gps, gps::GPS_DATE_STAMP),
            Some(&IFDValue::ascii("2023:06:15"))
        );
        assert_eq!(block.get(Segment::Gps, gps::GPS_LATITUDE_REF), Some(&IFDValue::ascii("S")));

        let jpeg = fs::read(dir.path().join("20230616_090000.jpg")).unwrap();
        assert_eq!(ContainerFormat::detect(&jpeg), Some(ContainerFormat::Jpeg));
        assert_eq!(
            read_block(&jpeg).unwrap().get(Segment::Primary, primary::DATE_TIME),
            Some(&IFDValue::ascii("2023:06:16 09:00:00"))
        );
    }

    #[test]
    fn test_out_of_range_coordinate_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "20230615_143000.jpg", ContainerFormat::Jpeg);
        let before = fs::read(dir.path().join("20230615_143000.jpg")).unwrap();

        let options = StampOptions {
            modify_timestamp: true,
            coordinate: Some(GeoCoordinate::new(91.0, 0.0)),
        };
        match run(dir.path(), &options) {
            Err(Error::CoordinateRange { latitude, .. }) => assert_eq!(latitude, 91.0),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fs::read(dir.path().join("20230615_143000.jpg")).unwrap(), before);
    }

    #[test]
    fn test_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("20230615_143000.jpg"), b"definitely not a JPEG").unwrap();

        match run(dir.path(), &StampOptions::default()) {
            Err(Error::Decode { path, .. }) => {
                assert_eq!(path, dir.path().join("20230615_143000.jpg"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        match run(&dir.path().join("missing"), &StampOptions::default()) {
            Err(Error::Io(_, path)) => assert_eq!(&*path, dir.path().join("missing").as_path()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dump_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "20230615_143000.jpg", ContainerFormat::Jpeg);
        run(dir.path(), &StampOptions::default()).unwrap();

        let entries = dump_directory(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].format, Some(ContainerFormat::Jpeg));

        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["format"], "jpeg");
        assert_eq!(json["metadata"]["primary"]["DateTime"], "2023:06:15 14:30:00");
    }
}
