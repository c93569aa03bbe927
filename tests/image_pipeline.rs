//! End-to-end image paths: analysis over generated files, the strip batch,
//! and a GPS-tagged JPEG through the analyzer.

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use std::io::Cursor;
use std::sync::Arc;

use file_toolbox::analyzer;
use file_toolbox::processor;
use file_toolbox::reencode::NativeCodec;
use file_toolbox::walker;

fn png_file(dir: &std::path::Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, buf.into_inner()).unwrap();
    path
}

/// Minimal JPEG container: SOI, one APP1 EXIF segment, EOI. Enough for the
/// metadata side of analysis; there is deliberately no image frame.
fn jpeg_with_exif(raw_exif: &[u8]) -> Vec<u8> {
    let mut out = vec![0xff, 0xd8, 0xff, 0xe1];
    out.extend_from_slice(&((raw_exif.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(raw_exif);
    out.extend_from_slice(&[0xff, 0xd9]);
    out
}

fn rational(num: u32, denom: u32) -> Rational {
    Rational { num, denom }
}

#[tokio::test]
async fn analyze_plain_png_reports_dimensions_and_no_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = png_file(dir.path(), "plain.png", 64, 48);

    let record = analyzer::analyze_file(&path).await.unwrap();
    assert_eq!(record.file_name, "plain.png");
    assert_eq!(record.width, Some(64));
    assert_eq!(record.height, Some(48));
    assert_eq!(record.media_type.as_deref(), Some("image/png"));
    assert!(record.raw.is_empty());
    assert_eq!(record.raw_dump(), "No embedded metadata found.");
    assert_eq!(record.location(), None);
}

#[tokio::test]
async fn analyze_gps_tagged_jpeg_formats_the_reference_coordinate() {
    let make = Field {
        tag: Tag::Make,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"Canon".to_vec()]),
    };
    let model = Field {
        tag: Tag::Model,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"EOS 5D".to_vec()]),
    };
    let lat = Field {
        tag: Tag::GPSLatitude,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![rational(40, 1), rational(26, 1), rational(46, 1)]),
    };
    let lat_ref = Field {
        tag: Tag::GPSLatitudeRef,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"N".to_vec()]),
    };
    let lng = Field {
        tag: Tag::GPSLongitude,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![rational(79, 1), rational(58, 1), rational(56, 1)]),
    };
    let lng_ref = Field {
        tag: Tag::GPSLongitudeRef,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"W".to_vec()]),
    };

    let mut writer = Writer::new();
    writer.push_field(&make);
    writer.push_field(&model);
    writer.push_field(&lat);
    writer.push_field(&lat_ref);
    writer.push_field(&lng);
    writer.push_field(&lng_ref);
    let mut raw = Cursor::new(Vec::new());
    writer.write(&mut raw, false).unwrap();

    let bytes = jpeg_with_exif(raw.get_ref());
    let size = bytes.len() as u64;
    let record = analyzer::analyze_bytes("geo.jpg".into(), size, Arc::new(bytes))
        .await
        .unwrap();

    assert_eq!(record.camera.as_deref(), Some("Canon EOS 5D"));
    assert_eq!(
        record.location().as_deref(),
        Some("40.446111\u{b0} N, 79.982222\u{b0} W")
    );
    // South/west encoding is in the sign, not the reference string.
    assert!(record.gps_longitude.unwrap() < 0.0);
    assert!(record.gps_latitude.unwrap() > 0.0);
    assert!(record.raw.contains_key("GPSLatitude"));
}

#[tokio::test]
async fn batch_strip_cleans_images_and_skips_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    png_file(dir.path(), "a.png", 10, 10);
    png_file(dir.path(), "b.png", 4, 6);
    std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();
    std::fs::write(dir.path().join("broken.png"), b"corrupt bytes").unwrap();

    let allowed: std::collections::HashSet<String> =
        ["png".to_string()].into_iter().collect();
    let (paths_tx, paths_rx) = crossbeam_channel::unbounded();
    let (reports_tx, reports_rx) = crossbeam_channel::unbounded();

    let root = dir.path().to_path_buf();
    let walker_handle = tokio::task::spawn_blocking({
        let allowed = allowed.clone();
        move || walker::start_walking(&root, &allowed, paths_tx)
    });
    let processor_handle = tokio::task::spawn_blocking(move || {
        let codec = NativeCodec::default();
        processor::start_processing(&codec, 2, None, None, paths_rx, reports_tx)
    });

    let (discovered, processed) = tokio::try_join!(walker_handle, processor_handle).unwrap();
    assert_eq!(discovered.unwrap(), 3); // two good images + the corrupt one
    processed.unwrap();

    let reports: Vec<_> = reports_rx.iter().collect();
    assert_eq!(reports.len(), 2); // the corrupt file was skipped, not fatal
    assert!(dir.path().join("a-clean.png").exists());
    assert!(dir.path().join("b-clean.png").exists());
    assert!(!dir.path().join("notes-clean.png").exists());

    // Cleaned copies decode to the original dimensions.
    let cleaned = image::open(dir.path().join("b-clean.png")).unwrap();
    assert_eq!((cleaned.width(), cleaned.height()), (4, 6));
}
