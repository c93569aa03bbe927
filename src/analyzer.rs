//! Per-file metadata analysis.
//!
//! The dimension probe and the EXIF parse are independent, so they run as two
//! blocking tasks joined before assembly. Either side may fail without
//! failing the analysis: a file with no parseable metadata still yields a
//! record (with an empty raw map), and a file the decoder rejects still
//! reports its EXIF fields.

use exif::{In, Tag, Value};
use std::collections::BTreeMap;
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;

use crate::error::AppError;
use crate::fields;
use crate::gps;
use crate::metadata::MetadataRecord;

const DATE_PRECEDENCE: [&str; 3] = ["DateTimeOriginal", "DateTimeDigitized", "DateTime"];
const ISO_PRECEDENCE: [&str; 3] = [
    "PhotographicSensitivity",
    "ISOSpeed",
    "StandardOutputSensitivity",
];
const DESCRIPTION_PRECEDENCE: [&str; 2] = ["ImageDescription", "UserComment"];

/// Input gate, checked before any decode is attempted: the declared media
/// type must be `image/*` or the extension must be allow-listed. Rejected
/// files cause no state change.
pub fn is_supported_image(name: &str, allowed_extensions: &std::collections::HashSet<String>) -> bool {
    let by_type = mime_guess::from_path(name)
        .first()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false);
    let by_extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed_extensions.contains(&e.to_lowercase()))
        .unwrap_or(false);
    by_type || by_extension
}

pub async fn analyze_file(path: &Path) -> Result<MetadataRecord, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let size = bytes.len() as u64;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    analyze_bytes(name, size, Arc::new(bytes)).await
}

pub async fn analyze_bytes(
    name: String,
    size: u64,
    bytes: Arc<Vec<u8>>,
) -> Result<MetadataRecord, AppError> {
    log::debug!("Analyzing {} ({} bytes)", name, size);

    let bytes_for_dims = bytes.clone();
    let dims_task = tokio::task::spawn_blocking(move || probe_dimensions(&bytes_for_dims));
    let bytes_for_exif = bytes.clone();
    let exif_task = tokio::task::spawn_blocking(move || parse_exif(&bytes_for_exif));

    let (dims, exif) = tokio::try_join!(dims_task, exif_task)?;
    Ok(assemble(&name, size, dims, exif.as_ref()))
}

/// Decode-independent dimension probe; tolerant of unsupported formats.
fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .map_err(|e| log::debug!("Dimension probe failed: {}", e))
        .ok()
}

/// A failed parse yields an empty result set rather than aborting analysis.
fn parse_exif(bytes: &[u8]) -> Option<exif::Exif> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    exif::Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| log::debug!("No parseable EXIF container: {}", e))
        .ok()
}

fn assemble(
    name: &str,
    size: u64,
    dims: Option<(u32, u32)>,
    exif: Option<&exif::Exif>,
) -> MetadataRecord {
    let raw = exif.map(raw_map).unwrap_or_default();

    let mut record = MetadataRecord {
        file_name: name.to_string(),
        file_size: size,
        media_type: mime_guess::from_path(name).first().map(|m| m.to_string()),
        raw,
        ..Default::default()
    };

    record.date_taken =
        fields::pick_first(&record.raw, &DATE_PRECEDENCE).map(|s| s.to_string());
    record.iso = fields::pick_first(&record.raw, &ISO_PRECEDENCE).map(|s| s.to_string());
    record.description =
        fields::pick_first(&record.raw, &DESCRIPTION_PRECEDENCE).map(|s| s.to_string());

    if let Some(exif) = exif {
        let make = ascii_field(exif, Tag::Make);
        let model = ascii_field(exif, Tag::Model);
        let camera = [make, model]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !camera.is_empty() {
            record.camera = Some(camera);
        }

        // EXIF-reported pixel dimensions take precedence over the probe.
        record.width = fields::first_present(vec![
            uint_field(exif, Tag::PixelXDimension),
            uint_field(exif, Tag::ImageWidth),
            dims.map(|d| d.0),
        ]);
        record.height = fields::first_present(vec![
            uint_field(exif, Tag::PixelYDimension),
            uint_field(exif, Tag::ImageLength),
            dims.map(|d| d.1),
        ]);

        record.lens = fields::first_present(vec![
            ascii_field(exif, Tag::LensModel),
            ascii_field(exif, Tag::LensMake),
        ]);
        record.aperture = rational_field(exif, Tag::FNumber)
            .map(|f| format!("f/{}", fields::trim_float(f, 1)));
        record.shutter_speed = shutter_speed(exif);
        record.focal_length =
            rational_field(exif, Tag::FocalLength).map(|f| format!("{:.0} mm", f));
        record.focal_length_35mm = uint_field(exif, Tag::FocalLengthIn35mmFilm)
            .filter(|v| *v > 0)
            .map(|v| format!("{} mm (35mm eq.)", v));
        record.exposure_bias = srational_field(exif, Tag::ExposureBiasValue)
            .map(|v| format!("{} EV", fields::trim_float(v, 2)));
        record.exposure_program =
            uint_field(exif, Tag::ExposureProgram).map(fields::exposure_program_label);
        record.metering_mode =
            uint_field(exif, Tag::MeteringMode).map(fields::metering_mode_label);
        record.white_balance =
            uint_field(exif, Tag::WhiteBalance).map(fields::white_balance_label);
        record.orientation = uint_field(exif, Tag::Orientation).map(fields::orientation_label);
        record.flash = uint_field(exif, Tag::Flash).map(fields::flash_label);
        record.software = ascii_field(exif, Tag::Software);
        record.artist = ascii_field(exif, Tag::Artist);
        record.copyright = ascii_field(exif, Tag::Copyright);

        record.gps_latitude = gps_component(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
        record.gps_longitude = gps_component(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);
        record.altitude = altitude(exif);
    } else {
        record.width = dims.map(|d| d.0);
        record.height = dims.map(|d| d.1);
    }

    log::trace!("Assembled record for {}: {:?}", name, record);
    record
}

/// Every recognized primary-image field, display-rendered. Thumbnail-IFD
/// duplicates are skipped.
fn raw_map(exif: &exif::Exif) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        map.insert(
            field.tag.to_string(),
            field.display_value().with_unit(exif).to_string(),
        );
    }
    map
}

fn uint_field(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}

fn rational_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Rational(parts)) if !parts.is_empty() && parts[0].denom != 0 => {
            Some(parts[0].to_f64())
        }
        _ => None,
    }
}

fn srational_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::SRational(parts)) if !parts.is_empty() && parts[0].denom != 0 => {
            Some(parts[0].to_f64())
        }
        _ => None,
    }
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(lines)) if !lines.is_empty() => {
            let s = String::from_utf8_lossy(&lines[0]).trim().to_string();
            (!s.is_empty()).then_some(s)
        }
        _ => None,
    }
}

fn shutter_speed(exif: &exif::Exif) -> Option<String> {
    let seconds = rational_field(exif, Tag::ExposureTime).or_else(|| {
        // APEX: Tv = -log2(seconds).
        srational_field(exif, Tag::ShutterSpeedValue).map(|tv| 2f64.powf(-tv))
    })?;
    fields::exposure_fraction(seconds).map(|f| format!("{} sec", f))
}

fn gps_component(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let coordinate = gps::coordinate_from_exif(&field.value)?;
    let reference = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string());
    gps::normalize(&coordinate, reference.as_deref())
}

fn altitude(exif: &exif::Exif) -> Option<String> {
    let meters = rational_field(exif, Tag::GPSAltitude)?;
    // Ref 1 means below sea level.
    let below = uint_field(exif, Tag::GPSAltitudeRef) == Some(1);
    let signed = if below { -meters } else { meters };
    Some(format!("{} m", fields::trim_float(signed, 1)))
}
