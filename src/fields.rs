//! Field selection and display formatting for metadata values.
//!
//! EXIF grew synonymous tag names over its revisions (the 0x8827 sensitivity
//! tag alone has three). [`pick_first`] resolves one concept from a fixed
//! precedence list; the tables below map numeric enumerations to labels.

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// First present, non-empty candidate wins. Pure and total: absent concepts
/// come back as `None`, never an error.
pub fn pick_first<'a>(raw: &'a BTreeMap<String, String>, candidates: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|name| raw.get(*name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

/// Same selection rule over already-extracted optional values.
pub fn first_present<T>(candidates: Vec<Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

lazy_static! {
    static ref EXPOSURE_PROGRAMS: HashMap<u32, &'static str> = HashMap::from([
        (0, "Not defined"),
        (1, "Manual"),
        (2, "Normal"),
        (3, "Aperture priority"),
        (4, "Shutter priority"),
        (5, "Creative"),
        (6, "Action"),
        (7, "Portrait"),
        (8, "Landscape"),
    ]);
    static ref METERING_MODES: HashMap<u32, &'static str> = HashMap::from([
        (0, "Unknown"),
        (1, "Average"),
        (2, "Center-weighted"),
        (3, "Spot"),
        (4, "Multi-spot"),
        (5, "Multi-segment"),
        (6, "Partial"),
        (255, "Other"),
    ]);
    static ref WHITE_BALANCE: HashMap<u32, &'static str> =
        HashMap::from([(0, "Auto"), (1, "Manual")]);
    static ref ORIENTATIONS: HashMap<u32, &'static str> = HashMap::from([
        (1, "Normal"),
        (2, "Mirror horizontal"),
        (3, "Rotate 180\u{b0}"),
        (4, "Mirror vertical"),
        (5, "Mirror + rotate 90\u{b0} CW"),
        (6, "Rotate 90\u{b0} CW"),
        (7, "Mirror + rotate 270\u{b0}"),
        (8, "Rotate 270\u{b0}"),
    ]);
}

fn label_or_number(table: &HashMap<u32, &'static str>, code: u32) -> String {
    table
        .get(&code)
        .map(|s| s.to_string())
        .unwrap_or_else(|| code.to_string())
}

pub fn exposure_program_label(code: u32) -> String {
    label_or_number(&EXPOSURE_PROGRAMS, code)
}

pub fn metering_mode_label(code: u32) -> String {
    label_or_number(&METERING_MODES, code)
}

pub fn white_balance_label(code: u32) -> String {
    label_or_number(&WHITE_BALANCE, code)
}

pub fn orientation_label(code: u32) -> String {
    label_or_number(&ORIENTATIONS, code)
}

/// Bit 0 of the flash word is the fired flag; the rest (return light, mode,
/// red-eye) is kept visible as the raw hex word.
pub fn flash_label(word: u32) -> String {
    let fired = word & 0x1 != 0;
    format!(
        "{} (0x{:x})",
        if fired { "Fired" } else { "Did not fire" },
        word
    )
}

/// `1/250` for sub-second exposures, a trimmed decimal for longer ones.
pub fn exposure_fraction(seconds: f64) -> Option<String> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return None;
    }
    if seconds >= 1.0 {
        let s = format!("{:.2}", seconds);
        Some(s.trim_end_matches('0').trim_end_matches('.').to_string())
    } else {
        Some(format!("1/{}", (1.0 / seconds).round() as i64))
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if value < 10.0 && unit > 0 {
        format!("{:.1} {}", value, UNITS[unit])
    } else {
        format!("{:.0} {}", value, UNITS[unit])
    }
}

/// Trims a float for display: `2.80` → `2.8`, `50.00` → `50`.
pub fn trim_float(value: f64, places: usize) -> String {
    let s = format!("{:.*}", places, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pick_first_respects_precedence() {
        let m = raw(&[("ISOSpeed", "800"), ("PhotographicSensitivity", "200")]);
        assert_eq!(
            pick_first(&m, &["PhotographicSensitivity", "ISOSpeed"]),
            Some("200")
        );
    }

    #[test]
    fn pick_first_skips_empty_values() {
        let m = raw(&[("DateTimeOriginal", "   "), ("DateTime", "2024-01-01 12:00:00")]);
        assert_eq!(
            pick_first(&m, &["DateTimeOriginal", "DateTimeDigitized", "DateTime"]),
            Some("2024-01-01 12:00:00")
        );
    }

    #[test]
    fn pick_first_is_total() {
        let m = raw(&[]);
        assert_eq!(pick_first(&m, &["Make", "Model"]), None);
    }

    #[test]
    fn enum_labels_fall_through_to_the_code() {
        assert_eq!(exposure_program_label(3), "Aperture priority");
        assert_eq!(exposure_program_label(42), "42");
        assert_eq!(metering_mode_label(255), "Other");
        assert_eq!(white_balance_label(0), "Auto");
        assert_eq!(orientation_label(6), "Rotate 90\u{b0} CW");
    }

    #[test]
    fn flash_reads_the_fired_bit() {
        assert_eq!(flash_label(0x19), "Fired (0x19)");
        assert_eq!(flash_label(0x10), "Did not fire (0x10)");
    }

    #[test]
    fn exposure_fraction_covers_both_ranges() {
        assert_eq!(exposure_fraction(0.004).as_deref(), Some("1/250"));
        assert_eq!(exposure_fraction(2.5).as_deref(), Some("2.5"));
        assert_eq!(exposure_fraction(30.0).as_deref(), Some("30"));
        assert_eq!(exposure_fraction(0.0), None);
        assert_eq!(exposure_fraction(f64::NAN), None);
    }

    #[test]
    fn byte_formatting_matches_display_rules() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(200 * 1024), "200 KB");
    }

    #[test]
    fn float_trimming() {
        assert_eq!(trim_float(2.80, 1), "2.8");
        assert_eq!(trim_float(50.0, 0), "50");
        assert_eq!(trim_float(-0.33, 2), "-0.33");
    }
}
