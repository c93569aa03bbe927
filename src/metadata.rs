use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gps;

/// Normalized metadata for one analyzed file. Built fresh per analysis and
/// discarded afterwards; nothing is persisted. Absent fields stay `None` and
/// are omitted from display.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MetadataRecord {
    pub file_name: String,
    pub file_size: u64,
    pub media_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub date_taken: Option<String>,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<String>,
    pub focal_length: Option<String>,
    pub focal_length_35mm: Option<String>,
    pub exposure_bias: Option<String>,
    pub exposure_program: Option<String>,
    pub metering_mode: Option<String>,
    pub white_balance: Option<String>,
    pub orientation: Option<String>,
    pub flash: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub altitude: Option<String>,
    pub software: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    /// Every recognized tag, display-rendered, for the structured dump.
    pub raw: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Decimal-degree location string, `None` unless both coordinates
    /// normalized successfully.
    pub fn location(&self) -> Option<String> {
        match (self.gps_latitude, self.gps_longitude) {
            (Some(lat), Some(lng)) => Some(gps::format_lat_lng(lat, lng)),
            _ => None,
        }
    }

    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{} \u{d7} {}", w, h)),
            _ => None,
        }
    }

    /// Detail rows in display order, absent fields skipped.
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        let candidates: [(&'static str, Option<&String>); 17] = [
            ("Lens", self.lens.as_ref()),
            ("Aperture", self.aperture.as_ref()),
            ("Shutter Speed", self.shutter_speed.as_ref()),
            ("ISO", self.iso.as_ref()),
            ("Focal Length", self.focal_length.as_ref()),
            ("35mm Equivalent", self.focal_length_35mm.as_ref()),
            ("Exposure Comp.", self.exposure_bias.as_ref()),
            ("Exposure Program", self.exposure_program.as_ref()),
            ("Metering Mode", self.metering_mode.as_ref()),
            ("White Balance", self.white_balance.as_ref()),
            ("Orientation", self.orientation.as_ref()),
            ("Flash", self.flash.as_ref()),
            ("Altitude", self.altitude.as_ref()),
            ("Software", self.software.as_ref()),
            ("Artist", self.artist.as_ref()),
            ("Copyright", self.copyright.as_ref()),
            ("Description", self.description.as_ref()),
        ];
        candidates
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v.clone())))
            .collect()
    }

    /// Pretty-printed dump of everything the parser recognized.
    pub fn raw_dump(&self) -> String {
        if self.raw.is_empty() {
            return "No embedded metadata found.".to_string();
        }
        serde_json::to_string_pretty(&self.raw)
            .unwrap_or_else(|_| "Unable to render metadata JSON.".to_string())
    }
}
