use crate::ip_lookup::IpEndpoint;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_image_extensions")]
    pub allowed_image_extensions: HashSet<String>,
    #[serde(default)]
    pub num_workers: usize,
    #[serde(default = "default_web_port")]
    pub web_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_line_tolerance")]
    pub pdf_line_tolerance: f64,
    #[serde(default = "default_ip_timeout")]
    pub ip_timeout_secs: u64,
    #[serde(default = "IpEndpoint::defaults")]
    pub ip_endpoints: Vec<IpEndpoint>,
}

fn default_image_extensions() -> HashSet<String> {
    ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "heic", "heif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_web_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_line_tolerance() -> f64 {
    10.0
}

fn default_ip_timeout() -> u64 {
    5
}

impl AppConfig {
    /// Layered load: `config/default` < `config/{RUN_MODE}` < `config/local`.
    /// Every file is optional; missing keys fall back to the serde defaults,
    /// so the binary also runs without any config directory at all.
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_image_extensions: default_image_extensions(),
            num_workers: 0,
            web_port: default_web_port(),
            log_level: default_log_level(),
            jpeg_quality: default_jpeg_quality(),
            pdf_line_tolerance: default_line_tolerance(),
            ip_timeout_secs: default_ip_timeout(),
            ip_endpoints: IpEndpoint::defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_fields() {
        let cfg = AppConfig::default();
        assert!(cfg.allowed_image_extensions.contains("jpg"));
        assert!(cfg.allowed_image_extensions.contains("tiff"));
        assert_eq!(cfg.web_port, 8080);
        assert_eq!(cfg.ip_timeout_secs, 5);
        assert!(!cfg.ip_endpoints.is_empty());
        assert!((cfg.pdf_line_tolerance - 10.0).abs() < f64::EPSILON);
    }
}
