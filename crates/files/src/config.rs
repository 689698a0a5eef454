use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FileError;

/// Runtime settings for path resolution and file-info extraction.
///
/// Every field has a default, so a settings file only needs to override what
/// differs. Filter lists are ordered: the first pattern that matches a
/// comment wins. Patterns use named capture groups — `mm` for millimetres,
/// `m` for metres (scaled ×1000), and `h`/`m`/`s` for time components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Physical root directory for drive 0.
    pub base_directory: PathBuf,
    /// Cadence of the host telemetry refresh in milliseconds. Consumed by
    /// the telemetry collector, not by the parsers in this crate.
    pub host_update_interval_ms: u64,
    /// Block size for forward reads and buffer size for the reverse reader.
    pub file_info_read_buffer_size: usize,
    /// Maximum number of bytes scanned from the start of a file.
    pub file_info_read_limit_header: u64,
    /// Maximum number of bytes scanned from the end of a file.
    pub file_info_read_limit_footer: u64,
    /// Upper bound on plausible first-layer Z heights (mm).
    pub max_layer_height: f64,
    /// Patterns extracting the layer height (group `mm`).
    pub layer_height_filters: Vec<String>,
    /// Patterns extracting filament usage (groups `mm` and `m`); every match
    /// on the line contributes one value.
    pub filament_filters: Vec<String>,
    /// Patterns extracting the slicer name (group 1).
    pub generated_by_filters: Vec<String>,
    /// Patterns extracting the estimated print time (groups `h`, `m`, `s`).
    pub print_time_filters: Vec<String>,
    /// Patterns extracting the simulated print time (groups `h`, `m`, `s`).
    pub simulated_time_filters: Vec<String>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            base_directory: PathBuf::from("/opt/printhost/sd"),
            host_update_interval_ms: 4000,
            file_info_read_buffer_size: 8192,
            file_info_read_limit_header: 12288,
            file_info_read_limit_footer: 262_144,
            max_layer_height: 0.9,
            layer_height_filters: vec![
                r"(?i)layer_height\D+(?<mm>\d+\.?\d*)".into(),
                r"(?i)layer height\D+(?<mm>\d+\.?\d*)".into(),
                r"(?i)layerheight\D+(?<mm>\d+\.?\d*)".into(),
                r"(?i)layer_thickness_mm\D+(?<mm>\d+\.?\d*)".into(),
                r"(?i)layerthickness\D+(?<mm>\d+\.?\d*)".into(),
            ],
            filament_filters: vec![
                r"(?i)filament used\D*(?<mm>\d+\.?\d*)\s*mm".into(),
                r"(?i)filament used\D*(?<m>\d+\.?\d*)\s*m([^m]|$)".into(),
                r"(?i)filament length\D*(?<mm>\d+\.?\d*)\s*mm".into(),
                r"(?i)\((?<mm>\d+\.?\d*)\s*mm\)".into(),
            ],
            generated_by_filters: vec![
                r"(?i)generated by\s+(.+)".into(),
                r"(?i)sliced by\s+(.+)".into(),
                r"(KISSlicer.*)".into(),
                r"(?i)sliced at:\s*(.+)".into(),
                r"(?i)generated with\s+(.+)".into(),
            ],
            print_time_filters: vec![
                r"(?i)estimated printing time.*=\s*(?:(?<h>\d+\.?\d*)h\s*)?(?:(?<m>\d+\.?\d*)m\s*)?(?<s>\d+\.?\d*)s".into(),
                r"(?i)TIME:(?<s>\d+\.?\d*)".into(),
                r"(?i)Build time:\s*(?:(?<h>\d+\.?\d*)\s*hours?\s*)?(?:(?<m>\d+\.?\d*)\s*minutes?)?".into(),
            ],
            simulated_time_filters: vec![
                r"(?i)simulated print time\D*(?<s>\d+\.?\d*)".into(),
            ],
        }
    }
}

impl Settings {
    /// Deserialize settings from JSON, falling back to defaults for missing
    /// fields.
    pub fn load_from_str(json: &str) -> Result<Settings, FileError> {
        let settings = serde_json::from_str(json)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert!(settings.file_info_read_buffer_size > 0);
        assert!(settings.file_info_read_limit_footer > settings.file_info_read_limit_header);
        assert!(!settings.layer_height_filters.is_empty());
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let settings =
            Settings::load_from_str(r#"{"base_directory": "/tmp/sd", "max_layer_height": 1.2}"#)
                .unwrap();
        assert_eq!(settings.base_directory, PathBuf::from("/tmp/sd"));
        assert_eq!(settings.max_layer_height, 1.2);
        assert_eq!(settings.file_info_read_buffer_size, 8192);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(Settings::load_from_str("{nope").is_err());
    }
}
