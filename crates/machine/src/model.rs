use serde::{Deserialize, Serialize};

/// The machine model as far as the command layer needs it: mounted storages
/// and configured directories. Index 0 of `storages` is the controller's own
/// base directory by convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineModel {
    /// Numbered drive table. `storages[n]` backs virtual paths `n:/...`.
    #[serde(default)]
    pub storages: Vec<Storage>,
    /// Directory categories, each a virtual path.
    #[serde(default)]
    pub directories: Directories,
}

/// One entry of the numbered drive table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Whether the storage is currently mounted.
    pub mounted: bool,
    /// Physical mount point. Ignored for drive 0, which always maps to the
    /// configured base directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Storage {
    /// A mounted storage at the given physical path.
    pub fn mounted(path: impl Into<String>) -> Storage {
        Storage {
            mounted: true,
            path: Some(path.into()),
        }
    }
}

/// Directory categories a relative virtual path may be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryCategory {
    /// Filament configuration directory.
    Filaments,
    /// Print job directory.
    GCodes,
    /// Macro file directory.
    Macros,
    /// System file directory.
    System,
    /// Web server content directory.
    Www,
}

/// The configured directory for each category, as virtual paths.
///
/// These are read from the model at resolution time rather than cached, so
/// runtime reconfiguration takes effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directories {
    /// Filament configuration directory.
    pub filaments: String,
    /// Print job directory.
    pub gcodes: String,
    /// Macro file directory.
    pub macros: String,
    /// System file directory.
    pub system: String,
    /// Web server content directory.
    pub www: String,
}

impl Default for Directories {
    fn default() -> Directories {
        Directories {
            filaments: "0:/filaments".into(),
            gcodes: "0:/gcodes".into(),
            macros: "0:/macros".into(),
            system: "0:/sys".into(),
            www: "0:/www".into(),
        }
    }
}

impl Directories {
    /// The configured virtual path for a category.
    pub fn get(&self, category: DirectoryCategory) -> &str {
        match category {
            DirectoryCategory::Filaments => &self.filaments,
            DirectoryCategory::GCodes => &self.gcodes,
            DirectoryCategory::Macros => &self.macros,
            DirectoryCategory::System => &self.system,
            DirectoryCategory::Www => &self.www,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directories() {
        let directories = Directories::default();
        assert_eq!(directories.get(DirectoryCategory::GCodes), "0:/gcodes");
        assert_eq!(directories.get(DirectoryCategory::System), "0:/sys");
        assert_eq!(directories.get(DirectoryCategory::Www), "0:/www");
    }

    #[test]
    fn model_deserializes_with_defaults() {
        let model: MachineModel = serde_json::from_str("{}").unwrap();
        assert!(model.storages.is_empty());
        assert_eq!(model.directories, Directories::default());
    }

    #[test]
    fn storage_round_trip() {
        let storage = Storage::mounted("/media/usb0");
        let json = serde_json::to_string(&storage).unwrap();
        let back: Storage = serde_json::from_str(&json).unwrap();
        assert_eq!(storage, back);
    }
}
