use std::path::{Path, PathBuf};
use std::sync::Arc;

use printhost_machine::{DirectoryCategory, ModelProvider};

use crate::config::Settings;
use crate::error::FileError;

/// Maps RepRapFirmware-style virtual paths (`n:/...`) onto the local
/// filesystem and back.
///
/// Drive 0 always resolves to the configured base directory; higher drive
/// numbers are looked up in the machine model's storage table under a scoped
/// read lock, which is released before any file I/O happens. Category
/// directories are re-read from the model on every call so runtime
/// reconfiguration is honoured.
#[derive(Debug, Clone)]
pub struct PathResolver {
    provider: Arc<ModelProvider>,
    base_directory: PathBuf,
}

impl PathResolver {
    /// Create a resolver over the given model with the configured base
    /// directory.
    pub fn new(settings: &Settings, provider: Arc<ModelProvider>) -> PathResolver {
        PathResolver {
            provider,
            base_directory: settings.base_directory.clone(),
        }
    }

    /// The physical root of drive 0.
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Resolve a virtual path to a physical one.
    ///
    /// Relative paths are resolved against the configured directory of
    /// `category`, which may itself be a virtual path and is resolved one
    /// level deep.
    pub fn to_physical(
        &self,
        path: &str,
        category: DirectoryCategory,
    ) -> Result<PathBuf, FileError> {
        self.resolve(path, category, true)
    }

    fn resolve(
        &self,
        path: &str,
        category: DirectoryCategory,
        resolve_relative: bool,
    ) -> Result<PathBuf, FileError> {
        if let Some((drive, rest)) = split_drive(path) {
            let rest = rest.trim_start_matches('/');
            if drive == 0 {
                return Ok(self.base_directory.join(rest));
            }
            let storage_path = self.provider.read_scope(|model| {
                model
                    .storages
                    .get(drive as usize)
                    .filter(|storage| storage.mounted)
                    .and_then(|storage| storage.path.clone())
            });
            return match storage_path {
                Some(root) => Ok(PathBuf::from(root).join(rest)),
                None => Err(FileError::InvalidDrive { drive }),
            };
        }

        if let Some(rest) = path.strip_prefix('/') {
            // Already-physical paths under the base directory pass through
            // unchanged; any other absolute path is taken relative to it.
            if Path::new(path).starts_with(&self.base_directory) {
                return Ok(PathBuf::from(path));
            }
            return Ok(self.base_directory.join(rest));
        }

        if !resolve_relative {
            return Ok(self.base_directory.join(path));
        }
        let directory = self
            .provider
            .read_scope(|model| model.directories.get(category).to_string());
        let directory = self.resolve(&directory, category, false)?;
        Ok(directory.join(path))
    }

    /// Map a physical path back to its virtual form.
    ///
    /// Children of the base directory become `0:/...`; children of a mounted
    /// storage root become `n:/...`; anything else is prefixed with `0:/`.
    pub fn to_virtual(&self, physical: &Path) -> String {
        if let Ok(rest) = physical.strip_prefix(&self.base_directory) {
            return format!("0:/{}", rest.display());
        }
        let from_storage = self.provider.read_scope(|model| {
            model
                .storages
                .iter()
                .enumerate()
                .skip(1)
                .find_map(|(drive, storage)| {
                    let root = storage.path.as_deref()?;
                    physical
                        .strip_prefix(root)
                        .ok()
                        .map(|rest| format!("{drive}:/{}", rest.display()))
                })
        });
        from_storage.unwrap_or_else(|| {
            let path = physical.display().to_string();
            format!("0:/{}", path.trim_start_matches('/'))
        })
    }
}

/// Split a `n:/rest` drive prefix, returning the drive number and the rest.
fn split_drive(path: &str) -> Option<(u32, &str)> {
    let (digits, rest) = path.split_once(':')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, rest))
}
