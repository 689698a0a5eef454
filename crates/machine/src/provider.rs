use parking_lot::RwLock;

use crate::model::MachineModel;

/// Scoped reader-writer access to the shared [`MachineModel`].
///
/// Multiple readers may hold scopes concurrently; a writer is exclusive.
/// Scopes are closures, so the lock is released on every return path and no
/// reference to model data can escape.
#[derive(Debug, Default)]
pub struct ModelProvider {
    model: RwLock<MachineModel>,
}

impl ModelProvider {
    /// Create a provider around an initial model.
    pub fn new(model: MachineModel) -> ModelProvider {
        ModelProvider {
            model: RwLock::new(model),
        }
    }

    /// Run `scope` with shared read access to the model.
    pub fn read_scope<T>(&self, scope: impl FnOnce(&MachineModel) -> T) -> T {
        scope(&self.model.read())
    }

    /// Run `scope` with exclusive write access to the model.
    pub fn write_scope<T>(&self, scope: impl FnOnce(&mut MachineModel) -> T) -> T {
        scope(&mut self.model.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Storage;
    use std::sync::Arc;

    #[test]
    fn writes_are_visible_to_readers() {
        let provider = ModelProvider::default();
        provider.write_scope(|model| {
            model.storages.push(Storage::default());
            model.storages.push(Storage::mounted("/media/usb0"));
        });
        let path = provider.read_scope(|model| model.storages[1].path.clone());
        assert_eq!(path.as_deref(), Some("/media/usb0"));
    }

    #[test]
    fn concurrent_readers_do_not_block_each_other() {
        let provider = Arc::new(ModelProvider::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || {
                    provider.read_scope(|model| model.storages.len())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }
    }

    #[test]
    fn scope_results_are_returned() {
        let provider = ModelProvider::default();
        let gcodes = provider.read_scope(|model| model.directories.gcodes.clone());
        assert_eq!(gcodes, "0:/gcodes");
    }
}
