//! Shared handle to the current mapping table with all-or-nothing reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;

use crate::mapping::{LoadError, MappingTable, load};

/// Readers take cheap `Arc` snapshots; [`reload`](Self::reload) validates a
/// fresh table completely before publishing it in one swap.
#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    tx: watch::Sender<Arc<MappingTable>>,
}

impl MappingStore {
    /// Load the initial table from `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let table = load(Some(&path))?;
        Ok(Self::with_table(path, table))
    }

    pub fn with_table(path: impl Into<PathBuf>, table: MappingTable) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(table));
        Self {
            path: path.into(),
            tx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<MappingTable> {
        self.tx.borrow().clone()
    }

    /// Receiver notified after every successful reload.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MappingTable>> {
        self.tx.subscribe()
    }

    /// Re-read the file. On failure the previous table stays in place.
    pub fn reload(&self) -> Result<Arc<MappingTable>, LoadError> {
        match load(Some(&self.path)) {
            Ok(table) => {
                let table = Arc::new(table);
                self.tx.send_replace(table.clone());
                tracing::info!("mapping table reloaded ({} entries)", table.len());
                Ok(table)
            }
            Err(e) => {
                tracing::warn!(
                    "mapping reload rejected, keeping previous table ({} entries)",
                    self.current().len()
                );
                Err(e)
            }
        }
    }
}
