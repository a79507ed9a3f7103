//! Per-run state shared by the loading and validation steps.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::Result;
use crate::store::{RecordStore, SqliteStore};

/// Store connection, interrupt flag and output location for one run.
///
/// Built once at the start of a run and released with [`RunContext::close`],
/// on error paths as well.
pub struct RunContext {
    store: Box<dyn RecordStore>,
    interrupt: Arc<AtomicBool>,
    output_dir: PathBuf,
}

impl RunContext {
    pub fn new(store: Box<dyn RecordStore>, interrupt: Arc<AtomicBool>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            interrupt,
            output_dir: output_dir.into(),
        }
    }

    /// Open a SQLite store at `db`, or an in-memory one when `db` is `None`.
    pub fn open_sqlite(db: Option<&Path>, interrupt: Arc<AtomicBool>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = match db {
            Some(path) => {
                info!(db = %path.display(), "Opening record store");
                SqliteStore::open(path)?
            }
            None => {
                info!("Opening in-memory record store");
                SqliteStore::open_in_memory()?
            }
        };
        Ok(Self::new(Box::new(store), interrupt, output_dir))
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn RecordStore {
        self.store.as_mut()
    }

    pub fn interrupt(&self) -> &AtomicBool {
        &self.interrupt
    }

    /// Shared handle to the interrupt flag, for use while the store is borrowed.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Release the store.
    pub fn close(self) -> Result<()> {
        debug!("Closing record store");
        self.store.close()
    }
}
