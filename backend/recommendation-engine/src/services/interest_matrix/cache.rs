use super::{InterestMatrix, InterestMatrixBuilder};
use crate::error::Result;
use crate::services::store::InteractionStore;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Owns the built interest matrix for as long as the source data is unchanged.
///
/// Lifecycle:
/// - `get_or_build`: first caller builds, everyone else reuses the same `Arc`
/// - `get`: current artifact, if any
/// - `invalidate`: drop it so the next `get_or_build` rebuilds
///
/// The matrix and both index maps live in one `Arc<InterestMatrix>`, so readers
/// never see a half-updated artifact.
pub struct InterestMatrixCache {
    builder: InterestMatrixBuilder,
    current: RwLock<Option<Arc<InterestMatrix>>>,
    /// Serializes builds; held only while building
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl Default for InterestMatrixCache {
    fn default() -> Self {
        Self::new(InterestMatrixBuilder::default())
    }
}

impl InterestMatrixCache {
    pub fn new(builder: InterestMatrixBuilder) -> Self {
        Self {
            builder,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> Option<Arc<InterestMatrix>> {
        self.current.read().clone()
    }

    pub fn is_built(&self) -> bool {
        self.current.read().is_some()
    }

    /// Number of artifacts published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get_or_build(&self, store: &InteractionStore) -> Result<Arc<InterestMatrix>> {
        if let Some(matrix) = self.get() {
            return Ok(matrix);
        }

        let _build = self.build_lock.lock();
        if let Some(matrix) = self.get() {
            debug!("Interest matrix built by a concurrent caller");
            return Ok(matrix);
        }

        let started = Instant::now();
        let matrix = Arc::new(self.builder.build(store)?);
        *self.current.write() = Some(Arc::clone(&matrix));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        info!(
            generation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Interest matrix cached"
        );
        Ok(matrix)
    }

    pub fn invalidate(&self) {
        let _build = self.build_lock.lock();
        self.drop_current();
    }

    /// Drop the matrix together with the store's tables. Both happen under the
    /// build lock, so no build can run in between and publish a matrix made
    /// from the old tables.
    pub fn invalidate_with_store(&self, store: &InteractionStore) {
        let _build = self.build_lock.lock();
        store.invalidate();
        self.drop_current();
    }

    fn drop_current(&self) {
        if self.current.write().take().is_some() {
            info!("Interest matrix cache invalidated");
        }
    }
}
