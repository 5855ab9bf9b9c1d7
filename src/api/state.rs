use crate::hierarchy::TaxonomyStore;
use crate::tables::TaxonomyKind;
use std::sync::Arc;

pub use crate::db::Pool;

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<Pool>,
}

impl AppState {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn store(&self, kind: TaxonomyKind) -> TaxonomyStore<'_> {
        TaxonomyStore::new(&self.pool, kind)
    }
}
