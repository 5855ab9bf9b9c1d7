pub mod state;
pub mod taxonomy;

pub use state::{AppState, Pool};
pub use taxonomy::{
    AssignRequest, AssignmentResponse, ConsistencyResponse, CreateNodeRequest,
    DescendantsResponse, ErrorResponse, NodeResponse, NodeTreeResponse, UpdateNodeRequest,
};

use crate::tables::TaxonomyKind;
use axum::Router;

/// Tags and groups are separate forests served from the same handlers, each
/// under its own prefix.
pub fn create_router(pool: Pool) -> Router {
    let state = AppState::new(pool);

    TaxonomyKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| {
            router.merge(taxonomy::create_router(kind))
        })
        .with_state(state)
}
