pub mod taxonomy;
pub use crate::api::{
    AssignRequest, AssignmentResponse, ConsistencyResponse, CreateNodeRequest,
    DescendantsResponse, ErrorResponse, NodeResponse, NodeTreeResponse, UpdateNodeRequest,
};
pub use crate::hierarchy::{ListFilter, RebuildReport};
pub use crate::tables::TaxonomyKind;
// Re-export the module
pub use taxonomy::*;
