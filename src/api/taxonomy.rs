use super::AppState;
use crate::hierarchy::{
    HierarchyError, Inconsistency, ListFilter, NodeDraft, NodeUpdate, RebuildReport,
    TaxonomyStore, TreeNode,
};
use crate::tables::{Assignment, TaxonomyKind, TaxonomyNode};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, warn};

impl IntoResponse for HierarchyError {
    fn into_response(self) -> Response {
        let status_code = match self {
            HierarchyError::Validation(_) => StatusCode::BAD_REQUEST,
            HierarchyError::NotFound(_) => StatusCode::NOT_FOUND,
            HierarchyError::DuplicateSlug(_)
            | HierarchyError::Cycle { .. }
            | HierarchyError::HasChildren { .. } => StatusCode::CONFLICT,
            HierarchyError::Database(_) | HierarchyError::Pool(_) | HierarchyError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if self.is_internal() {
            error!("Taxonomy request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            if status_code == StatusCode::CONFLICT {
                warn!("Rejected taxonomy change: {}", self);
            }
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message,
        };
        (status_code, Json(body)).into_response()
    }
}

// Malformed or incomplete request input is a validation failure like any
// other, so it gets the same status and body.
impl From<JsonRejection> for HierarchyError {
    fn from(rejection: JsonRejection) -> Self {
        HierarchyError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for HierarchyError {
    fn from(rejection: QueryRejection) -> Self {
        HierarchyError::Validation(rejection.body_text())
    }
}

// * Types ....................................................................

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl From<CreateNodeRequest> for NodeDraft {
    fn from(request: CreateNodeRequest) -> Self {
        Self {
            name: request.name,
            slug: request.slug,
            parent_id: request.parent_id,
            color: request.color,
            icon: request.icon,
            description: request.description,
            sort_order: request.sort_order,
            is_active: request.is_active,
        }
    }
}

/// Absent fields are left alone. For `parent_id` and the metadata fields an
/// explicit `null` is a change: it moves the node to the root or clears the
/// value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNodeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
}

// A present field, even `null`, becomes `Some`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<UpdateNodeRequest> for NodeUpdate {
    fn from(request: UpdateNodeRequest) -> Self {
        Self {
            name: request.name,
            slug: request.slug,
            parent_id: request.parent_id,
            sort_order: request.sort_order,
            is_active: request.is_active,
            color: request.color,
            icon: request.icon,
            description: request.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub path: String,
    pub level: i32,
    pub sort_order: i32,
    pub is_active: bool,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<TaxonomyNode> for NodeResponse {
    fn from(node: TaxonomyNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            slug: node.slug,
            parent_id: node.parent_id,
            path: node.path,
            level: node.level,
            sort_order: node.sort_order,
            is_active: node.is_active,
            color: node.color,
            icon: node.icon,
            description: node.description,
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

pub type NodeTreeResponse = TreeNode<NodeResponse>;

fn into_response_tree(node: TreeNode<TaxonomyNode>) -> NodeTreeResponse {
    TreeNode {
        data: node.data.into(),
        children: node.children.into_iter().map(into_response_tree).collect(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescendantsResponse {
    pub id: i32,
    pub descendant_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyResponse {
    pub consistent: bool,
    pub issues: Vec<Inconsistency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub entity_type: String,
    pub entity_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub id: i32,
    pub node_id: i32,
    pub entity_type: String,
    pub entity_id: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            node_id: assignment.node_id,
            entity_type: assignment.entity_type,
            entity_id: assignment.entity_id,
            created_at: assignment.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

// * Router ...................................................................

pub fn create_router(kind: TaxonomyKind) -> Router<AppState> {
    let base = format!("/{}", kind.api_segment());

    Router::new()
        .route(base.as_str(), get(list_nodes).post(create_node))
        .route(format!("{base}/tree").as_str(), get(get_tree))
        .route(format!("{base}/by-slug/:slug").as_str(), get(get_node_by_slug))
        .route(format!("{base}/by-path").as_str(), get(get_node_by_path))
        .route(format!("{base}/consistency").as_str(), get(check_consistency))
        .route(format!("{base}/rebuild-paths").as_str(), post(rebuild_paths))
        .route(
            format!("{base}/:id").as_str(),
            get(get_node)
                .put(update_node)
                .patch(update_node)
                .delete(delete_node),
        )
        .route(format!("{base}/:id/children").as_str(), get(get_children))
        .route(format!("{base}/:id/descendants").as_str(), get(get_descendants))
        .route(format!("{base}/:id/ancestors").as_str(), get(get_ancestors))
        .route(
            format!("{base}/:id/assignments").as_str(),
            get(list_assignments).post(assign),
        )
        .route(
            format!("{base}/:id/assignments/:entity_type/:entity_id").as_str(),
            delete(unassign),
        )
        .layer(Extension(kind))
}

// * Handlers .................................................................

// Diesel calls block, so every store operation runs on the blocking pool.
async fn with_store<T, F>(state: AppState, kind: TaxonomyKind, op: F) -> Result<T, HierarchyError>
where
    T: Send + 'static,
    F: for<'s> FnOnce(TaxonomyStore<'s>) -> Result<T, HierarchyError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(state.store(kind))).await?
}

// ** Flat ....................................................................

async fn list_nodes(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    query: Result<Query<ListFilter>, QueryRejection>,
) -> Result<Json<Vec<NodeResponse>>, HierarchyError> {
    let Query(filter) = query?;
    let nodes = with_store(state, kind, move |store| store.list(filter)).await?;
    Ok(Json(nodes.into_iter().map(Into::into).collect()))
}

async fn get_node(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<Json<NodeResponse>, HierarchyError> {
    let node = with_store(state, kind, move |store| store.get(id)).await?;
    Ok(Json(node.into()))
}

async fn get_node_by_slug(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(slug): Path<String>,
) -> Result<Json<NodeResponse>, HierarchyError> {
    let node = with_store(state, kind, move |store| store.get_by_slug(&slug)).await?;
    Ok(Json(node.into()))
}

async fn get_node_by_path(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<NodeResponse>, HierarchyError> {
    let Query(query) = query?;
    let node = with_store(state, kind, move |store| store.get_by_path(&query.path)).await?;
    Ok(Json(node.into()))
}

async fn create_node(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    payload: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NodeResponse>), HierarchyError> {
    let Json(payload) = payload?;
    let node = with_store(state, kind, move |store| store.create(payload.into())).await?;
    Ok((StatusCode::CREATED, Json(node.into())))
}

async fn update_node(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateNodeRequest>, JsonRejection>,
) -> Result<Json<NodeResponse>, HierarchyError> {
    let Json(payload) = payload?;
    let node = with_store(state, kind, move |store| store.update(id, payload.into())).await?;
    Ok(Json(node.into()))
}

async fn delete_node(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<StatusCode, HierarchyError> {
    with_store(state, kind, move |store| store.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ** Hierarchy ...............................................................

async fn get_tree(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> Result<Json<Vec<NodeTreeResponse>>, HierarchyError> {
    let Query(query) = query?;
    let tree = with_store(state, kind, move |store| store.tree(query.include_inactive)).await?;
    Ok(Json(tree.into_iter().map(into_response_tree).collect()))
}

async fn get_children(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<NodeResponse>>, HierarchyError> {
    let children = with_store(state, kind, move |store| store.children(id)).await?;
    Ok(Json(children.into_iter().map(Into::into).collect()))
}

async fn get_descendants(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<Json<DescendantsResponse>, HierarchyError> {
    let ids = with_store(state, kind, move |store| store.descendant_ids(id)).await?;
    let mut descendant_ids: Vec<i32> = ids.into_iter().collect();
    descendant_ids.sort_unstable();
    Ok(Json(DescendantsResponse { id, descendant_ids }))
}

async fn get_ancestors(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<NodeResponse>>, HierarchyError> {
    let ancestors = with_store(state, kind, move |store| store.ancestors(id)).await?;
    Ok(Json(ancestors.into_iter().map(Into::into).collect()))
}

async fn check_consistency(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
) -> Result<Json<ConsistencyResponse>, HierarchyError> {
    let issues = with_store(state, kind, |store| store.check_consistency()).await?;
    Ok(Json(ConsistencyResponse {
        consistent: issues.is_empty(),
        issues,
    }))
}

async fn rebuild_paths(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
) -> Result<Json<RebuildReport>, HierarchyError> {
    let report = with_store(state, kind, |store| store.rebuild_paths()).await?;
    Ok(Json(report))
}

// ** Assignments .............................................................

async fn list_assignments(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<AssignmentResponse>>, HierarchyError> {
    let assignments = with_store(state, kind, move |store| store.assignments(id)).await?;
    Ok(Json(assignments.into_iter().map(Into::into).collect()))
}

async fn assign(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path(id): Path<i32>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AssignmentResponse>), HierarchyError> {
    let Json(payload) = payload?;
    let assignment = with_store(state, kind, move |store| {
        store.assign(id, &payload.entity_type, &payload.entity_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(assignment.into())))
}

async fn unassign(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    Path((id, entity_type, entity_id)): Path<(i32, String, String)>,
) -> Result<StatusCode, HierarchyError> {
    with_store(state, kind, move |store| {
        store.unassign(id, &entity_type, &entity_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
