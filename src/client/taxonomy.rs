use super::{
    AssignRequest, AssignmentResponse, ConsistencyResponse, CreateNodeRequest,
    DescendantsResponse, ErrorResponse, ListFilter, NodeResponse, NodeTreeResponse,
    RebuildReport, TaxonomyKind, UpdateNodeRequest,
};
use reqwest::{self, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unexpected server error: {0}")]
    ServerError(String),
}

// * Helpers ..................................................................

fn kind_url(base_url: &str, kind: TaxonomyKind) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), kind.api_segment())
}

// Turns a non-2xx response into the matching error, preferring the server's
// `message` over the raw body.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorResponse>(&error_text)
        .map(|body| body.message)
        .unwrap_or(error_text);

    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::BadRequest(message)
        }
        StatusCode::CONFLICT => ClientError::Conflict(message),
        _ => ClientError::ServerError(format!("{status}: {message}")),
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    response.json::<T>().await.map_err(ClientError::NetworkError)
}

// * Client ...................................................................
// ** Flat Functions ..........................................................
// *** Create .................................................................

pub async fn create_node(
    base_url: &str,
    kind: TaxonomyKind,
    node: &CreateNodeRequest,
) -> Result<NodeResponse, ClientError> {
    let client = reqwest::Client::new();
    let response = client.post(kind_url(base_url, kind)).json(node).send().await?;
    parse_json(response).await
}

// *** Read ...................................................................

pub async fn list_nodes(
    base_url: &str,
    kind: TaxonomyKind,
    filter: &ListFilter,
) -> Result<Vec<NodeResponse>, ClientError> {
    let client = reqwest::Client::new();
    let mut request = client.get(kind_url(base_url, kind));
    if filter.include_inactive {
        request = request.query(&[("include_inactive", "true")]);
    }
    if filter.roots_only {
        request = request.query(&[("roots_only", "true")]);
    }
    if let Some(parent_id) = filter.parent_id {
        request = request.query(&[("parent_id", parent_id)]);
    }
    parse_json(request.send().await?).await
}

pub async fn get_node(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
) -> Result<NodeResponse, ClientError> {
    let url = format!("{}/{}", kind_url(base_url, kind), id);
    parse_json(reqwest::get(url).await?).await
}

pub async fn get_node_by_slug(
    base_url: &str,
    kind: TaxonomyKind,
    slug: &str,
) -> Result<NodeResponse, ClientError> {
    let url = format!(
        "{}/by-slug/{}",
        kind_url(base_url, kind),
        urlencoding::encode(slug)
    );
    parse_json(reqwest::get(url).await?).await
}

pub async fn get_node_by_path(
    base_url: &str,
    kind: TaxonomyKind,
    path: &str,
) -> Result<NodeResponse, ClientError> {
    let url = format!(
        "{}/by-path?path={}",
        kind_url(base_url, kind),
        urlencoding::encode(path)
    );
    parse_json(reqwest::get(url).await?).await
}

// *** Update .................................................................

pub async fn update_node(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
    changes: &UpdateNodeRequest,
) -> Result<NodeResponse, ClientError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{}", kind_url(base_url, kind), id);
    let response = client.put(url).json(changes).send().await?;
    parse_json(response).await
}

// *** Delete .................................................................

pub async fn delete_node(base_url: &str, kind: TaxonomyKind, id: i32) -> Result<(), ClientError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{}", kind_url(base_url, kind), id);
    let response = client.delete(url).send().await?;
    check_status(response).await?;
    Ok(())
}

// ** Hierarchy Functions .....................................................

pub async fn get_tree(
    base_url: &str,
    kind: TaxonomyKind,
    include_inactive: bool,
) -> Result<Vec<NodeTreeResponse>, ClientError> {
    let client = reqwest::Client::new();
    let mut request = client.get(format!("{}/tree", kind_url(base_url, kind)));
    if include_inactive {
        request = request.query(&[("include_inactive", "true")]);
    }
    parse_json(request.send().await?).await
}

pub async fn get_children(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
) -> Result<Vec<NodeResponse>, ClientError> {
    let url = format!("{}/{}/children", kind_url(base_url, kind), id);
    parse_json(reqwest::get(url).await?).await
}

pub async fn get_descendants(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
) -> Result<DescendantsResponse, ClientError> {
    let url = format!("{}/{}/descendants", kind_url(base_url, kind), id);
    parse_json(reqwest::get(url).await?).await
}

pub async fn get_ancestors(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
) -> Result<Vec<NodeResponse>, ClientError> {
    let url = format!("{}/{}/ancestors", kind_url(base_url, kind), id);
    parse_json(reqwest::get(url).await?).await
}

// ** Maintenance .............................................................

pub async fn check_consistency(
    base_url: &str,
    kind: TaxonomyKind,
) -> Result<ConsistencyResponse, ClientError> {
    let url = format!("{}/consistency", kind_url(base_url, kind));
    parse_json(reqwest::get(url).await?).await
}

pub async fn rebuild_paths(
    base_url: &str,
    kind: TaxonomyKind,
) -> Result<RebuildReport, ClientError> {
    let client = reqwest::Client::new();
    let url = format!("{}/rebuild-paths", kind_url(base_url, kind));
    parse_json(client.post(url).send().await?).await
}

// ** Assignments .............................................................

pub async fn list_assignments(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
) -> Result<Vec<AssignmentResponse>, ClientError> {
    let url = format!("{}/{}/assignments", kind_url(base_url, kind), id);
    parse_json(reqwest::get(url).await?).await
}

pub async fn assign(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
    entity_type: &str,
    entity_id: &str,
) -> Result<AssignmentResponse, ClientError> {
    let client = reqwest::Client::new();
    let url = format!("{}/{}/assignments", kind_url(base_url, kind), id);
    let body = AssignRequest {
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
    };
    parse_json(client.post(url).json(&body).send().await?).await
}

pub async fn unassign(
    base_url: &str,
    kind: TaxonomyKind,
    id: i32,
    entity_type: &str,
    entity_id: &str,
) -> Result<(), ClientError> {
    let client = reqwest::Client::new();
    let url = format!(
        "{}/{}/assignments/{}/{}",
        kind_url(base_url, kind),
        id,
        urlencoding::encode(entity_type),
        urlencoding::encode(entity_id)
    );
    check_status(client.delete(url).send().await?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_url() {
        assert_eq!(
            kind_url("http://localhost:37240/", TaxonomyKind::Tag),
            "http://localhost:37240/tags"
        );
        assert_eq!(
            kind_url("http://localhost:37240", TaxonomyKind::Group),
            "http://localhost:37240/groups"
        );
    }
}
