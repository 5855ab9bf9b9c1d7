use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use axum_test::TestServer;
use serde_json::{json, Value};
use taxonomy_rest_api::{
    api::{self, ConsistencyResponse, DescendantsResponse, NodeResponse, NodeTreeResponse},
    db,
};
use tower::ServiceExt;

fn setup() -> TestServer {
    let pool = db::establish_memory_pool().expect("Failed to create pool");
    TestServer::new(api::create_router(pool)).expect("Failed to start test server")
}

async fn create(server: &TestServer, base: &str, body: Value) -> NodeResponse {
    let response = server.post(base).json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
    response.json::<NodeResponse>()
}

fn error_kind(response: &axum_test::TestResponse) -> String {
    let body: Value = response.json();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_tags_crud() {
    let server = setup();

    // Create
    let marketing = create(&server, "/tags", json!({"name": "Marketing", "slug": "marketing"})).await;
    assert_eq!(marketing.path, "/marketing");
    assert_eq!(marketing.level, 0);
    assert!(marketing.is_active);

    let salon = create(
        &server,
        "/tags",
        json!({"name": "Salon", "slug": "salon", "parent_id": marketing.id, "color": "#ff0000"}),
    )
    .await;
    assert_eq!(salon.path, "/marketing/salon");
    assert_eq!(salon.level, 1);
    assert_eq!(salon.color.as_deref(), Some("#ff0000"));

    // Read
    let fetched = server.get(&format!("/tags/{}", salon.id)).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(fetched.json::<NodeResponse>(), salon);

    let listed = server.get("/tags").await.json::<Vec<NodeResponse>>();
    let paths: Vec<&str> = listed.iter().map(|n| n.path.as_str()).collect();
    assert_eq!(paths, vec!["/marketing", "/marketing/salon"]);

    // Update
    let renamed = server
        .put(&format!("/tags/{}", marketing.id))
        .json(&json!({"slug": "mkt"}))
        .await;
    assert_eq!(renamed.status_code(), StatusCode::OK);
    assert_eq!(renamed.json::<NodeResponse>().path, "/mkt");

    let child = server.get(&format!("/tags/{}", salon.id)).await.json::<NodeResponse>();
    assert_eq!(child.path, "/mkt/salon");

    let cleared = server
        .put(&format!("/tags/{}", salon.id))
        .json(&json!({"color": null}))
        .await
        .json::<NodeResponse>();
    assert_eq!(cleared.color, None);

    // Delete
    let refused = server.delete(&format!("/tags/{}", marketing.id)).await;
    assert_eq!(refused.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_kind(&refused), "has_children");

    let deleted = server.delete(&format!("/tags/{}", salon.id)).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let missing = server.get(&format!("/tags/{}", salon.id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&missing), "not_found");
}

#[tokio::test]
async fn test_error_mapping() {
    let server = setup();
    let a = create(&server, "/tags", json!({"name": "A", "slug": "a"})).await;
    let b = create(&server, "/tags", json!({"name": "B", "slug": "b", "parent_id": a.id})).await;

    let duplicate = server.post("/tags").json(&json!({"name": "Again", "slug": "a"})).await;
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_kind(&duplicate), "duplicate_slug");

    let invalid = server.post("/tags").json(&json!({"name": "Bad", "slug": "Bad Slug"})).await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&invalid), "validation");

    let orphan = server
        .post("/tags")
        .json(&json!({"name": "Orphan", "slug": "orphan", "parent_id": 999}))
        .await;
    assert_eq!(orphan.status_code(), StatusCode::NOT_FOUND);

    let cycle = server
        .put(&format!("/tags/{}", a.id))
        .json(&json!({"parent_id": b.id}))
        .await;
    assert_eq!(cycle.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_kind(&cycle), "cycle");

    let self_parent = server
        .put(&format!("/tags/{}", a.id))
        .json(&json!({"parent_id": a.id}))
        .await;
    assert_eq!(self_parent.status_code(), StatusCode::CONFLICT);

    // Nothing moved
    let a_after = server.get(&format!("/tags/{}", a.id)).await.json::<NodeResponse>();
    assert_eq!(a_after, a);
}

#[tokio::test]
async fn test_tags_and_groups_are_separate() {
    let server = setup();
    let tag = create(&server, "/tags", json!({"name": "Sales", "slug": "sales"})).await;
    let group = create(&server, "/groups", json!({"name": "Sales", "slug": "sales"})).await;
    assert_ne!(tag.id, group.id);

    let cross = server.get(&format!("/groups/{}", tag.id)).await;
    assert_eq!(cross.status_code(), StatusCode::NOT_FOUND);

    let groups = server.get("/groups").await.json::<Vec<NodeResponse>>();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, group.id);
}

#[tokio::test]
async fn test_hierarchy_routes() {
    let server = setup();
    let root = create(&server, "/tags", json!({"name": "Root", "slug": "root"})).await;
    let mid = create(&server, "/tags", json!({"name": "Mid", "slug": "mid", "parent_id": root.id})).await;
    let leaf = create(&server, "/tags", json!({"name": "Leaf", "slug": "leaf", "parent_id": mid.id})).await;

    let by_slug = server.get("/tags/by-slug/leaf").await.json::<NodeResponse>();
    assert_eq!(by_slug.id, leaf.id);

    let by_path = server
        .get("/tags/by-path")
        .add_query_param("path", "/root/mid/leaf")
        .await
        .json::<NodeResponse>();
    assert_eq!(by_path.id, leaf.id);

    let children = server
        .get(&format!("/tags/{}/children", root.id))
        .await
        .json::<Vec<NodeResponse>>();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, mid.id);

    let descendants = server
        .get(&format!("/tags/{}/descendants", root.id))
        .await
        .json::<DescendantsResponse>();
    assert_eq!(descendants.descendant_ids, vec![mid.id, leaf.id]);

    let ancestors = server
        .get(&format!("/tags/{}/ancestors", leaf.id))
        .await
        .json::<Vec<NodeResponse>>();
    let ancestor_ids: Vec<i32> = ancestors.iter().map(|n| n.id).collect();
    assert_eq!(ancestor_ids, vec![root.id, mid.id]);

    let tree = server.get("/tags/tree").await.json::<Vec<NodeTreeResponse>>();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].data.id, root.id);
    assert_eq!(tree[0].children[0].children[0].data.id, leaf.id);

    // Moving the middle node to the root takes the leaf along
    let moved = server
        .put(&format!("/tags/{}", mid.id))
        .json(&json!({"parent_id": null}))
        .await
        .json::<NodeResponse>();
    assert_eq!(moved.path, "/mid");
    let leaf_after = server.get(&format!("/tags/{}", leaf.id)).await.json::<NodeResponse>();
    assert_eq!(leaf_after.path, "/mid/leaf");
    assert_eq!(leaf_after.level, 1);

    let report = server.get("/tags/consistency").await.json::<ConsistencyResponse>();
    assert!(report.consistent);
    assert!(report.issues.is_empty());

    let rebuilt = server.post("/tags/rebuild-paths").await;
    assert_eq!(rebuilt.status_code(), StatusCode::OK);
    let rebuilt: Value = rebuilt.json();
    assert_eq!(rebuilt["updated"], json!(0));
}

#[tokio::test]
async fn test_malformed_input_is_a_validation_error() {
    let server = setup();

    let missing_slug = server.post("/tags").json(&json!({"name": "NoSlug"})).await;
    assert_eq!(missing_slug.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&missing_slug), "validation");
    let body: Value = missing_slug.json();
    assert!(body["message"].as_str().unwrap_or_default().contains("slug"));

    let broken = server
        .post("/tags")
        .text("{\"name\": ")
        .content_type("application/json")
        .await;
    assert_eq!(broken.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&broken), "validation");

    let wrong_type = server
        .post("/groups")
        .json(&json!({"name": "Ops", "slug": "ops", "parent_id": "one"}))
        .await;
    assert_eq!(wrong_type.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&wrong_type), "validation");

    let node = create(&server, "/tags", json!({"name": "Urgent", "slug": "urgent"})).await;
    let incomplete = server
        .post(&format!("/tags/{}/assignments", node.id))
        .json(&json!({"entity_type": "task"}))
        .await;
    assert_eq!(incomplete.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&incomplete), "validation");

    let no_path = server.get("/tags/by-path").await;
    assert_eq!(no_path.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&no_path), "validation");

    // Nothing was written by the rejected requests
    let listed = server.get("/tags").await.json::<Vec<NodeResponse>>();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_assignment_routes() {
    let server = setup();
    let tag = create(&server, "/tags", json!({"name": "Urgent", "slug": "urgent"})).await;
    let base = format!("/tags/{}/assignments", tag.id);

    let first = server
        .post(&base)
        .json(&json!({"entity_type": "task", "entity_id": "42"}))
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    let again = server
        .post(&base)
        .json(&json!({"entity_type": "task", "entity_id": "42"}))
        .await;
    assert_eq!(again.status_code(), StatusCode::CREATED);

    let listed: Value = server.get(&base).await.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["entity_id"], json!("42"));

    let removed = server.delete(&format!("{base}/task/42")).await;
    assert_eq!(removed.status_code(), StatusCode::NO_CONTENT);

    let listed: Value = server.get(&base).await.json();
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_router_oneshot() {
    let pool = db::establish_memory_pool().expect("Failed to create pool");
    let app = api::create_router(pool);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/groups/tree")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
