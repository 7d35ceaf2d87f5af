mod common;

use common::TestApp;
use mongodb::bson::doc;
use reqwest::StatusCode;
use uuid::Uuid;

#[tokio::test]
async fn create_project_works() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/projects", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Garden redesign", "description": "Back yard" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::CREATED, response.status());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["name"], "Garden redesign");
    assert_eq!(body["description"], "Back yard");
    assert_eq!(body["owner_id"], "alice");

    let project_id = body["id"].as_str().unwrap();

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap()
        .expect("Project not found in DB");

    assert_eq!(stored.owner_id, "alice");
    assert_eq!(stored.name, "Garden redesign");

    app.cleanup().await;
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::spawn().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/projects", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::UNAUTHORIZED, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn requests_with_invalid_token_are_rejected() {
    let app = TestApp::spawn().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/projects", app.address))
        .bearer_auth("not-a-real-token")
        .json(&serde_json::json!({ "name": "Sneaky" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::UNAUTHORIZED, response.status());

    // 401 happens before the store is touched
    let count = app
        .db
        .projects()
        .count_documents(doc! {}, None)
        .await
        .unwrap();
    assert_eq!(count, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn create_project_with_empty_name_is_rejected() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/projects", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    let count = app
        .db
        .projects()
        .count_documents(doc! {}, None)
        .await
        .unwrap();
    assert_eq!(count, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn list_projects_returns_only_own_projects() {
    let app = TestApp::spawn().await;
    let alice = TestApp::token_for("alice");
    let bob = TestApp::token_for("bob");

    app.create_project(&alice, "Alice one").await;
    app.create_project(&alice, "Alice two").await;
    app.create_project(&bob, "Bob one").await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/projects", app.address))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let projects = body.as_array().expect("Expected a JSON array");
    assert_eq!(projects.len(), 2);
    for project in projects {
        assert_eq!(project["owner_id"], "alice");
    }

    app.cleanup().await;
}

#[tokio::test]
async fn get_project_works() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let created = app.create_project(&token, "Reading list").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["id"], project_id);
    assert_eq!(body["name"], "Reading list");

    app.cleanup().await;
}

#[tokio::test]
async fn get_project_of_another_user_is_forbidden() {
    let app = TestApp::spawn().await;
    let alice = TestApp::token_for("alice");
    let bob = TestApp::token_for("bob");

    let created = app.create_project(&alice, "Private").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::FORBIDDEN, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn get_missing_project_returns_404() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/projects/{}", app.address, Uuid::new_v4()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::NOT_FOUND, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn update_project_works() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let created = app.create_project(&token, "Old name").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "New name" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["name"], "New name");

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap()
        .expect("Project not found in DB");
    assert_eq!(stored.name, "New name");

    app.cleanup().await;
}

#[tokio::test]
async fn update_missing_project_returns_404() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/api/projects/{}", app.address, Uuid::new_v4()))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Whatever" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::NOT_FOUND, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn update_project_of_another_user_is_forbidden() {
    let app = TestApp::spawn().await;
    let alice = TestApp::token_for("alice");
    let bob = TestApp::token_for("bob");

    let created = app.create_project(&alice, "Alice's").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&bob)
        .json(&serde_json::json!({ "name": "Hijacked" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::FORBIDDEN, response.status());

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap()
        .expect("Project not found in DB");
    assert_eq!(stored.name, "Alice's");

    app.cleanup().await;
}

#[tokio::test]
async fn update_cannot_change_project_owner() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let created = app.create_project(&token, "Mine").await;
    let project_id = created["id"].as_str().unwrap();

    // owner_id is not part of the update shape; unknown fields are dropped
    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": "Still mine", "owner_id": "mallory" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap()
        .expect("Project not found in DB");
    assert_eq!(stored.owner_id, "alice");
    assert_eq!(stored.name, "Still mine");

    app.cleanup().await;
}

#[tokio::test]
async fn delete_project_works() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let created = app.create_project(&token, "Short lived").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .delete(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    // The deleted representation comes back
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["id"], project_id);
    assert_eq!(body["name"], "Short lived");

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap();
    assert!(stored.is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn delete_project_removes_its_tasks() {
    let app = TestApp::spawn().await;
    let token = TestApp::token_for("alice");

    let created = app.create_project(&token, "With tasks").await;
    let project_id = created["id"].as_str().unwrap();

    app.create_task(&token, project_id, "First").await;
    app.create_task(&token, project_id, "Second").await;

    let client = reqwest::Client::new();
    let response = client
        .delete(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::OK, response.status());

    let remaining = app
        .db
        .tasks()
        .count_documents(doc! { "project_id": project_id }, None)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_project_of_another_user_is_forbidden() {
    let app = TestApp::spawn().await;
    let alice = TestApp::token_for("alice");
    let bob = TestApp::token_for("bob");

    let created = app.create_project(&alice, "Keep out").await;
    let project_id = created["id"].as_str().unwrap();

    let client = reqwest::Client::new();
    let response = client
        .delete(format!("{}/api/projects/{}", app.address, project_id))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(StatusCode::FORBIDDEN, response.status());

    let stored = app
        .db
        .projects()
        .find_one(doc! { "_id": project_id }, None)
        .await
        .unwrap();
    assert!(stored.is_some());

    app.cleanup().await;
}
