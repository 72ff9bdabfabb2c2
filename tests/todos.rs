mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use apihub::db::{Entity, Filter, Store, UUID};
use common::{app, bearer, register_and_login, send, store};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

#[test_log::test(actix_rt::test)]
async fn test_todo_crud() {
    let db = store();
    let app = app(db.clone()).await;
    let user = register_and_login(&app, "Tal", "tal@example.com").await;

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::post().uri("/api/v1/todos"), &user.token).set_json(json!({
            "title": "Integration Todo",
            "description": "Integration Description"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["completed"], false);
    let todo_id = body["data"]["_id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/todos/{}", todo_id);
    let (status, body) = send(&app, bearer(test::TestRequest::get().uri(&uri), &user.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Integration Todo");

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::put().uri(&uri), &user.token)
            .set_json(json!({ "status": "completed", "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["completed"], true);
    assert_eq!(body["data"]["title"], "Integration Todo");

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::delete().uri(&uri), &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedTodo"]["_id"], todo_id.as_str());

    let (status, body) = send(&app, bearer(test::TestRequest::get().uri(&uri), &user.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Todo does not exist");

    // The row survives, only marked deleted.
    let record = db
        .raw()
        .find_one(
            Entity::Todos,
            &Filter::new().eq(UUID, Uuid::parse_str(&todo_id).unwrap()),
        )
        .await
        .unwrap()
        .expect("row kept");
    assert!(!record["deleted_at"].is_null());
}

#[actix_rt::test]
async fn test_todos_are_private_to_their_owner() {
    let app = app(store()).await;
    let owner = register_and_login(&app, "Owner", "owner@example.com").await;
    let other = register_and_login(&app, "Other", "other@example.com").await;

    let (_, body) = send(
        &app,
        bearer(test::TestRequest::post().uri("/api/v1/todos"), &owner.token)
            .set_json(json!({ "title": "Mine" })),
    )
    .await;
    let uri = format!("/api/v1/todos/{}", body["data"]["_id"].as_str().unwrap());

    let (status, _) = send(&app, bearer(test::TestRequest::get().uri(&uri), &other.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        bearer(test::TestRequest::delete().uri(&uri), &other.token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::get().uri("/api/v1/todos"), &other.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[actix_rt::test]
async fn test_todo_list_filters() {
    let app = app(store()).await;
    let user = register_and_login(&app, "Filter", "filter@example.com").await;

    for (title, status) in [
        ("Buy milk", "pending"),
        ("Write report", "inprogress"),
        ("Ship release", "completed"),
    ] {
        let (code, _) = send(
            &app,
            bearer(test::TestRequest::post().uri("/api/v1/todos"), &user.token)
                .set_json(json!({ "title": title, "status": status })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (_, body) = send(
        &app,
        bearer(test::TestRequest::get().uri("/api/v1/todos"), &user.token),
    )
    .await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Ship release", "Write report", "Buy milk"]);

    let (_, body) = send(
        &app,
        bearer(
            test::TestRequest::get().uri("/api/v1/todos?status=inprogress"),
            &user.token,
        ),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Write report");

    let (_, body) = send(
        &app,
        bearer(test::TestRequest::get().uri("/api/v1/todos?q=MILK"), &user.token),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Buy milk");

    let (status, _) = send(
        &app,
        bearer(
            test::TestRequest::get().uri("/api/v1/todos?status=done"),
            &user.token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_todo_validation_and_bad_ids() {
    let app = app(store()).await;
    let user = register_and_login(&app, "Val", "val@example.com").await;

    let (status, _) = send(
        &app,
        bearer(test::TestRequest::post().uri("/api/v1/todos"), &user.token)
            .set_json(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        bearer(test::TestRequest::get().uri("/api/v1/todos/not-a-uuid"), &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, test::TestRequest::get().uri("/api/v1/todos")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
