mod common;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use apihub::routes::users::issue_email_verification;
use common::{app, bearer, register_and_login, send, store, user_by_email, PASSWORD};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test_log::test(actix_rt::test)]
async fn test_register_and_login_flow() {
    let db = store();
    let app = app(db.clone()).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/register")
            .set_json(json!({
                "name": "Integration User",
                "email": "Integration@Example.com",
                "password": PASSWORD
            })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "integration@example.com");
    assert_eq!(body["data"]["role"], "USER");
    assert_eq!(body["data"]["isEmailVerified"], false);
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("id").is_none());

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/register")
            .set_json(json!({ "email": "integration@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["data"], json!(null));

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({ "email": "integration@example.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("accessToken=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User logged in successfully");
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::get().uri("/api/v1/users/current-user"), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "integration@example.com");

    let (status, body) = send(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/users/current-user")
            .cookie(Cookie::new("accessToken", token.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "cookie auth failed: {}", body);
}

#[actix_rt::test]
async fn test_login_failures() {
    let db = store();
    let app = app(db.clone()).await;
    register_and_login(&app, "Lia", "lia@example.com").await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "email": "nobody@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User does not exist");

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "email": "lia@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "email": "lia@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = app(store()).await;

    let (status, _) = send(
        &app,
        test::TestRequest::get().uri("/api/v1/users/current-user"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        bearer(
            test::TestRequest::get().uri("/api/v1/users/current-user"),
            "garbage",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid access token");
}

#[actix_rt::test]
async fn test_refresh_token_rotation() {
    let db = store();
    let app = app(db.clone()).await;
    let user = register_and_login(&app, "Rami", "rami@example.com").await;

    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/refresh-token")
            .set_json(json!({ "refreshToken": user.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "refresh failed: {}", body);
    assert_eq!(body["message"], "Access token refreshed");
    let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, user.refresh_token);

    // The replaced token is no longer accepted.
    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/refresh-token")
            .set_json(json!({ "refreshToken": user.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Refresh token is expired or used");

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/refresh-token")
            .cookie(Cookie::new("refreshToken", rotated.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        test::TestRequest::post().uri("/api/v1/users/refresh-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized request");
}

#[actix_rt::test]
async fn test_logout_revokes_refresh_token() {
    let db = store();
    let app = app(db.clone()).await;
    let user = register_and_login(&app, "Omer", "omer@example.com").await;

    let (status, body) = send(
        &app,
        bearer(test::TestRequest::post().uri("/api/v1/users/logout"), &user.token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User logged out");

    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/users/refresh-token")
            .set_json(json!({ "refreshToken": user.refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_verify_email() {
    let db = store();
    let app = app(db.clone()).await;
    let user = register_and_login(&app, "Vera", "vera@example.com").await;

    let stored = user_by_email(&db, &user.email).await;
    let raw = issue_email_verification(&db, stored.id).await.unwrap();

    let uri = format!("/api/v1/users/verify-email/{}", raw);
    let (status, body) = send(&app, test::TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEmailVerified"], true);
    assert!(user_by_email(&db, &user.email).await.is_email_verified);

    // Tokens are single use.
    let (status, body) = send(&app, test::TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired token");
}
