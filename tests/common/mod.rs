#![allow(dead_code)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use apihub::auth::AuthMiddleware;
use apihub::config::Config;
use apihub::db::{Filter, MemoryStore, SoftDeleteStore};
use apihub::models::User;
use apihub::routes;
use serde_json::{json, Value};

pub const PASSWORD: &str = "Password123!";

pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub fn store() -> web::Data<SoftDeleteStore> {
    web::Data::new(SoftDeleteStore::new(Arc::new(MemoryStore::new())))
}

pub async fn app(
    db: web::Data<SoftDeleteStore>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(db)
            .app_data(web::Data::new(test_config()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(
                web::scope("/api/v1")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await
}

/// Sends the request and returns the status with the decoded JSON body.
pub async fn send(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        panic!(
            "non-JSON body with status {}: {}",
            status,
            String::from_utf8_lossy(&bytes)
        )
    });
    (status, body)
}

pub fn bearer(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", token)))
}

pub struct TestUser {
    pub uuid: String,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
) -> TestUser {
    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/v1/users/register")
            .set_json(json!({ "name": name, "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/v1/users/login")
            .set_json(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    TestUser {
        uuid: body["data"]["user"]["_id"].as_str().unwrap().to_string(),
        email: email.to_string(),
        token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

pub async fn user_by_email(db: &SoftDeleteStore, email: &str) -> User {
    db.first::<User>(&Filter::new().eq("email", email))
        .await
        .unwrap()
        .expect("user exists")
}
