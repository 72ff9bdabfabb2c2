mod common;

use std::net::TcpListener;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use apihub::auth::AuthMiddleware;
use apihub::routes;
use common::{store, test_config, PASSWORD};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Binds the app to an ephemeral port and returns its base URL.
fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();
    let db = store();
    let config = web::Data::new(test_config());

    let server = HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(config.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/api/v1")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .workers(1)
    .listen(listener)
    .expect("listen")
    .run();
    actix_rt::spawn(server);

    format!("http://127.0.0.1:{}/api/v1", port)
}

#[test_log::test(actix_rt::test)]
async fn test_health_check_over_http() {
    let base = spawn_server();

    let resp = reqwest::get(format!("{}/health-check", base)).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Health check passed");

    let resp = reqwest::get(format!("{}/users/current-user", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 401);
}

#[actix_rt::test]
async fn test_cookie_session_over_http() {
    let base = spawn_server();
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();

    let resp = client
        .post(format!("{}/users/register", base))
        .json(&json!({ "name": "Http", "email": "http@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let resp = client
        .post(format!("{}/users/login", base))
        .json(&json!({ "email": "http@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // No Authorization header: the stored cookie authenticates.
    let resp = client
        .get(format!("{}/users/current-user", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "http@example.com");

    let resp = client
        .post(format!("{}/users/logout", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .get(format!("{}/users/current-user", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}
