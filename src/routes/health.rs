use actix_web::{get, Responder};
use chrono::Utc;
use serde_json::json;

use crate::response;

/// Health check endpoint
///
/// Returns a fixed message and the current server time.
#[get("/health-check")]
pub async fn health_check() -> impl Responder {
    response::ok("Health check passed", json!({ "timestamp": Utc::now() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(actix_web::App::new().service(health_check)).await;

        let req = test::TestRequest::get().uri("/health-check").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "Health check passed");
        assert_eq!(json["success"], true);
        assert!(json["data"]["timestamp"].is_string());
    }
}
