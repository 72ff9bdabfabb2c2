use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// The success envelope every handler responds with.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            success: status.as_u16() < 400,
            message: message.into(),
            data,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        HttpResponse::build(status).json(self)
    }
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    ApiResponse::new(StatusCode::OK, message, data).into_response()
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> HttpResponse {
    ApiResponse::new(StatusCode::CREATED, message, data).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flag_follows_status() {
        let body = ApiResponse::new(StatusCode::CREATED, "made", 1);
        assert!(body.success);
        assert_eq!(body.status_code, 201);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 201);
        assert_eq!(json["message"], "made");
        assert_eq!(json["data"], 1);
    }
}
