//! HTTP response types for the Piaget server
//!
//! Every JSON body is wrapped in `{code, message, data}`.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

use piaget_common::error::SUCCESS;

use super::constants::PDF_CONTENT_TYPE;

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        Result::<T> {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Result<T> {
        Result::<T> {
            code: SUCCESS.code,
            message: SUCCESS.message.to_string(),
            data,
        }
    }

    pub fn http_success(data: impl Serialize) -> HttpResponse {
        HttpResponse::Ok().json(Result::success(data))
    }

    pub fn http_response(
        status: u16,
        code: i32,
        message: String,
        data: impl Serialize,
    ) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(Result::new(code, message, data))
    }
}

/// PDF download offered as an attachment
pub fn pdf_attachment(file_name: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(PDF_CONTENT_TYPE)
        .insert_header((
            actix_web::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes)
}

/// Error body for rejected requests outside the handlers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResult {
    pub timestamp: String,
    pub status: i32,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorResult {
    pub fn new(status: StatusCode, message: &str, path: &str) -> Self {
        ErrorResult {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16() as i32,
            error: status.canonical_reason().unwrap_or_default().to_string(),
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    pub fn http_response_unauthorized(message: &str, path: &str) -> HttpResponse {
        HttpResponse::Unauthorized().json(ErrorResult::new(StatusCode::UNAUTHORIZED, message, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_wraps_data() {
        let result = Result::success(vec!["Turma A".to_string()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"][0], "Turma A");
    }

    #[test]
    fn test_http_response_status() {
        let resp = Result::<String>::http_response(404, 22000, "missing".to_string(), "");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let fallback = Result::<String>::http_response(1000, 1, "odd".to_string(), "");
        assert_eq!(fallback.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pdf_attachment_headers() {
        let resp = pdf_attachment("declaracao.pdf", b"%PDF-1.5".to_vec());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(actix_web::http::header::CONTENT_TYPE)
                .unwrap(),
            PDF_CONTENT_TYPE
        );
        assert_eq!(
            resp.headers()
                .get(actix_web::http::header::CONTENT_DISPOSITION)
                .unwrap(),
            "attachment; filename=\"declaracao.pdf\""
        );
    }

    #[test]
    fn test_error_result_unauthorized() {
        let body = ErrorResult::new(StatusCode::UNAUTHORIZED, "token expired!", "/v1/students");
        assert_eq!(body.status, 401);
        assert_eq!(body.error, "Unauthorized");
        assert_eq!(body.path, "/v1/students");
    }
}
