//! Liveness probe backed by a storage round-trip

use actix_web::{HttpResponse, get, web};
use serde::Serialize;

use piaget_common::error::{DATA_ACCESS_ERROR, SUCCESS};

use crate::model::{AppState, response::Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthView {
    pub status: &'static str,
    pub storage: String,
}

#[get("/health")]
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let storage = data.persistence.storage_mode().to_string();

    match data.persistence.health_check().await {
        Ok(()) => Result::<HealthView>::http_response(
            200,
            SUCCESS.code,
            SUCCESS.message.to_string(),
            HealthView {
                status: "UP",
                storage,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, storage = %storage, "Storage health check failed");
            Result::<HealthView>::http_response(
                503,
                DATA_ACCESS_ERROR.code,
                e.to_string(),
                HealthView {
                    status: "DOWN",
                    storage,
                },
            )
        }
    }
}
