//! Attendance declarations for staff

use actix_web::{HttpRequest, HttpResponse, Scope, get, post, web};
use serde::Deserialize;

use piaget_common::ReferenceMonth;
use piaget_persistence::DeclarationInfo;
use piaget_school::{AttendanceEntry, AttendanceSummary, declaration_file_name, render_declaration};

use crate::{
    error::AppError,
    model::{AppState, response::{Result, pdf_attachment}},
    secured,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthQuery {
    pub month: ReferenceMonth,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub student_id: String,
    pub month: ReferenceMonth,
    pub year: i32,
}

/// Save a month's attendance; a second save for the same month replaces the first
#[post("")]
async fn record(
    req: HttpRequest,
    data: web::Data<AppState>,
    entry: web::Json<AttendanceEntry>,
) -> std::result::Result<HttpResponse, AppError> {
    let session_user = secured!(req);

    let declaration = data.recorder.record(&entry).await?;

    tracing::debug!(by = %session_user.email, id = %declaration.id, "Declaration saved via API");
    Ok(Result::<DeclarationInfo>::http_success(declaration))
}

#[get("")]
async fn list_by_month(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<MonthQuery>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let declarations = data
        .recorder
        .list_by_month(params.month, params.year)
        .await?;

    Ok(Result::<Vec<DeclarationInfo>>::http_success(declarations))
}

#[get("/pdf")]
async fn document(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<DocumentQuery>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let declaration = data
        .recorder
        .find(&params.student_id, params.month, params.year)
        .await?;
    let student = data.registry.get(&declaration.student_id).await?;

    let bytes = render_declaration(
        &data.institution,
        &student,
        &AttendanceSummary::from(&declaration),
    )?;

    Ok(pdf_attachment(
        &declaration_file_name(&student, params.month, params.year),
        bytes,
    ))
}

#[get("/student/{id}")]
async fn history(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let declarations = data.recorder.history(&path).await?;

    Ok(Result::<Vec<DeclarationInfo>>::http_success(declarations))
}

pub fn routes() -> Scope {
    web::scope("/v1/declarations")
        .service(record)
        .service(list_by_month)
        .service(document)
        .service(history)
}
