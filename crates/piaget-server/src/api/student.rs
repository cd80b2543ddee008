//! Student registry endpoints for staff

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Scope, delete, get, post, put, web};
use futures::StreamExt;

use piaget_common::{
    IMPORT_FAILED_MESSAGE,
    error::{IMPORT_FILE_EMPTY, IMPORT_FILE_INVALID},
};
use piaget_persistence::{NewStudent, StudentInfo, StudentPatch};
use piaget_school::{ImportReport, StudentFilter, import_students};

use crate::{
    error::AppError,
    model::{AppState, IMPORT_FILE_FIELD, MAX_IMPORT_FILE_BYTES, response::Result},
    secured,
};

#[get("")]
async fn list(
    req: HttpRequest,
    data: web::Data<AppState>,
    filter: web::Query<StudentFilter>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let students = data.registry.list(&filter).await?;

    Ok(Result::<Vec<StudentInfo>>::http_success(students))
}

/// Distinct class labels, for the class filter
#[get("/classes")]
async fn classes(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let labels = data.registry.class_labels().await?;

    Ok(Result::<Vec<String>>::http_success(labels))
}

#[post("")]
async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<NewStudent>,
) -> std::result::Result<HttpResponse, AppError> {
    let session_user = secured!(req);

    let student = data.registry.create(&form).await?;

    tracing::debug!(by = %session_user.email, id = %student.id, "Student created via API");
    Ok(Result::<StudentInfo>::http_success(student))
}

#[get("/{id}")]
async fn find_one(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let student = data.registry.get(&path).await?;

    Ok(Result::<StudentInfo>::http_success(student))
}

#[put("/{id}")]
async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    patch: web::Json<StudentPatch>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    let student = data.registry.update(&path, &patch).await?;

    Ok(Result::<StudentInfo>::http_success(student))
}

#[delete("/{id}")]
async fn remove(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> std::result::Result<HttpResponse, AppError> {
    secured!(req);

    data.registry.delete(&path).await?;

    Ok(Result::<bool>::http_success(true))
}

/// Spreadsheet upload: one student per accepted row
#[post("/import")]
async fn import(
    req: HttpRequest,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> std::result::Result<HttpResponse, AppError> {
    let session_user = secured!(req);

    let mut file_data: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed spreadsheet upload");
                return Ok(import_failed());
            }
        };

        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == IMPORT_FILE_FIELD);
        if !is_file {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read uploaded spreadsheet");
                    return Ok(import_failed());
                }
            };
            if bytes.len() + chunk.len() > MAX_IMPORT_FILE_BYTES {
                tracing::warn!(
                    limit = MAX_IMPORT_FILE_BYTES,
                    "Uploaded spreadsheet exceeds the size limit"
                );
                return Ok(import_failed());
            }
            bytes.extend_from_slice(&chunk);
        }
        file_data = Some(bytes);
    }

    let Some(bytes) = file_data.filter(|b| !b.is_empty()) else {
        return Ok(Result::<String>::http_response(
            400,
            IMPORT_FILE_EMPTY.code,
            IMPORT_FILE_EMPTY.message.to_string(),
            String::new(),
        ));
    };

    let report = import_students(&data.registry, &bytes, &data.import_mapping).await?;

    tracing::info!(
        by = %session_user.email,
        created = report.created,
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Spreadsheet import finished"
    );

    Ok(Result::<ImportReport>::http_success(report))
}

fn import_failed() -> HttpResponse {
    Result::<String>::http_response(
        400,
        IMPORT_FILE_INVALID.code,
        IMPORT_FAILED_MESSAGE.to_string(),
        String::new(),
    )
}

pub fn routes() -> Scope {
    web::scope("/v1/students")
        .service(list)
        .service(create)
        .service(classes)
        .service(import)
        .service(find_one)
        .service(update)
        .service(remove)
}
