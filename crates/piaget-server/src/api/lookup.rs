//! Guardian declaration lookup; no sign-in required

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;

use piaget_common::error::{NO_ATTENDANCE, STUDENT_NOT_FOUND};
use piaget_school::{AttendanceSummary, LookupOutcome, declaration_file_name, render_declaration};

use crate::{
    error::AppError,
    middleware::rate_limit::too_many_requests,
    model::{AppState, response::{Result, pdf_attachment}},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupForm {
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub birth_date: String,
}

/// National ID and birth date in; the latest declaration PDF or a message out.
///
/// Misses are counted per client; once locked out, requests are refused
/// before the store is consulted.
#[post("/v1/lookup")]
pub async fn lookup(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<LookupForm>,
) -> std::result::Result<HttpResponse, AppError> {
    let client = data.client_key(&req);
    let limiter = &data.lookup_limiter;

    let (allowed, _, lockout_secs) = limiter.check_attempt(&client);
    if !allowed {
        tracing::warn!(client = %client, "Lookup refused: client locked out");
        return Ok(too_many_requests(limiter.config().max_attempts, lockout_secs));
    }

    let outcome = data.lookup.lookup(&form.national_id, &form.birth_date).await?;
    let message = outcome.message();

    match outcome {
        LookupOutcome::StudentNotFound => {
            let (_, remaining, _) = limiter.record_attempt(&client);
            tracing::debug!(client = %client, remaining, "Lookup miss");
            Ok(Result::<String>::http_response(
                404,
                STUDENT_NOT_FOUND.code,
                message.unwrap_or(STUDENT_NOT_FOUND.message).to_string(),
                String::new(),
            ))
        }
        LookupOutcome::NoAttendance => Ok(Result::<String>::http_response(
            404,
            NO_ATTENDANCE.code,
            message.unwrap_or(NO_ATTENDANCE.message).to_string(),
            String::new(),
        )),
        LookupOutcome::Found {
            student,
            declaration,
        } => {
            let bytes = render_declaration(
                &data.institution,
                &student,
                &AttendanceSummary::from(&declaration),
            )?;

            Ok(pdf_attachment(
                &declaration_file_name(
                    &student,
                    declaration.reference_month,
                    declaration.reference_year,
                ),
                bytes,
            ))
        }
    }
}
