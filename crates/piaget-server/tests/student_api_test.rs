//! Student registry endpoints

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{Value, json};

use piaget_common::IMPORT_FAILED_MESSAGE;
use piaget_server::model::MAX_IMPORT_FILE_BYTES;

use common::{TestContext, bearer};

const STAFF: &str = "registro@cmei.edu.br";

#[actix_web::test]
async fn test_students_require_sign_in() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);

    let req = test::TestRequest::get().uri("/v1/students").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/v1/students")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_student_lifecycle() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let token = bearer(STAFF);

    let req = test::TestRequest::post()
        .uri("/v1/students")
        .insert_header(("Authorization", token.as_str()))
        .set_json(json!({
            "name": " Maria Eduarda ",
            "nationalId": "123.456.789-00",
            "birthDate": "15/03/2020",
            "classLabel": "Turma B",
            "phase": "Maternal III",
            "shift": "Vespertino"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["name"], "Maria Eduarda");
    assert_eq!(body["data"]["birthDate"], "2020-03-15");
    assert_eq!(body["data"]["status"], "active");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    ctx.add_student("João Pedro", "987.654.321-00", "2019-08-01").await;

    let req = test::TestRequest::get()
        .uri("/v1/students?classLabel=Turma%20B")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let students = body["data"].as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["id"], id.as_str());

    let req = test::TestRequest::get()
        .uri("/v1/students?classLabel=Todas")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/v1/students/classes")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!(["Turma A", "Turma B"]));

    let req = test::TestRequest::put()
        .uri(&format!("/v1/students/{}", id))
        .insert_header(("Authorization", token.as_str()))
        .set_json(json!({ "shift": "Integral", "status": "departed" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["shift"], "Integral");
    assert_eq!(body["data"]["status"], "departed");
    assert_eq!(body["data"]["classLabel"], "Turma B");

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/students/{}", id))
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/v1/students/{}", id))
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 22000);
}

#[actix_web::test]
async fn test_create_rejects_blank_name() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);

    let req = test::TestRequest::post()
        .uri("/v1/students")
        .insert_header(("Authorization", bearer(STAFF)))
        .set_json(json!({ "name": "   ", "nationalId": "111" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn multipart_upload(boundary: &str, csv: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"alunos.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        csv = csv
    )
}

#[actix_web::test]
async fn test_import_spreadsheet() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let boundary = "piagetboundary";

    let csv = "Nome do Aluno;CPF;Data de Nascimento;Turma\n\
               ana clara;111.222.333-44;02/05/2020;Turma A\n\
               ;555.666.777-88;01/01/2020;Turma A\n\
               bruno lima;;01/01/2020;Turma A\n\
               carla souza;999.888.777-66;sem data;Turma C\n";

    let req = test::TestRequest::post()
        .uri("/v1/students/import")
        .insert_header(("Authorization", bearer(STAFF)))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(multipart_upload(boundary, csv))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["created"], 2);
    assert_eq!(body["data"]["skipped"].as_array().unwrap().len(), 2);
    assert!(body["data"]["failed"].as_array().unwrap().is_empty());

    let mut students = ctx
        .state
        .registry
        .list(&Default::default())
        .await
        .unwrap();
    students.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(students[0].name, "ANA CLARA");
    assert_eq!(students[0].birth_date, "2020-05-02");
    assert_eq!(students[1].name, "CARLA SOUZA");
    assert_eq!(students[1].birth_date, "");
}

#[actix_web::test]
async fn test_import_without_file_is_rejected() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let boundary = "piagetboundary";

    let payload = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = boundary
    );
    let req = test::TestRequest::post()
        .uri("/v1/students/import")
        .insert_header(("Authorization", bearer(STAFF)))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 23000);
}

#[actix_web::test]
async fn test_import_rejects_oversized_spreadsheet() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let boundary = "piagetboundary";

    let row = "ana clara;111.222.333-44;02/05/2020;Turma A\n";
    let mut csv = String::from("Nome do Aluno;CPF;Data de Nascimento;Turma\n");
    csv.push_str(&row.repeat(MAX_IMPORT_FILE_BYTES / row.len() + 1));
    assert!(csv.len() > MAX_IMPORT_FILE_BYTES);

    let req = test::TestRequest::post()
        .uri("/v1/students/import")
        .insert_header(("Authorization", bearer(STAFF)))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(multipart_upload(boundary, &csv))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 23001);
    assert_eq!(body["message"], IMPORT_FAILED_MESSAGE);

    let students = ctx
        .state
        .registry
        .list(&Default::default())
        .await
        .unwrap();
    assert!(students.is_empty());
}

#[actix_web::test]
async fn test_import_reports_malformed_upload() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let boundary = "piagetboundary";

    // form-data part without a field name
    let payload = format!(
        "--{b}\r\nContent-Disposition: form-data; filename=\"alunos.csv\"\r\n\
         Content-Type: text/csv\r\n\r\nNome;CPF\r\n--{b}--\r\n",
        b = boundary
    );
    let req = test::TestRequest::post()
        .uri("/v1/students/import")
        .insert_header(("Authorization", bearer(STAFF)))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 23001);
    assert_eq!(body["message"], IMPORT_FAILED_MESSAGE);
}
