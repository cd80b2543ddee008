//! Page gate decisions over HTTP

mod common;

use actix_web::{App, http::StatusCode, test, web};
use serde_json::Value;

use piaget_server::api;

use common::{TestContext, bearer};

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[actix_web::test]
async fn test_unresolved_session_shows_loading() {
    let ctx = TestContext::new();
    // No authentication middleware: the session is never resolved
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.state.clone()))
            .configure(api::configure),
    )
    .await;

    for path in ["/", "/home", "/consulta"] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", path);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["view"], "loading", "{}", path);
    }
}

#[actix_web::test]
async fn test_signed_out_visitor() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["view"], "login");

    let req = test::TestRequest::get().uri("/consulta").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["view"], "lookup");

    for path in ["/home", "/login", "/relatorios"] {
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{}", path);
        assert_eq!(location(&resp), "/");
    }
}

#[actix_web::test]
async fn test_signed_in_staff() {
    let ctx = TestContext::new();
    let app = init_app!(ctx.state);
    let token = bearer("gate@cmei.edu.br");

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/home");

    let req = test::TestRequest::get()
        .uri("/home")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["view"], "home");
    assert_eq!(body["data"]["email"], "gate@cmei.edu.br");
    assert_eq!(body["data"]["formOptions"]["months"].as_array().unwrap().len(), 12);
    assert_eq!(body["data"]["formOptions"]["defaultSchoolDays"], 20);

    let req = test::TestRequest::get()
        .uri("/consulta")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["view"], "lookup");
}
