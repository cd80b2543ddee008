//! Page gate: which view a request gets, or where it is sent

use actix_web::{HttpRequest, HttpResponse, Resource, http::header, web};
use serde::Serialize;

use piaget_auth::{GateDecision, SessionGate, View};
use piaget_common::{ALL_CLASSES, DEFAULT_SCHOOL_DAYS, PHASES, ReferenceMonth, SHIFTS};

use crate::model::response::Result;

use super::auth::request_session;

/// View descriptor returned instead of a rendered page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDescriptor {
    pub view: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_options: Option<FormOptions>,
}

/// Choices offered by the staff forms
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub phases: Vec<&'static str>,
    pub shifts: Vec<&'static str>,
    pub months: Vec<&'static str>,
    pub all_classes: &'static str,
    pub default_school_days: u32,
}

impl FormOptions {
    fn new() -> Self {
        Self {
            phases: PHASES.to_vec(),
            shifts: SHIFTS.to_vec(),
            months: ReferenceMonth::ALL.iter().map(|m| m.label()).collect(),
            all_classes: ALL_CLASSES,
            default_school_days: DEFAULT_SCHOOL_DAYS,
        }
    }
}

fn view_name(view: View) -> &'static str {
    match view {
        View::Login => "login",
        View::Home => "home",
        View::Lookup => "lookup",
    }
}

pub async fn gate(req: HttpRequest) -> HttpResponse {
    let status = request_session(&req).status();

    match SessionGate::decide(&status, req.path()) {
        GateDecision::Loading => Result::<ViewDescriptor>::http_success(ViewDescriptor {
            view: "loading",
            email: None,
            form_options: None,
        }),
        GateDecision::Redirect(location) => HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .finish(),
        GateDecision::Render(view) => {
            let form_options = (view == View::Home).then(FormOptions::new);
            Result::<ViewDescriptor>::http_success(ViewDescriptor {
                view: view_name(view),
                email: status.user().map(|u| u.email.clone()),
                form_options,
            })
        }
    }
}

pub fn routes() -> Resource {
    web::resource(["/", "/home", "/login", "/consulta"]).route(web::get().to(gate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_options() {
        let options = FormOptions::new();
        assert_eq!(options.months.len(), 12);
        assert_eq!(options.months[2], "Março");
        assert_eq!(options.phases.len(), 5);
        assert_eq!(options.all_classes, "Todas");
    }

    #[test]
    fn test_view_names() {
        assert_eq!(view_name(View::Login), "login");
        assert_eq!(view_name(View::Home), "home");
        assert_eq!(view_name(View::Lookup), "lookup");
    }
}
