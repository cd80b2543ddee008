//! HTTP API: staff endpoints, guardian lookup and the page gate

pub mod auth;
pub mod declaration;
pub mod gate;
pub mod health;
pub mod lookup;
pub mod student;

use actix_web::web;

/// Register every route on an app or test service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(auth::routes())
        .service(student::routes())
        .service(declaration::routes())
        .service(lookup::lookup)
        .service(gate::routes());
}
