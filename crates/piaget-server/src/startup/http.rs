//! HTTP server setup

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{
    api,
    middleware::{
        auth::Authentication,
        rate_limit::{RateLimiter, RateLimiterState},
    },
    model::AppState,
};

/// Creates and binds the HTTP server.
///
/// The request rate limiter state is shared by every worker so the limit
/// applies per client, not per worker.
pub fn main_server(
    app_state: Arc<AppState>,
    rate_limit_state: Arc<RateLimiterState>,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RateLimiter::from_state(rate_limit_state.clone()))
            .wrap(Authentication)
            .app_data(web::Data::from(app_state.clone()))
            .configure(api::configure)
            .default_service(web::to(api::gate::gate))
    })
    .bind((address, port))?
    .run())
}
