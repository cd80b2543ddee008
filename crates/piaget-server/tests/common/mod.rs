//! Shared fixtures for the HTTP API tests

#![allow(dead_code)]

use std::sync::Arc;

use config::Config;
use tempfile::TempDir;

use piaget_auth::{TOKEN_SECRET_KEY, service::auth};
use piaget_persistence::{EmbeddedPersistService, NewStudent, StudentInfo};
use piaget_server::model::{AppState, Configuration};

pub const SECRET: &str = "U2VjcmV0S2V5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTIzNDU2Nzg5";

/// Lookup misses allowed before a client is locked out in tests
pub const LOOKUP_MAX_ATTEMPTS: i64 = 3;

pub struct TestContext {
    _dir: TempDir,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Same store, with forwarding headers accepted from `proxy`
    pub fn behind_proxy(proxy: &str) -> Self {
        Self::build(Some(proxy))
    }

    fn build(trusted_proxy: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = EmbeddedPersistService::open(dir.path().join("rocksdb")).unwrap();

        let mut builder = Config::builder()
            .set_override(TOKEN_SECRET_KEY, SECRET)
            .unwrap()
            .set_override("piaget.ratelimit.lookup.max_attempts", LOOKUP_MAX_ATTEMPTS)
            .unwrap()
            .set_override("piaget.ratelimit.auth.max_attempts", 3_i64)
            .unwrap();
        if let Some(proxy) = trusted_proxy {
            builder = builder
                .set_override("piaget.server.trusted_proxies", proxy)
                .unwrap();
        }
        let config = builder.build().unwrap();

        let state = AppState::new(Configuration::from_config(config), Arc::new(store)).unwrap();

        TestContext { _dir: dir, state }
    }

    pub async fn add_student(&self, name: &str, national_id: &str, birth_date: &str) -> StudentInfo {
        self.state
            .registry
            .create(&NewStudent {
                name: name.to_string(),
                national_id: national_id.to_string(),
                birth_date: birth_date.to_string(),
                class_label: "Turma A".to_string(),
                phase: "1º Período".to_string(),
                shift: "Matutino".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }
}

/// Bearer header value for a staff member
pub fn bearer(email: &str) -> String {
    format!(
        "Bearer {}",
        auth::encode_jwt_token(email, SECRET, 3600).unwrap()
    )
}

/// Test service with the production middleware and routes
#[macro_export]
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(piaget_server::middleware::auth::Authentication)
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(piaget_server::api::configure)
                .default_service(actix_web::web::to(piaget_server::api::gate::gate)),
        )
        .await
    };
}
