//! Application state shared across all handlers

use std::net::IpAddr;
use std::sync::Arc;

use piaget_persistence::PersistenceService;
use piaget_school::{
    AttendanceRecorder, DeclarationLookup, ImportMapping, InstitutionInfo, StudentRegistry,
};

use crate::middleware::rate_limit::{AuthRateLimiter, client_key};

use super::config::Configuration;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn PersistenceService>,
    pub registry: StudentRegistry,
    pub recorder: AttendanceRecorder,
    pub lookup: DeclarationLookup,
    pub institution: InstitutionInfo,
    pub import_mapping: ImportMapping,
    /// Staff sign-in lockout, keyed by client address
    pub login_limiter: Arc<AuthRateLimiter>,
    /// Guardian lookup lockout, keyed by client address
    pub lookup_limiter: Arc<AuthRateLimiter>,
    pub trusted_proxies: Vec<IpAddr>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("configuration", &self.configuration)
            .field("storage_mode", &self.persistence.storage_mode())
            .field("institution", &self.institution)
            .field("import_mapping_headers", &self.import_mapping.len())
            .field("trusted_proxies", &self.trusted_proxies)
            .finish()
    }
}

impl AppState {
    /// Wire the domain services over one persistence backend
    pub fn new(
        configuration: Configuration,
        persistence: Arc<dyn PersistenceService>,
    ) -> anyhow::Result<Self> {
        let institution = configuration.institution();
        let import_mapping = configuration.import_mapping()?;
        let login_limiter = Arc::new(AuthRateLimiter::new(
            configuration.auth_rate_limit_config(),
        ));
        let lookup_limiter = Arc::new(AuthRateLimiter::new(
            configuration.lookup_rate_limit_config(),
        ));
        let trusted_proxies = configuration.trusted_proxies();

        Ok(Self {
            registry: StudentRegistry::new(persistence.clone()),
            recorder: AttendanceRecorder::new(persistence.clone()),
            lookup: DeclarationLookup::new(persistence.clone()),
            configuration,
            persistence,
            institution,
            import_mapping,
            login_limiter,
            lookup_limiter,
            trusted_proxies,
        })
    }

    pub fn persistence(&self) -> &dyn PersistenceService {
        self.persistence.as_ref()
    }

    /// Lockout key for the client behind `req`
    pub fn client_key(&self, req: &actix_web::HttpRequest) -> String {
        client_key(req, &self.trusted_proxies)
    }

    pub fn token_secret_key(&self) -> String {
        self.configuration.token_secret_key()
    }
}
