//! Configuration management for the Piaget server
//!
//! Values come from `conf/application.yml`, environment variables prefixed
//! with `piaget` and command line overrides, in that order of precedence
//! (last wins).

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use piaget_auth::{
    DEFAULT_TOKEN_EXPIRE_SECONDS, DEFAULT_TOKEN_SECRET_KEY, MAX_TOKEN_EXPIRE_SECONDS,
    TOKEN_EXPIRE_SECONDS, TOKEN_SECRET_KEY,
};
use piaget_common::{DEFAULT_INSTITUTION_CITY, DEFAULT_INSTITUTION_NAME};
use piaget_persistence::StorageMode;
use piaget_school::{ImportMapping, InstitutionInfo, pdf::DEFAULT_DOCUMENT_TITLE};

use crate::middleware::rate_limit::{AuthRateLimitConfig, RateLimitConfig};
use crate::startup::LoggingConfig;

use super::constants::{
    DEFAULT_EMBEDDED_DATA_DIR, DEFAULT_SERVER_PORT, EMBEDDED_DATA_DIR_PROPERTY,
    IMPORT_MAPPING_PROPERTY, PERSISTENCE_MODE_PROPERTY, SERVER_ADDRESS_PROPERTY,
    SERVER_PORT_PROPERTY, TRUSTED_PROXIES_PROPERTY,
};

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(version, about = "CMEI Jean Piaget attendance declaration server")]
pub struct Cli {
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Storage backend: embedded or external_db
    #[arg(short = 's', long = "storage")]
    pub storage: Option<String>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long = "data-dir")]
    pub data_dir: Option<String>,
    #[arg(short = 'c', long = "config", default_value = "conf/application.yml")]
    pub config_file: String,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration using the process command line
    pub fn new() -> anyhow::Result<Self> {
        Self::load(Cli::parse())
    }

    pub fn load(args: Cli) -> anyhow::Result<Self> {
        let mut config_builder = Config::builder()
            .add_source(config::File::with_name(&args.config_file).required(false))
            .add_source(
                Environment::with_prefix("piaget")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = args.port {
            config_builder = config_builder.set_override(SERVER_PORT_PROPERTY, v as i64)?;
        }
        if let Some(v) = args.storage {
            config_builder = config_builder.set_override(PERSISTENCE_MODE_PROPERTY, v)?;
        }
        if let Some(v) = args.database_url {
            config_builder = config_builder.set_override("db.url", v)?;
        }
        if let Some(v) = args.data_dir {
            config_builder = config_builder.set_override(EMBEDDED_DATA_DIR_PROPERTY, v)?;
        }

        Ok(Self::from_config(config_builder.build()?))
    }

    pub fn from_config(config: Config) -> Self {
        Configuration { config }
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string(SERVER_ADDRESS_PROPERTY)
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int(SERVER_PORT_PROPERTY)
            .unwrap_or(DEFAULT_SERVER_PORT.into()) as u16
    }

    pub fn shutdown_timeout_seconds(&self) -> u64 {
        self.config
            .get_int("piaget.server.shutdown_timeout_seconds")
            .unwrap_or(5) as u64
    }

    /// Reverse proxies whose forwarding headers are believed.
    ///
    /// Accepts a YAML list or a comma separated string. Unparsable entries
    /// are logged and ignored.
    pub fn trusted_proxies(&self) -> Vec<IpAddr> {
        let entries: Vec<String> = match self.config.get_array(TRUSTED_PROXIES_PROPERTY) {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| v.into_string().ok())
                .collect(),
            Err(_) => self
                .config
                .get_string(TRUSTED_PROXIES_PROPERTY)
                .map(|v| v.split(',').map(|p| p.to_string()).collect())
                .unwrap_or_default(),
        };

        entries
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(entry = %entry, "Ignoring invalid trusted proxy address");
                    None
                }
            })
            .collect()
    }

    // ========================================================================
    // Persistence Configuration
    // ========================================================================

    pub fn persistence_mode(&self) -> StorageMode {
        self.config
            .get_string(PERSISTENCE_MODE_PROPERTY)
            .ok()
            .and_then(|v| match v.parse() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    tracing::warn!("{}, falling back to embedded storage", e);
                    None
                }
            })
            .unwrap_or(StorageMode::Embedded)
    }

    pub fn embedded_data_dir(&self) -> PathBuf {
        self.config
            .get_string(EMBEDDED_DATA_DIR_PROPERTY)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_EMBEDDED_DATA_DIR))
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let max_connections = self
            .config
            .get_int("db.pool.max_connections")
            .unwrap_or(10) as u32;
        let min_connections = self
            .config
            .get_int("db.pool.min_connections")
            .unwrap_or(1) as u32;
        let connect_timeout = self
            .config
            .get_int("db.pool.connect_timeout")
            .unwrap_or(30) as u64;
        let idle_timeout = self.config.get_int("db.pool.idle_timeout").unwrap_or(600) as u64;
        let sqlx_logging = self.config.get_bool("db.pool.sqlx_logging").unwrap_or(false);

        let url = self.config.get_string("db.url")?;

        let mut opt = ConnectOptions::new(url);

        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .sqlx_logging(sqlx_logging)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        tracing::info!(
            max_connections = max_connections,
            min_connections = min_connections,
            connect_timeout = connect_timeout,
            idle_timeout = idle_timeout,
            "Database connection pool configured"
        );

        Ok(Database::connect(opt).await?)
    }

    // ========================================================================
    // Authentication Configuration
    // ========================================================================

    /// Base64 HS256 secret for access tokens
    pub fn token_secret_key(&self) -> String {
        self.config
            .get_string(TOKEN_SECRET_KEY)
            .unwrap_or(DEFAULT_TOKEN_SECRET_KEY.to_string())
    }

    /// Token lifetime, kept within what the sign-out revocation list covers
    pub fn auth_token_expire_seconds(&self) -> i64 {
        let configured = self
            .config
            .get_int(TOKEN_EXPIRE_SECONDS)
            .unwrap_or(DEFAULT_TOKEN_EXPIRE_SECONDS);
        let clamped = configured.clamp(1, MAX_TOKEN_EXPIRE_SECONDS);
        if clamped != configured {
            tracing::warn!(
                configured,
                used = clamped,
                "{} out of range, clamped",
                TOKEN_EXPIRE_SECONDS
            );
        }
        clamped
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("piaget.logs.path").ok(),
            self.config.get_bool("piaget.logs.console").unwrap_or(true),
            self.config.get_bool("piaget.logs.file").unwrap_or(true),
            self.config
                .get_string("piaget.logs.level")
                .unwrap_or("info".to_string()),
        )
    }

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================

    /// Check if API rate limiting is enabled
    pub fn ratelimit_enabled(&self) -> bool {
        self.config
            .get_bool("piaget.ratelimit.enabled")
            .unwrap_or(true)
    }

    /// Get maximum requests per window for API rate limiting
    pub fn ratelimit_max_requests(&self) -> u32 {
        self.config
            .get_int("piaget.ratelimit.max_requests")
            .unwrap_or(100) as u32
    }

    pub fn ratelimit_window_seconds(&self) -> u64 {
        self.config
            .get_int("piaget.ratelimit.window_seconds")
            .unwrap_or(60) as u64
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.ratelimit_max_requests(),
            window_duration: Duration::from_secs(self.ratelimit_window_seconds()),
            enabled: self.ratelimit_enabled(),
        }
    }

    /// Lockout settings under `prefix`, e.g. `piaget.ratelimit.auth`
    fn lockout_config(&self, prefix: &str, defaults: AuthRateLimitConfig) -> AuthRateLimitConfig {
        let get_secs = |key: &str, default: Duration| {
            self.config
                .get_int(&format!("{}.{}", prefix, key))
                .map(|v| Duration::from_secs(v.max(0) as u64))
                .unwrap_or(default)
        };

        AuthRateLimitConfig {
            max_attempts: self
                .config
                .get_int(&format!("{}.max_attempts", prefix))
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.max_attempts),
            window_duration: get_secs("window_seconds", defaults.window_duration),
            lockout_duration: get_secs("lockout_seconds", defaults.lockout_duration),
            enabled: self
                .config
                .get_bool(&format!("{}.enabled", prefix))
                .unwrap_or(defaults.enabled),
        }
    }

    /// Staff sign-in lockout
    pub fn auth_rate_limit_config(&self) -> AuthRateLimitConfig {
        self.lockout_config("piaget.ratelimit.auth", AuthRateLimitConfig::default())
    }

    /// Guardian lookup lockout
    pub fn lookup_rate_limit_config(&self) -> AuthRateLimitConfig {
        self.lockout_config(
            "piaget.ratelimit.lookup",
            AuthRateLimitConfig {
                max_attempts: 10,
                window_duration: Duration::from_secs(600),
                lockout_duration: Duration::from_secs(900),
                enabled: true,
            },
        )
    }

    // ========================================================================
    // Documents and Import
    // ========================================================================

    pub fn institution(&self) -> InstitutionInfo {
        InstitutionInfo {
            name: self
                .config
                .get_string("piaget.institution.name")
                .unwrap_or(DEFAULT_INSTITUTION_NAME.to_string()),
            city: self
                .config
                .get_string("piaget.institution.city")
                .unwrap_or(DEFAULT_INSTITUTION_CITY.to_string()),
            document_title: self
                .config
                .get_string("piaget.institution.document_title")
                .unwrap_or(DEFAULT_DOCUMENT_TITLE.to_string()),
        }
    }

    /// Default header table plus any `piaget.import.mapping` entries
    pub fn import_mapping(&self) -> anyhow::Result<ImportMapping> {
        let mut mapping = ImportMapping::default();

        if let Ok(table) = self.config.get_table(IMPORT_MAPPING_PROPERTY) {
            let entries = table
                .into_iter()
                .map(|(header, field)| Ok((header, field.into_string()?)))
                .collect::<Result<Vec<(String, String)>, config::ConfigError>>()?;
            mapping.extend_from_entries(entries)?;
        }

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration(overrides: &[(&str, &str)]) -> Configuration {
        let mut builder = Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Configuration::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let conf = configuration(&[]);
        assert_eq!(conf.server_address(), "0.0.0.0");
        assert_eq!(conf.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(conf.persistence_mode(), StorageMode::Embedded);
        assert_eq!(conf.auth_token_expire_seconds(), DEFAULT_TOKEN_EXPIRE_SECONDS);
        assert_eq!(conf.institution(), InstitutionInfo::default());
        assert!(conf.trusted_proxies().is_empty());

        let lookup = conf.lookup_rate_limit_config();
        assert_eq!(lookup.max_attempts, 10);
        assert_eq!(lookup.lockout_duration, Duration::from_secs(900));
        assert!(lookup.enabled);
    }

    #[test]
    fn test_overrides() {
        let conf = configuration(&[
            ("piaget.server.port", "9090"),
            ("piaget.persistence.mode", "external_db"),
            ("piaget.ratelimit.lookup.max_attempts", "3"),
            ("piaget.ratelimit.lookup.enabled", "false"),
            ("piaget.institution.city", "Parintins"),
        ]);
        assert_eq!(conf.server_port(), 9090);
        assert_eq!(conf.persistence_mode(), StorageMode::ExternalDb);
        assert_eq!(conf.lookup_rate_limit_config().max_attempts, 3);
        assert!(!conf.lookup_rate_limit_config().enabled);
        assert_eq!(conf.institution().city, "Parintins");
        assert_eq!(conf.institution().name, DEFAULT_INSTITUTION_NAME);
    }

    #[test]
    fn test_token_expiry_clamped_to_revocation_window() {
        let long = configuration(&[("piaget.auth.token.expire.seconds", "31536000")]);
        assert_eq!(long.auth_token_expire_seconds(), MAX_TOKEN_EXPIRE_SECONDS);

        let negative = configuration(&[("piaget.auth.token.expire.seconds", "-5")]);
        assert_eq!(negative.auth_token_expire_seconds(), 1);

        let normal = configuration(&[("piaget.auth.token.expire.seconds", "3600")]);
        assert_eq!(normal.auth_token_expire_seconds(), 3600);
    }

    #[test]
    fn test_trusted_proxies_list() {
        let conf = configuration(&[(
            "piaget.server.trusted_proxies",
            "127.0.0.1, ::1,not-an-address,,10.1.2.3",
        )]);
        let expected: Vec<IpAddr> = vec![
            "127.0.0.1".parse().unwrap(),
            "::1".parse().unwrap(),
            "10.1.2.3".parse().unwrap(),
        ];
        assert_eq!(conf.trusted_proxies(), expected);
    }

    #[test]
    fn test_unknown_storage_mode_falls_back() {
        let conf = configuration(&[("piaget.persistence.mode", "distributed")]);
        assert_eq!(conf.persistence_mode(), StorageMode::Embedded);
    }

    #[test]
    fn test_import_mapping_extends_defaults() {
        let conf = configuration(&[("piaget.import.mapping.documento", "national_id")]);
        let mapping = conf.import_mapping().unwrap();
        assert_eq!(
            mapping.field_for(" Documento "),
            Some(piaget_school::StudentField::NationalId)
        );
        assert_eq!(
            mapping.field_for("nome"),
            Some(piaget_school::StudentField::Name)
        );

        let bad = configuration(&[("piaget.import.mapping.apelido", "nickname")]);
        assert!(bad.import_mapping().is_err());
    }
}
