//! Server-specific configuration keys and defaults

pub const SERVER_ADDRESS_PROPERTY: &str = "piaget.server.address";
pub const SERVER_PORT_PROPERTY: &str = "piaget.server.port";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
/// Proxy addresses allowed to set `Forwarded` / `X-Forwarded-For`
pub const TRUSTED_PROXIES_PROPERTY: &str = "piaget.server.trusted_proxies";

pub const PERSISTENCE_MODE_PROPERTY: &str = "piaget.persistence.mode";
pub const EMBEDDED_DATA_DIR_PROPERTY: &str = "piaget.embedded.data_dir";
pub const DEFAULT_EMBEDDED_DATA_DIR: &str = "data/rocksdb";

pub const IMPORT_MAPPING_PROPERTY: &str = "piaget.import.mapping";

/// Multipart field carrying the uploaded spreadsheet
pub const IMPORT_FILE_FIELD: &str = "file";
/// Largest spreadsheet accepted by the import endpoint (5 MiB)
pub const MAX_IMPORT_FILE_BYTES: usize = 5 * 1024 * 1024;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
