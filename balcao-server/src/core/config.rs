/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/balcao | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | STORE_BACKEND | redb | redb \| memory |
/// | ORDER_LIST_LIMIT | 100 | Bulk-fetch bound for the order feed |
/// | OPERATOR_ID | (unset) | Identity for the approval resolver |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Persistence backend: "redb" or "memory"
    pub store_backend: String,
    /// Upper bound for the order feed's initial bulk fetch
    pub order_list_limit: usize,
    /// Operator identity the approval resolver tracks, when present
    pub operator_id: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/balcao".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            store_backend: std::env::var("STORE_BACKEND").unwrap_or_else(|_| "redb".into()),
            order_list_limit: std::env::var("ORDER_LIST_LIMIT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(100),
            operator_id: std::env::var("OPERATOR_ID").ok(),
        }
    }

    /// Override the values tests care about
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.store_backend = "memory".into();
        config
    }

    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("balcao.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
