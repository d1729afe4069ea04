use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
    /// Apply `migrations/` at startup. Off unless the database is a scratch copy.
    pub bootstrap_schema: bool,
}

/// Where the star schema is read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WarehouseBackend {
    #[default]
    Postgres,
    /// Directory holding the ETL's CSV export
    Csv(PathBuf),
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Price-prediction service configuration
#[derive(Debug, Clone)]
pub struct MlServiceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub warehouse: WarehouseBackend,
    /// Only present for the Postgres backend
    pub database: Option<DatabaseConfig>,
    pub ml_service: MlServiceConfig,
    pub log_level: String,
    pub log_format: LogFormat,
    pub ws_port: u16,
    pub environment: String,
}

/// Parse an optional variable, falling back to `default` when unset or invalid
fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn from_process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&from_process_env)
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let url = lookup("DATABASE_URL")
            .ok_or("DATABASE_URL environment variable is required for the postgres backend")?;

        let max_connections = parsed(lookup, "DATABASE_MAX_CONNECTIONS", 10u32);
        let acquire_timeout_secs = parsed(lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64);
        let idle_timeout_secs = parsed(lookup, "DATABASE_IDLE_TIMEOUT_SECS", 600u64); // 10 minutes
        let max_lifetime_secs = parsed(lookup, "DATABASE_MAX_LIFETIME_SECS", 1800u64); // 30 minutes
        let test_before_acquire = parsed(lookup, "DATABASE_TEST_BEFORE_ACQUIRE", true);
        let bootstrap_schema = parsed(lookup, "DATABASE_BOOTSTRAP_SCHEMA", false);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
            bootstrap_schema,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/airbnb_insights".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
            bootstrap_schema: false,
        }
    }
}

impl WarehouseBackend {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&from_process_env)
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let backend = lookup("WAREHOUSE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        match backend.to_lowercase().as_str() {
            "postgres" => Ok(WarehouseBackend::Postgres),
            "csv" => {
                let dir = lookup("WAREHOUSE_CSV_DIR").unwrap_or_else(|| "./data".to_string());
                Ok(WarehouseBackend::Csv(PathBuf::from(dir)))
            }
            other => Err(format!(
                "Invalid WAREHOUSE_BACKEND: {}. Must be one of: [\"postgres\", \"csv\"]",
                other
            )),
        }
    }
}

impl LogFormat {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let format = lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string());
        match format.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: [\"pretty\", \"json\"]",
                other
            )),
        }
    }
}

impl MlServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&from_process_env)
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let url = lookup("ML_SERVICE_URL").unwrap_or_else(|| "http://localhost:5000".to_string());
        let timeout_secs = parsed(lookup, "ML_SERVICE_TIMEOUT_SECS", 10u64);

        if timeout_secs == 0 {
            return Err("ML_SERVICE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self { url, timeout_secs })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&from_process_env)
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let warehouse = WarehouseBackend::from_lookup(lookup)?;
        let database = match warehouse {
            WarehouseBackend::Postgres => Some(DatabaseConfig::from_lookup(lookup)?),
            WarehouseBackend::Csv(_) => None,
        };
        let ml_service = MlServiceConfig::from_lookup(lookup)?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = LogFormat::from_lookup(lookup)?;
        let ws_port = parsed(lookup, "WS_PORT", 8080u16);
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            warehouse,
            database,
            ml_service,
            log_level: log_level.to_lowercase(),
            log_format,
            ws_port,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            warehouse: WarehouseBackend::default(),
            database: Some(DatabaseConfig::default()),
            ml_service: MlServiceConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            ws_port: 8080,
            environment: "development".to_string(),
        }
    }
}
