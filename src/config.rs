use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Which key-value store backs the services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Spanner,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spanner" => Ok(StoreBackend::Spanner),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND must be one of: spanner, memory, got '{}'", other),
        }
    }
}

/// Spanner database coordinates, required when the backend is Spanner
#[derive(Debug, Clone)]
pub struct SpannerSettings {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerSettings {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub spanner: Option<SpannerSettings>,
    pub patients_table: String,
    pub triage_table: String,
    /// Base URL of the triage service; only patient deletion needs it.
    pub triajes_api_base: Option<String>,
    pub triage_lookup_timeout: Duration,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend = match env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Spanner,
        };

        let spanner = match store_backend {
            StoreBackend::Spanner => Some(spanner_from_env()?),
            StoreBackend::Memory => None,
        };

        let patients_table = env::var("PATIENTS_TABLE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "pacientes".to_string());

        let triage_table = env::var("TRIAJES_TABLE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "triajes".to_string());

        let triajes_api_base = env::var("TRIAJES_API_BASE")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty());

        let timeout_secs = env::var("TRIAGE_LOOKUP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .context("TRIAGE_LOOKUP_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            bail!("TRIAGE_LOOKUP_TIMEOUT_SECS must be greater than zero");
        }

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            store_backend,
            spanner,
            patients_table,
            triage_table,
            triajes_api_base,
            triage_lookup_timeout: Duration::from_secs(timeout_secs),
            service_port,
            service_host,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Store backend: {:?}", self.store_backend);
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner database: {}", spanner.database_path());
        }
        tracing::info!("  Patients table: {}", self.patients_table);
        tracing::info!("  Triage table: {}", self.triage_table);
        tracing::info!(
            "  Triage API base: {}",
            self.triajes_api_base
                .as_deref()
                .unwrap_or("not configured (patient deletion disabled)")
        );
        tracing::info!("  Triage lookup timeout: {:?}", self.triage_lookup_timeout);
        tracing::info!("  Service listening on: {}", self.bind_address());
    }
}

fn spanner_from_env() -> Result<SpannerSettings> {
    let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

    let project = env::var("SPANNER_PROJECT")
        .context("SPANNER_PROJECT environment variable is required")?;

    let instance = env::var("SPANNER_INSTANCE")
        .context("SPANNER_INSTANCE environment variable is required")?;

    let database = env::var("SPANNER_DATABASE")
        .context("SPANNER_DATABASE environment variable is required")?;

    Ok(SpannerSettings {
        emulator_host,
        project,
        instance,
        database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::env;

    // Environment variables are process-wide; tests touching them take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env_vars() {
        unsafe {
            env::remove_var("STORE_BACKEND");
            env::remove_var("SPANNER_EMULATOR_HOST");
            env::remove_var("SPANNER_PROJECT");
            env::remove_var("SPANNER_INSTANCE");
            env::remove_var("SPANNER_DATABASE");
            env::remove_var("PATIENTS_TABLE");
            env::remove_var("TRIAJES_TABLE");
            env::remove_var("TRIAJES_API_BASE");
            env::remove_var("TRIAGE_LOOKUP_TIMEOUT_SECS");
            env::remove_var("SERVICE_PORT");
            env::remove_var("SERVICE_HOST");
        }
    }

    fn set_spanner_vars() {
        unsafe {
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
            env::set_var("SPANNER_DATABASE", "test-database");
        }
    }

    #[test]
    fn test_config_with_all_vars() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        set_spanner_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "spanner");
            env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
            env::set_var("PATIENTS_TABLE", "patients_v2");
            env::set_var("TRIAJES_TABLE", "triage_v2");
            env::set_var("TRIAJES_API_BASE", "http://triajes.local/");
            env::set_var("TRIAGE_LOOKUP_TIMEOUT_SECS", "3");
            env::set_var("SERVICE_PORT", "8080");
            env::set_var("SERVICE_HOST", "127.0.0.1");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        let spanner = config.spanner.expect("spanner settings");
        assert_eq!(config.store_backend, StoreBackend::Spanner);
        assert_eq!(spanner.emulator_host, Some("localhost:9010".to_string()));
        assert_eq!(
            spanner.database_path(),
            "projects/test-project/instances/test-instance/databases/test-database"
        );
        assert_eq!(config.patients_table, "patients_v2");
        assert_eq!(config.triage_table, "triage_v2");
        assert_eq!(config.triajes_api_base.as_deref(), Some("http://triajes.local"));
        assert_eq!(config.triage_lookup_timeout, Duration::from_secs(3));
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
    }

    #[test]
    fn test_config_with_defaults() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        set_spanner_vars();

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.store_backend, StoreBackend::Spanner);
        assert_eq!(config.spanner.unwrap().emulator_host, None);
        assert_eq!(config.patients_table, "pacientes");
        assert_eq!(config.triage_table, "triajes");
        assert_eq!(config.triajes_api_base, None);
        assert_eq!(config.triage_lookup_timeout, Duration::from_secs(5));
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
    }

    #[test]
    fn test_memory_backend_needs_no_spanner_vars() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "memory");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.spanner.is_none());
    }

    #[test]
    fn test_missing_required_var() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        unsafe {
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
        }
        // Missing SPANNER_DATABASE

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("SPANNER_DATABASE"));
    }

    #[test]
    fn test_unknown_backend() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "dynamodb");
        }

        let result = Config::from_env();
        clear_env_vars();

        assert!(result.unwrap_err().to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn test_blank_triage_base_is_unset() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "memory");
            env::set_var("TRIAJES_API_BASE", "   ");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.triajes_api_base, None);
    }

    #[test]
    fn test_invalid_timeout() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "memory");
            env::set_var("TRIAGE_LOOKUP_TIMEOUT_SECS", "soon");
        }

        let result = Config::from_env();
        clear_env_vars();

        assert!(result.unwrap_err().to_string().contains("TRIAGE_LOOKUP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_invalid_port() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        set_spanner_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "not-a-number");
        }

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let _guard = ENV_LOCK.lock();
        clear_env_vars();
        set_spanner_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "99999");
        }

        let result = Config::from_env();
        clear_env_vars();

        assert!(result.is_err());
    }
}
