use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub sweeps: SweepsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Параметры подключения к банковскому шлюзу (эквайринг)
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Базовый URL REST API шлюза
    pub base_url: String,
    pub user_name: String,
    pub password: String,
    /// Куда банк вернёт пользователя после успешной оплаты
    pub return_url: String,
    /// Куда банк вернёт пользователя после неуспешной оплаты
    pub fail_url: String,
    /// Валюта (ISO 4217 numeric)
    pub currency: String,
}

/// Параметры фоновых сверок
#[derive(Debug, Deserialize, Clone)]
pub struct SweepsConfig {
    /// Период запуска воркера, секунды
    pub interval_seconds: u64,
    /// Возраст pending-заказа, после которого он считается брошенным
    pub stale_pending_hours: i64,
    /// Минимальный возраст succeeded-заказа для проверки гранта
    pub gap_min_age_seconds: i64,
}

impl Default for SweepsConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            stale_pending_hours: 24,
            gap_min_age_seconds: 60,
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[gateway]
base_url = "https://3dsec.sberbank.ru/payment/rest"
user_name = "test-api"
password = "test"
return_url = "https://localhost/payment/success"
fail_url = "https://localhost/payment/fail"
currency = "643"

[sweeps]
interval_seconds = 300
stale_pending_hours = 24
gap_min_age_seconds = 60
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    // Try to find config.toml next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    // Fall back to default config
    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    // If absolute path, use as is
    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    // If relative path, resolve it relative to the executable directory
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let resolved_path = exe_dir.join(db_path);
            return Ok(resolved_path);
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Result<Config, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.database.path, "target/db/app.db");
        assert_eq!(config.gateway.currency, "643");
        assert_eq!(config.sweeps.interval_seconds, 300);
    }

    #[test]
    fn test_sweeps_section_optional() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "x.db"

            [gateway]
            base_url = "https://example/rest"
            user_name = "u"
            password = "p"
            return_url = "https://r"
            fail_url = "https://f"
            currency = "643"
            "#,
        )
        .unwrap();
        assert_eq!(config.sweeps.stale_pending_hours, 24);
    }
}
