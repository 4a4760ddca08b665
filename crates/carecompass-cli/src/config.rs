use carecompass_client::ClientConfig;
use config::{Config as ConfigLoader, ConfigError, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the bearer credential
pub const TOKEN_VAR: &str = "CARECOMPASS_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl ApiConfig {
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.base_url.clone());
        match self.connect_timeout_secs {
            Some(secs) => config.with_connect_timeout_secs(secs),
            None => config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (ENV defaults to "dev")
    /// 3. API_BASE_URL, API_CONNECT_TIMEOUT_SECS, LOG_LEVEL, LOG_FORMAT
    ///
    /// The bearer credential is not part of the file config, see [`TOKEN_VAR`].
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .set_default("api.base_url", carecompass_client::DEFAULT_BASE_URL)?
            .set_default("logging.level", "warn")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .set_override_option("api.base_url", env_var("API_BASE_URL"))?
            .set_override_option(
                "api.connect_timeout_secs",
                env_var("API_CONNECT_TIMEOUT_SECS"),
            )?
            .set_override_option("logging.level", env_var("LOG_LEVEL"))?
            .set_override_option("logging.format", env_var("LOG_FORMAT"))?;

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [api]
            base_url = "https://carecompass.example.com/api"
            connect_timeout_secs = 5

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "https://carecompass.example.com/api");
        assert_eq!(config.logging.format, "json");

        let client = config.api.client_config();
        assert_eq!(client.connect_timeout_secs, Some(5));
    }

    #[test]
    fn test_timeout_optional() {
        let toml = r#"
            [api]
            base_url = "http://localhost:5000/api"

            [logging]
            level = "info"
            format = "pretty"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.api.client_config().connect_timeout_secs.is_none());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("carecompass-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://10.0.0.2/api\"\n[logging]\nlevel = \"warn\"\nformat = \"pretty\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.api.base_url, "http://10.0.0.2/api");
    }
}
