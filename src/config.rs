use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub progress_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub cookie_max_age_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_body_size: usize,  // in bytes
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_defaults_load() {
        let config = Config::load().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.progress_file, "data/progress.csv");
        assert_eq!(config.identity.cookie_max_age_days, 7);
    }
}
