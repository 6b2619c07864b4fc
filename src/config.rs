use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub kafka: KafkaConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(true))
            .add_source(
                config::File::with_name(&format!("config/{env}"))
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub uri: String,
    #[serde(default = "PostgresConfig::default_pool_size")]
    pub max_connections: u32,
}

impl PostgresConfig {
    fn default_pool_size() -> u32 {
        10
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    #[serde(default = "KafkaConfig::default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "KafkaConfig::default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "KafkaConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "KafkaConfig::default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl KafkaConfig {
    fn default_session_timeout_ms() -> u64 {
        30_000
    }

    fn default_heartbeat_interval_ms() -> u64 {
        3_000
    }

    fn default_retry_backoff_ms() -> u64 {
        300
    }

    fn default_shutdown_grace_ms() -> u64 {
        30_000
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
