use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub upload: UploadSettings,
    pub chat: ChatSettings,
    pub sweep: SweepSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSettings {
    pub bucket_name: String,
    pub max_file_size_bytes: u64,
    pub max_files_per_request: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    pub edit_window_secs: u64,
    pub max_message_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepSettings {
    pub enabled: bool,
    /// 6-field cron expression, evaluated in UTC.
    pub schedule: String,
    pub min_age_hours: i64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("CAREERCOMPASS"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 4000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "careercompass")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "careercompass")?
            .set_default("upload.bucket_name", "uploads")?
            .set_default("upload.max_file_size_bytes", 5 * 1024 * 1024)?
            .set_default("upload.max_files_per_request", 5)?
            .set_default("chat.edit_window_secs", 300)?
            .set_default("chat.max_message_length", 2000)?
            .set_default("sweep.enabled", true)?
            .set_default("sweep.schedule", "0 0 * * * *")?
            .set_default("sweep.min_age_hours", 6)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
