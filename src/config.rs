use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub templates_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let port = env_or("PORT", "8000")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid PORT value: {}", e))?;

        let cors_origins = env_or(
            "CORS_ORIGINS",
            "http://localhost:3000,http://localhost:8080",
        )
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

        Ok(Config {
            app_name: env_or("APP_NAME", "Excel Report API"),
            host: env_or("HOST", "127.0.0.1"),
            port,
            debug: env_or("DEBUG", "true").parse().unwrap_or(true),
            templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "./templates")),
            cors_origins,
        })
    }
}
