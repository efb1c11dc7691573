use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::pipeline::rasterizer::DEFAULT_PREVIEW_DPI;

/// Where rendered artifacts are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        endpoint: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub storage: StorageConfig,
    pub scratch_dir: PathBuf,
    pub latex_bin: String,
    pub ghostscript_bin: String,
    pub preview_dpi: u32,
    pub compile_timeout: Duration,
    pub rasterize_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(lookup);

        let storage = match env.or("STORAGE_BACKEND", "local").as_str() {
            "local" => StorageConfig::Local {
                root: env.or("ARTIFACT_DIR", "./artifacts").into(),
            },
            "s3" => StorageConfig::S3 {
                bucket: env.require("S3_BUCKET")?,
                endpoint: env.require("S3_ENDPOINT")?,
                region: env.or("S3_REGION", "us-east-1"),
                access_key_id: env.require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: env.require("AWS_SECRET_ACCESS_KEY")?,
            },
            other => bail!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            port: env.parse("PORT", 8080)?,
            rust_log: env.or("RUST_LOG", "info"),
            storage,
            scratch_dir: env.or("SCRATCH_DIR", "./latex_files").into(),
            latex_bin: env.or("LATEX_BIN", "pdflatex"),
            ghostscript_bin: env.or("GHOSTSCRIPT_BIN", "gs"),
            preview_dpi: env.parse("PREVIEW_DPI", DEFAULT_PREVIEW_DPI)?,
            compile_timeout: Duration::from_secs(env.parse("COMPILE_TIMEOUT_SECS", 60)?),
            rasterize_timeout: Duration::from_secs(env.parse("RASTERIZE_TIMEOUT_SECS", 30)?),
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
            None => Ok(default),
        }
    }
}
