use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use crate::services::geocoder::MAPQUEST_ADDRESS_URL;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: String,
    /// Largest accepted photo, in bytes.
    pub max_file_upload: u64,
    pub geocoder_url: String,
    pub geocoder_api_key: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Bootcamp directory API")]
pub struct Args {
    /// Host to bind to (overrides BOOTCAMP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BOOTCAMP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides BOOTCAMP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory photo uploads are written to (overrides FILE_UPLOAD_PATH)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Maximum photo size in bytes (overrides MAX_FILE_UPLOAD)
    #[arg(long)]
    pub max_file_upload: Option<u64>,

    /// Geocoding endpoint (overrides GEOCODER_URL)
    #[arg(long)]
    pub geocoder_url: Option<String>,

    /// Geocoding API key (overrides GEOCODER_API_KEY)
    #[arg(long)]
    pub geocoder_api_key: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |key: &str| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// CLI values win over environment values, which win over defaults.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        let env_port = match var("BOOTCAMP_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing BOOTCAMP_PORT value `{}`", value))?,
            None => 5000,
        };
        let env_max_upload = match var("MAX_FILE_UPLOAD")? {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parsing MAX_FILE_UPLOAD value `{}` as bytes", value))?,
            None => 1_000_000,
        };

        Ok(Self {
            host: match args.host {
                Some(host) => host,
                None => var("BOOTCAMP_HOST")?.unwrap_or_else(|| "0.0.0.0".into()),
            },
            port: args.port.unwrap_or(env_port),
            database_url: match args.database_url {
                Some(url) => url,
                None => var("BOOTCAMP_DATABASE_URL")?
                    .unwrap_or_else(|| "sqlite://./data/bootcamps.db".into()),
            },
            upload_dir: match args.upload_dir {
                Some(dir) => dir,
                None => var("FILE_UPLOAD_PATH")?.unwrap_or_else(|| "./public/uploads".into()),
            },
            max_file_upload: args.max_file_upload.unwrap_or(env_max_upload),
            geocoder_url: match args.geocoder_url {
                Some(url) => url,
                None => var("GEOCODER_URL")?.unwrap_or_else(|| MAPQUEST_ADDRESS_URL.into()),
            },
            geocoder_api_key: match args.geocoder_api_key {
                Some(key) => Some(key),
                None => var("GEOCODER_API_KEY")?.filter(|k| !k.trim().is_empty()),
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
