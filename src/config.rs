use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub server_url: String,
    pub download_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self {
            server_url: try_load("REVIEWD_SERVER_URL", "http://127.0.0.1:5000".to_string()),
            download_dir: PathBuf::from(try_load("REVIEWD_DOWNLOAD_DIR", ".".to_string())),
            http_timeout: Duration::from_secs(try_load("REVIEWD_HTTP_TIMEOUT_SECS", 30u64)),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}; using default: {default}");
        default
    })
}
