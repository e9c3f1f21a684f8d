use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::ShopAxes;

/// Environment variable that overrides the location of `config.toml`.
pub const CONFIG_PATH_ENV: &str = "COFFEE_FINDER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub location: LocationConfig,
    pub ranking: RankingConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,             // Serves POST /tokens and GET /coffee_shops
    pub timeout_secs: u64,            // Per-request client timeout
    pub max_token_refreshes: u32,     // New tokens fetched after 401/504 before giving up
    pub max_unavailable_retries: u32, // Same-token retries after 503
    pub backoff_base_ms: u64,         // First back-off sleep; doubles per attempt
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub auto_locate: bool, // Use IP geolocation if true
    pub lookup_ip: String, // Empty means "my own public address"
    pub manual_lat: f64,   // Latitude used if auto_locate is false
    pub manual_lon: f64,   // Longitude used if auto_locate is false
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    pub top_n: usize,
    /// Label is whatever follows the last occurrence of this text in the shop
    /// name. `None` or `""` keeps names as they are.
    pub name_strip_prefix: Option<String>,
    pub axes: ShopAxes,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub default_view: String, // "Bubbles" or "Map"
    pub tick_rate_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blue-bottle-api-test.herokuapp.com/v1".to_string(),
            timeout_secs: 10,
            max_token_refreshes: 3,
            max_unavailable_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            auto_locate: true,
            lookup_ip: String::new(),
            manual_lat: 37.7749,
            manual_lon: -122.4194,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            name_strip_prefix: Some("Blue Bottle ".to_string()),
            axes: ShopAxes::XLatitude,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_view: "Bubbles".to_string(),
            tick_rate_ms: 120,
        }
    }
}

impl Config {
    /// Path of the config file: `$COFFEE_FINDER_CONFIG` or `./config.toml`.
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads the config file from [`Config::path`].
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str(&content) {
                Ok(config) => {
                    info!(path = %config_path.display(), "Loaded configuration.");
                    return config;
                }
                Err(e) => {
                    warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", config_path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}
