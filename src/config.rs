//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Feed Parameters ===
    /// Number of amplified catalog entries per batch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How many times the base catalog is replicated.
    #[serde(default = "default_amplification")]
    pub amplification_factor: usize,

    /// Simulated fetch latency in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub load_latency_ms: u64,

    /// Sentinel visibility fraction that counts as visible (0.0 - 1.0).
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,

    // === Viewport Model ===
    /// Cards per grid row.
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,

    /// Height of one card row in pixels.
    #[serde(default = "default_row_height")]
    pub row_height_px: u32,

    /// Height of the visible viewport in pixels.
    #[serde(default = "default_viewport_height")]
    pub viewport_height_px: u32,

    // === Catalog ===
    /// JSON catalog file replacing the built-in mock markets.
    #[serde(default)]
    pub catalog_path: Option<String>,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_page_size() -> usize {
    20 // 5 rows x 4 columns
}

fn default_amplification() -> usize {
    10
}

fn default_latency_ms() -> u64 {
    800
}

fn default_visibility_threshold() -> f64 {
    0.1
}

fn default_grid_columns() -> usize {
    4
}

fn default_row_height() -> u32 {
    220
}

fn default_viewport_height() -> u32 {
    900
}

fn default_port() -> u16 {
    8080
}


impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            amplification_factor: default_amplification(),
            load_latency_ms: default_latency_ms(),
            visibility_threshold: default_visibility_threshold(),
            grid_columns: default_grid_columns(),
            row_height_px: default_row_height(),
            viewport_height_px: default_viewport_height(),
            catalog_path: None,
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("PAGE_SIZE must be at least 1".to_string());
        }

        if self.amplification_factor == 0 {
            return Err("AMPLIFICATION_FACTOR must be at least 1".to_string());
        }

        if u32::try_from(self.amplification_factor).is_err() {
            return Err(format!("AMPLIFICATION_FACTOR must be at most {}", u32::MAX));
        }

        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err("VISIBILITY_THRESHOLD must be between 0.0 and 1.0".to_string());
        }

        if self.grid_columns == 0 {
            return Err("GRID_COLUMNS must be at least 1".to_string());
        }

        if self.row_height_px == 0 || self.viewport_height_px == 0 {
            return Err("ROW_HEIGHT_PX and VIEWPORT_HEIGHT_PX must be positive".to_string());
        }

        Ok(())
    }

    /// Total number of entries the feed can ever show for a catalog of `base_len`.
    pub fn amplified_len(&self, base_len: usize) -> usize {
        base_len * self.amplification_factor
    }
}
