//! Configuration management for the image server.
//!
//! Options come from command-line arguments, fall back to environment
//! variables with the `IMG_` prefix, and otherwise use the defaults below.
//!
//! # Environment Variables
//!
//! - `IMG_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMG_PORT` - Server port (default: 3000)
//! - `IMG_ROOT` - Directory that `/static/...` paths are resolved against (default: .)
//! - `IMG_CACHE_TTL` - Seconds a transformed image stays cached (default: 3600)
//! - `IMG_CACHE_MAX_ENTRIES` - Max transformed images to cache (default: 100)
//! - `IMG_SWEEP_INTERVAL` - Seconds between expired-entry sweeps (default: 300)
//! - `IMG_DEFAULT_QUALITY` - Quality when a request omits `q` (default: 80)
//! - `IMG_CACHE_MAX_AGE` - HTTP Cache-Control max-age seconds (default: 3600)
//! - `IMG_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cache::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL};
use crate::transform::{is_valid_quality, DEFAULT_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default root directory.
pub const DEFAULT_ROOT: &str = ".";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image delivery server: resizes and re-encodes static images on request.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-delivery")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMG_PORT")]
    pub port: u16,

    /// Directory that image paths (`/static/...`) are resolved against.
    #[arg(long, default_value = DEFAULT_ROOT, env = "IMG_ROOT")]
    pub root: PathBuf,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Seconds a transformed image stays in the cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs(), env = "IMG_CACHE_TTL")]
    pub cache_ttl: u64,

    /// Maximum number of transformed images to cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_ENTRIES, env = "IMG_CACHE_MAX_ENTRIES")]
    pub cache_max_entries: usize,

    /// Seconds between background sweeps of expired cache entries.
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs(), env = "IMG_SWEEP_INTERVAL")]
    pub sweep_interval: u64,

    // =========================================================================
    // Image Configuration
    // =========================================================================
    /// Output quality (1-100) used when a request does not set `q`.
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "IMG_DEFAULT_QUALITY")]
    pub default_quality: u8,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IMG_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if !self.root.is_dir() {
            return Err(format!(
                "root directory '{}' does not exist. Set --root or IMG_ROOT",
                self.root.display()
            ));
        }

        if self.cache_ttl == 0 {
            return Err("cache_ttl must be greater than 0".to_string());
        }
        if self.cache_max_entries == 0 {
            return Err("cache_max_entries must be greater than 0".to_string());
        }
        if self.sweep_interval == 0 {
            return Err("sweep_interval must be greater than 0".to_string());
        }

        if !is_valid_quality(self.default_quality) {
            return Err("default_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cache time-to-live as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Sweep period as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

// =============================================================================
// Tests
// =============================================================================
