//! Service configuration
//!
//! Every knob is a CLI flag with an environment fallback, parsed once at
//! startup into an immutable struct.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Runtime configuration for the render service.
#[derive(Parser, Debug, Clone)]
#[command(name = "htmlshot", version, about = "Render HTML or URLs to PDF and images over HTTP")]
pub struct ServiceConfig {
    /// Shared secret expected in the App-Key request header
    #[arg(long, env = "APP_KEY")]
    pub app_key: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Directory for short-lived render artifacts (default: system temp)
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Path to the Chrome/Chromium executable (default: autodetect)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Include internal error detail in error responses
    #[arg(long, env = "HTMLSHOT_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Maximum renders running at once (default: CPU count)
    #[arg(long, env = "MAX_CONCURRENT_RENDERS")]
    pub max_concurrent_renders: Option<usize>,
}

impl ServiceConfig {
    /// Resolved scratch directory.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("htmlshot"))
    }

    /// Resolved concurrent-render bound; never zero.
    pub fn render_slots(&self) -> usize {
        self.max_concurrent_renders
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get)
    }
}
