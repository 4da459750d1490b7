//! Command-line and environment configuration

use std::time::Duration;

use clap::Parser;

/// Command-line arguments for the pdfedit server
///
/// Every flag can also be set through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfedit-server")]
#[command(about = "PDF layout extraction and coordinate patch editor")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "PDFEDIT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Maximum request body size in megabytes
    #[arg(long, env = "PDFEDIT_MAX_UPLOAD_MB", default_value = "50")]
    pub max_upload_mb: usize,

    /// Seconds an editing session stays alive after its last use
    #[arg(
        long,
        env = "PDFEDIT_SESSION_TTL_SECS",
        default_value = "1800",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub session_ttl_secs: u32,

    /// Seconds between sweeps for expired sessions
    #[arg(
        long,
        env = "PDFEDIT_SWEEP_INTERVAL_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,

    /// Maximum number of live sessions (0 = unlimited)
    #[arg(long, env = "PDFEDIT_MAX_SESSIONS", default_value = "0")]
    pub max_sessions: usize,

    /// Rate limit: requests per second per IP
    #[arg(
        long,
        env = "PDFEDIT_RATE_LIMIT",
        default_value = "10",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.session_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
